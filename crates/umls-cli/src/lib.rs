//! Library side of the `umls-grounder` binary: logging setup and config.

pub mod config;
pub mod logging;
