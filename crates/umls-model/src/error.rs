use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid option {field}: {message}")]
    InvalidOption {
        field: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
