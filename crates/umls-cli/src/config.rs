//! TOML configuration for grounding runs.
//!
//! Every field has a default, so an empty file (or no file) is valid as
//! long as the reference path arrives from the command line. Relative paths
//! in a config file resolve against the file's directory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use umls_ingest::{DEFAULT_CHECK_INTERVAL, ScanControl, ScanOptions, load_semantic_types};
use umls_model::{
    DEFAULT_PREFERRED_TERM_TYPES, DEFAULT_SOURCE_PREFERENCE, DEFAULT_TOP_K, GroundingOptions,
    SemanticTypeOptions,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroundingConfig {
    /// MRCONSO-style reference file.
    pub reference_file: Option<PathBuf>,
    /// Source vocabularies, best first. Empty ranks all sources equally.
    pub source_preference: Vec<String>,
    pub top_k: usize,
    pub preferred_term_types: BTreeSet<String>,
    pub use_semantic_type_filter: bool,
    /// MRSTY-style file merged into `cui_to_semantic_types`.
    pub semantic_types_file: Option<PathBuf>,
    pub anatomy_type_codes: BTreeSet<String>,
    pub observation_type_codes: BTreeSet<String>,
    pub cui_to_semantic_types: BTreeMap<String, BTreeSet<String>>,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// 0 = one shard per worker thread.
    pub shards: usize,
    /// Lines between cancellation and deadline checks.
    pub check_interval: u64,
    /// 0 = no deadline.
    pub deadline_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            shards: 0,
            check_interval: DEFAULT_CHECK_INTERVAL,
            deadline_secs: 0,
        }
    }
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            reference_file: None,
            source_preference: DEFAULT_SOURCE_PREFERENCE
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            top_k: DEFAULT_TOP_K,
            preferred_term_types: DEFAULT_PREFERRED_TERM_TYPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            use_semantic_type_filter: false,
            semantic_types_file: None,
            anatomy_type_codes: BTreeSet::new(),
            observation_type_codes: BTreeSet::new(),
            cui_to_semantic_types: BTreeMap::new(),
            scan: ScanConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub reference_file: Option<PathBuf>,
    pub top_k: Option<usize>,
    /// `Some(vec![])` disables source preference.
    pub source_preference: Option<Vec<String>>,
    pub semantic_filter: Option<bool>,
    pub semantic_types_file: Option<PathBuf>,
    pub shards: Option<usize>,
    pub deadline_secs: Option<u64>,
}

impl GroundingConfig {
    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let mut config = Self::from_toml_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `path` when given, else start from defaults, then apply overrides.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.reference_file {
            self.reference_file = Some(path.clone());
        }
        if let Some(top_k) = overrides.top_k {
            self.top_k = top_k;
        }
        if let Some(sources) = &overrides.source_preference {
            self.source_preference.clone_from(sources);
        }
        if let Some(enabled) = overrides.semantic_filter {
            self.use_semantic_type_filter = enabled;
        }
        if let Some(path) = &overrides.semantic_types_file {
            self.semantic_types_file = Some(path.clone());
        }
        if let Some(shards) = overrides.shards {
            self.scan.shards = shards;
        }
        if let Some(secs) = overrides.deadline_secs {
            self.scan.deadline_secs = secs;
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.reference_file, &mut self.semantic_types_file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// The reference file path; a run without one cannot start.
    pub fn reference_file(&self) -> Result<&Path> {
        match &self.reference_file {
            Some(path) => Ok(path),
            None => bail!("no reference file: pass --reference or set reference_file in the config"),
        }
    }

    /// Grounding options, loading the semantic-type file when configured.
    ///
    /// Inline `cui_to_semantic_types` entries are unioned with the file's.
    pub fn grounding_options(&self) -> Result<GroundingOptions> {
        let mut mapping = match &self.semantic_types_file {
            Some(path) => load_semantic_types(path)
                .with_context(|| format!("load semantic types {}", path.display()))?,
            None => BTreeMap::new(),
        };
        for (cui, codes) in &self.cui_to_semantic_types {
            mapping
                .entry(cui.clone())
                .or_default()
                .extend(codes.iter().cloned());
        }

        let semantic_types = SemanticTypeOptions::default()
            .enabled(self.use_semantic_type_filter)
            .with_mapping(mapping)
            .with_anatomy_codes(self.anatomy_type_codes.iter().cloned())
            .with_observation_codes(self.observation_type_codes.iter().cloned());

        let mut options = GroundingOptions::new()
            .with_top_k(self.top_k)
            .with_semantic_types(semantic_types);
        options.preferred_term_types.clone_from(&self.preferred_term_types);
        options = if self.source_preference.is_empty() {
            options.without_source_preference()
        } else {
            options.with_source_preference(self.source_preference.iter().cloned())
        };
        options.validate().context("invalid grounding options")?;
        Ok(options)
    }

    /// Scan options with a fresh control, armed with the configured deadline.
    pub fn scan_options(&self) -> ScanOptions {
        let mut control = ScanControl::new();
        if self.scan.deadline_secs > 0 {
            control = control.with_timeout(Duration::from_secs(self.scan.deadline_secs));
        }
        ScanOptions::default()
            .with_shards(self.scan.shards)
            .with_check_interval(self.scan.check_interval)
            .with_control(control)
    }
}
