use umls_ingest::IngestError;
use umls_model::ModelError;

/// Errors raised while grounding a mention batch.
#[derive(Debug, thiserror::Error)]
pub enum GroundingError {
    /// Options rejected before any processing.
    #[error("invalid grounding options: {0}")]
    Options(#[from] ModelError),

    /// The reference scan failed, was cancelled, or ran past its deadline.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A mention batch is too large to index.
    #[error("mention batch of {count} unique mentions exceeds the supported maximum")]
    BatchTooLarge { count: usize },
}

impl GroundingError {
    /// True when the scan stopped on request rather than failing.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Ingest(e) if e.is_cancellation())
    }
}

pub type Result<T> = std::result::Result<T, GroundingError>;
