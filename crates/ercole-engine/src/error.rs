/// Failure of one ingestion, as surfaced to the HTTP boundary.
///
/// `Validation` maps to 422, `Infrastructure` to 500. Best-effort failures
/// never show up here: they are logged where they happen.
///
/// # Examples
///
/// ```rust
/// use ercole_engine::IngestError;
///
/// let err = IngestError::Validation("hostname is empty".into());
/// assert!(err.is_validation());
/// assert!(err.to_string().contains("hostname"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The snapshot breaks a business rule and was not persisted.
    #[error("Invalid hostdata: {0}")]
    Validation(String),

    /// A fatal step failed against the store or the alert sink.
    #[error("Ingestion failed at {step}: {source}")]
    Infrastructure {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl IngestError {
    pub fn infrastructure(step: &'static str, source: anyhow::Error) -> Self {
        IngestError::Infrastructure { step, source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, IngestError::Validation(_))
    }
}

/// Errors of the engine's own jobs and helpers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A job was configured with values it cannot run with.
    #[error("Engine: invalid configuration: {0}")]
    InvalidConfig(String),

    /// The alert sink refused an alert the caller needed delivered.
    #[error("Engine: alert delivery failed: {0}")]
    AlertDelivery(#[source] anyhow::Error),

    /// A port other than the alert sink failed.
    #[error("Engine: {0}")]
    Port(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
