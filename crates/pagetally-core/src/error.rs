use thiserror::Error;

/// Failures surfaced by the ingestion and reporting components.
///
/// The first four variants are tracking rejections. They are expected from
/// arbitrary web callers and must never be reported back with detail.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("property token is required")]
    MissingToken,

    #[error("property not found")]
    PropertyNotFound,

    #[error("property is not active")]
    PropertyInactive,

    #[error("request origin '{origin}' does not match property domain '{domain}'")]
    OriginMismatch { origin: String, domain: String },

    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    #[error("unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    #[error("window start must be on or before window end")]
    InvalidWindow,

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl CoreError {
    /// `true` for validation failures of a tracking request.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CoreError::MissingToken
                | CoreError::PropertyNotFound
                | CoreError::PropertyInactive
                | CoreError::OriginMismatch { .. }
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
