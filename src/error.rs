/// Convenience result type used across the engine.
pub type GaugeResult<T> = Result<T, GaugeError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Every variant is scoped to a single creative: no error from one creative
/// may prevent processing of another. Batch-level code reports these through
/// `tracing` and keeps going.
#[derive(thiserror::Error, Debug)]
pub enum GaugeError {
    /// Malformed or missing required fields in one creative's config section.
    #[error("config error: {0}")]
    Config(String),

    /// No background variant range matched the percentage.
    #[error("selection error: {0}")]
    Selection(String),

    /// A raster asset or font could not be fetched or decoded.
    #[error("asset load error: {0}")]
    AssetLoad(String),

    /// The output image could not be written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The upload sink rejected the finished creative.
    #[error("upload error: {0}")]
    Upload(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GaugeError {
    /// Build a [`GaugeError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`GaugeError::Selection`] value.
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }

    /// Build a [`GaugeError::AssetLoad`] value.
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    /// Build a [`GaugeError::Persistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Build a [`GaugeError::Upload`] value.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }
}
