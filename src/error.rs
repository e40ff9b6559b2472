// External crates
use polars::error::PolarsError;
use thiserror::Error;

/// Errors raised while building a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A numeric parameter is outside its accepted range
    #[error("invalid {name}: {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("required column '{0}' not found")]
    MissingColumn(String),

    #[error("column '{0}' cannot be read as floating point values")]
    NonNumericColumn(String),

    #[error("no feature columns left besides the label column")]
    NoFeatureColumns,

    #[error("unsupported kline interval '{0}'")]
    InvalidInterval(String),

    #[error("candle download failed: {0}")]
    Fetch(String),

    #[error("invalid array archive: {0}")]
    InvalidArchive(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Encode(#[from] bincode::error::EncodeError),

    #[error(transparent)]
    Decode(#[from] bincode::error::DecodeError),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

impl DatasetError {
    pub fn invalid(name: &'static str, value: impl ToString, reason: &'static str) -> Self {
        DatasetError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
