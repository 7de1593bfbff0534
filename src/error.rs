use thiserror::Error;

#[derive(Error, Debug)]
pub enum QoiError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    /// A step did not supply exactly one value per tracked quantity.
    #[error("Inconsistent Update: {0}")]
    InconsistentUpdate(String),

    #[error("Division by zero: mean requested before any sample was recorded")]
    ZeroSamples,

    #[error("Field '{field}' is not defined on region '{region}'")]
    MissingField { field: String, region: String },

    #[error("Node {node} has no entry in region '{region}'")]
    UnknownNode { node: u64, region: String },

    /// Raised by a field mapper; always propagated unchanged.
    #[error("Mapping Failure: {0}")]
    MappingFailure(String),
}

pub type QoiResult<T> = Result<T, QoiError>;
