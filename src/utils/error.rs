use thiserror::Error;

/// 模板在某筆記錄上求值失敗
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("field '{field}' referenced by template '{template}' is missing")]
    MissingField { template: String, field: String },

    #[error("template '{template}' could not be evaluated: {reason}")]
    Syntax { template: String, reason: String },
}

impl EvaluationError {
    pub fn template(&self) -> &str {
        match self {
            EvaluationError::MissingField { template, .. } => template,
            EvaluationError::Syntax { template, .. } => template,
        }
    }
}

/// HTTP 傳輸層錯誤
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Client { message: String },
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Evaluation error: {0}")]
    EvaluationError(#[from] EvaluationError),

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Retries exhausted after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: usize, message: String },

    #[error("Response body is not valid JSON: {0}")]
    DecodeError(#[source] serde_json::Error),

    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
