use thiserror::Error;

#[derive(Error, Debug)]
pub enum RxError {
    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image encode error: {0}")]
    Encode(String),

    #[error("Service error: {message}")]
    Service {
        message: String,
        status: Option<u16>,
    },

    #[error("Operation timed out after {attempts} polls")]
    Timeout { attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Entity recognition unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl RxError {
    pub fn service(message: impl Into<String>) -> Self {
        RxError::Service {
            message: message.into(),
            status: None,
        }
    }

    pub fn service_status(status: u16, message: impl Into<String>) -> Self {
        RxError::Service {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Whether a caller may reasonably retry the whole call.
    pub fn is_retryable(&self) -> bool {
        match self {
            RxError::Service {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            RxError::Http(_) | RxError::Timeout { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RxError>;
