#[derive(Debug, thiserror::Error)]
pub enum AzureError {
    /// The service answered with a structured error body
    #[error("API error ({status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        error_type: String,
        param: Option<String>,
        code: Option<String>,
    },
    /// Non-success status whose body could not be decoded
    #[error("HTTP error: status {status}")]
    HttpError { status: u16 },
    /// Success status but the body did not match the expected type
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Transport failure after the stream was opened
    #[error("Streaming error: {0}")]
    StreamingError(String),
    /// A request value could not be serialized
    #[error("Encoding error: {0}")]
    EncodingError(String),
    /// A polymorphic field matched none of its wire shapes
    #[error("Unrecognized shape for {type_name}: {found}")]
    UnrecognizedShape {
        type_name: &'static str,
        found: String,
    },
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(reqwest::Error),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IOError(String),
    /// The client's own transport was shut down
    #[error("Client has been shut down")]
    ClientClosed,
}

impl AzureError {
    pub(crate) fn unrecognized(type_name: &'static str, value: &serde_json::Value) -> Self {
        let mut found = value.to_string();
        if found.len() > 80 {
            let cut = (0..=80).rev().find(|&i| found.is_char_boundary(i)).unwrap_or(0);
            found.truncate(cut);
            found.push_str("...");
        }
        Self::UnrecognizedShape { type_name, found }
    }

    /// Status code carried by `ApiError` and `HttpError`.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } | Self::HttpError { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AzureError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err.to_string())
    }
}

impl From<serde_json::Error> for AzureError {
    fn from(err: serde_json::Error) -> Self {
        Self::EncodingError(err.to_string())
    }
}

impl From<reqwest::Error> for AzureError {
    fn from(err: reqwest::Error) -> Self {
        // Status-bearing errors come from error_for_status and carry no body
        if let Some(status) = err.status() {
            Self::HttpError {
                status: status.as_u16(),
            }
        } else if err.is_decode() || err.is_body() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err)
        }
    }
}
