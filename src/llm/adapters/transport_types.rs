//! Transport types
//!
//! Common types shared across transport implementations.

use crate::llm::parse::TranslationError;

/// Adapter errors
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Network error (connection refused, reset, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Request deadline exceeded
    #[error("request timed out")]
    Timeout,

    /// HTTP error (non-2xx status)
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Authentication failed
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Rate limited by the provider
    #[error("rate limited by provider")]
    RateLimited,

    /// Response envelope not understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Provider returned unusable intent IR
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl AdapterError {
    /// Transient errors are worth retrying; everything else propagates
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Network(_) | AdapterError::Timeout | AdapterError::RateLimited => true,
            AdapterError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            AdapterError::Timeout
        } else {
            AdapterError::Io(err.to_string())
        }
    }
}

impl From<ureq::Error> for AdapterError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(401, _) => {
                AdapterError::Authentication("invalid API key".to_string())
            }
            ureq::Error::Status(429, _) => AdapterError::RateLimited,
            ureq::Error::Status(code, _) => AdapterError::Http {
                status: code,
                message: format!("HTTP {}", code),
            },
            ureq::Error::Transport(err) => AdapterError::Network(err.to_string()),
        }
    }
}

/// Synchronous HTTP transport
///
/// Abstraction over the HTTP client so adapters can be exercised with a
/// scripted fake.
pub trait SyncTransport: Send + Sync {
    /// POST JSON request and return the response body
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, AdapterError>;

    /// POST JSON request and process the streaming response line-by-line
    ///
    /// Calls `on_line` for each line of the response body.
    /// Returns the concatenated body.
    fn post_stream<F>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        on_line: F,
    ) -> Result<String, AdapterError>
    where
        F: FnMut(&str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AdapterError::Network("refused".into()).is_transient());
        assert!(AdapterError::Timeout.is_transient());
        assert!(AdapterError::RateLimited.is_transient());
        assert!(AdapterError::Http {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());

        assert!(!AdapterError::Http {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!AdapterError::Authentication("nope".into()).is_transient());
        assert!(!AdapterError::Configuration("missing key".into()).is_transient());
    }

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::Network("test".to_string());
        assert_eq!(format!("{}", err), "network error: test");

        let err = AdapterError::Http {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(format!("{}", err), "HTTP error 404: not found");
    }
}
