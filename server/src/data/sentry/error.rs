//! Fetch error types

use thiserror::Error;

/// Failure of a single upstream API call
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Request to {path} timed out")]
    Timeout { path: String },

    #[error("Request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} from {path}")]
    Status { path: String, status: u16 },

    #[error("Malformed response from {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl FetchError {
    pub(crate) fn from_transport(path: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                path: path.to_string(),
            }
        } else {
            Self::Http {
                path: path.to_string(),
                source: err,
            }
        }
    }

    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status {
            path: "/organizations/acme/events/".to_string(),
            status: 403,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected status 403 from /organizations/acme/events/"
        );
    }

    #[test]
    fn test_malformed_error_display() {
        let err = FetchError::malformed("/projects/acme/1/", "missing field `organization`");
        assert_eq!(
            err.to_string(),
            "Malformed response from /projects/acme/1/: missing field `organization`"
        );
    }

    #[test]
    fn test_timeout_error_display() {
        let err = FetchError::Timeout {
            path: "/x".to_string(),
        };
        assert_eq!(err.to_string(), "Request to /x timed out");
    }
}
