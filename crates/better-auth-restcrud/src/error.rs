// Adapter error taxonomy: a closed set of ten kinds, each carrying a
// retryable classification and the originating HTTP status when known.
//
// Validation failures are raised before any network call and are never
// retryable. Retryability for remote failures is decided against the
// configured retryable status list, not hardcoded per kind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// A single field-level validation failure.
///
/// Validation errors always carry a list of these, never a flat message,
/// so callers can act on individual field errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Error kind discriminant, used for metrics bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    Network,
    Timeout,
    RateLimited,
    Server,
    Unknown,
}

impl ErrorKind {
    /// Every kind, in metrics slot order.
    pub const ALL: [ErrorKind; 10] = [
        Self::Validation,
        Self::NotFound,
        Self::Conflict,
        Self::Unauthorized,
        Self::Forbidden,
        Self::Network,
        Self::Timeout,
        Self::RateLimited,
        Self::Server,
        Self::Unknown,
    ];

    /// Stable slot index for metrics counters.
    pub fn slot(&self) -> usize {
        match self {
            Self::Validation => 0,
            Self::NotFound => 1,
            Self::Conflict => 2,
            Self::Unauthorized => 3,
            Self::Forbidden => 4,
            Self::Network => 5,
            Self::Timeout => 6,
            Self::RateLimited => 7,
            Self::Server => 8,
            Self::Unknown => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Server => "SERVER_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The adapter error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    /// Input failed shape or format validation. Raised before any network
    /// call; never retryable.
    #[error("Validation failed on {} field(s)", .issues.len())]
    Validation { issues: Vec<FieldIssue> },

    /// The targeted record does not exist (update/delete of a missing
    /// record). Single-record reads return `Ok(None)` instead.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record with the same unique key already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 401 from the remote API.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 403 from the remote API.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transport-level failure (DNS, connection refused, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// 429 from the remote API.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 5xx from the remote API.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Anything that doesn't fit the taxonomy.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AdapterError {
    /// Build a validation error from a list of field issues.
    pub fn validation(issues: Vec<FieldIssue>) -> Self {
        Self::Validation { issues }
    }

    /// Build a validation error for a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    /// Classify a non-2xx HTTP status into an error kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::Validation {
                issues: vec![FieldIssue::new("body", message)],
            },
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            429 => Self::RateLimited(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Unknown(format!("HTTP {status}: {message}")),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// The originating HTTP status, if one applies.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::RateLimited(_) => Some(429),
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the operation is safe, given the configured set of
    /// retryable HTTP statuses. Transport failures are always retryable;
    /// validation never is.
    pub fn is_retryable(&self, retryable_statuses: &[u16]) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Validation { .. } => false,
            other => other
                .status()
                .map(|s| retryable_statuses.contains(&s))
                .unwrap_or(false),
        }
    }

    /// The validation issues, if this is a validation error.
    pub fn issues(&self) -> Option<&[FieldIssue]> {
        match self {
            Self::Validation { issues } => Some(issues),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_RETRYABLE: &[u16] = &[429, 500, 502, 503, 504];

    #[test]
    fn test_from_status_classification() {
        assert_eq!(
            AdapterError::from_status(401, "x").kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            AdapterError::from_status(403, "x").kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            AdapterError::from_status(404, "x").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AdapterError::from_status(409, "x").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            AdapterError::from_status(429, "x").kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            AdapterError::from_status(503, "x").kind(),
            ErrorKind::Server
        );
        assert_eq!(
            AdapterError::from_status(422, "x").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AdapterError::from_status(302, "x").kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_retryable() {
        assert!(AdapterError::Network("down".into()).is_retryable(DEFAULT_RETRYABLE));
        assert!(AdapterError::Timeout("slow".into()).is_retryable(DEFAULT_RETRYABLE));
        assert!(AdapterError::from_status(429, "x").is_retryable(DEFAULT_RETRYABLE));
        assert!(AdapterError::from_status(502, "x").is_retryable(DEFAULT_RETRYABLE));
        assert!(!AdapterError::from_status(404, "x").is_retryable(DEFAULT_RETRYABLE));
        assert!(!AdapterError::from_status(409, "x").is_retryable(DEFAULT_RETRYABLE));
        assert!(!AdapterError::invalid_field("email", "bad").is_retryable(DEFAULT_RETRYABLE));
    }

    #[test]
    fn test_validation_carries_issue_list() {
        let err = AdapterError::validation(vec![
            FieldIssue::new("email", "must be a string"),
            FieldIssue::new("userId", "is required"),
        ]);
        let issues = err.issues().unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].field, "email");
        assert!(format!("{err}").contains("2 field(s)"));
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(AdapterError::from_status(401, "x").status(), Some(401));
        assert_eq!(
            AdapterError::Server {
                status: 502,
                message: "bad gateway".into()
            }
            .status(),
            Some(502)
        );
        assert_eq!(AdapterError::Network("x".into()).status(), None);
    }

    #[test]
    fn test_kind_slots_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for kind in ErrorKind::ALL {
            assert!(seen.insert(kind.slot()));
        }
    }
}
