// Adapter configuration.
//
// Mirrors the shape of the other adapter configs in this family: a plain
// struct with defaults, no builder. `base_url` is the only required value.

use std::time::Duration;

/// Minimum accepted session token length.
pub const TOKEN_MIN_LEN: usize = 16;

/// Maximum accepted session token length.
pub const TOKEN_MAX_LEN: usize = 255;

/// Retry policy for remote calls.
///
/// Retries apply only to transport failures and to the statuses listed in
/// `retryable_statuses`. Delays grow exponentially with up to 10% jitter,
/// capped at `max_delay_ms`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// HTTP statuses considered safe to retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based):
    /// `initial × 2^attempt × (1 + jitter)`, jitter up to 10%, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms.saturating_mul(1u64 << attempt.min(16));
        let jitter = 1.0 + rand::random::<f64>() * 0.1;
        let ms = ((base as f64) * jitter).min(self.max_delay_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

/// Configuration for [`RestCrudAdapter`](crate::adapter::RestCrudAdapter).
#[derive(Debug, Clone)]
pub struct RestCrudConfig {
    /// Base URL of the generated REST backend (required).
    pub base_url: String,

    /// API key sent on every request. With the default `Authorization`
    /// header this is sent as `Bearer <key>`; with a custom header name the
    /// key is sent verbatim.
    pub api_key: Option<String>,

    /// Header name used for the API key (default: `Authorization`).
    pub auth_header: String,

    /// Per-request timeout in seconds (default: 30).
    pub timeout_secs: u64,

    /// Retry policy for retryable failures.
    pub retry: RetryPolicy,

    /// Whether collection paths are pluralized (`users` vs `user`).
    /// Default: true, since generated backends pluralize.
    pub use_plural: bool,

    /// Lower-case, trim, and format-check user emails (default: true).
    pub normalize_email: bool,

    /// Check required-field presence and types before mapping (default: true).
    pub validate: bool,

    /// Issue soft deletes (`DELETE /{id}?soft=true`) instead of hard deletes.
    pub soft_delete: bool,

    /// Send an `X-Tenant-ID` header when a tenant is set on the adapter.
    pub multi_tenant: bool,

    /// Emit a `tracing` debug event for every adapter operation.
    pub debug_logs: bool,

    /// Skip all write requests, echoing the would-be payload back.
    pub dry_run: bool,
}

impl Default for RestCrudConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            auth_header: "Authorization".to_string(),
            timeout_secs: 30,
            retry: RetryPolicy::default(),
            use_plural: true,
            normalize_email: true,
            validate: true,
            soft_delete: false,
            multi_tenant: false,
            debug_logs: false,
            dry_run: false,
        }
    }
}

impl RestCrudConfig {
    /// Config with defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RestCrudConfig::new("https://api.example.com");
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.auth_header, "Authorization");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.use_plural);
        assert!(config.normalize_email);
        assert!(config.validate);
        assert!(!config.soft_delete);
        assert!(!config.dry_run);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retryable_statuses, vec![429, 500, 502, 503, 504]);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();

        let first = policy.delay_for(0).as_millis() as u64;
        assert!((200..=220).contains(&first), "got {first}");

        let second = policy.delay_for(1).as_millis() as u64;
        assert!((400..=440).contains(&second), "got {second}");

        // Far past the cap
        let late = policy.delay_for(10).as_millis() as u64;
        assert_eq!(late, policy.max_delay_ms);
    }

    #[test]
    fn test_backoff_attempt_overflow_is_capped() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_for(u32::MAX).as_millis() as u64;
        assert_eq!(delay, policy.max_delay_ms);
    }
}
