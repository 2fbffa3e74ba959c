// Email normalization: trim, lower-case, format check.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AdapterError, AdapterResult};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Normalize an email address. Idempotent: normalizing an already
/// normalized address is a no-op.
pub fn normalize(raw: &str) -> AdapterResult<String> {
    let normalized = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(AdapterError::invalid_field(
            "email",
            format!("'{raw}' is not a valid email address"),
        ));
    }
    Ok(normalized)
}

/// Whether a string looks like a valid, already-normalized email.
pub fn is_valid(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize("A@B.com").unwrap(), "a@b.com");
        assert_eq!(normalize("  Alice@Example.COM  ").unwrap(), "alice@example.com");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("Alice@Example.com").unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(normalize("not-an-email").is_err());
        assert!(normalize("a@b").is_err());
        assert!(normalize("a b@c.com").is_err());
        assert!(normalize("").is_err());
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = normalize("bad").unwrap_err();
        let issues = err.issues().unwrap();
        assert_eq!(issues[0].field, "email");
    }
}
