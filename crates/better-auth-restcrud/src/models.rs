// Framework-shape entity models.
//
// These are the shapes the auth framework works with (camelCase). The remote
// backend uses a slightly different schema; the mapper owns that
// translation. The framework shape deliberately does not expose the remote
// `created_at`/`updated_at` bookkeeping columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Stored normalized (lower-case, trimmed).
    pub email: String,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Remote field name: `password_hash`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashed_password: Option<String>,
}

/// Proof of an active login. The `id` is the remote primary key and may be
/// distinct from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// The bearer value used in cookies. Remote field name: `token`.
    pub session_token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Single-use token for email verification / password reset.
///
/// Multiple tokens per identifier are allowed; lookups take the first
/// active one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationToken {
    pub id: String,
    /// The email or subject this token was issued for.
    pub identifier: String,
    /// The secret. `token` is accepted as a legacy alias on input.
    #[serde(alias = "token")]
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// A linked authentication method (credential entry or OAuth provider link).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub user_id: String,
    /// "credential" or "oauth".
    #[serde(rename = "type")]
    pub account_type: String,
    /// Remote field name: `providerId`.
    pub provider: String,
    /// Remote field name: `accountId`.
    pub provider_account_id: String,
    /// Only for credential accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// OAuth expiry, seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
}
