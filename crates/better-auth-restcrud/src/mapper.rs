// Entity mapper: bidirectional field-level translation between the
// framework shape and the remote shape, per entity kind.
//
// The two schemas differ in a handful of fixed renames, not in a general
// casing convention, so the mapper carries explicit per-entity rename tables
// instead of a blanket camelCase/snake_case transform:
//
//   user:              hashedPassword      <-> password_hash
//   session:           sessionToken        <-> token
//   verificationToken: value               <-> token  (legacy `token` accepted inbound)
//   account:           provider            <-> providerId
//                      providerAccountId   <-> accountId
//
// The remote side additionally carries `created_at`/`updated_at`, which the
// framework shape never sees: backfilled outbound on create, stripped
// inbound. Unknown models pass through unchanged so custom entities work
// without adapter changes.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::RestCrudConfig;
use crate::email;
use crate::error::{AdapterError, AdapterResult, FieldIssue};
use crate::naming::canonical_model;

const USER_RENAMES: &[(&str, &str)] = &[("hashedPassword", "password_hash")];
const SESSION_RENAMES: &[(&str, &str)] = &[("sessionToken", "token")];
const VERIFICATION_RENAMES: &[(&str, &str)] = &[("value", "token")];
const ACCOUNT_RENAMES: &[(&str, &str)] = &[
    ("provider", "providerId"),
    ("providerAccountId", "accountId"),
];

/// Models whose remote records always carry `created_at`/`updated_at`.
const TIMESTAMPED: &[&str] = &["user", "session", "account"];

fn renames_for(model: &str) -> &'static [(&'static str, &'static str)] {
    match model {
        "user" => USER_RENAMES,
        "session" => SESSION_RENAMES,
        "verificationToken" => VERIFICATION_RENAMES,
        "account" => ACCOUNT_RENAMES,
        _ => &[],
    }
}

/// Translate a framework field name to its remote column name.
pub fn remote_field(model: &str, field: &str) -> String {
    let Some(canonical) = canonical_model(model) else {
        return field.to_string();
    };
    renames_for(canonical)
        .iter()
        .find(|(fw, _)| *fw == field)
        .map(|(_, remote)| (*remote).to_string())
        .unwrap_or_else(|| field.to_string())
}

/// Convert a framework-shape record to the remote shape (full mapper).
///
/// Fields absent on the input are omitted, not nulled. An empty-string id is
/// dropped; a record arriving without an id is taken as a creation (a
/// heuristic, not a guarantee) and gets `created_at`/`updated_at` backfilled
/// where the remote schema requires them. New account records without an id
/// get a client-side v4 UUID, since the remote id column is not reliably
/// auto-assigned for every entity.
pub fn to_api(model: &str, value: Value, config: &RestCrudConfig) -> AdapterResult<Value> {
    let Some(canonical) = canonical_model(model) else {
        return Ok(value);
    };
    let Value::Object(mut obj) = value else {
        return Ok(value);
    };

    drop_empty_id(&mut obj);
    let creating = !obj.contains_key("id");

    if config.validate {
        let issues = validate_framework(canonical, &obj);
        if !issues.is_empty() {
            return Err(AdapterError::validation(issues));
        }
    }

    if canonical == "user" {
        normalize_user_email(&mut obj, config, true)?;
    }

    if canonical == "account" && creating {
        obj.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }

    if canonical == "verificationToken" {
        reconcile_verification_value(&mut obj);
    }

    let mut out = rename_keys(obj, renames_for(canonical), false);

    if creating && TIMESTAMPED.contains(&canonical) {
        let now = Value::String(Utc::now().to_rfc3339());
        out.insert("created_at".to_string(), now.clone());
        out.insert("updated_at".to_string(), now);
    }

    Ok(Value::Object(out))
}

/// PATCH-style partial mapper: renames only the fields present on the
/// input. No defaulting, no timestamp backfill, no id synthesis; partial
/// updates must not clobber remote fields the caller didn't touch.
pub fn to_api_partial(model: &str, value: Value, config: &RestCrudConfig) -> AdapterResult<Value> {
    let Some(canonical) = canonical_model(model) else {
        return Ok(value);
    };
    let Value::Object(mut obj) = value else {
        return Ok(value);
    };

    drop_empty_id(&mut obj);

    if canonical == "user" {
        normalize_user_email(&mut obj, config, true)?;
    }
    if canonical == "verificationToken" {
        reconcile_verification_value(&mut obj);
    }

    Ok(Value::Object(rename_keys(
        obj,
        renames_for(canonical),
        false,
    )))
}

/// Convert a remote-shape record back to the framework shape.
///
/// Lenient by design: the remote store is the source of truth, so inbound
/// records are never rejected. Remote bookkeeping timestamps are stripped,
/// user emails are lower-cased when normalization is enabled.
pub fn from_api(model: &str, value: Value, config: &RestCrudConfig) -> Value {
    let Some(canonical) = canonical_model(model) else {
        return value;
    };
    let Value::Object(obj) = value else {
        return value;
    };

    let mut out = rename_keys(obj, renames_for(canonical), true);

    for key in ["created_at", "updated_at", "createdAt", "updatedAt"] {
        out.remove(key);
    }

    if canonical == "user" && config.normalize_email {
        if let Some(Value::String(raw)) = out.get("email") {
            let normalized = raw.trim().to_lowercase();
            out.insert("email".to_string(), Value::String(normalized));
        }
    }

    Value::Object(out)
}

/// Rename object keys per the table. `reverse` flips the direction
/// (remote -> framework).
fn rename_keys(
    obj: Map<String, Value>,
    table: &[(&str, &str)],
    reverse: bool,
) -> Map<String, Value> {
    let mut out = Map::with_capacity(obj.len());
    for (key, val) in obj {
        let renamed = table
            .iter()
            .find(|(fw, remote)| if reverse { *remote == key } else { *fw == key })
            .map(|(fw, remote)| {
                if reverse {
                    (*fw).to_string()
                } else {
                    (*remote).to_string()
                }
            })
            .unwrap_or(key);
        out.insert(renamed, val);
    }
    out
}

fn drop_empty_id(obj: &mut Map<String, Value>) {
    let empty = match obj.get("id") {
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Null) => true,
        _ => false,
    };
    if empty {
        obj.remove("id");
    }
}

/// If a legacy `token` key is present alongside `value`, `value` wins.
/// A lone legacy `token` is promoted to `value` so the rename table applies.
fn reconcile_verification_value(obj: &mut Map<String, Value>) {
    if obj.contains_key("value") {
        obj.remove("token");
    } else if let Some(token) = obj.remove("token") {
        obj.insert("value".to_string(), token);
    }
}

fn normalize_user_email(
    obj: &mut Map<String, Value>,
    config: &RestCrudConfig,
    strict: bool,
) -> AdapterResult<()> {
    if !config.normalize_email {
        return Ok(());
    }
    if let Some(Value::String(raw)) = obj.get("email") {
        let normalized = if strict {
            email::normalize(raw)?
        } else {
            raw.trim().to_lowercase()
        };
        obj.insert("email".to_string(), Value::String(normalized));
    }
    Ok(())
}

// ─── Validation ──────────────────────────────────────────────────

/// Required-field and type checks for the framework shape. Returns one
/// issue per offending field.
pub fn validate_framework(model: &str, obj: &Map<String, Value>) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    match model {
        "user" => {
            require_string(obj, "email", &mut issues);
            check_bool(obj, "emailVerified", &mut issues);
            for field in ["name", "image", "hashedPassword"] {
                check_string(obj, field, &mut issues);
            }
        }
        "session" => {
            require_string(obj, "sessionToken", &mut issues);
            require_string(obj, "userId", &mut issues);
            require_string(obj, "expiresAt", &mut issues);
        }
        "verificationToken" => {
            require_string(obj, "identifier", &mut issues);
            if !obj.get("value").is_some_and(Value::is_string)
                && !obj.get("token").is_some_and(Value::is_string)
            {
                issues.push(FieldIssue::new("value", "is required and must be a string"));
            }
            require_string(obj, "expiresAt", &mut issues);
        }
        "account" => {
            require_string(obj, "userId", &mut issues);
            require_string(obj, "provider", &mut issues);
            require_string(obj, "providerAccountId", &mut issues);
            check_string(obj, "type", &mut issues);
        }
        _ => {}
    }
    issues
}

fn require_string(obj: &Map<String, Value>, field: &str, issues: &mut Vec<FieldIssue>) {
    match obj.get(field) {
        Some(Value::String(_)) => {}
        Some(_) => issues.push(FieldIssue::new(field, "must be a string")),
        None => issues.push(FieldIssue::new(field, "is required")),
    }
}

fn check_string(obj: &Map<String, Value>, field: &str, issues: &mut Vec<FieldIssue>) {
    if let Some(v) = obj.get(field) {
        if !v.is_string() && !v.is_null() {
            issues.push(FieldIssue::new(field, "must be a string"));
        }
    }
}

fn check_bool(obj: &Map<String, Value>, field: &str, issues: &mut Vec<FieldIssue>) {
    if let Some(v) = obj.get(field) {
        if !v.is_boolean() {
            issues.push(FieldIssue::new(field, "must be a boolean"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> RestCrudConfig {
        RestCrudConfig::new("https://api.test")
    }

    #[test]
    fn test_user_to_api_normalizes_email_and_drops_empty_id() {
        let mapped = to_api(
            "user",
            json!({"id": "", "email": "A@B.com", "emailVerified": false}),
            &config(),
        )
        .unwrap();
        assert_eq!(mapped["email"], "a@b.com");
        assert!(mapped.get("id").is_none());
        // No id supplied -> creation heuristic fires
        assert!(mapped.get("created_at").is_some());
        assert!(mapped.get("updated_at").is_some());
    }

    #[test]
    fn test_user_update_gets_no_timestamp_backfill() {
        let mapped = to_api(
            "user",
            json!({"id": "u1", "email": "a@b.com", "hashedPassword": "h"}),
            &config(),
        )
        .unwrap();
        assert!(mapped.get("created_at").is_none());
        assert_eq!(mapped["password_hash"], "h");
        assert!(mapped.get("hashedPassword").is_none());
    }

    #[test]
    fn test_user_round_trip_is_lossless() {
        let original = json!({
            "id": "u1",
            "email": "a@b.com",
            "emailVerified": true,
            "name": "Alice",
            "hashedPassword": "argon2..."
        });
        let cfg = config();
        let there = to_api("user", original.clone(), &cfg).unwrap();
        let back = from_api("user", there, &cfg);
        assert_eq!(back, original);
    }

    #[test]
    fn test_session_round_trip() {
        let original = json!({
            "id": "s1",
            "sessionToken": "tok_abcdefgh12345678",
            "userId": "u1",
            "expiresAt": "2026-01-01T00:00:00Z"
        });
        let cfg = config();
        let there = to_api("session", original.clone(), &cfg).unwrap();
        assert_eq!(there["token"], "tok_abcdefgh12345678");
        assert!(there.get("sessionToken").is_none());
        let back = from_api("session", there, &cfg);
        assert_eq!(back, original);
    }

    #[test]
    fn test_verification_round_trip_and_legacy_token() {
        let cfg = config();
        let original = json!({
            "id": "v1",
            "identifier": "a@b.com",
            "value": "secret",
            "expiresAt": "2026-01-01T00:00:00Z"
        });
        let there = to_api("verificationToken", original.clone(), &cfg).unwrap();
        assert_eq!(there["token"], "secret");
        let back = from_api("verificationToken", there, &cfg);
        assert_eq!(back, original);

        // Legacy `token` input is promoted to `value`
        let legacy = json!({
            "id": "v2",
            "identifier": "a@b.com",
            "token": "legacy-secret",
            "expiresAt": "2026-01-01T00:00:00Z"
        });
        let there = to_api("verificationToken", legacy, &cfg).unwrap();
        assert_eq!(there["token"], "legacy-secret");
    }

    #[test]
    fn test_account_round_trip_and_uuid_synthesis() {
        let cfg = config();
        let there = to_api(
            "account",
            json!({
                "userId": "u1",
                "type": "oauth",
                "provider": "github",
                "providerAccountId": "gh-1",
                "access_token": "at",
                "scope": "read:user"
            }),
            &cfg,
        )
        .unwrap();

        assert_eq!(there["providerId"], "github");
        assert_eq!(there["accountId"], "gh-1");
        assert_eq!(there["access_token"], "at");
        // Synthesized id parses as a v4 UUID
        let id = there["id"].as_str().unwrap();
        let parsed = uuid::Uuid::parse_str(id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);

        let back = from_api("account", there, &cfg);
        assert_eq!(back["provider"], "github");
        assert_eq!(back["providerAccountId"], "gh-1");
        assert!(back.get("created_at").is_none());
    }

    #[test]
    fn test_partial_mapper_renames_only_present_fields() {
        let cfg = config();
        let patch = to_api_partial("session", json!({"expiresAt": "2026-02-01T00:00:00Z"}), &cfg)
            .unwrap();
        assert_eq!(
            patch,
            json!({"expiresAt": "2026-02-01T00:00:00Z"})
        );
        assert!(patch.get("created_at").is_none());
        assert!(patch.get("token").is_none());

        let patch = to_api_partial("user", json!({"hashedPassword": "new"}), &cfg).unwrap();
        assert_eq!(patch, json!({"password_hash": "new"}));
    }

    #[test]
    fn test_malformed_email_is_a_validation_error() {
        let err = to_api(
            "user",
            json!({"email": "not-an-email", "emailVerified": false}),
            &config(),
        )
        .unwrap_err();
        assert_eq!(err.issues().unwrap()[0].field, "email");
    }

    #[test]
    fn test_validation_collects_multiple_issues() {
        let err = to_api("session", json!({"expiresAt": 5}), &config()).unwrap_err();
        let issues = err.issues().unwrap();
        assert_eq!(issues.len(), 3);
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"sessionToken"));
        assert!(fields.contains(&"userId"));
        assert!(fields.contains(&"expiresAt"));
    }

    #[test]
    fn test_unknown_model_passes_through() {
        let cfg = config();
        let value = json!({"anything": "goes", "created_at": "kept"});
        assert_eq!(to_api("widget", value.clone(), &cfg).unwrap(), value);
        assert_eq!(from_api("widget", value.clone(), &cfg), value);
    }

    #[test]
    fn test_model_dispatch_is_case_insensitive() {
        let cfg = config();
        let mapped = to_api(
            "Session",
            json!({
                "id": "s1",
                "sessionToken": "tok_abcdefgh12345678",
                "userId": "u1",
                "expiresAt": "2026-01-01T00:00:00Z"
            }),
            &cfg,
        )
        .unwrap();
        assert_eq!(mapped["token"], "tok_abcdefgh12345678");
    }

    #[test]
    fn test_remote_field_translation() {
        assert_eq!(remote_field("session", "sessionToken"), "token");
        assert_eq!(remote_field("account", "provider"), "providerId");
        assert_eq!(remote_field("user", "email"), "email");
        assert_eq!(remote_field("widget", "anything"), "anything");
    }

    #[test]
    fn test_from_api_strips_timestamps_and_normalizes_email() {
        let cfg = config();
        let back = from_api(
            "user",
            json!({
                "id": "u1",
                "email": "Mixed@Case.com",
                "password_hash": "h",
                "created_at": "2025-01-01T00:00:00Z",
                "updated_at": "2025-01-01T00:00:00Z"
            }),
            &cfg,
        );
        assert_eq!(back["email"], "mixed@case.com");
        assert_eq!(back["hashedPassword"], "h");
        assert!(back.get("created_at").is_none());
        assert!(back.get("updated_at").is_none());
    }
}
