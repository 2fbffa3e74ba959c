// Session operations.
//
// Token uniqueness is enforced with a read-then-compare before create. That
// check-then-act has a race window (no remote transaction backs it), so the
// remote store remains the real uniqueness authority; the adapter-side check
// is a fast-fail only.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;

use crate::adapter::{BulkFailure, BulkResult};
use crate::client::RestClient;
use crate::config::{TOKEN_MAX_LEN, TOKEN_MIN_LEN};
use crate::error::{AdapterError, AdapterResult};
use crate::mapper;
use crate::naming::collection_path;
use crate::normalize;
use crate::ops::{parse_expiry, record_id};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Session token format check: alphanumeric with dash/underscore, within
/// the configured length bounds. Runs before any network call.
pub fn validate_token(token: &str) -> AdapterResult<()> {
    if token.len() < TOKEN_MIN_LEN {
        return Err(AdapterError::invalid_field(
            "sessionToken",
            format!("must be at least {TOKEN_MIN_LEN} characters"),
        ));
    }
    if token.len() > TOKEN_MAX_LEN {
        return Err(AdapterError::invalid_field(
            "sessionToken",
            format!("must be at most {TOKEN_MAX_LEN} characters"),
        ));
    }
    if !TOKEN_RE.is_match(token) {
        return Err(AdapterError::invalid_field(
            "sessionToken",
            "may only contain alphanumerics, dashes and underscores",
        ));
    }
    Ok(())
}

pub struct SessionOps<'a> {
    client: &'a RestClient,
}

impl<'a> SessionOps<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> String {
        collection_path("session", self.client.config().use_plural)
    }

    /// Fast path: server-side filter on the unique token column.
    pub async fn find_by_token(&self, token: &str) -> AdapterResult<Option<Value>> {
        let filter = format!("token||eq||{token}");
        let body = self
            .client
            .get_list(&self.collection(), &[filter], Some(1), None, None)
            .await?;
        Ok(normalize::to_single(&body)
            .map(|v| mapper::from_api("session", v, self.client.config())))
    }

    /// Create a session: token format and shape validation, then an
    /// advisory uniqueness check, then the write. Invalid input never
    /// reaches the wire.
    pub async fn create(&self, data: Value) -> AdapterResult<Value> {
        let config = self.client.config();

        let token = data
            .get("sessionToken")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(ref token) = token {
            validate_token(token)?;
        }

        if config.debug_logs {
            if let Some(user_id) = data.get("userId").and_then(Value::as_str) {
                // Referential integrity is the remote store's job.
                tracing::debug!(user_id, "session create: skipping user existence check");
            }
        }

        let payload = mapper::to_api("session", data, config)?;

        if let Some(ref token) = token {
            if self.find_by_token(token).await?.is_some() {
                return Err(AdapterError::Conflict(
                    "a session with this token already exists".to_string(),
                ));
            }
        }
        let body = self
            .client
            .create_record(&self.collection(), payload.clone())
            .await?;
        let created = normalize::to_single(&body).unwrap_or(payload);
        Ok(mapper::from_api("session", created, config))
    }

    /// Update by natural key: look up by token, then update by id. Two
    /// round trips, not an atomic conditional update.
    pub async fn update_by_token(&self, token: &str, patch: Value) -> AdapterResult<Value> {
        let config = self.client.config();
        let existing = self.find_by_token(token).await?.ok_or_else(|| {
            AdapterError::NotFound(format!("no session with token '{token}'"))
        })?;
        let id = record_id(&existing)
            .ok_or_else(|| AdapterError::Unknown("session record has no id".to_string()))?;

        let payload = mapper::to_api_partial("session", patch.clone(), config)?;
        let body = self
            .client
            .update_record(&self.collection(), &id, payload)
            .await?;

        match normalize::to_single(&body) {
            Some(updated) => Ok(mapper::from_api("session", updated, config)),
            // Backend answered with an empty body; merge locally.
            None => {
                let mut merged = existing;
                if let (Some(obj), Some(patch_obj)) = (merged.as_object_mut(), patch.as_object()) {
                    for (k, v) in patch_obj {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                Ok(merged)
            }
        }
    }

    /// Expiry sweep: list every session and delete the expired ones one by
    /// one. Best-effort: individual failures are logged and counted, not
    /// raised.
    pub async fn delete_expired(&self) -> AdapterResult<BulkResult> {
        let collection = self.collection();
        let body = self.client.get_list(&collection, &[], None, None, None).await?;
        let now = Utc::now();

        let mut result = BulkResult::default();
        for record in normalize::to_items(&body) {
            let expired = parse_expiry(&record).is_some_and(|at| at <= now);
            if !expired {
                continue;
            }
            let Some(id) = record_id(&record) else {
                result.failures.push(BulkFailure {
                    id: None,
                    message: "expired session record has no id".to_string(),
                });
                continue;
            };
            match self.client.delete_record(&collection, &id).await {
                Ok(_) => result.succeeded += 1,
                Err(err) => {
                    tracing::warn!(session_id = %id, error = %err, "expiry sweep: delete failed");
                    result.failures.push(BulkFailure {
                        id: Some(id),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }
}
