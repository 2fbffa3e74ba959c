// The storage adapter: routes the framework's 8-method storage interface
// onto the generated REST backend.
//
// Routing policy: lookups on a unique or natural key take a dedicated fast
// path (server-side filter, limit 1). Anything the remote filter convention
// can express runs server-side. Everything else falls back to listing the
// collection and filtering in memory, which is correct but only acceptable
// at auth-table sizes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::client::{HttpTransport, RestClient};
use crate::config::RestCrudConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::mapper;
use crate::metrics::MetricsSnapshot;
use crate::naming::{canonical_model, collection_path};
use crate::normalize;
use crate::ops::account::AccountOps;
use crate::ops::record_id;
use crate::ops::session::SessionOps;
use crate::ops::user::UserOps;
use crate::ops::verification::VerificationOps;
use crate::query::{
    self, Connector, FindManyQuery, Operator, SortDirection, WhereClause,
};

/// One record that a bulk operation could not process.
#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    /// Record id, when one could be read off the record.
    pub id: Option<String>,
    pub message: String,
}

/// Outcome of a bulk operation. Bulk writes never abort mid-way: every
/// matched record is attempted, and the caller gets the full picture of
/// what succeeded and what did not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkResult {
    pub succeeded: i64,
    pub failures: Vec<BulkFailure>,
}

impl BulkResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The storage interface the auth framework programs against.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn create(&self, model: &str, data: Value) -> AdapterResult<Value>;

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<Value>>;

    async fn find_many(&self, model: &str, query: FindManyQuery) -> AdapterResult<Vec<Value>>;

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64>;

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<Value>;

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<BulkResult>;

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()>;

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<BulkResult>;
}

/// [`StorageAdapter`] implementation backed by a generated REST CRUD API.
pub struct RestCrudAdapter {
    client: RestClient,
}

impl RestCrudAdapter {
    pub fn new(config: RestCrudConfig) -> Self {
        Self {
            client: RestClient::new(config),
        }
    }

    /// Build an adapter over a custom transport (tests, instrumentation).
    pub fn with_transport(config: RestCrudConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            client: RestClient::with_transport(config, transport),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.client.metrics().snapshot()
    }

    pub fn reset_metrics(&self) {
        self.client.metrics().reset();
    }

    /// Scope subsequent requests to a tenant (sent as `X-Tenant-ID` when
    /// multi-tenancy is enabled).
    pub fn set_tenant(&self, tenant: impl Into<String>) {
        self.client.set_tenant(Some(tenant.into()));
    }

    pub fn clear_tenant(&self) {
        self.client.set_tenant(None);
    }

    /// Sweep expired sessions. Best-effort bulk delete; see [`BulkResult`].
    pub async fn delete_expired_sessions(&self) -> AdapterResult<BulkResult> {
        SessionOps::new(&self.client).delete_expired().await
    }

    /// Create a batch of records sequentially. Per-record failures are
    /// collected, not raised; see [`BulkResult`].
    pub async fn create_many(&self, model: &str, items: Vec<Value>) -> AdapterResult<BulkResult> {
        let mut result = BulkResult::default();
        for item in items {
            let id = record_id(&item);
            match self.create(model, item).await {
                Ok(_) => result.succeeded += 1,
                Err(err) => {
                    tracing::warn!(model, error = %err, "bulk create: record failed");
                    result.failures.push(BulkFailure {
                        id,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }

    fn collection(&self, model: &str) -> String {
        let name = canonical_model(model).unwrap_or(model);
        collection_path(name, self.client.config().use_plural)
    }

    /// Rewrite clause field names into the remote column names so the
    /// clauses can be rendered into server-side filters.
    fn remote_clauses(&self, model: &str, clauses: &[WhereClause]) -> Vec<WhereClause> {
        clauses
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.field = mapper::remote_field(model, &c.field);
                c
            })
            .collect()
    }

    async fn update_by_id(&self, model: &str, id: &str, data: Value) -> AdapterResult<Value> {
        let config = self.client.config();
        let collection = self.collection(model);
        let payload = mapper::to_api_partial(model, data, config)?;
        let body = self
            .client
            .update_record(&collection, id, payload)
            .await?;

        if let Some(updated) = normalize::to_single(&body) {
            return Ok(mapper::from_api(model, updated, config));
        }
        // Empty update response; re-read the record.
        match self.client.get_by_id(&collection, id).await? {
            Some(fresh) => Ok(mapper::from_api(model, fresh, config)),
            None => Err(AdapterError::NotFound(format!(
                "no {model} record with id '{id}'"
            ))),
        }
    }

    /// Resolve the id of the single record a WHERE targets.
    async fn resolve_id(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<String>> {
        if let Some(("id", id)) = single_eq(where_clauses) {
            return Ok(Some(id.to_string()));
        }
        match self.find_one(model, where_clauses).await? {
            Some(record) => match record_id(&record) {
                Some(id) => Ok(Some(id)),
                None => Err(AdapterError::Unknown(format!(
                    "matched {model} record has no id"
                ))),
            },
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StorageAdapter for RestCrudAdapter {
    async fn create(&self, model: &str, data: Value) -> AdapterResult<Value> {
        match canonical_model(model) {
            Some("user") => UserOps::new(&self.client).create(data).await,
            Some("session") => SessionOps::new(&self.client).create(data).await,
            Some("account") => AccountOps::new(&self.client).create(data).await,
            Some("verificationToken") => VerificationOps::new(&self.client).create(data).await,
            _ => {
                let config = self.client.config();
                let payload = mapper::to_api(model, data, config)?;
                let body = self
                    .client
                    .create_record(&self.collection(model), payload.clone())
                    .await?;
                let created = normalize::to_single(&body).unwrap_or(payload);
                Ok(mapper::from_api(model, created, config))
            }
        }
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<Value>> {
        let config = self.client.config();

        // Id lookups go straight to GET /{collection}/{id} for any model.
        if let Some(("id", id)) = single_eq(where_clauses) {
            return Ok(self
                .client
                .get_by_id(&self.collection(model), id)
                .await?
                .map(|v| mapper::from_api(model, v, config)));
        }

        match (canonical_model(model), single_eq(where_clauses)) {
            (Some("user"), Some(("email", email))) => {
                return UserOps::new(&self.client).find_by_email(email).await;
            }
            (Some("session"), Some(("sessionToken" | "token", token))) => {
                return SessionOps::new(&self.client).find_by_token(token).await;
            }
            (Some("verificationToken"), Some(("identifier", identifier))) => {
                return VerificationOps::new(&self.client)
                    .find_first_active(identifier)
                    .await;
            }
            _ => {}
        }

        if canonical_model(model) == Some("account") {
            if let Some((provider, account_id)) = provider_pair(where_clauses) {
                return AccountOps::new(&self.client)
                    .find_by_provider(provider, account_id)
                    .await;
            }
        }

        let query = FindManyQuery {
            where_clauses: where_clauses.to_vec(),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.find_many(model, query).await?.into_iter().next())
    }

    async fn find_many(&self, model: &str, query: FindManyQuery) -> AdapterResult<Vec<Value>> {
        let config = self.client.config();
        let collection = self.collection(model);

        let remote = self.remote_clauses(model, &query.where_clauses);
        if let Some(filters) = query::server_side_filters(&remote) {
            let sort_field;
            let sort = match query.sort_by {
                Some(ref s) => {
                    sort_field = mapper::remote_field(model, &s.field);
                    let direction = match s.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    Some((sort_field.as_str(), direction))
                }
                None => None,
            };
            let body = self
                .client
                .get_list(&collection, &filters, query.limit, query.offset, sort)
                .await?;
            return Ok(normalize::to_items(&body)
                .into_iter()
                .map(|v| mapper::from_api(model, v, config))
                .collect());
        }

        // The WHERE cannot be expressed remotely (OR chain or an opaque
        // value); fetch the collection and filter here.
        let body = self
            .client
            .get_list(&collection, &[], None, None, None)
            .await?;
        let mut records: Vec<Value> = normalize::to_items(&body)
            .into_iter()
            .map(|v| mapper::from_api(model, v, config))
            .filter(|record| query::matches_where(record, &query.where_clauses))
            .collect();
        query::apply_page(&mut records, &query);
        Ok(records)
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let collection = self.collection(model);

        let remote = self.remote_clauses(model, where_clauses);
        if let Some(filters) = query::server_side_filters(&remote) {
            // Raw body, not the item list: a `meta.total` beats counting a
            // page.
            let body = self
                .client
                .get_list(&collection, &filters, None, None, None)
                .await?;
            return Ok(normalize::to_count(&body));
        }

        let query = FindManyQuery {
            where_clauses: where_clauses.to_vec(),
            ..Default::default()
        };
        Ok(self.find_many(model, query).await?.len() as i64)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<Value> {
        if canonical_model(model) == Some("session") {
            if let Some(("sessionToken" | "token", token)) = single_eq(where_clauses) {
                return SessionOps::new(&self.client)
                    .update_by_token(token, data)
                    .await;
            }
        }

        match self.resolve_id(model, where_clauses).await? {
            Some(id) => self.update_by_id(model, &id, data).await,
            None => Err(AdapterError::NotFound(format!(
                "no {model} record matches the update target"
            ))),
        }
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<BulkResult> {
        let query = FindManyQuery {
            where_clauses: where_clauses.to_vec(),
            ..Default::default()
        };
        let targets = self.find_many(model, query).await?;

        let mut result = BulkResult::default();
        for target in targets {
            let Some(id) = record_id(&target) else {
                result.failures.push(BulkFailure {
                    id: None,
                    message: format!("matched {model} record has no id"),
                });
                continue;
            };
            match self.update_by_id(model, &id, data.clone()).await {
                Ok(_) => result.succeeded += 1,
                Err(err) => {
                    tracing::warn!(model, record_id = %id, error = %err, "bulk update: record failed");
                    result.failures.push(BulkFailure {
                        id: Some(id),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let Some(id) = self.resolve_id(model, where_clauses).await? else {
            return Err(AdapterError::NotFound(format!(
                "no {model} record matches the delete target"
            )));
        };
        self.client
            .delete_record(&self.collection(model), &id)
            .await?;
        Ok(())
    }

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<BulkResult> {
        let collection = self.collection(model);
        let query = FindManyQuery {
            where_clauses: where_clauses.to_vec(),
            ..Default::default()
        };
        let targets = self.find_many(model, query).await?;

        let mut result = BulkResult::default();
        for target in targets {
            let Some(id) = record_id(&target) else {
                result.failures.push(BulkFailure {
                    id: None,
                    message: format!("matched {model} record has no id"),
                });
                continue;
            };
            match self.client.delete_record(&collection, &id).await {
                Ok(_) => result.succeeded += 1,
                Err(err) => {
                    tracing::warn!(model, record_id = %id, error = %err, "bulk delete: record failed");
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

/// A WHERE that is exactly one equality on a string value.
fn single_eq(clauses: &[WhereClause]) -> Option<(&str, &str)> {
    match clauses {
        [c] if c.operator == Operator::Eq => c.value.as_str().map(|v| (c.field.as_str(), v)),
        _ => None,
    }
}

/// A WHERE that is exactly the account natural key: two string equalities
/// on `provider` and `providerAccountId`, ANDed.
fn provider_pair(clauses: &[WhereClause]) -> Option<(&str, &str)> {
    if clauses.len() != 2 {
        return None;
    }
    if clauses
        .iter()
        .any(|c| c.operator != Operator::Eq || c.connector == Some(Connector::Or))
    {
        return None;
    }
    let mut provider = None;
    let mut account_id = None;
    for clause in clauses {
        match clause.field.as_str() {
            "provider" => provider = clause.value.as_str(),
            "providerAccountId" => account_id = clause.value.as_str(),
            _ => return None,
        }
    }
    provider.zip(account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_eq_detection() {
        let clauses = vec![WhereClause::eq("email", "a@b.com")];
        assert_eq!(single_eq(&clauses), Some(("email", "a@b.com")));

        // Non-string value
        assert_eq!(single_eq(&[WhereClause::eq("n", 5)]), None);
        // More than one clause
        let two = vec![WhereClause::eq("a", "1"), WhereClause::eq("b", "2")];
        assert_eq!(single_eq(&two), None);
        // Wrong operator
        let gt = WhereClause {
            field: "n".into(),
            value: json!("5"),
            operator: Operator::Gt,
            connector: None,
        };
        assert_eq!(single_eq(&[gt]), None);
    }

    #[test]
    fn test_provider_pair_detection() {
        let clauses = vec![
            WhereClause::eq("provider", "github").and(),
            WhereClause::eq("providerAccountId", "gh-1"),
        ];
        assert_eq!(provider_pair(&clauses), Some(("github", "gh-1")));

        // Order does not matter
        let swapped = vec![
            WhereClause::eq("providerAccountId", "gh-1"),
            WhereClause::eq("provider", "github"),
        ];
        assert_eq!(provider_pair(&swapped), Some(("github", "gh-1")));

        // OR chains never take the fast path
        let ored = vec![
            WhereClause::eq("provider", "github").or(),
            WhereClause::eq("providerAccountId", "gh-1"),
        ];
        assert_eq!(provider_pair(&ored), None);

        // A stray third clause disqualifies
        let three = vec![
            WhereClause::eq("provider", "github"),
            WhereClause::eq("providerAccountId", "gh-1"),
            WhereClause::eq("userId", "u1"),
        ];
        assert_eq!(provider_pair(&three), None);
    }

    #[test]
    fn test_bulk_result_completeness() {
        assert!(BulkResult::default().is_complete());
        let partial = BulkResult {
            succeeded: 2,
            failures: vec![BulkFailure {
                id: Some("x".into()),
                message: "boom".into(),
            }],
        };
        assert!(!partial.is_complete());
    }
}
