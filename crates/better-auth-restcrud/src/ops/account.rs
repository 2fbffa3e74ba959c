// Account operations. The natural key is (provider, providerAccountId);
// on the remote side those columns are `providerId` and `accountId`.

use serde_json::Value;

use crate::client::RestClient;
use crate::error::{AdapterError, AdapterResult};
use crate::mapper;
use crate::naming::collection_path;
use crate::normalize;

pub struct AccountOps<'a> {
    client: &'a RestClient,
}

impl<'a> AccountOps<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> String {
        collection_path("account", self.client.config().use_plural)
    }

    /// Fast path: two server-side filters on the provider pair.
    pub async fn find_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> AdapterResult<Option<Value>> {
        let filters = [
            format!("providerId||eq||{provider}"),
            format!("accountId||eq||{provider_account_id}"),
        ];
        let body = self
            .client
            .get_list(&self.collection(), &filters, Some(1), None, None)
            .await?;
        Ok(normalize::to_single(&body)
            .map(|v| mapper::from_api("account", v, self.client.config())))
    }

    /// Create an account. The mapper synthesizes a v4 UUID when the caller
    /// supplies no id; the remote id column is not reliably auto-assigned
    /// for this entity.
    pub async fn create(&self, data: Value) -> AdapterResult<Value> {
        let config = self.client.config();

        let pair = data
            .get("provider")
            .and_then(Value::as_str)
            .zip(data.get("providerAccountId").and_then(Value::as_str))
            .map(|(p, a)| (p.to_string(), a.to_string()));

        // Shape validation precedes the conflict lookup; invalid input
        // makes no network call.
        let payload = mapper::to_api("account", data, config)?;

        if let Some((ref provider, ref account_id)) = pair {
            if self.find_by_provider(provider, account_id).await?.is_some() {
                return Err(AdapterError::Conflict(
                    "this provider account is already linked".to_string(),
                ));
            }
        }
        let body = self
            .client
            .create_record(&self.collection(), payload.clone())
            .await?;
        let created = normalize::to_single(&body).unwrap_or(payload);
        Ok(mapper::from_api("account", created, config))
    }
}
