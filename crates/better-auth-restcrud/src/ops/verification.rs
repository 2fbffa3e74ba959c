// Verification token operations. No uniqueness is enforced on
// (identifier, value) pairs: multiple live tokens per identifier are
// allowed, and lookups take the first active one.

use chrono::Utc;
use serde_json::Value;

use crate::client::RestClient;
use crate::error::AdapterResult;
use crate::mapper;
use crate::naming::collection_path;
use crate::normalize;
use crate::ops::parse_expiry;

pub struct VerificationOps<'a> {
    client: &'a RestClient,
}

impl<'a> VerificationOps<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> String {
        collection_path("verificationToken", self.client.config().use_plural)
    }

    /// First non-expired token for the identifier, in listing order.
    pub async fn find_first_active(&self, identifier: &str) -> AdapterResult<Option<Value>> {
        let config = self.client.config();
        let filter = format!("identifier||eq||{identifier}");
        let body = self
            .client
            .get_list(&self.collection(), &[filter], None, None, None)
            .await?;
        let now = Utc::now();

        Ok(normalize::to_items(&body)
            .into_iter()
            .find(|record| parse_expiry(record).is_none_or(|at| at > now))
            .map(|v| mapper::from_api("verificationToken", v, config)))
    }

    pub async fn create(&self, data: Value) -> AdapterResult<Value> {
        let config = self.client.config();
        let payload = mapper::to_api("verificationToken", data, config)?;
        let body = self
            .client
            .create_record(&self.collection(), payload.clone())
            .await?;
        let created = normalize::to_single(&body).unwrap_or(payload);
        Ok(mapper::from_api("verificationToken", created, config))
    }
}
