// User operations. Email is the natural key; the remote store enforces its
// uniqueness, the create-side check here only fails fast.

use serde_json::Value;

use crate::client::RestClient;
use crate::email;
use crate::error::{AdapterError, AdapterResult};
use crate::mapper;
use crate::naming::collection_path;
use crate::normalize;

pub struct UserOps<'a> {
    client: &'a RestClient,
}

impl<'a> UserOps<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self { client }
    }

    fn collection(&self) -> String {
        collection_path("user", self.client.config().use_plural)
    }

    /// Fast path: server-side filter on the unique email column. The lookup
    /// value is normalized the same way stored emails are, so lookups by
    /// `A@B.com` find `a@b.com`.
    pub async fn find_by_email(&self, raw_email: &str) -> AdapterResult<Option<Value>> {
        let config = self.client.config();
        let lookup = if config.normalize_email {
            email::normalize(raw_email)?
        } else {
            raw_email.to_string()
        };
        let filter = format!("email||eq||{lookup}");
        let body = self
            .client
            .get_list(&self.collection(), &[filter], Some(1), None, None)
            .await?;
        Ok(normalize::to_single(&body).map(|v| mapper::from_api("user", v, config)))
    }

    /// Create a user. Shape validation precedes the conflict lookup;
    /// invalid input makes no network call.
    pub async fn create(&self, data: Value) -> AdapterResult<Value> {
        let config = self.client.config();

        let email = data
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);
        let payload = mapper::to_api("user", data, config)?;

        if let Some(ref raw) = email {
            if self.find_by_email(raw).await?.is_some() {
                return Err(AdapterError::Conflict(
                    "a user with this email already exists".to_string(),
                ));
            }
        }
        let body = self
            .client
            .create_record(&self.collection(), payload.clone())
            .await?;
        let created = normalize::to_single(&body).unwrap_or(payload);
        Ok(mapper::from_api("user", created, config))
    }
}
