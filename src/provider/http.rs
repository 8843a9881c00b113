use crate::normalize::lookup;
use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// How a submission response is judged and where its task id lives.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitContract {
    pub success_statuses: Vec<u16>,
    pub task_id_field: String,
}

impl SubmitContract {
    pub fn accepts(&self, status: u16) -> bool {
        self.success_statuses.contains(&status)
    }

    /// Pull the task id out of an accepted response body.
    pub fn extract_task_id(&self, body: &Value) -> Option<String> {
        match lookup(body, &self.task_id_field)? {
            Value::String(id) => {
                let id = id.trim();
                (!id.is_empty()).then(|| id.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthScheme {
    Bearer(String),
    Header { name: String, value: String },
}

/// Shared HTTP plumbing for provider adapters.
pub struct ProviderHttpClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    auth: AuthScheme,
    provider: &'static str,
}

impl ProviderHttpClient {
    pub fn new(
        provider: &'static str,
        base_url: String,
        auth: AuthScheme,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::new_with_client(provider, base_url, auth, client))
    }

    pub fn new_with_client(
        provider: &'static str,
        base_url: String,
        auth: AuthScheme,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            provider,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            AuthScheme::Bearer(token) => request.bearer_auth(token),
            AuthScheme::Header { name, value } => request.header(name.as_str(), value.as_str()),
        }
    }

    /// Send a generation request and return the provider's task id.
    ///
    /// Not retried: a transport fault surfaces immediately.
    pub async fn submit<Req: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &Req,
        contract: &SubmitContract,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Submitting generation request to {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to {}: {}", self.provider, e);
                e
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !contract.accepts(status) {
            tracing::error!("{} rejected submission (status {}): {}", self.provider, status, body);
            return Err(Error::SubmissionRejected { status, body });
        }

        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        contract.extract_task_id(&parsed).ok_or_else(|| {
            tracing::error!(
                "{} response has no task id at '{}': {}",
                self.provider,
                contract.task_id_field,
                body
            );
            Error::MissingTaskId(body)
        })
    }

    /// URL of `collection/{id}` with `id` percent-encoded as one segment.
    pub fn resource_url(&self, collection: &str, id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, collection))
            .map_err(|e| Error::Config(format!("Invalid {} base URL: {}", self.provider, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} base URL cannot take a path", self.provider)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// GET `collection/{id}` as a JSON document.
    pub async fn get_resource(&self, collection: &str, id: &str) -> Result<Value> {
        let url = self.resource_url(collection, id)?;
        self.get_url(url).await
    }

    /// Any non-2xx answer is a transport-level fault.
    async fn get_url(&self, url: Url) -> Result<Value> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach {} status endpoint: {}", self.provider, e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::warn!("{} status error (status {}): {}", self.provider, status, error_text);
            return Err(Error::Transport(format!(
                "{} status query failed (status {}): {}",
                self.provider, status, error_text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Failed to parse {} status response: {}\nBody: {}", self.provider, e, body);
            Error::Transport(format!("Unreadable {} status response: {}", self.provider, e))
        })
    }
}
