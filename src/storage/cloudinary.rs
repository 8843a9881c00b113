use super::StorageService;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com";

/// API key pair for signed uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudinaryCredentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Cloudinary upload settings.
///
/// With `credentials` every upload is signed; otherwise `upload_preset`
/// must name an unsigned preset.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub upload_preset: Option<String>,
    pub credentials: Option<CloudinaryCredentials>,
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

pub struct CloudinaryClient {
    client: Client,
    settings: CloudinarySettings,
    base_url: String,
    fixed_timestamp: Option<i64>,
}

impl CloudinaryClient {
    pub fn new(settings: CloudinarySettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::new_with_client(settings, client))
    }

    pub fn new_with_client(settings: CloudinarySettings, client: Client) -> Self {
        Self {
            client,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            fixed_timestamp: None,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[cfg(test)]
    fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.fixed_timestamp = Some(timestamp);
        self
    }

    fn data_uri(data: &[u8], content_type: &str) -> String {
        use base64::Engine as _;
        format!(
            "data:{};base64,{}",
            content_type,
            base64::engine::general_purpose::STANDARD.encode(data)
        )
    }

    /// Form fields for one upload, signed when credentials are configured.
    fn upload_form(&self, file: String) -> Vec<(&'static str, String)> {
        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        if let Some(preset) = &self.settings.upload_preset {
            params.insert("upload_preset", preset.clone());
        }
        if let Some(folder) = &self.settings.folder {
            params.insert("folder", folder.clone());
        }

        let mut form = Vec::new();
        if let Some(credentials) = &self.settings.credentials {
            let timestamp = self
                .fixed_timestamp
                .unwrap_or_else(|| chrono::Utc::now().timestamp());
            params.insert("timestamp", timestamp.to_string());

            let signature = sign(&params, &credentials.api_secret);
            form.push(("api_key", credentials.api_key.clone()));
            form.push(("signature", signature));
        }

        form.extend(params);
        form.push(("file", file));
        form
    }
}

/// `key=value` pairs in key order joined by `&`; empty values are skipped.
fn string_to_sign(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex SHA-1 of the signable params followed by the API secret.
fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl StorageService for CloudinaryClient {
    async fn upload_image(&self, data: &[u8], content_type: &str) -> Result<String> {
        let url = format!(
            "{}/v1_1/{}/image/upload",
            self.base_url, self.settings.cloud_name
        );

        let form = self.upload_form(Self::data_uri(data, content_type));

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send upload to Cloudinary: {}", e);
                Error::Upload(format!("Cloudinary unreachable: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Upload(format!("Failed to read Cloudinary response: {}", e)))?;

        if !status.is_success() {
            tracing::error!("Cloudinary upload error (status {}): {}", status, body);
            return Err(Error::Upload(format!(
                "Cloudinary rejected the upload (status {}): {}",
                status, body
            )));
        }

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Cloudinary response: {}\nBody: {}", e, body);
            Error::Upload(format!("Failed to parse Cloudinary response: {}", e))
        })?;

        parsed
            .secure_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Upload("Cloudinary response has no secure_url".to_string()))
    }
}
