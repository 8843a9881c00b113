//! Process configuration
//!
//! Read once at startup (environment plus optional `.env`) and handed to
//! every component explicitly.

use crate::models::GenerationProfile;
use crate::poll::PollPolicy;
use crate::provider::{MeshyAdapter, ProviderContract, ProviderKind, SynexaAdapter};
use crate::storage::cloudinary::{CloudinaryCredentials, CloudinarySettings};
use crate::storage::s3::S3Settings;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How `POST /generate` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Hold the request open and poll until the task finishes or times out.
    Blocking,
    /// Answer with the task id right away; clients poll `/check-status`.
    Async,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Blocking => "blocking",
            GenerationMode::Async => "async",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" | "sync" => Ok(GenerationMode::Blocking),
            "async" | "split" => Ok(GenerationMode::Async),
            other => Err(format!("unknown mode '{}' (expected blocking or async)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageSettings {
    S3(S3Settings),
    Cloudinary(CloudinarySettings),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub contract: ProviderContract,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: String,
    pub mode: GenerationMode,
    pub cors_allowed_origins: Option<String>,
    pub max_upload_bytes: usize,
    /// Use in-memory storage and a sample-model provider.
    pub dry_run: bool,
    /// `None` only in dry-run mode.
    pub storage: Option<StorageSettings>,
    pub provider: ProviderSettings,
    pub profile: GenerationProfile,
    pub poll: PollPolicy,
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| Error::Config(format!("{} not set", key)))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("{}='{}' is invalid: {}", key, raw, e))),
            None => Ok(default),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(Error::Config(format!("{}='{}' is not a boolean", key, v))),
        }
    }
}

/// Lookup that answers from `overrides` first, then falls back to `lookup`.
fn overlay<'a, F>(
    overrides: &'a [(&'a str, String)],
    lookup: F,
) -> impl Fn(&str) -> Option<String> + 'a
where
    F: Fn(&str) -> Option<String> + 'a,
{
    move |key| {
        overrides
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.clone())
            .or_else(|| lookup(key))
    }
}

fn parse_status_list(key: &str, raw: &str) -> Result<Vec<u16>> {
    let statuses = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u16>()
                .map_err(|e| Error::Config(format!("{} entry '{}' is invalid: {}", key, s, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    if statuses.is_empty() {
        return Err(Error::Config(format!("{} lists no status codes", key)));
    }
    Ok(statuses)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(&[])
    }

    /// Like [`Config::from_env`], with `overrides` taking precedence over the
    /// environment. The process environment itself is never modified.
    pub fn from_env_with(overrides: &[(&str, String)]) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(overlay(overrides, |key| std::env::var(key).ok()))
    }

    /// Build from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let dry_run = env.bool_or("DRY_RUN", false)?;
        let mode = env.parse_or("RELAY_MODE", GenerationMode::Async)?;
        let max_upload_mb: usize = env.parse_or("RELAY_MAX_UPLOAD_MB", 20)?;
        let max_upload_bytes = max_upload_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            Error::Config(format!("RELAY_MAX_UPLOAD_MB={} is too large", max_upload_mb))
        })?;

        let storage = if dry_run {
            None
        } else {
            Some(Self::storage_from(&env)?)
        };

        let provider = Self::provider_from(&env, dry_run)?;
        let profile = Self::profile_from(&env)?;

        let (default_interval, default_attempts) = match provider.kind {
            ProviderKind::Synexa => (3, 40),
            ProviderKind::Meshy => (2, 60),
        };
        let interval_secs: u64 = env.parse_or("POLL_INTERVAL_SECS", default_interval)?;
        let max_attempts: u32 = env.parse_or("POLL_MAX_ATTEMPTS", default_attempts)?;
        let interval = Duration::from_secs(interval_secs);
        if interval.checked_mul(max_attempts).is_none() {
            return Err(Error::Config(format!(
                "POLL_INTERVAL_SECS={} x POLL_MAX_ATTEMPTS={} overflows the poll budget",
                interval_secs, max_attempts
            )));
        }

        Ok(Self {
            bind_address: env.get("RELAY_BIND").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            mode,
            cors_allowed_origins: env.get("RELAY_CORS_ORIGINS"),
            max_upload_bytes,
            dry_run,
            storage,
            provider,
            profile,
            poll: PollPolicy::new(interval, max_attempts),
        })
    }

    fn storage_from<F>(env: &Env<F>) -> Result<StorageSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = env
            .get("STORAGE_BACKEND")
            .unwrap_or_else(|| "s3".to_string())
            .to_ascii_lowercase();

        match backend.as_str() {
            "s3" => Ok(StorageSettings::S3(S3Settings {
                access_key_id: env.required("S3_ACCESS_KEY_ID")?,
                secret_access_key: env.required("S3_SECRET_ACCESS_KEY")?,
                endpoint: env
                    .get("S3_ENDPOINT")
                    .unwrap_or_else(|| "https://s3.amazonaws.com".to_string()),
                region: env
                    .get("S3_REGION")
                    .unwrap_or_else(|| "us-east-1".to_string()),
                bucket: env.required("S3_BUCKET")?,
                public_base_url: env.required("S3_PUBLIC_BASE_URL")?,
            })),
            "cloudinary" => Ok(StorageSettings::Cloudinary(Self::cloudinary_from(env)?)),
            other => Err(Error::Config(format!(
                "STORAGE_BACKEND='{}' is invalid (expected s3 or cloudinary)",
                other
            ))),
        }
    }

    fn cloudinary_from<F>(env: &Env<F>) -> Result<CloudinarySettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = match (env.get("CLOUDINARY_API_KEY"), env.get("CLOUDINARY_API_SECRET")) {
            (Some(api_key), Some(api_secret)) => Some(CloudinaryCredentials {
                api_key,
                api_secret,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET must be set together".to_string(),
                ))
            }
        };
        let upload_preset = env.get("CLOUDINARY_UPLOAD_PRESET");
        if credentials.is_none() && upload_preset.is_none() {
            return Err(Error::Config(
                "Cloudinary needs CLOUDINARY_API_KEY/CLOUDINARY_API_SECRET or CLOUDINARY_UPLOAD_PRESET"
                    .to_string(),
            ));
        }

        Ok(CloudinarySettings {
            cloud_name: env.required("CLOUDINARY_CLOUD_NAME")?,
            upload_preset,
            credentials,
            folder: env.get("CLOUDINARY_FOLDER"),
        })
    }

    fn provider_from<F>(env: &Env<F>, dry_run: bool) -> Result<ProviderSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = env.parse_or("PROVIDER", ProviderKind::Synexa)?;

        let mut contract = match kind {
            ProviderKind::Synexa => SynexaAdapter::default_contract(),
            ProviderKind::Meshy => MeshyAdapter::default_contract(),
        };
        if let Some(raw) = env.get("PROVIDER_SUCCESS_STATUSES") {
            contract.submit.success_statuses =
                parse_status_list("PROVIDER_SUCCESS_STATUSES", &raw)?;
        }
        if let Some(path) = env.get("PROVIDER_TASK_ID_PATH") {
            contract.submit.task_id_field = path;
        }
        if let Some(path) = env.get("PROVIDER_RESULT_PATH") {
            contract.status.result_field = path;
        }
        if let Some(path) = env.get("PROVIDER_ERROR_PATH") {
            contract.status.error_field = path;
        }

        let api_key = if dry_run {
            env.get("PROVIDER_API_KEY")
        } else {
            Some(env.required("PROVIDER_API_KEY")?)
        };

        Ok(ProviderSettings {
            kind,
            api_key,
            base_url: env.get("PROVIDER_BASE_URL"),
            model: env.get("PROVIDER_MODEL"),
            contract,
        })
    }

    fn profile_from<F>(env: &Env<F>) -> Result<GenerationProfile>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GenerationProfile::default();
        let target_polycount = match env.get("GEN_TARGET_POLYCOUNT") {
            Some(_) => Some(env.parse_or("GEN_TARGET_POLYCOUNT", 0u32)?),
            None => None,
        };

        Ok(GenerationProfile {
            enable_pbr: env.bool_or("GEN_ENABLE_PBR", defaults.enable_pbr)?,
            should_texture: env.bool_or("GEN_SHOULD_TEXTURE", defaults.should_texture)?,
            should_remesh: env.bool_or("GEN_SHOULD_REMESH", defaults.should_remesh)?,
            steps: env.parse_or("GEN_STEPS", defaults.steps)?,
            guidance_scale: env.parse_or("GEN_GUIDANCE_SCALE", defaults.guidance_scale)?,
            octree_resolution: env.parse_or("GEN_OCTREE_RESOLUTION", defaults.octree_resolution)?,
            remove_background: env.bool_or("GEN_REMOVE_BACKGROUND", defaults.remove_background)?,
            target_polycount,
        })
    }
}
