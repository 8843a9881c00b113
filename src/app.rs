//! Application orchestration: upload, submit, and drive tasks to completion.

use crate::config::{Config, StorageSettings};
use crate::ingress::upload_source_image;
use crate::models::{GenerationTask, Submission, TaskState};
use crate::poll::{poll_until, Clock, PollOutcome, PollPolicy, TokioClock};
use crate::provider::{MeshyAdapter, MockProvider, ProviderAdapter, ProviderKind, SynexaAdapter};
use crate::storage::{CloudinaryClient, MockStorageClient, S3StorageClient, StorageService};
use crate::{Error, Result};
use tracing::{error, info, warn};

/// Coordinates storage, the generation provider, and status polling.
///
/// Holds no per-task state; every call works only from its arguments and
/// the provider's answers.
pub struct App {
    storage: Box<dyn StorageService>,
    provider: Box<dyn ProviderAdapter>,
    clock: Box<dyn Clock>,
    poll: PollPolicy,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub storage: Box<dyn StorageService>,
    pub provider: Box<dyn ProviderAdapter>,
    pub clock: Box<dyn Clock>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, poll: PollPolicy) -> Self {
        Self {
            storage: services.storage,
            provider: services.provider,
            clock: services.clock,
            poll,
        }
    }

    fn build_provider(config: &Config) -> Result<Box<dyn ProviderAdapter>> {
        let settings = &config.provider;
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("PROVIDER_API_KEY not set".to_string()))?;

        info!(
            "Generation provider: {} (success statuses {:?}, task id at '{}')",
            settings.kind, settings.contract.submit.success_statuses, settings.contract.submit.task_id_field
        );

        Ok(match settings.kind {
            ProviderKind::Synexa => Box::new(SynexaAdapter::new(
                api_key,
                settings.base_url.clone(),
                settings.model.clone(),
                config.profile.clone(),
                settings.contract.clone(),
            )?),
            ProviderKind::Meshy => Box::new(MeshyAdapter::new(
                api_key,
                settings.base_url.clone(),
                settings.model.clone(),
                config.profile.clone(),
                settings.contract.clone(),
            )?),
        })
    }

    async fn build_storage(settings: &StorageSettings) -> Result<Box<dyn StorageService>> {
        Ok(match settings {
            StorageSettings::S3(s3) => {
                info!("Storage backend: S3 bucket {} at {}", s3.bucket, s3.endpoint);
                Box::new(S3StorageClient::new(s3.clone()).await?)
            }
            StorageSettings::Cloudinary(cloudinary) => {
                info!("Storage backend: Cloudinary cloud {}", cloudinary.cloud_name);
                Box::new(CloudinaryClient::new(cloudinary.clone())?)
            }
        })
    }

    /// Construct an app from process configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let services = match (&config.storage, config.dry_run) {
            (_, true) => {
                info!("DRY_RUN enabled: uploads stay in memory and every task returns the sample model");
                AppServices {
                    storage: Box::new(MockStorageClient::new().discarding()),
                    provider: Box::new(MockProvider::sample().discarding()),
                    clock: Box::new(TokioClock),
                }
            }
            (Some(storage), false) => AppServices {
                storage: Self::build_storage(storage).await?,
                provider: Self::build_provider(config)?,
                clock: Box::new(TokioClock),
            },
            (None, false) => {
                return Err(Error::Config(
                    "storage backend is not configured".to_string(),
                ))
            }
        };

        info!(
            "Polling every {:?}, at most {} attempts",
            config.poll.interval, config.poll.max_attempts
        );
        Ok(Self::with_services(services, config.poll))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Upload the image and start a generation task.
    ///
    /// Nothing reaches the provider unless the upload produced a URL.
    pub async fn submit(&self, image: &[u8]) -> Result<Submission> {
        let image_url = upload_source_image(self.storage.as_ref(), image).await?;

        let task_id = self.provider.submit(&image_url).await.map_err(|e| {
            error!("Submission to {} failed: {}", self.provider.name(), e);
            e
        })?;
        info!("Provider {} accepted task {}", self.provider.name(), task_id);

        Ok(Submission {
            task_id,
            source_image_url: image_url,
        })
    }

    /// Submit, then poll until the task reaches a terminal status.
    ///
    /// Holds the caller for up to the full poll budget; prefer
    /// [`App::submit`] + [`App::check_status`].
    pub async fn generate_blocking(&self, image: &[u8]) -> Result<GenerationTask> {
        let submission = self.submit(image).await?;
        let task_id = submission.task_id.as_str();

        info!(
            "[{}] Waiting for completion (up to {:?})",
            task_id,
            self.poll.budget()
        );

        let outcome = poll_until(
            &self.poll,
            self.clock.as_ref(),
            |attempt| {
                tracing::debug!("[{}] Status check {}/{}", task_id, attempt, self.poll.max_attempts);
                self.provider.check_status(task_id)
            },
            GenerationTask::is_terminal,
        )
        .await;

        match outcome {
            PollOutcome::Done { value: task, attempts } => {
                let task = task.with_source_image_url(Some(submission.source_image_url.clone()));
                match &task.state {
                    TaskState::Succeeded { result_url } => {
                        info!("[{}] Finished after {} checks: {}", task_id, attempts, result_url);
                        Ok(task)
                    }
                    TaskState::Failed { error } => {
                        warn!("[{}] Provider reported failure: {}", task_id, error);
                        Err(Error::ProviderReportedFailure(error.clone()))
                    }
                    TaskState::TimedOut { .. } | TaskState::Pending | TaskState::InProgress => {
                        Err(Error::Timeout { attempts })
                    }
                }
            }
            PollOutcome::Exhausted { attempts, last } => {
                warn!(
                    "[{}] Gave up after {} checks (last status: {:?})",
                    task_id,
                    attempts,
                    last.map(|t| t.status())
                );
                Err(Error::Timeout { attempts })
            }
        }
    }

    /// One status query for a previously submitted task.
    pub async fn check_status(&self, task_id: &str) -> Result<GenerationTask> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(Error::InvalidRequest("taskId is required".to_string()));
        }
        // Ids travel as one encoded path segment; dot segments cannot.
        if matches!(task_id, "." | "..") {
            return Err(Error::InvalidRequest(format!("taskId '{}' is invalid", task_id)));
        }

        let task = self.provider.check_status(task_id).await.map_err(|e| {
            warn!("[{}] Status check failed: {}", task_id, e);
            e
        })?;
        info!("[{}] Status {:?} ({}%)", task_id, task.status(), task.progress);
        Ok(task)
    }
}
