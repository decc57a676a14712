use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OcrConfig;
use crate::error::{Result, RxError};
use crate::models::{PreprocessedImage, Transcript};

use super::api::{OperationStatus, ReadApiClient};
use super::poll::{PollPolicy, Sleeper, TokioSleeper};

/// How a recognition call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    Completed(Transcript),
    /// The engine reported `failed`
    Failed,
    /// The poll budget was spent without a terminal status
    TimedOut { attempts: u32 },
}

impl OcrOutcome {
    pub fn into_transcript(self) -> Transcript {
        match self {
            OcrOutcome::Completed(transcript) => transcript,
            OcrOutcome::Failed | OcrOutcome::TimedOut { .. } => Transcript::empty(),
        }
    }
}

/// A submitted operation; lives only for one polling loop.
#[derive(Debug)]
struct OcrOperation {
    location: Url,
    status: OperationStatus,
}

#[derive(Clone)]
enum OcrBackend {
    Api { client: ReadApiClient },
    Unavailable { reason: String },
}

#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
    policy: PollPolicy,
    strict_timeout: bool,
    sleeper: Arc<dyn Sleeper>,
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        config.validate()?;

        let backend = match ReadApiClient::new(config) {
            Ok(client) => {
                info!(url = %client.analyze_url(), "Read OCR API backend initialized");
                OcrBackend::Api { client }
            }
            Err(e) => {
                let reason = format!("Read OCR backend unavailable: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Ok(Self {
            backend,
            policy: PollPolicy::from_config(config),
            strict_timeout: config.strict_timeout,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Result<Self> {
        if policy.max_attempts == 0 {
            return Err(RxError::Config(
                "Poll policy needs at least one attempt".to_string(),
            ));
        }
        self.policy = policy;
        Ok(self)
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    /// Recognize text, collapsing soft failures into an empty transcript.
    pub async fn extract_text(&self, image: &PreprocessedImage) -> Result<Transcript> {
        let outcome = self.recognize(image, &CancellationToken::new()).await?;
        Ok(outcome.into_transcript())
    }

    /// Submit the image and poll until the operation finishes, the poll
    /// budget runs out, or `cancel` fires.
    pub async fn recognize(
        &self,
        image: &PreprocessedImage,
        cancel: &CancellationToken,
    ) -> Result<OcrOutcome> {
        let client = match &self.backend {
            OcrBackend::Api { client } => client,
            OcrBackend::Unavailable { reason } => {
                return Err(RxError::OcrUnavailable(reason.clone()))
            }
        };

        let location = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RxError::Cancelled),
            location = client.submit(image) => location?,
        };
        let mut operation = OcrOperation {
            location,
            status: OperationStatus::NotStarted,
        };
        debug!(operation = %operation.location, "Read operation submitted");

        for attempt in 1..=self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RxError::Cancelled),
                _ = self.sleeper.sleep(self.policy.interval) => {}
            }

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RxError::Cancelled),
                response = client.fetch(&operation.location) => response?,
            };
            operation.status = response.status;
            debug!(attempt, status = ?operation.status, "Polled read operation");

            match operation.status {
                OperationStatus::Succeeded => {
                    let transcript = response.into_transcript()?;
                    debug!(lines = transcript.len(), attempt, "Read operation succeeded");
                    return Ok(OcrOutcome::Completed(transcript));
                }
                OperationStatus::Failed => {
                    warn!(operation = %operation.location, "Read operation reported failure");
                    return Ok(OcrOutcome::Failed);
                }
                OperationStatus::NotStarted | OperationStatus::Running => {}
            }
        }

        let attempts = self.policy.max_attempts;
        warn!(
            attempts,
            status = ?operation.status,
            "Read operation did not finish within the poll budget"
        );
        if self.strict_timeout {
            Err(RxError::Timeout { attempts })
        } else {
            Ok(OcrOutcome::TimedOut { attempts })
        }
    }
}
