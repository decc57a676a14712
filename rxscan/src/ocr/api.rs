use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::OcrConfig;
use crate::error::{Result, RxError};
use crate::models::{PreprocessedImage, Transcript};

const READ_ANALYZE_PATH: &str = "vision/v3.2/read/analyze";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::Failed)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOperationResponse {
    pub status: OperationStatus,
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub read_results: Vec<ReadResult>,
}

#[derive(Debug, Deserialize)]
pub struct ReadResult {
    pub lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
pub struct ReadLine {
    pub text: String,
}

impl ReadOperationResponse {
    /// Flatten every page's lines, in engine order.
    pub fn into_transcript(self) -> Result<Transcript> {
        let analyze_result = self.analyze_result.ok_or_else(|| {
            RxError::service("Read operation succeeded without an analyzeResult")
        })?;

        Ok(analyze_result
            .read_results
            .into_iter()
            .flat_map(|page| page.lines.into_iter().map(|line| line.text))
            .collect())
    }
}

/// Client for the asynchronous submit/poll Read API.
#[derive(Clone, Debug)]
pub struct ReadApiClient {
    client: Client,
    api_key: String,
    analyze_url: Url,
}

impl ReadApiClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| RxError::Config("Endpoint required for Read OCR".to_string()))?;

        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RxError::Config("API key required for Read OCR".to_string()))?;

        let analyze_url = analyze_url(endpoint)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RxError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            analyze_url,
        })
    }

    pub fn analyze_url(&self) -> &Url {
        &self.analyze_url
    }

    /// Upload the image; returns the operation URL to poll.
    pub async fn submit(&self, image: &PreprocessedImage) -> Result<Url> {
        let response = self
            .client
            .post(self.analyze_url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(image.bytes().to_vec())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(RxError::service_status(
                status.as_u16(),
                format!("OCR submission rejected: {status} - {body}"),
            ));
        }

        let location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                RxError::service("OCR submission accepted without an Operation-Location header")
            })?;

        Url::parse(location).map_err(|e| {
            RxError::service(format!("Invalid Operation-Location '{location}': {e}"))
        })
    }

    /// Fetch the current state of a submitted operation.
    pub async fn fetch(&self, operation: &Url) -> Result<ReadOperationResponse> {
        let response = self
            .client
            .get(operation.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RxError::service_status(
                status.as_u16(),
                format!("OCR status request failed: {status} - {body}"),
            ));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| RxError::service(format!("Malformed OCR status response: {e}")))
    }
}

/// Accepts either the resource endpoint or the full analyze URL.
fn analyze_url(endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    if endpoint.trim_end_matches('/').ends_with("read/analyze") {
        return Ok(Url::parse(endpoint)?);
    }

    let base = if endpoint.ends_with('/') {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("{endpoint}/"))?
    };
    Ok(base.join(READ_ANALYZE_PATH)?)
}
