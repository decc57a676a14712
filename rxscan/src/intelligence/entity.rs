use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::NerConfig;
use crate::error::{Result, RxError};
use crate::models::{CandidateSet, FormattedText, MedicineCandidate, Strategy};

use super::extractor::MedicineExtractor;

const SUBWORD_MARKER: &str = "##";
const KEPT_GROUPS: &[&str] = &["ORG", "PER", "MISC"];

/// One recognized span. Other fields in the response are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerEntity {
    #[serde(alias = "entity")]
    pub entity_group: String,
    pub word: String,
}

impl NerEntity {
    pub fn new(entity_group: impl Into<String>, word: impl Into<String>) -> Self {
        Self {
            entity_group: entity_group.into(),
            word: word.into(),
        }
    }

    /// Splits a per-token IOB label such as `B-ORG` into its tag and group.
    /// Aggregated labels have no tag.
    fn label(&self) -> (Option<char>, &str) {
        match self.entity_group.split_once('-') {
            Some((tag, group)) if tag.len() == 1 => {
                (tag.chars().next().map(|c| c.to_ascii_uppercase()), group)
            }
            _ => (None, self.entity_group.as_str()),
        }
    }
}

fn is_kept(group: &str) -> bool {
    KEPT_GROUPS
        .iter()
        .any(|kept| group.eq_ignore_ascii_case(kept))
}

#[derive(Clone)]
pub struct NerApiClient {
    client: reqwest::Client,
    url: Url,
    api_token: String,
}

impl NerApiClient {
    pub fn new(config: &NerConfig) -> Result<Self> {
        let api_token = config
            .api_token
            .clone()
            .ok_or_else(|| RxError::Config("API token required for entity recognition".to_string()))?;
        let url = Url::parse(&config.url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RxError::Config(format!("Failed to create NER HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_token,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn recognize(&self, text: &str) -> Result<Vec<NerEntity>> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": text }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(RxError::service_status(
                status.as_u16(),
                format!("Entity recognition request failed: {status} {body}"),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            RxError::service(format!("Malformed entity recognition response: {e}"))
        })
    }
}

#[derive(Clone)]
enum NerBackend {
    Api { client: NerApiClient },
    Unavailable { reason: String },
}

/// Remote extractor backed by a token-classification model.
#[derive(Clone)]
pub struct EntityExtractor {
    backend: NerBackend,
}

impl EntityExtractor {
    pub fn new(config: &NerConfig) -> Self {
        let backend = match NerApiClient::new(config) {
            Ok(client) => {
                info!(url = %client.url(), "Entity recognition backend initialized");
                NerBackend::Api { client }
            }
            Err(e) => {
                let reason = format!("Entity recognition backend unavailable: {e}");
                warn!("{}", reason);
                NerBackend::Unavailable { reason }
            }
        };
        Self { backend }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: NerBackend::Unavailable {
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, NerBackend::Unavailable { .. })
    }
}

#[async_trait]
impl MedicineExtractor for EntityExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Entity
    }

    async fn extract(&self, text: &FormattedText) -> Result<Vec<MedicineCandidate>> {
        let client = match &self.backend {
            NerBackend::Api { client } => client,
            NerBackend::Unavailable { reason } => {
                return Err(RxError::ServiceUnavailable(reason.clone()))
            }
        };

        if text.is_empty() {
            return Ok(Vec::new());
        }

        let entities = client.recognize(&text.to_string()).await?;
        debug!(entities = entities.len(), "Entity recognition returned");
        Ok(merge_entities(&entities))
    }
}

/// Rebuild words from the token stream, then keep those grouped ORG/PER/MISC.
///
/// A `##` piece always extends the token right before it, whatever its group.
/// A per-token `I-` label continues a word of the same group with a space.
pub fn merge_entities(entities: &[NerEntity]) -> Vec<MedicineCandidate> {
    let mut candidates = CandidateSet::new(Strategy::Entity);
    // (group, word) of the word being assembled
    let mut current: Option<(String, String)> = None;

    for entity in entities {
        let piece = entity.word.trim();
        let (tag, group) = entity.label();
        let continuation = piece.strip_prefix(SUBWORD_MARKER);

        if let Some((current_group, word)) = &mut current {
            if let Some(rest) = continuation {
                word.push_str(&rest.replace(SUBWORD_MARKER, ""));
                continue;
            }
            if tag == Some('I') && current_group.eq_ignore_ascii_case(group) {
                word.push(' ');
                word.push_str(&piece.replace(SUBWORD_MARKER, ""));
                continue;
            }
        }

        finish_word(&mut candidates, current.take());
        current = Some((
            group.to_string(),
            continuation.unwrap_or(piece).replace(SUBWORD_MARKER, ""),
        ));
    }
    finish_word(&mut candidates, current.take());

    candidates.into_vec()
}

fn finish_word(candidates: &mut CandidateSet, word: Option<(String, String)>) {
    if let Some((group, word)) = word {
        if is_kept(&group) {
            candidates.insert(&word);
        }
    }
}
