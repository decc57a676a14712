use serde::Deserialize;
use std::env;

use crate::error::{Result, RxError};
use crate::models::Strategy;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

pub const DEFAULT_NER_URL: &str =
    "https://api-inference.huggingface.co/models/dslim/bert-base-NER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ocr: OcrConfig,
    pub ner: NerConfig,
    pub preprocess: PreprocessConfig,
    pub pipeline: PipelineConfig,
}

/// Cloud Read API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Raise `RxError::Timeout` instead of returning an empty transcript
    pub strict_timeout: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NerConfig {
    pub url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessConfig {
    /// Neighbourhood size of the adaptive threshold (odd)
    pub block_size: u32,
    /// Constant subtracted from the weighted local mean
    pub threshold_offset: i32,
    /// Non-local means filter strength (`h`)
    pub denoise_strength: f32,
    pub template_window: u32,
    pub search_window: u32,
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub strategy: Strategy,
    pub pattern_min_length: usize,
    pub degrade_on_extraction_error: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
            poll_interval_ms: 1000,
            max_poll_attempts: 10,
            strict_timeout: false,
        }
    }
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_NER_URL.to_string(),
            api_token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            threshold_offset: 2,
            denoise_strength: 10.0,
            template_window: 7,
            search_window: 21,
            max_image_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Pattern,
            pattern_min_length: 4,
            degrade_on_extraction_error: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ocr = OcrConfig::default();
        let ner = NerConfig::default();
        let preprocess = PreprocessConfig::default();
        let pipeline = PipelineConfig::default();

        Self {
            ocr: OcrConfig {
                endpoint: parse_env_opt("OCR_ENDPOINT"),
                api_key: parse_env_opt("OCR_API_KEY"),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr.timeout_secs),
                poll_interval_ms: parse_env_or("OCR_POLL_INTERVAL_MS", ocr.poll_interval_ms),
                max_poll_attempts: parse_env_or("OCR_MAX_POLL_ATTEMPTS", ocr.max_poll_attempts),
                strict_timeout: parse_env_or("OCR_STRICT_TIMEOUT", ocr.strict_timeout),
            },
            ner: NerConfig {
                url: parse_env_opt("NER_URL").unwrap_or(ner.url),
                api_token: parse_env_opt("NER_API_TOKEN"),
                timeout_secs: parse_env_or("NER_TIMEOUT", ner.timeout_secs),
            },
            preprocess: PreprocessConfig {
                block_size: parse_env_or("PREPROCESS_BLOCK_SIZE", preprocess.block_size),
                threshold_offset: parse_env_or(
                    "PREPROCESS_THRESHOLD_OFFSET",
                    preprocess.threshold_offset,
                ),
                denoise_strength: parse_env_or(
                    "PREPROCESS_DENOISE_STRENGTH",
                    preprocess.denoise_strength,
                ),
                template_window: parse_env_or(
                    "PREPROCESS_TEMPLATE_WINDOW",
                    preprocess.template_window,
                ),
                search_window: parse_env_or("PREPROCESS_SEARCH_WINDOW", preprocess.search_window),
                max_image_bytes: parse_env_or("MAX_IMAGE_BYTES", preprocess.max_image_bytes),
            },
            pipeline: PipelineConfig {
                strategy: parse_env_or("EXTRACTION_STRATEGY", pipeline.strategy),
                pattern_min_length: parse_env_or(
                    "PATTERN_MIN_LENGTH",
                    pipeline.pattern_min_length,
                ),
                degrade_on_extraction_error: parse_env_or(
                    "DEGRADE_ON_EXTRACTION_ERROR",
                    pipeline.degrade_on_extraction_error,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.ocr.validate()?;
        self.preprocess.validate()?;
        if self.pipeline.pattern_min_length == 0 {
            return Err(RxError::Config(
                "PATTERN_MIN_LENGTH must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl OcrConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_poll_attempts == 0 {
            return Err(RxError::Config(
                "OCR_MAX_POLL_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_window(name: &str, value: u32) -> Result<()> {
    if value < 3 || value % 2 == 0 {
        return Err(RxError::Config(format!(
            "{name} must be an odd number >= 3, got {value}"
        )));
    }
    Ok(())
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        check_window("PREPROCESS_BLOCK_SIZE", self.block_size)?;
        check_window("PREPROCESS_TEMPLATE_WINDOW", self.template_window)?;
        check_window("PREPROCESS_SEARCH_WINDOW", self.search_window)?;
        if self.denoise_strength.is_nan() || self.denoise_strength <= 0.0 {
            return Err(RxError::Config(format!(
                "PREPROCESS_DENOISE_STRENGTH must be positive, got {}",
                self.denoise_strength
            )));
        }
        if self.max_image_bytes == 0 {
            return Err(RxError::Config(
                "MAX_IMAGE_BYTES must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
