use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, PipelineConfig};
use crate::error::{Result, RxError};
use crate::intelligence::{EntityExtractor, MedicineExtractor, PatternExtractor};
use crate::models::{DegradedReason, ExtractionResult, RawImage, Strategy};
use crate::ocr::{ImagePreprocessor, OcrOutcome, OcrProvider, Sleeper};

use super::TextFormatter;

/// Image in, formatted text and medicine candidates out.
///
/// Holds no per-run state, so one instance can serve many concurrent calls.
#[derive(Clone)]
pub struct ExtractionPipeline {
    preprocessor: ImagePreprocessor,
    ocr: OcrProvider,
    formatter: TextFormatter,
    pattern: PatternExtractor,
    entity: EntityExtractor,
    config: PipelineConfig,
}

impl ExtractionPipeline {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let pipeline = Self {
            preprocessor: ImagePreprocessor::new(&config.preprocess),
            ocr: OcrProvider::new(&config.ocr)?,
            formatter: TextFormatter::new(),
            pattern: PatternExtractor::from_config(&config.pipeline),
            entity: EntityExtractor::new(&config.ner),
            config: config.pipeline.clone(),
        };
        info!(
            ocr_available = pipeline.ocr.is_available(),
            entity_available = pipeline.entity.is_available(),
            default_strategy = %pipeline.config.strategy,
            "Extraction pipeline ready"
        );
        Ok(pipeline)
    }

    pub fn with_ocr(mut self, ocr: OcrProvider) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.ocr = self.ocr.with_sleeper(sleeper);
        self
    }

    pub fn with_entity_extractor(mut self, entity: EntityExtractor) -> Self {
        self.entity = entity;
        self
    }

    pub fn default_strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn extractor(&self, strategy: Strategy) -> &dyn MedicineExtractor {
        match strategy {
            Strategy::Pattern => &self.pattern,
            Strategy::Entity => &self.entity,
        }
    }

    pub async fn run(&self, raw: RawImage, strategy: Strategy) -> Result<ExtractionResult> {
        self.run_with_cancel(raw, strategy, &CancellationToken::new())
            .await
    }

    pub async fn run_with_cancel(
        &self,
        raw: RawImage,
        strategy: Strategy,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        if cancel.is_cancelled() {
            return Err(RxError::Cancelled);
        }

        let started = Instant::now();
        let preprocessor = self.preprocessor.clone();
        let image = tokio::task::spawn_blocking(move || preprocessor.preprocess(&raw))
            .await
            .map_err(|e| RxError::Internal(format!("Preprocessing task failed: {e}")))??;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            dimensions = ?image.dimensions(),
            "Image preprocessed"
        );

        let started = Instant::now();
        let transcript = match self.ocr.recognize(&image, cancel).await? {
            OcrOutcome::Completed(transcript) => transcript,
            OcrOutcome::Failed => return Ok(degrade(strategy, DegradedReason::OcrFailed)),
            OcrOutcome::TimedOut { .. } => {
                return Ok(degrade(strategy, DegradedReason::OcrTimedOut))
            }
        };
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            lines = transcript.len(),
            "OCR finished"
        );
        if transcript.is_empty() {
            return Ok(degrade(strategy, DegradedReason::NoText));
        }

        let text = self.formatter.format(&transcript);
        debug!(lines = text.lines().len(), "Transcript formatted");

        let started = Instant::now();
        let medicines = match self.extractor(strategy).extract(&text).await {
            Ok(medicines) => medicines,
            Err(e @ RxError::Service { .. }) if self.config.degrade_on_extraction_error => {
                warn!(error = %e, %strategy, "Medicine extraction failed, returning text only");
                let mut result = ExtractionResult::degraded(strategy, DegradedReason::ExtractionFailed);
                result.text = text;
                result.transcript_lines = transcript.len();
                return Ok(result);
            }
            Err(e) => return Err(e),
        };
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            count = medicines.len(),
            %strategy,
            "Medicines extracted"
        );

        Ok(ExtractionResult::completed(
            text,
            medicines,
            strategy,
            transcript.len(),
        ))
    }
}

fn degrade(strategy: Strategy, reason: DegradedReason) -> ExtractionResult {
    warn!(?reason, %strategy, "Returning degraded extraction result");
    ExtractionResult::degraded(strategy, reason)
}
