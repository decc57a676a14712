#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};

use rxscan::config::{Config, NerConfig, OcrConfig, PipelineConfig, PreprocessConfig};
use rxscan::ocr::Sleeper;

pub const ANALYZE_PATH: &str = "/vision/v3.2/read/analyze";
pub const OPERATION_PATH: &str = "/vision/v3.2/read/analyzeResults/op-1";
pub const NER_PATH: &str = "/models/ner";

/// Sleeper that returns immediately.
#[derive(Debug, Default)]
pub struct InstantSleeper;

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records how often the poll loop waited.
#[derive(Debug, Default)]
pub struct CountingSleeper {
    calls: AtomicU32,
}

impl CountingSleeper {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for CountingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn instant() -> Arc<dyn Sleeper> {
    Arc::new(InstantSleeper)
}

/// Light page with a dark bar, small enough to keep the denoiser fast.
pub fn prescription_png() -> Vec<u8> {
    let mut img = RgbImage::from_pixel(32, 24, Rgb([235, 230, 220]));
    for x in 4..28 {
        for y in 10..13 {
            img.put_pixel(x, y, Rgb([20, 20, 30]));
        }
    }
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

pub fn prescription_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(24, 16, Rgb([240, 240, 240]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("Failed to encode test image");
    buf
}

pub fn ocr_config(server_uri: &str) -> OcrConfig {
    OcrConfig {
        endpoint: Some(server_uri.to_string()),
        api_key: Some("test-key".to_string()),
        timeout_secs: 5,
        poll_interval_ms: 1,
        max_poll_attempts: 10,
        strict_timeout: false,
    }
}

pub fn ner_config(server_uri: &str) -> NerConfig {
    NerConfig {
        url: format!("{server_uri}{NER_PATH}"),
        api_token: Some("hf_test".to_string()),
        timeout_secs: 5,
    }
}

pub fn pipeline_config(server_uri: &str) -> Config {
    Config {
        ocr: ocr_config(server_uri),
        ner: ner_config(server_uri),
        preprocess: PreprocessConfig {
            template_window: 3,
            search_window: 5,
            ..PreprocessConfig::default()
        },
        pipeline: PipelineConfig::default(),
    }
}

pub fn operation_location(server_uri: &str) -> String {
    format!("{server_uri}{OPERATION_PATH}")
}

pub fn status_body(status: &str) -> Value {
    json!({ "status": status })
}

pub fn succeeded_body(lines: &[&str]) -> Value {
    let lines: Vec<Value> = lines.iter().map(|text| json!({ "text": text })).collect();
    json!({
        "status": "succeeded",
        "createdDateTime": "2024-03-01T10:00:00Z",
        "analyzeResult": {
            "version": "3.2.0",
            "readResults": [
                { "page": 1, "angle": 0.0, "width": 32, "height": 24, "lines": lines }
            ]
        }
    })
}
