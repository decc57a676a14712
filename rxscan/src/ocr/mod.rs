//! OCR (Optical Character Recognition) Module
//!
//! Turns a raw prescription photo into a transcript:
//! - `preprocessing` binarizes and denoises the image
//! - `api` speaks the cloud Read API wire format (submit, then fetch status)
//! - `provider` drives the bounded poll loop and reports how it ended
//!
//! # Configuration
//!
//! OCR behavior is controlled via `OcrConfig` and `PreprocessConfig` (see `config.rs`):
//! - `endpoint` / `api_key`: Read API resource and subscription key
//! - `poll_interval_ms` / `max_poll_attempts`: polling schedule (1 s x 10 by default)
//! - `strict_timeout`: raise instead of returning an empty transcript on timeout
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr)?;
//! let image = preprocess_image(&raw, &config.preprocess)?;
//! let transcript = ocr.extract_text(&image).await?;
//! ```

mod api;
mod denoise;
mod poll;
mod preprocessing;
mod provider;

pub use api::{OperationStatus, ReadApiClient};
pub use poll::{PollPolicy, Sleeper, TokioSleeper};
pub use preprocessing::{preprocess_image, ImagePreprocessor};
pub use provider::{OcrOutcome, OcrProvider};
