pub mod config;
pub mod error;
pub mod intelligence;
pub mod models;
pub mod ocr;
pub mod processing;

pub use config::Config;
pub use error::{Result, RxError};
pub use models::{ExtractionResult, MedicineCandidate, RawImage, Strategy};
pub use processing::ExtractionPipeline;
