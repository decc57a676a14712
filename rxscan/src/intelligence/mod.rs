//! Medicine name extraction from formatted prescription text.
//!
//! Two interchangeable strategies sit behind [`MedicineExtractor`]: a local
//! regex heuristic and a remote named-entity recognizer.

mod entity;
mod extractor;
mod pattern;

pub use entity::{EntityExtractor, NerApiClient, NerEntity};
pub use extractor::MedicineExtractor;
pub use pattern::PatternExtractor;

pub use crate::models::Strategy;
