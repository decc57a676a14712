use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FormattedText, MedicineCandidate, Strategy};

/// A way of turning formatted prescription text into medicine candidates.
#[async_trait]
pub trait MedicineExtractor: Send + Sync {
    fn strategy(&self) -> Strategy;

    async fn extract(&self, text: &FormattedText) -> Result<Vec<MedicineCandidate>>;
}
