pub mod in_memory;

use crate::core::errors::SplitError;
use async_trait::async_trait;

/// Object store holding receipt photos referenced by transactions.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Releases the object behind `url`. Unknown urls are not an error.
    async fn release(&self, url: &str) -> Result<(), SplitError>;
}
