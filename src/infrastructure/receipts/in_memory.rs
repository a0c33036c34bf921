use crate::core::errors::SplitError;
use crate::infrastructure::receipts::ReceiptStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Clone, Default)]
pub struct InMemoryReceiptStore {
    released: Arc<RwLock<Vec<String>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryReceiptStore {
    pub fn new() -> Self {
        InMemoryReceiptStore::default()
    }

    /// Makes every subsequent `release` fail, as an unreachable store would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn released(&self) -> Vec<String> {
        self.released.read().await.clone()
    }
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn release(&self, url: &str) -> Result<(), SplitError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SplitError::ReceiptError(format!("store unavailable, cannot release {}", url)));
        }
        debug!(url, "receipt released");
        self.released.write().await.push(url.to_string());
        Ok(())
    }
}
