pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::SplitError;
pub use crate::core::services::SplitService;
pub use crate::infrastructure::cache::in_memory::InMemoryCache;
pub use crate::infrastructure::receipts::in_memory::InMemoryReceiptStore;
pub use crate::infrastructure::storage::in_memory::InMemoryStorage;

#[cfg(test)]
mod tests; // Include integration tests
