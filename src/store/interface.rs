use thiserror::Error;

// ── Error Types ────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Store Trait ────────────────────────────────────────

/// A durable string key/value store, shared process-wide.
///
/// Mirrors a per-origin browser storage area: every value is text, reads of
/// unknown keys return `None`, and writes replace whatever was there.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
