use async_trait::async_trait;
use orderdesk_core::AppResult;

/// Durable client-side key/value storage.
///
/// Entries are plain strings without schema versioning.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> AppResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> AppResult<()>;
}
