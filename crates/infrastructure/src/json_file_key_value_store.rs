use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use orderdesk_application::KeyValueStore;
use orderdesk_core::{AppError, AppResult};
use tokio::sync::Mutex;
use tracing::warn;

/// Key/value store persisted as one JSON object file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers never observe a partially written file.
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<String, String>>>,
}

impl JsonFileKeyValueStore {
    /// Creates a store backed by `path`. The file is read lazily.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    async fn load(&self) -> AppResult<BTreeMap<String, String>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read state file '{}': {error}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_slice(raw.as_slice()) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    error = %error,
                    "ignoring unreadable state file"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to create state directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let encoded = serde_json::to_vec_pretty(entries)
            .map_err(|error| AppError::Internal(format!("failed to encode state file: {error}")))?;

        let mut temporary = self.path.clone().into_os_string();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);

        tokio::fs::write(&temporary, encoded).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write state file '{}': {error}",
                temporary.display()
            ))
        })?;
        tokio::fs::rename(&temporary, &self.path)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to replace state file '{}': {error}",
                    self.path.display()
                ))
            })
    }

    async fn update<F>(&self, change: F) -> AppResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut cached = self.entries.lock().await;
        let current = match cached.take() {
            Some(entries) => entries,
            None => self.load().await?,
        };

        let mut next = current.clone();
        if !change(&mut next) {
            *cached = Some(current);
            return Ok(());
        }

        // The cache only advances once the file does.
        match self.persist(&next).await {
            Ok(()) => {
                *cached = Some(next);
                Ok(())
            }
            Err(error) => {
                *cached = Some(current);
                Err(error)
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut cached = self.entries.lock().await;
        if cached.is_none() {
            *cached = Some(self.load().await?);
        }

        Ok(cached.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value);
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.update(|entries| entries.remove(key).is_some()).await
    }
}
