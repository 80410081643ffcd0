//! Draft persistence
//!
//! Snapshots of a form's fields saved under a caller-chosen draft id. The
//! backing [`KvStore`] is synchronous, so every call is moved onto the
//! blocking pool and the async caller only ever awaits.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use draftstore::{CorruptValue, KvStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default inactivity window before an autosave
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Key namespace for drafts in the shared store
pub const KEY_PREFIX: &str = "draft:";

/// Form field name to current value
pub type DraftSnapshot = BTreeMap<String, String>;

/// A snapshot as read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDraft {
    /// When the snapshot was written
    pub saved_at: DateTime<Utc>,
    /// The saved form fields
    pub fields: DraftSnapshot,
}

/// Errors from draft operations
///
/// A corrupt stored snapshot is not an error: it is cleared and reported as absent.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Draft id must not be empty")]
    EmptyId,

    #[error("Draft store error: {0}")]
    Store(String),

    #[error("Draft store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Failed to encode draft: {0}")]
    Encode(#[from] serde_json::Error),
}

enum Stored {
    Missing,
    Text(String),
    Unreadable(String),
}

/// Save, load and clear drafts in a key-value store
#[derive(Clone)]
pub struct DraftStore {
    kv: Arc<dyn KvStore>,
}

impl DraftStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Store key for a draft id
    pub fn key(draft_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, draft_id)
    }

    fn checked_key(draft_id: &str) -> Result<String, DraftError> {
        if draft_id.trim().is_empty() {
            return Err(DraftError::EmptyId);
        }
        Ok(Self::key(draft_id))
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DraftError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KvStore) -> eyre::Result<T> + Send + 'static,
    {
        let kv = Arc::clone(&self.kv);
        tokio::task::spawn_blocking(move || f(kv.as_ref()))
            .await?
            .map_err(|e| DraftError::Store(format!("{:#}", e)))
    }

    /// Overwrite the draft with `snapshot`
    pub async fn save(&self, draft_id: &str, snapshot: &DraftSnapshot) -> Result<(), DraftError> {
        debug!(%draft_id, field_count = snapshot.len(), "DraftStore::save: called");
        let key = Self::checked_key(draft_id)?;
        let stored = SavedDraft {
            saved_at: Utc::now(),
            fields: snapshot.clone(),
        };
        let json = serde_json::to_string(&stored)?;
        self.blocking(move |kv| kv.set(&key, &json)).await
    }

    /// Read the draft, if one exists and is readable
    pub async fn load(&self, draft_id: &str) -> Result<Option<SavedDraft>, DraftError> {
        debug!(%draft_id, "DraftStore::load: called");
        let key = Self::checked_key(draft_id)?;
        let stored = {
            let key = key.clone();
            self.blocking(move |kv| match kv.get(&key) {
                Ok(Some(raw)) => Ok(Stored::Text(raw)),
                Ok(None) => Ok(Stored::Missing),
                Err(e) if e.downcast_ref::<CorruptValue>().is_some() => Ok(Stored::Unreadable(format!("{:#}", e))),
                Err(e) => Err(e),
            })
            .await?
        };

        let raw = match stored {
            Stored::Missing => {
                debug!(%draft_id, "DraftStore::load: no draft");
                return Ok(None);
            }
            Stored::Unreadable(reason) => return self.discard_corrupt(draft_id, key, &reason).await,
            Stored::Text(raw) => raw,
        };

        match serde_json::from_str::<SavedDraft>(&raw) {
            Ok(draft) => {
                debug!(%draft_id, field_count = draft.fields.len(), "DraftStore::load: found draft");
                Ok(Some(draft))
            }
            Err(e) => self.discard_corrupt(draft_id, key, &e.to_string()).await,
        }
    }

    async fn discard_corrupt(
        &self,
        draft_id: &str,
        key: String,
        reason: &str,
    ) -> Result<Option<SavedDraft>, DraftError> {
        warn!(%draft_id, %reason, "Stored draft is corrupt, discarding");
        self.blocking(move |kv| kv.delete(&key)).await?;
        Ok(None)
    }

    /// Delete the draft; clearing a missing draft succeeds
    pub async fn clear(&self, draft_id: &str) -> Result<(), DraftError> {
        debug!(%draft_id, "DraftStore::clear: called");
        let key = Self::checked_key(draft_id)?;
        self.blocking(move |kv| kv.delete(&key)).await?;
        info!(%draft_id, "Draft cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftstore::MemoryStore;

    fn snapshot(pairs: &[(&str, &str)]) -> DraftSnapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = DraftStore::new(Arc::new(MemoryStore::new()));

        store.save("t1", &snapshot(&[("x", "1")])).await.unwrap();
        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.fields, snapshot(&[("x", "1")]));

        store.clear("t1").await.unwrap();
        assert!(store.load("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = DraftStore::new(Arc::new(MemoryStore::new()));
        store.save("t1", &snapshot(&[("x", "1"), ("y", "2")])).await.unwrap();
        store.save("t1", &snapshot(&[("x", "3")])).await.unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.fields, snapshot(&[("x", "3")]));
    }

    #[tokio::test]
    async fn test_drafts_are_scoped_by_id() {
        let store = DraftStore::new(Arc::new(MemoryStore::new()));
        store.save("a", &snapshot(&[("x", "1")])).await.unwrap();
        assert!(store.load("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_draft_is_cleared_and_absent() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(&DraftStore::key("bad"), "{not json").unwrap();
        let store = DraftStore::new(kv.clone());

        assert!(store.load("bad").await.unwrap().is_none());
        assert!(kv.get(&DraftStore::key("bad")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_utf8_draft_is_cleared_and_absent() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("draft%3At1.val");
        let store = DraftStore::new(Arc::new(draftstore::FileStore::open(temp.path()).unwrap()));
        std::fs::write(&path, [0xff, 0xfe, b'{']).unwrap();

        assert!(store.load("t1").await.unwrap().is_none());
        assert!(!path.exists());
        assert!(store.load("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let store = DraftStore::new(Arc::new(MemoryStore::new()));
        assert!(matches!(store.load(" ").await, Err(DraftError::EmptyId)));
    }
}
