//! Key-value store implementations

use eyre::{Context, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A stored value that exists but cannot be read back as text
///
/// Returned inside the `eyre::Report` from [`KvStore::get`]; callers that
/// want to recover can find it with `downcast_ref`.
#[derive(Debug, Error)]
#[error("Stored value for {key} is not valid UTF-8")]
pub struct CorruptValue {
    pub key: String,
}

/// A durable string-to-string store
///
/// Implementations must be safe to share between threads; callers on an async
/// runtime are expected to invoke these methods from a blocking context.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<()>;

    /// List all keys currently stored, sorted
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries.lock().map_err(|_| eyre::eyre!("Memory store lock poisoned"))
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(%key, "MemoryStore::get: called");
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(%key, value_len = value.len(), "MemoryStore::set: called");
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(%key, "MemoryStore::delete: called");
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Directory-backed store, one file per key
pub struct FileStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl FileStore {
    /// Open or create a file store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened draft store");
        Ok(Self { base_path })
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.{}", encode_key(key), crate::VALUE_EXTENSION))
    }

    /// Run `f` while holding the store's exclusive write lock
    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.base_path.join(".lock"))
            .context("Failed to open store lock file")?;
        lock_file.lock_exclusive().context("Failed to lock draft store")?;
        let result = f();
        let _ = FileExt::unlock(&lock_file);
        result
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        debug!(%key, ?path, "FileStore::get: called");
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).context(format!("Failed to read value: {}", key))?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(Some(content)),
            Err(e) => {
                warn!(%key, error = %e, "Stored value is not text");
                Err(CorruptValue { key: key.to_string() }.into())
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(key);
        debug!(%key, value_len = value.len(), "FileStore::set: called");
        self.with_lock(|| {
            // Write to a sibling file first so readers never see a partial value
            let tmp = path.with_extension("tmp");
            fs::write(&tmp, value).context(format!("Failed to write value: {}", key))?;
            fs::rename(&tmp, &path).context(format!("Failed to commit value: {}", key))?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.value_path(key);
        debug!(%key, "FileStore::delete: called");
        self.with_lock(|| {
            if path.exists() {
                fs::remove_file(&path).context(format!("Failed to delete value: {}", key))?;
                info!(%key, "Deleted value");
            }
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map(|e| e == crate::VALUE_EXTENSION).unwrap_or(false)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && let Some(key) = decode_key(stem)
            {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9_.-]` so keys map to safe file names
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
