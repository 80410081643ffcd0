//! DraftStore - local key-value storage for editor drafts
//!
//! Holds small string values under string keys with "last write wins"
//! semantics. Values survive for the lifetime of the backing store: the
//! process for [`MemoryStore`], the directory for [`FileStore`].
//!
//! # Architecture
//!
//! ```text
//! ~/.local/share/promptforge/drafts/
//! ├── .lock                 # advisory lock held during writes
//! ├── draft%3Awelcome.val   # one file per key, key percent-encoded
//! └── ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use draftstore::{FileStore, KvStore};
//!
//! let store = FileStore::open("/tmp/drafts")?;
//! store.set("draft:welcome", "{\"fields\":{}}")?;
//! assert!(store.get("draft:welcome")?.is_some());
//! store.delete("draft:welcome")?;
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{CorruptValue, FileStore, KvStore, MemoryStore};

/// File extension used for stored values
pub const VALUE_EXTENSION: &str = "val";
