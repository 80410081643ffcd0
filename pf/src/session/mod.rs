//! Editing sessions
//!
//! One actor per open form. Hosts send events through a [`SessionHandle`] and
//! render the [`ViewUpdate`]s it publishes.

mod actor;
mod clipboard;
mod handle;
mod messages;

pub use actor::{CATEGORY_FIELD, DESCRIPTION_FIELD, NAME_FIELD, Session, SessionOptions, SessionServices};
pub use clipboard::{Clipboard, CommandClipboard};
pub use handle::SessionHandle;
pub use messages::{SessionCommand, SessionError, SessionResponse, Submission, ViewUpdate};
