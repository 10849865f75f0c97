//! klip - save selected text as named snippets and paste them back anywhere.
//!
//! Snippets live in a JSON file in the data directory and are bound to ten
//! numbered hotkey slots. Shift plus a digit pastes a slot into the focused
//! application; Alt+1 saves the current selection as a new snippet.

pub mod cli;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod keyboard;
pub mod listener;
pub mod models;
pub mod session;
pub mod slots;
pub mod storage;
pub mod ui;

// Re-export
pub use clipboard::{ClipboardAccess, SystemClipboard};
pub use config::{get_config_dir, AppConfig, Tier, MAX_SNIPPETS_FREE, MAX_SNIPPETS_PREMIUM};
pub use dispatch::{CaptureSettings, Dispatcher, PasteOutcome, PasteTimings, SavedSelection};
pub use error::{KlipError, Result};
pub use keyboard::{EnigoKeys, KeySender};
pub use listener::{run_listener, HotkeyAction, HotkeyTracker};
pub use models::{Snippet, SnippetMap};
pub use session::{logout, LogoutReport, Session};
pub use slots::{HotkeySlots, Slot};
pub use storage::SnippetStore;
pub use ui::run_selector;
