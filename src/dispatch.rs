//! Hotkey to clipboard bridge.
//!
//! Firing a slot copies the snippet to the clipboard and sends the paste
//! shortcut. Saving a selection copies whatever is selected in the foreground
//! application, detects it by comparing against the previous clipboard text,
//! and stores it as a new snippet.

use crate::clipboard::ClipboardAccess;
use crate::error::{KlipError, Result};
use crate::keyboard::KeySender;
use crate::models::Snippet;
use crate::slots::Slot;
use crate::storage::SnippetStore;
use std::thread;
use std::time::Duration;

/// Longest name derived from captured text
const DERIVED_NAME_MAX: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct PasteTimings {
    /// Wait between updating the clipboard and sending the paste shortcut
    pub settle: Duration,
    /// Wait after the shortcut while the target application reads the clipboard
    pub linger: Duration,
}

impl Default for PasteTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(50),
            linger: Duration::ZERO,
        }
    }
}

impl PasteTimings {
    /// For a process that exits right after pasting. On X11 and Wayland the
    /// clipboard contents go away with the process that set them.
    pub fn one_shot() -> Self {
        Self {
            linger: Duration::from_millis(500),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    pub attempts: u32,
    pub key_gap: Duration,
    /// Wait after the copy shortcut before reading the clipboard
    pub copy_wait: Duration,
    pub retry_wait: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            key_gap: Duration::from_millis(50),
            copy_wait: Duration::from_millis(200),
            retry_wait: Duration::from_millis(100),
        }
    }
}

impl CaptureSettings {
    /// No waiting at all, for tests and fakes
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            key_gap: Duration::ZERO,
            copy_wait: Duration::ZERO,
            retry_wait: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Clipboard set and paste shortcut sent
    Pasted,
    /// Paste failed and the text was typed instead
    Typed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSelection {
    pub snippet: Snippet,
    pub slot: Option<Slot>,
}

pub struct Dispatcher<C, K> {
    store: SnippetStore,
    clipboard: C,
    keys: K,
    paste: PasteTimings,
    capture: CaptureSettings,
}

impl<C: ClipboardAccess, K: KeySender> Dispatcher<C, K> {
    pub fn new(store: SnippetStore, clipboard: C, keys: K) -> Self {
        Self {
            store,
            clipboard,
            keys,
            paste: PasteTimings::default(),
            capture: CaptureSettings::default(),
        }
    }

    pub fn with_timings(mut self, paste: PasteTimings, capture: CaptureSettings) -> Self {
        self.paste = paste;
        self.capture = capture;
        self
    }

    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    /// Paste whatever `slot` points at. Returns the pasted snippet's name.
    pub fn fire_slot(&mut self, slot: Slot) -> Result<Option<String>> {
        let Some(snippet) = self.store.resolve_slot(slot)? else {
            tracing::debug!("slot {} has no snippet", slot);
            return Ok(None);
        };
        let outcome = self.paste_code(&snippet.code)?;
        tracing::info!("snippet '{}' from slot {} {:?}", snippet.name, slot, outcome);
        Ok(Some(snippet.name))
    }

    /// Put `code` on the clipboard and paste it, typing it out if that fails
    pub fn paste_code(&mut self, code: &str) -> Result<PasteOutcome> {
        match self.try_paste(code) {
            Ok(()) => Ok(PasteOutcome::Pasted),
            Err(e) => {
                tracing::warn!("paste failed ({}), typing snippet instead", e);
                self.keys.type_text(code)?;
                Ok(PasteOutcome::Typed)
            }
        }
    }

    fn try_paste(&mut self, code: &str) -> Result<()> {
        self.clipboard.set_text(code)?;
        thread::sleep(self.paste.settle);
        self.keys.send_paste()?;
        thread::sleep(self.paste.linger);
        Ok(())
    }

    /// Put `code` on the clipboard without pasting it
    pub fn copy_code(&mut self, code: &str) -> Result<()> {
        self.clipboard.set_text(code)
    }

    /// Copy the foreground selection. The previous clipboard text is restored.
    pub fn capture_selection(&mut self) -> Result<Option<String>> {
        let original = self.clipboard.get_text().unwrap_or_default();
        let captured = self.copy_until_changed(&original);

        if let Err(e) = self.clipboard.set_text(&original) {
            tracing::warn!("could not restore clipboard: {}", e);
        }

        let selected = captured?;
        Ok(selected
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }

    fn copy_until_changed(&mut self, original: &str) -> Result<Option<String>> {
        for attempt in 1..=self.capture.attempts {
            thread::sleep(self.capture.key_gap);
            self.keys.send_copy()?;
            thread::sleep(self.capture.copy_wait);

            let current = self.clipboard.get_text().unwrap_or_default();
            if current != original {
                return Ok(Some(current));
            }
            tracing::debug!(
                "clipboard unchanged after copy attempt {}/{}",
                attempt,
                self.capture.attempts
            );
            thread::sleep(self.capture.retry_wait);
        }
        Ok(None)
    }

    /// Capture the selection and store it, named `name` or after its first line
    pub fn save_selection(&mut self, name: Option<&str>) -> Result<SavedSelection> {
        if !self.store.can_add_more()? {
            return Err(KlipError::LimitReached {
                count: self.store.count()?,
                max: self.store.limit(),
            });
        }

        let code = self.capture_selection()?.ok_or(KlipError::NoSelection)?;
        let name = match name {
            Some(name) => name.trim().to_string(),
            None => {
                let existing = self.store.load_snippets()?;
                derive_name(&code, |candidate| existing.contains_key(candidate))
            }
        };

        let slot = self.store.add(&name, &code)?;
        Ok(SavedSelection {
            snippet: Snippet { name, code },
            slot,
        })
    }
}

/// Name for captured text: its first non-empty line, shortened, made unique
pub fn derive_name(code: &str, taken: impl Fn(&str) -> bool) -> String {
    let first_line = code
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    let mut base: String = first_line.chars().take(DERIVED_NAME_MAX).collect();
    base = base.trim_end().to_string();
    if base.is_empty() {
        base = "snippet".to_string();
    }

    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} ({})", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
