use crate::error::{KlipError, Result};
use arboard::Clipboard;

/// Text clipboard used when pasting and capturing snippets
pub trait ClipboardAccess {
    fn get_text(&mut self) -> Result<String>;
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The OS clipboard
pub struct SystemClipboard {
    inner: Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = Clipboard::new().map_err(|e| KlipError::Clipboard(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardAccess for SystemClipboard {
    fn get_text(&mut self) -> Result<String> {
        self.inner
            .get_text()
            .map_err(|e| KlipError::Clipboard(e.to_string()))
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text)
            .map_err(|e| KlipError::Clipboard(e.to_string()))
    }
}

/// Whether clipboard contents disappear when the process that set them exits
pub const OWNED_BY_PROCESS: bool = cfg!(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
));

/// Copy text to the OS clipboard from a process about to exit.
///
/// Where the clipboard is owned by the setting process this blocks until
/// another application replaces the contents.
pub fn set_clipboard_text(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().map_err(|e| KlipError::Clipboard(e.to_string()))?;
    set_and_hold(&mut clipboard, text).map_err(|e| KlipError::Clipboard(e.to_string()))
}

#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
))]
fn set_and_hold(clipboard: &mut Clipboard, text: &str) -> std::result::Result<(), arboard::Error> {
    use arboard::SetExtLinux;
    clipboard.set().wait().text(text.to_owned())
}

#[cfg(not(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
)))]
fn set_and_hold(clipboard: &mut Clipboard, text: &str) -> std::result::Result<(), arboard::Error> {
    clipboard.set_text(text)
}
