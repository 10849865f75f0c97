use crate::error::{KlipError, Result};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::thread;
use std::time::Duration;

/// Synthetic keystrokes sent to the foreground application
pub trait KeySender {
    /// Platform paste shortcut (Ctrl+V, Cmd+V on macOS)
    fn send_paste(&mut self) -> Result<()>;
    /// Platform copy shortcut (Ctrl+C, Cmd+C on macOS)
    fn send_copy(&mut self) -> Result<()>;
    /// Type `text` key by key
    fn type_text(&mut self, text: &str) -> Result<()>;
}

#[cfg(target_os = "macos")]
const SHORTCUT_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const SHORTCUT_MODIFIER: Key = Key::Control;

pub struct EnigoKeys {
    enigo: Enigo,
    /// Pause between the modifier and the letter of a shortcut
    key_gap: Duration,
}

impl EnigoKeys {
    pub fn new(key_gap: Duration) -> Result<Self> {
        let settings = Settings::default();
        let enigo = Enigo::new(&settings).map_err(|err| {
            KlipError::Keyboard(format!("Failed to create keyboard controller: {}", err))
        })?;
        Ok(Self { enigo, key_gap })
    }

    fn chord(&mut self, letter: char) -> Result<()> {
        self.enigo
            .key(SHORTCUT_MODIFIER, Direction::Press)
            .map_err(|e| KlipError::Keyboard(format!("Failed to press modifier: {}", e)))?;
        thread::sleep(self.key_gap);

        let clicked = self.enigo.key(Key::Unicode(letter), Direction::Click);
        thread::sleep(self.key_gap);

        // Release even if the click failed so the modifier is not left stuck
        let released = self.enigo.key(SHORTCUT_MODIFIER, Direction::Release);

        clicked.map_err(|e| KlipError::Keyboard(format!("Failed to send '{}': {}", letter, e)))?;
        released.map_err(|e| KlipError::Keyboard(format!("Failed to release modifier: {}", e)))
    }
}

impl KeySender for EnigoKeys {
    fn send_paste(&mut self) -> Result<()> {
        self.chord('v')
    }

    fn send_copy(&mut self) -> Result<()> {
        self.chord('c')
    }

    fn type_text(&mut self, text: &str) -> Result<()> {
        type_text_with_formatting(&mut self.enigo, text)
    }
}

/// Largest piece of text handed to the keyboard in one call
const CHUNK_SIZE: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeStep {
    Text(String),
    Return,
}

/// Break `text` into typed chunks of at most `CHUNK_SIZE` chars, with a
/// Return press between lines. `\r\n` counts as one line break.
pub fn typing_steps(text: &str) -> Vec<TypeStep> {
    let mut steps = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            steps.push(TypeStep::Return);
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(CHUNK_SIZE) {
            steps.push(TypeStep::Text(chunk.iter().collect()));
        }
    }
    steps
}

pub fn type_text_with_formatting(keyboard: &mut impl Keyboard, text: &str) -> Result<()> {
    for step in typing_steps(text) {
        match step {
            TypeStep::Return => {
                keyboard
                    .key(Key::Return, Direction::Click)
                    .map_err(|err| KlipError::Keyboard(format!("Failed to type newline: {}", err)))?;
                thread::sleep(Duration::from_millis(15));
            }
            TypeStep::Text(chunk) => {
                keyboard
                    .text(&chunk)
                    .map_err(|err| KlipError::Keyboard(format!("Failed to type text: {}", err)))?;
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    Ok(())
}
