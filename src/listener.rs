use crate::clipboard::ClipboardAccess;
use crate::dispatch::Dispatcher;
use crate::error::{KlipError, Result};
use crate::keyboard::KeySender;
use crate::models::Snippet;
use crate::slots::Slot;
use crate::storage::SnippetStore;
use crate::ui::run_selector;
use rdev::{EventType, Key as RdevKey};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const MAX_LISTEN_RETRIES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Shift + digit
    PasteSlot(Slot),
    /// Alt + 1
    SaveSelection,
    /// F12 or Ctrl + Shift + S
    OpenSelector,
}

/// Turns raw key events into hotkey actions
#[derive(Debug, Default)]
pub struct HotkeyTracker {
    shift: bool,
    alt: bool,
    ctrl: bool,
    meta: bool,
    /// Hotkey currently held down, so auto-repeat fires only once
    held: Option<RdevKey>,
}

impl HotkeyTracker {
    pub fn on_event(&mut self, event: &EventType) -> Option<HotkeyAction> {
        match event {
            EventType::KeyPress(key) => self.on_press(*key),
            EventType::KeyRelease(key) => {
                self.on_release(*key);
                None
            }
            _ => None,
        }
    }

    fn on_press(&mut self, key: RdevKey) -> Option<HotkeyAction> {
        if self.set_modifier(key, true) {
            return None;
        }
        if self.held == Some(key) {
            return None;
        }
        let action = self.action_for(key)?;
        self.held = Some(key);
        Some(action)
    }

    fn action_for(&self, key: RdevKey) -> Option<HotkeyAction> {
        // (shift, alt, ctrl, meta)
        let mods = (self.shift, self.alt, self.ctrl, self.meta);
        match key {
            RdevKey::F12 if mods == (false, false, false, false) => {
                Some(HotkeyAction::OpenSelector)
            }
            RdevKey::KeyS if mods == (true, false, true, false) => {
                Some(HotkeyAction::OpenSelector)
            }
            _ => match (mods, digit_of(key)?) {
                ((false, true, false, false), 1) => Some(HotkeyAction::SaveSelection),
                ((true, false, false, false), digit) => {
                    Slot::new(digit).map(HotkeyAction::PasteSlot)
                }
                _ => None,
            },
        }
    }

    fn on_release(&mut self, key: RdevKey) {
        if !self.set_modifier(key, false) && self.held == Some(key) {
            self.held = None;
        }
    }

    /// Update modifier state; returns false when `key` is not a modifier
    fn set_modifier(&mut self, key: RdevKey, down: bool) -> bool {
        let flag = match key {
            RdevKey::ShiftLeft | RdevKey::ShiftRight => &mut self.shift,
            RdevKey::Alt => &mut self.alt,
            RdevKey::ControlLeft | RdevKey::ControlRight => &mut self.ctrl,
            RdevKey::MetaLeft | RdevKey::MetaRight => &mut self.meta,
            _ => return false,
        };
        *flag = down;
        true
    }
}

fn digit_of(key: RdevKey) -> Option<u8> {
    let digit = match key {
        RdevKey::Num0 => 0,
        RdevKey::Num1 => 1,
        RdevKey::Num2 => 2,
        RdevKey::Num3 => 3,
        RdevKey::Num4 => 4,
        RdevKey::Num5 => 5,
        RdevKey::Num6 => 6,
        RdevKey::Num7 => 7,
        RdevKey::Num8 => 8,
        RdevKey::Num9 => 9,
        _ => return None,
    };
    Some(digit)
}

/// Hook global key events on a background thread and run the resulting
/// actions on this one. Returns once the hook cannot be (re)started.
pub fn run_listener<C: ClipboardAccess, K: KeySender>(
    mut dispatcher: Dispatcher<C, K>,
) -> Result<()> {
    dispatcher.store().sync_hotkeys()?;

    let (tx, rx) = mpsc::channel();
    let hook = spawn_hook_thread(tx);
    tracing::info!(
        "listening: Shift+1..9,0 pastes a slot, Alt+1 saves the selection, F12 opens the selector"
    );

    process_actions(&mut dispatcher, rx, run_selector);

    if hook.join().is_err() {
        tracing::error!("keyboard hook thread panicked");
    }
    Err(KlipError::Listener("keyboard hook stopped".to_string()))
}

fn spawn_hook_thread(tx: Sender<HotkeyAction>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut retry_count = 0;

        while retry_count < MAX_LISTEN_RETRIES {
            let tx = tx.clone();
            let mut tracker = HotkeyTracker::default();
            let callback = move |event: rdev::Event| {
                if let Some(action) = tracker.on_event(&event.event_type) {
                    let _ = tx.send(action);
                }
            };

            match rdev::listen(callback) {
                // listen() blocks for the life of the hook
                Ok(()) => break,
                Err(e) => {
                    retry_count += 1;
                    tracing::warn!(
                        "keyboard listener failed: {:?}, retrying ({}/{})",
                        e,
                        retry_count,
                        MAX_LISTEN_RETRIES
                    );
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    })
}

/// Execute actions in arrival order until every sender is gone.
///
/// Save requests that piled up while a capture was running are dropped.
/// Keys typed into the selector also reach the hook, so everything queued
/// while it was open is discarded.
fn process_actions<C, K, S>(
    dispatcher: &mut Dispatcher<C, K>,
    rx: Receiver<HotkeyAction>,
    mut select: S,
) where
    C: ClipboardAccess,
    K: KeySender,
    S: FnMut(&SnippetStore) -> Result<Option<Snippet>>,
{
    let mut pending = VecDeque::new();

    loop {
        let action = match pending.pop_front() {
            Some(action) => action,
            None => match rx.recv() {
                Ok(action) => action,
                Err(_) => break,
            },
        };

        match action {
            HotkeyAction::OpenSelector => {
                open_selector(dispatcher, &mut select);
                pending.clear();
                while rx.try_recv().is_ok() {}
            }
            HotkeyAction::SaveSelection => {
                run_action(dispatcher, action);
                while let Ok(next) = rx.try_recv() {
                    if next != HotkeyAction::SaveSelection {
                        pending.push_back(next);
                    }
                }
            }
            HotkeyAction::PasteSlot(_) => run_action(dispatcher, action),
        }
    }
}

/// Run the selector in this terminal and put the choice on the clipboard
fn open_selector<C, K, S>(dispatcher: &mut Dispatcher<C, K>, select: &mut S)
where
    C: ClipboardAccess,
    K: KeySender,
    S: FnMut(&SnippetStore) -> Result<Option<Snippet>>,
{
    match select(dispatcher.store()) {
        Ok(Some(snippet)) => match dispatcher.copy_code(&snippet.code) {
            Ok(()) => tracing::info!("snippet '{}' copied to clipboard", snippet.name),
            Err(e) => tracing::error!("could not copy snippet '{}': {}", snippet.name, e),
        },
        Ok(None) => {}
        Err(e) => tracing::error!("quick selector failed: {}", e),
    }
}

fn run_action<C: ClipboardAccess, K: KeySender>(
    dispatcher: &mut Dispatcher<C, K>,
    action: HotkeyAction,
) {
    match action {
        HotkeyAction::PasteSlot(slot) => match dispatcher.fire_slot(slot) {
            Ok(Some(_)) => {}
            Ok(None) => tracing::info!("slot {}: no snippet assigned", slot),
            Err(e) => tracing::error!("could not paste slot {}: {}", slot, e),
        },
        HotkeyAction::SaveSelection => match dispatcher.save_selection(None) {
            Ok(saved) => match saved.slot {
                Some(slot) => tracing::info!(
                    "saved selection as '{}' on slot {}",
                    saved.snippet.name,
                    slot
                ),
                None => tracing::info!("saved selection as '{}'", saved.snippet.name),
            },
            Err(e) => tracing::warn!("could not save selection: {}", e),
        },
        HotkeyAction::OpenSelector => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{CaptureSettings, PasteTimings};
    use crate::storage::SnippetStore;
    use rdev::EventType::{KeyPress, KeyRelease};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Clipboard that never changes, so every capture exhausts its attempts
    struct StaticClipboard;

    impl ClipboardAccess for StaticClipboard {
        fn get_text(&mut self) -> Result<String> {
            Ok("unchanged".to_string())
        }
        fn set_text(&mut self, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        last_set: Rc<RefCell<Option<String>>>,
    }

    impl ClipboardAccess for RecordingClipboard {
        fn get_text(&mut self) -> Result<String> {
            Ok(self.last_set.borrow().clone().unwrap_or_default())
        }
        fn set_text(&mut self, text: &str) -> Result<()> {
            *self.last_set.borrow_mut() = Some(text.to_string());
            Ok(())
        }
    }

    struct CountingKeys {
        copies: Rc<Cell<usize>>,
        pastes: Rc<Cell<usize>>,
    }

    impl KeySender for CountingKeys {
        fn send_paste(&mut self) -> Result<()> {
            self.pastes.set(self.pastes.get() + 1);
            Ok(())
        }
        fn send_copy(&mut self) -> Result<()> {
            self.copies.set(self.copies.get() + 1);
            Ok(())
        }
        fn type_text(&mut self, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    fn feed(tracker: &mut HotkeyTracker, events: &[EventType]) -> Vec<HotkeyAction> {
        events.iter().filter_map(|e| tracker.on_event(e)).collect()
    }

    fn slot(d: u8) -> Slot {
        Slot::new(d).unwrap()
    }

    #[test]
    fn shift_digit_pastes_slot() {
        let mut tracker = HotkeyTracker::default();
        let actions = feed(
            &mut tracker,
            &[
                KeyPress(RdevKey::ShiftLeft),
                KeyPress(RdevKey::Num3),
                KeyRelease(RdevKey::Num3),
                KeyPress(RdevKey::Num0),
                KeyRelease(RdevKey::Num0),
                KeyRelease(RdevKey::ShiftLeft),
            ],
        );
        assert_eq!(
            actions,
            vec![
                HotkeyAction::PasteSlot(slot(3)),
                HotkeyAction::PasteSlot(slot(0))
            ]
        );
    }

    #[test]
    fn plain_digits_and_other_modifiers_are_ignored() {
        let mut tracker = HotkeyTracker::default();
        let actions = feed(
            &mut tracker,
            &[
                KeyPress(RdevKey::Num2),
                KeyRelease(RdevKey::Num2),
                KeyPress(RdevKey::ControlLeft),
                KeyPress(RdevKey::ShiftRight),
                KeyPress(RdevKey::Num2),
                KeyRelease(RdevKey::Num2),
                KeyRelease(RdevKey::ControlLeft),
                KeyRelease(RdevKey::ShiftRight),
                KeyPress(RdevKey::Alt),
                KeyPress(RdevKey::Num2),
            ],
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn alt_one_saves_selection() {
        let mut tracker = HotkeyTracker::default();
        let actions = feed(
            &mut tracker,
            &[
                KeyPress(RdevKey::Alt),
                KeyPress(RdevKey::Num1),
                KeyRelease(RdevKey::Num1),
                KeyRelease(RdevKey::Alt),
            ],
        );
        assert_eq!(actions, vec![HotkeyAction::SaveSelection]);
    }

    #[test]
    fn auto_repeat_fires_once() {
        let mut tracker = HotkeyTracker::default();
        let actions = feed(
            &mut tracker,
            &[
                KeyPress(RdevKey::ShiftLeft),
                KeyPress(RdevKey::Num5),
                KeyPress(RdevKey::Num5),
                KeyPress(RdevKey::Num5),
                KeyRelease(RdevKey::Num5),
                KeyPress(RdevKey::Num5),
            ],
        );
        assert_eq!(actions, vec![HotkeyAction::PasteSlot(slot(5)); 2]);
    }

    #[test]
    fn queued_saves_collapse_but_pastes_still_run() {
        let dir = TempDir::new().unwrap();
        let store = SnippetStore::in_dir(dir.path());
        store.add("q", "select 1").unwrap();

        let copies = Rc::new(Cell::new(0));
        let pastes = Rc::new(Cell::new(0));
        let keys = CountingKeys {
            copies: Rc::clone(&copies),
            pastes: Rc::clone(&pastes),
        };
        let mut dispatcher = Dispatcher::new(store, StaticClipboard, keys).with_timings(
            PasteTimings {
                settle: Duration::ZERO,
                linger: Duration::ZERO,
            },
            CaptureSettings::immediate(3),
        );

        let (tx, rx) = mpsc::channel();
        tx.send(HotkeyAction::SaveSelection).unwrap();
        tx.send(HotkeyAction::SaveSelection).unwrap();
        tx.send(HotkeyAction::PasteSlot(slot(1))).unwrap();
        tx.send(HotkeyAction::SaveSelection).unwrap();
        drop(tx);

        process_actions(&mut dispatcher, rx, |_: &SnippetStore| Ok(None));
        assert_eq!(copies.get(), 3);
        assert_eq!(pastes.get(), 1);
    }

    #[test]
    fn f12_and_ctrl_shift_s_open_the_selector() {
        let mut tracker = HotkeyTracker::default();
        let actions = feed(
            &mut tracker,
            &[
                KeyPress(RdevKey::F12),
                KeyPress(RdevKey::F12),
                KeyRelease(RdevKey::F12),
                KeyPress(RdevKey::ControlLeft),
                KeyPress(RdevKey::ShiftLeft),
                KeyPress(RdevKey::KeyS),
                KeyRelease(RdevKey::KeyS),
                KeyRelease(RdevKey::ShiftLeft),
                KeyPress(RdevKey::F12),
                KeyRelease(RdevKey::F12),
                KeyRelease(RdevKey::ControlLeft),
                KeyPress(RdevKey::KeyS),
            ],
        );
        assert_eq!(actions, vec![HotkeyAction::OpenSelector; 2]);
    }

    #[test]
    fn selector_choice_is_copied_and_keys_typed_meanwhile_are_dropped() {
        let dir = TempDir::new().unwrap();
        let store = SnippetStore::in_dir(dir.path());
        store.add("q", "select 1").unwrap();

        let copies = Rc::new(Cell::new(0));
        let pastes = Rc::new(Cell::new(0));
        let keys = CountingKeys {
            copies: Rc::clone(&copies),
            pastes: Rc::clone(&pastes),
        };
        let clipboard = RecordingClipboard::default();
        let last_set = Rc::clone(&clipboard.last_set);
        let mut dispatcher = Dispatcher::new(store, clipboard, keys);

        let (tx, rx) = mpsc::channel();
        tx.send(HotkeyAction::OpenSelector).unwrap();
        // typed into the selector while it was open
        tx.send(HotkeyAction::PasteSlot(slot(1))).unwrap();
        drop(tx);

        let mut opened = 0;
        process_actions(&mut dispatcher, rx, |store: &SnippetStore| {
            opened += 1;
            store.get("q")
        });
        assert_eq!(opened, 1);
        assert_eq!(pastes.get(), 0);
        assert_eq!(last_set.borrow().as_deref(), Some("select 1"));
    }
}
