use crate::cli::Commands;
use crate::clipboard::{set_clipboard_text, SystemClipboard, OWNED_BY_PROCESS};
use crate::dispatch::{CaptureSettings, Dispatcher, PasteTimings};
use crate::error::{KlipError, Result};
use crate::keyboard::EnigoKeys;
use crate::listener::run_listener;
use crate::session::{logout, Session};
use crate::slots::Slot;
use crate::storage::SnippetStore;
use crate::ui::run_selector;
use std::thread;
use std::time::Duration;

const LIST_PREVIEW_LEN: usize = 60;
const SLOT_NAME_LEN: usize = 15;

pub fn handle_command(command: Option<Commands>) -> Result<()> {
    let store = SnippetStore::open_default()?;
    match command {
        Some(command) => handle_subcommand(&store, command),
        // Default: open the quick selector when no command is given
        None => handle_select(&store),
    }
}

fn handle_subcommand(store: &SnippetStore, command: Commands) -> Result<()> {
    match command {
        Commands::Add { name, code } => {
            let slot = store.add(&name, &code)?;
            match slot {
                Some(slot) => println!("Snippet '{}' added on slot {}", name, slot),
                None => println!("Snippet '{}' added (no free slot)", name),
            }
            Ok(())
        }
        Commands::Update {
            name,
            new_name,
            code,
        } => handle_update(store, &name, new_name, code),
        Commands::Delete { name } => {
            store.delete(&name)?;
            println!("Snippet '{}' deleted", name);
            Ok(())
        }
        Commands::Search { query } => print_snippets(store, &query),
        Commands::List => print_snippets(store, ""),
        Commands::Slots => print_slots(store),
        Commands::Assign { slot, name } => {
            let slot: Slot = slot.parse()?;
            if name.eq_ignore_ascii_case("none") {
                store.assign(slot, None)?;
                println!("Slot {} cleared", slot);
            } else {
                store.assign(slot, Some(&name))?;
                println!("Slot {} -> {}", slot, name);
            }
            Ok(())
        }
        Commands::Paste { slot, delay_ms } => handle_paste(store, slot.parse()?, delay_ms),
        Commands::Capture { name, delay_ms } => handle_capture(store, name.as_deref(), delay_ms),
        Commands::Sync => {
            let cleared = store.sync_hotkeys()?;
            if cleared.is_empty() {
                println!("All slots point at existing snippets");
            }
            for (slot, name) in cleared {
                println!("Slot {} cleared (snippet '{}' no longer exists)", slot, name);
            }
            Ok(())
        }
        Commands::Select => handle_select(store),
        Commands::Listen => run_listener(system_dispatcher(store)?),
        Commands::Status => print_status(store),
        Commands::Logout => {
            let report = logout(store)?;
            if report.is_empty() {
                println!("No session to close");
            } else {
                println!("Session closed");
            }
            Ok(())
        }
    }
}

fn system_dispatcher(store: &SnippetStore) -> Result<Dispatcher<SystemClipboard, EnigoKeys>> {
    let clipboard = SystemClipboard::new()?;
    let keys = EnigoKeys::new(Duration::from_millis(10))?;
    Ok(Dispatcher::new(store.clone(), clipboard, keys))
}

fn handle_update(
    store: &SnippetStore,
    name: &str,
    new_name: Option<String>,
    code: Option<String>,
) -> Result<()> {
    let current = store
        .get(name)?
        .ok_or_else(|| KlipError::NotFound(name.to_string()))?;
    let new_name = new_name.unwrap_or(current.name);
    let code = code.unwrap_or(current.code);

    store.update(name, &new_name, &code)?;
    println!("Snippet '{}' updated", new_name);
    Ok(())
}

fn handle_paste(store: &SnippetStore, slot: Slot, delay_ms: u64) -> Result<()> {
    if store.resolve_slot(slot)?.is_none() {
        return Err(KlipError::Other(format!(
            "Number {}: No snippet assigned",
            slot
        )));
    }
    thread::sleep(Duration::from_millis(delay_ms));

    // Stay alive briefly after the shortcut so the target can read the clipboard
    let mut dispatcher =
        system_dispatcher(store)?.with_timings(PasteTimings::one_shot(), CaptureSettings::default());
    if let Some(name) = dispatcher.fire_slot(slot)? {
        println!("Snippet '{}' pasted", name);
    }
    Ok(())
}

fn handle_capture(store: &SnippetStore, name: Option<&str>, delay_ms: u64) -> Result<()> {
    thread::sleep(Duration::from_millis(delay_ms));

    let mut dispatcher = system_dispatcher(store)?;
    let saved = dispatcher.save_selection(name)?;
    match saved.slot {
        Some(slot) => println!("Saved '{}' on slot {}", saved.snippet.name, slot),
        None => println!("Saved '{}' (no free slot)", saved.snippet.name),
    }
    Ok(())
}

/// Pick a snippet and put it on the clipboard.
///
/// On X11 and Wayland the text is served by this process, so the command
/// keeps running until something else is copied.
fn handle_select(store: &SnippetStore) -> Result<()> {
    let Some(snippet) = run_selector(store)? else {
        return Ok(());
    };
    if OWNED_BY_PROCESS {
        println!(
            "Snippet '{}' is on the clipboard until something else is copied (Ctrl+C to stop)",
            snippet.name
        );
        set_clipboard_text(&snippet.code)?;
    } else {
        set_clipboard_text(&snippet.code)?;
        println!("Snippet '{}' copied to clipboard", snippet.name);
    }
    Ok(())
}

fn print_snippets(store: &SnippetStore, query: &str) -> Result<()> {
    let snippets = store.search(query)?;
    if snippets.is_empty() {
        if query.is_empty() {
            println!("No snippets yet. Add one with: klip add --name <name> --code <text>");
        } else {
            println!("No snippets match '{}'", query);
        }
        return Ok(());
    }

    let hotkeys = store.hotkeys();
    for snippet in snippets {
        let label = match hotkeys.slot_of(&snippet.name) {
            Some(slot) => format!("[{}]", slot),
            None => "   ".to_string(),
        };
        println!(
            "{} {}  -  {}",
            label,
            snippet.name,
            snippet.preview(LIST_PREVIEW_LEN)
        );
    }
    Ok(())
}

fn print_slots(store: &SnippetStore) -> Result<()> {
    for (slot, name) in store.hotkeys().iter() {
        match name {
            Some(name) => println!("{}: {}", slot, shorten(name, SLOT_NAME_LEN)),
            None => println!("{}: (not assigned)", slot),
        }
    }
    Ok(())
}

fn print_status(store: &SnippetStore) -> Result<()> {
    let config = store.load_config();
    println!("Data directory: {}", store.dir().display());
    println!("Snippets: {} ({:?} tier)", store.limit_info()?, config.tier);
    println!("Slots assigned: {}/10", config.hotkeys.assigned_count());
    match Session::load(store.dir()) {
        Some(session) => match session.saved_at {
            Some(at) => println!("Session: cached (saved {})", at),
            None => println!("Session: cached"),
        },
        None => println!("Session: none"),
    }
    Ok(())
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str("...");
    cut
}
