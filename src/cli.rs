use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "klip - save text snippets and paste them back with numbered hotkeys",
    long_about = "klip stores named snippets in a local JSON file and binds them to \
                  ten slots. Shift+1..9,0 pastes a slot; Alt+1 saves the current selection."
)]
pub struct Klip {
    #[clap(subcommand)]
    pub commands: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new snippet; it takes the first free slot
    Add {
        #[clap(long, short = 'n', help = "Name of the snippet")]
        name: String,

        #[clap(long, short = 'c', help = "The snippet text")]
        code: String,
    },
    /// Rename and/or change an existing snippet
    Update {
        #[clap(long, short = 'n', help = "Current name of the snippet")]
        name: String,

        #[clap(long = "new-name", short = 'r', help = "New name (defaults to the current one)")]
        new_name: Option<String>,

        #[clap(long, short = 'c', help = "New snippet text (defaults to the current one)")]
        code: Option<String>,
    },
    /// Delete a snippet and free its slot
    Delete {
        #[clap(long, short = 'n', help = "Name of the snippet to delete")]
        name: String,
    },
    /// Search snippet names and contents, ignoring case
    Search {
        #[clap(help = "Text to look for")]
        query: String,
    },
    /// List every snippet
    List,
    /// Show the ten hotkey slots
    Slots,
    /// Point a slot at a snippet, or clear it with "none"
    Assign {
        #[clap(help = "Slot digit 0-9")]
        slot: String,

        #[clap(help = "Snippet name, or \"none\" to clear")]
        name: String,
    },
    /// Paste a slot's snippet into the focused application
    Paste {
        #[clap(help = "Slot digit 0-9")]
        slot: String,

        #[clap(long, short = 'd', default_value = "1500", help = "Delay in ms to switch focus first")]
        delay_ms: u64,
    },
    /// Save the current selection of the focused application as a snippet
    Capture {
        #[clap(long, short = 'n', help = "Name for the snippet (derived from the text if omitted)")]
        name: Option<String>,

        #[clap(long, short = 'd', default_value = "1500", help = "Delay in ms to switch focus first")]
        delay_ms: u64,
    },
    /// Clear slots pointing at snippets that no longer exist
    Sync,
    /// Open the quick selector and copy the chosen snippet
    Select,
    /// Listen for the global hotkeys until interrupted
    Listen,
    /// Show snippet usage, slot usage and session state
    Status,
    /// Forget the cached session and login
    Logout,
}
