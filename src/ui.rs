use crate::error::Result;
use crate::models::Snippet;
use crate::slots::{HotkeySlots, Slot};
use crate::storage::SnippetStore;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};
use std::io::{self, stdout};

const PREVIEW_LEN: usize = 80;

#[derive(Debug, PartialEq, Eq)]
pub enum SelectorOutcome {
    Continue,
    Chosen(Snippet),
    Cancelled,
}

/// Search box, filtered list and slot labels of the quick selector
#[derive(Debug)]
pub struct SelectorState {
    pub query: String,
    pub results: Vec<Snippet>,
    pub slots: HotkeySlots,
    pub selected: usize,
    /// First result drawn, so the selection stays in view
    pub offset: usize,
    pub message: Option<String>,
    pub limit_info: String,
}

impl SelectorState {
    pub fn load(store: &SnippetStore) -> Result<Self> {
        let mut state = Self {
            query: String::new(),
            results: Vec::new(),
            slots: HotkeySlots::default(),
            selected: 0,
            offset: 0,
            message: None,
            limit_info: String::new(),
        };
        state.refresh(store)?;
        Ok(state)
    }

    fn refresh(&mut self, store: &SnippetStore) -> Result<()> {
        self.results = store.search(&self.query)?;
        self.slots = store.hotkeys();
        self.limit_info = store.limit_info()?;
        if self.selected >= self.results.len() {
            self.selected = self.results.len().saturating_sub(1);
        }
        Ok(())
    }

    pub fn handle_key(&mut self, store: &SnippetStore, key: KeyEvent) -> Result<SelectorOutcome> {
        self.message = None;

        match key.code {
            KeyCode::Esc => return Ok(SelectorOutcome::Cancelled),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(SelectorOutcome::Cancelled)
            }
            KeyCode::Enter => {
                if let Some(snippet) = self.results.get(self.selected) {
                    return Ok(SelectorOutcome::Chosen(snippet.clone()));
                }
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < self.results.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char(c) if c.is_ascii_digit() && self.query.is_empty() => {
                let digit = c as u8 - b'0';
                if let Some(slot) = Slot::new(digit) {
                    match store.resolve_slot(slot)? {
                        Some(snippet) => return Ok(SelectorOutcome::Chosen(snippet)),
                        None => {
                            self.message = Some(format!("Number {}: No snippet assigned", slot))
                        }
                    }
                }
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.selected = 0;
                self.refresh(store)?;
            }
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.selected = 0;
                    self.refresh(store)?;
                }
            }
            _ => {}
        }

        Ok(SelectorOutcome::Continue)
    }

    /// Move the window of `visible` rows so it contains the selection
    pub fn scroll_to_selection(&mut self, visible: usize) {
        let visible = visible.max(1);
        if self.selected >= self.offset + visible {
            self.offset = self.selected + 1 - visible;
        } else if self.selected < self.offset {
            self.offset = self.selected;
        }
    }

    fn list_items(&self, visible: usize) -> Vec<ListItem<'static>> {
        self.results
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(visible)
            .map(|(i, snippet)| {
                let slot_label = match self.slots.slot_of(&snippet.name) {
                    Some(slot) => format!("[{}] ", slot),
                    None => "    ".to_string(),
                };
                let highlight_symbol = if i == self.selected {
                    Span::styled(
                        "> ",
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };

                let line = Line::from(vec![
                    highlight_symbol,
                    Span::styled(slot_label, Style::default().fg(Color::Yellow)),
                    Span::styled(snippet.name.clone(), Style::default().fg(Color::Red)),
                    Span::raw("  "),
                    Span::styled(snippet.preview(PREVIEW_LEN), Style::default().fg(Color::White)),
                ]);

                if i == self.selected {
                    ListItem::new(line).style(Style::default().bg(Color::DarkGray))
                } else {
                    ListItem::new(line)
                }
            })
            .collect()
    }
}

/// Display the quick selector and return the chosen snippet
pub fn run_selector(store: &SnippetStore) -> Result<Option<Snippet>> {
    let mut state = SelectorState::load(store)?;

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let result = match Terminal::new(backend) {
        Ok(mut terminal) => run_ui(&mut terminal, store, &mut state),
        Err(e) => Err(e.into()),
    };

    // Clean up terminal
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;

    result
}

fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    store: &SnippetStore,
    state: &mut SelectorState,
) -> Result<Option<Snippet>> {
    loop {
        terminal.draw(|f| {
            let size = f.size();
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(3),
                        Constraint::Length(3),
                    ]
                    .as_ref(),
                )
                .split(size);

            let search = Paragraph::new(Line::from(vec![
                Span::styled("Search: ", Style::default().fg(Color::Yellow)),
                Span::raw(state.query.clone()),
            ]))
            .block(Block::default().borders(Borders::ALL).title(" klip "));

            // Account for borders
            let visible = layout[1].height.saturating_sub(2) as usize;
            state.scroll_to_selection(visible);

            let title = format!(" Snippets {} ", state.limit_info);
            let items = if state.results.is_empty() {
                vec![ListItem::new("  No snippets found")]
            } else {
                state.list_items(visible)
            };
            let list = List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .style(Style::default().bg(Color::Black).fg(Color::White)),
            );

            let help = match &state.message {
                Some(message) => Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(Color::Red),
                )),
                None => Line::from(vec![
                    Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
                    Span::raw(": Navigate  "),
                    Span::styled("0-9", Style::default().fg(Color::Yellow)),
                    Span::raw(": Pick slot  "),
                    Span::styled("Enter", Style::default().fg(Color::Yellow)),
                    Span::raw(": Copy  "),
                    Span::styled("Esc", Style::default().fg(Color::Yellow)),
                    Span::raw(": Exit"),
                ]),
            };
            let help_text = Paragraph::new(help)
                .block(Block::default().borders(Borders::TOP))
                .style(Style::default().bg(Color::Black));

            f.render_widget(search, layout[0]);
            f.render_widget(list, layout[1]);
            f.render_widget(help_text, layout[2]);
        })?;

        // Handle input
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.handle_key(store, key)? {
                SelectorOutcome::Continue => {}
                SelectorOutcome::Chosen(snippet) => return Ok(Some(snippet)),
                SelectorOutcome::Cancelled => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;
    use tempfile::TempDir;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn fixture() -> (TempDir, SnippetStore) {
        let dir = TempDir::new().unwrap();
        let store = SnippetStore::in_dir(dir.path());
        let mut config = store.load_config();
        config.tier = Tier::Premium;
        store.save_config(&config).unwrap();
        store.add("orders", "select * from orders").unwrap();
        store.add("users", "select * from users").unwrap();
        store.add("logs2", "delete from logs").unwrap();
        (dir, store)
    }

    #[test]
    fn typing_filters_and_enter_chooses() {
        let (_dir, store) = fixture();
        let mut state = SelectorState::load(&store).unwrap();
        assert_eq!(state.results.len(), 3);

        for c in "USE".chars() {
            state.handle_key(&store, press(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(state.results.len(), 1);
        let outcome = state.handle_key(&store, press(KeyCode::Enter)).unwrap();
        assert_eq!(
            outcome,
            SelectorOutcome::Chosen(Snippet::new("users", "select * from users"))
        );
    }

    #[test]
    fn digit_with_empty_query_picks_slot() {
        let (_dir, store) = fixture();
        let mut state = SelectorState::load(&store).unwrap();

        let outcome = state.handle_key(&store, press(KeyCode::Char('2'))).unwrap();
        assert_eq!(
            outcome,
            SelectorOutcome::Chosen(Snippet::new("users", "select * from users"))
        );

        let outcome = state.handle_key(&store, press(KeyCode::Char('7'))).unwrap();
        assert_eq!(outcome, SelectorOutcome::Continue);
        assert_eq!(state.message.as_deref(), Some("Number 7: No snippet assigned"));
    }

    #[test]
    fn digits_after_text_extend_the_query() {
        let (_dir, store) = fixture();
        let mut state = SelectorState::load(&store).unwrap();
        state.handle_key(&store, press(KeyCode::Char('s'))).unwrap();
        state.handle_key(&store, press(KeyCode::Char('2'))).unwrap();
        assert_eq!(state.query, "s2");
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].name, "logs2");

        state.handle_key(&store, press(KeyCode::Backspace)).unwrap();
        assert_eq!(state.query, "s");
    }

    #[test]
    fn navigation_stays_in_bounds_and_esc_cancels() {
        let (_dir, store) = fixture();
        let mut state = SelectorState::load(&store).unwrap();
        state.handle_key(&store, press(KeyCode::Up)).unwrap();
        assert_eq!(state.selected, 0);
        for _ in 0..5 {
            state.handle_key(&store, press(KeyCode::Down)).unwrap();
        }
        assert_eq!(state.selected, 2);
        assert_eq!(
            state.handle_key(&store, press(KeyCode::Esc)).unwrap(),
            SelectorOutcome::Cancelled
        );
    }

    #[test]
    fn scrolling_keeps_the_selection_visible() {
        let (_dir, store) = fixture();
        let mut state = SelectorState::load(&store).unwrap();

        state.handle_key(&store, press(KeyCode::Down)).unwrap();
        state.handle_key(&store, press(KeyCode::Down)).unwrap();
        state.scroll_to_selection(2);
        assert_eq!(state.offset, 1);
        assert_eq!(state.list_items(2).len(), 2);

        state.handle_key(&store, press(KeyCode::Up)).unwrap();
        state.handle_key(&store, press(KeyCode::Up)).unwrap();
        state.scroll_to_selection(2);
        assert_eq!(state.offset, 0);

        // a new query resets the selection to the top
        state.selected = 2;
        state.scroll_to_selection(1);
        state.handle_key(&store, press(KeyCode::Char('s'))).unwrap();
        state.scroll_to_selection(1);
        assert_eq!((state.selected, state.offset), (0, 0));
    }
}
