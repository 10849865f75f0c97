use crate::config::{
    ensure_config_dir, get_config_dir, AppConfig, CONFIG_FILENAME, SNIPPETS_FILENAME,
};
use crate::error::{KlipError, Result};
use crate::models::{Snippet, SnippetMap};
use crate::slots::{HotkeySlots, Slot};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Snippet file plus the hotkey config that references it.
///
/// Every call re-reads the files, so edits made by another process or by hand
/// are picked up on the next operation.
#[derive(Debug, Clone)]
pub struct SnippetStore {
    dir: PathBuf,
}

impl SnippetStore {
    /// Store rooted at the default data directory
    pub fn open_default() -> Result<Self> {
        let dir = get_config_dir();
        ensure_config_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snippets_path(&self) -> PathBuf {
        self.dir.join(SNIPPETS_FILENAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILENAME)
    }

    /// Load all snippets. A missing or empty file is an empty store.
    pub fn load_snippets(&self) -> Result<SnippetMap> {
        let path = self.snippets_path();
        if !path.exists() {
            return Ok(SnippetMap::new());
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(SnippetMap::new());
        }

        let value: serde_json::Value = serde_json::from_str(&content)?;
        if !value.is_object() {
            tracing::warn!(
                "{} does not hold a JSON object, treating it as empty",
                path.display()
            );
            return Ok(SnippetMap::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn save_snippets(&self, snippets: &SnippetMap) -> Result<()> {
        write_json_atomic(&self.snippets_path(), snippets)
    }

    /// Load `config.json` for display, falling back to defaults on any error
    pub fn load_config(&self) -> AppConfig {
        self.read_config().unwrap_or_else(|e| {
            tracing::warn!("could not read {}: {}", self.config_path().display(), e);
            AppConfig::default()
        })
    }

    /// Load `config.json` ahead of rewriting it.
    ///
    /// Any JSON object is kept, foreign keys included. Only a file that holds
    /// no JSON object at all is replaced by defaults; I/O errors are returned.
    pub(crate) fn read_config(&self) -> Result<AppConfig> {
        let path = self.config_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map.into()),
            Ok(_) => {
                tracing::warn!(
                    "{} does not hold a JSON object, using defaults",
                    path.display()
                );
                Ok(AppConfig::default())
            }
            Err(e) => {
                tracing::warn!("ignoring unreadable {}: {}", path.display(), e);
                Ok(AppConfig::default())
            }
        }
    }

    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        write_json_atomic(&self.config_path(), config)
    }

    pub fn hotkeys(&self) -> HotkeySlots {
        self.load_config().hotkeys
    }

    pub fn limit(&self) -> usize {
        self.load_config().tier.max_snippets()
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.load_snippets()?.len())
    }

    /// Usage against the cap, e.g. `2/3`
    pub fn limit_info(&self) -> Result<String> {
        Ok(format!("{}/{}", self.count()?, self.limit()))
    }

    pub fn can_add_more(&self) -> Result<bool> {
        Ok(self.count()? < self.limit())
    }

    /// Add a snippet and give it the first free hotkey slot.
    ///
    /// Returns the slot it landed in, or `None` when all ten are taken.
    pub fn add(&self, name: &str, code: &str) -> Result<Option<Slot>> {
        if name.trim().is_empty() || code.trim().is_empty() {
            return Err(KlipError::MissingFields);
        }

        let mut snippets = self.load_snippets()?;
        let max = self.limit();
        if snippets.len() >= max {
            return Err(KlipError::LimitReached {
                count: snippets.len(),
                max,
            });
        }
        if snippets.contains_key(name) {
            return Err(KlipError::AlreadyExists(name.to_string()));
        }

        let mut config = self.read_config()?;
        snippets.insert(name.to_string(), code.to_string());
        self.save_snippets(&snippets)?;

        let slot = config.hotkeys.assign_next(name);
        match slot {
            Some(slot) => {
                self.save_config(&config)?;
                tracing::info!("snippet '{}' assigned to slot {}", name, slot);
            }
            None => tracing::warn!("no free slot left for snippet '{}'", name),
        }
        Ok(slot)
    }

    /// Rename and/or recode a snippet. Slots follow the rename.
    pub fn update(&self, old_name: &str, new_name: &str, new_code: &str) -> Result<()> {
        if new_name.trim().is_empty() || new_code.trim().is_empty() {
            return Err(KlipError::MissingFields);
        }

        let mut snippets = self.load_snippets()?;
        if !snippets.contains_key(old_name) {
            return Err(KlipError::NotFound(old_name.to_string()));
        }
        if new_name != old_name && snippets.contains_key(new_name) {
            return Err(KlipError::AlreadyExists(new_name.to_string()));
        }

        // Only slots that resolve to this snippet move with it
        let mut config = self.read_config()?;
        let moved = if new_name != old_name {
            config.hotkeys.repoint_where(new_name, |value| {
                resolve_name(&snippets, value) == Some(old_name)
            })
        } else {
            Vec::new()
        };

        snippets.remove(old_name);
        snippets.insert(new_name.to_string(), new_code.to_string());
        self.save_snippets(&snippets)?;

        if !moved.is_empty() {
            self.save_config(&config)?;
        }
        Ok(())
    }

    /// Delete a snippet and clear any slot pointing at it
    pub fn delete(&self, name: &str) -> Result<Vec<Slot>> {
        let mut snippets = self.load_snippets()?;
        if !snippets.contains_key(name) {
            return Err(KlipError::NotFound(name.to_string()));
        }

        let mut config = self.read_config()?;
        let cleared = config
            .hotkeys
            .clear_where(|value| resolve_name(&snippets, value) == Some(name));

        snippets.remove(name);
        self.save_snippets(&snippets)?;

        if !cleared.is_empty() {
            self.save_config(&config)?;
            tracing::info!("removed slot assignment of '{}'", name);
        }
        Ok(cleared)
    }

    /// Snippets whose name or code contains `query`, ignoring case.
    /// An empty query returns everything. Sorted by lowercase name.
    pub fn search(&self, query: &str) -> Result<Vec<Snippet>> {
        let snippets = self.load_snippets()?;
        let needle = query.to_lowercase();

        let mut results: Vec<Snippet> = snippets
            .into_iter()
            .map(|(name, code)| Snippet { name, code })
            .filter(|s| needle.is_empty() || s.matches(&needle))
            .collect();

        results.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(results)
    }

    pub fn get(&self, name: &str) -> Result<Option<Snippet>> {
        Ok(self
            .load_snippets()?
            .remove_entry(name)
            .map(|(name, code)| Snippet { name, code }))
    }

    /// Exact match first, then the first case-insensitive match by name order
    pub fn find_case_insensitive(&self, name: &str) -> Result<Option<Snippet>> {
        let mut snippets = self.load_snippets()?;
        let Some(key) = resolve_name(&snippets, name).map(str::to_string) else {
            return Ok(None);
        };
        Ok(snippets
            .remove_entry(&key)
            .map(|(name, code)| Snippet { name, code }))
    }

    /// The snippet a slot refers to, if it is assigned and still exists
    pub fn resolve_slot(&self, slot: Slot) -> Result<Option<Snippet>> {
        let hotkeys = self.hotkeys();
        match hotkeys.get(slot) {
            Some(name) => self.find_case_insensitive(name),
            None => Ok(None),
        }
    }

    /// Point `slot` at a snippet, or clear it with `None`
    pub fn assign(&self, slot: Slot, name: Option<&str>) -> Result<()> {
        let mut config = self.read_config()?;
        match name {
            Some(name) => {
                let snippet = self
                    .find_case_insensitive(name)?
                    .ok_or_else(|| KlipError::NotFound(name.to_string()))?;
                config.hotkeys.set(slot, Some(snippet.name));
            }
            None => config.hotkeys.clear(slot),
        }
        self.save_config(&config)
    }

    /// Clear slots whose snippet no longer exists.
    ///
    /// Returns what was cleared; the config is only rewritten on change.
    pub fn sync_hotkeys(&self) -> Result<Vec<(Slot, String)>> {
        let snippets = self.load_snippets()?;
        let mut config = self.read_config()?;
        let cleared = config.hotkeys.retain_existing(snippets.keys());

        if !cleared.is_empty() {
            for (slot, name) in &cleared {
                tracing::warn!("clearing stale assignment of slot {} to '{}'", slot, name);
            }
            self.save_config(&config)?;
        }
        Ok(cleared)
    }
}

/// The key a slot value refers to: the exact name, else the first
/// case-insensitive match in name order
fn resolve_name<'a>(snippets: &'a SnippetMap, name: &str) -> Option<&'a str> {
    if let Some((key, _)) = snippets.get_key_value(name) {
        return Some(key.as_str());
    }
    let target = name.to_lowercase();
    snippets
        .keys()
        .find(|key| key.to_lowercase() == target)
        .map(String::as_str)
}

/// Serialize `value` next to `path` and rename it into place
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_config_dir(&parent)?;

    let mut file = NamedTempFile::new_in(&parent)?;
    {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(file.as_file_mut(), formatter);
        value.serialize(&mut ser)?;
    }
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path)?;
    Ok(())
}
