use crate::error::Result;
use crate::slots::HotkeySlots;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "KLIP_HOME";
pub const LOG_ENV: &str = "KLIP_LOG";
pub const SNIPPETS_FILENAME: &str = "sql_snippets.json";
pub const CONFIG_FILENAME: &str = "config.json";
pub const SESSION_FILENAME: &str = "session.json";
pub const CREDENTIALS_FILENAME: &str = "credentials.json";

pub const MAX_SNIPPETS_FREE: usize = 3;
pub const MAX_SNIPPETS_PREMIUM: usize = 50;

/// Get the klip data directory
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = env::var(HOME_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".klip"))
        .unwrap_or_else(|_| PathBuf::from(".klip"))
}

/// Ensure the data directory exists
pub fn ensure_config_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        tracing::debug!("creating data directory at {}", dir.display());
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

impl Tier {
    pub fn max_snippets(self) -> usize {
        match self {
            Tier::Free => MAX_SNIPPETS_FREE,
            Tier::Premium => MAX_SNIPPETS_PREMIUM,
        }
    }

    /// Read a tier from any JSON value; anything but "premium" is free
    pub fn from_value(value: &Value) -> Tier {
        match value.as_str() {
            Some(tier) if tier.trim().eq_ignore_ascii_case("premium") => Tier::Premium,
            _ => Tier::Free,
        }
    }
}

impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Tier::from_value(&Value::deserialize(deserializer)?))
    }
}

/// Contents of `config.json`.
///
/// Keys this crate does not manage (cached login, remote service keys) are
/// carried in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppConfig {
    pub hotkeys: HotkeySlots,
    pub tier: Tier,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConfig {
    /// Remove cached login credentials, returning whether any were present
    pub fn forget_credentials(&mut self) -> bool {
        let email = self.extra.remove("email").is_some();
        let password = self.extra.remove("password").is_some();
        email || password
    }
}

/// Any JSON object is a config: `hotkeys` and `tier` are read leniently and
/// everything else lands in `extra`.
impl From<Map<String, Value>> for AppConfig {
    fn from(mut map: Map<String, Value>) -> Self {
        let hotkeys = map
            .remove("hotkeys")
            .map(|v| HotkeySlots::from_value(&v))
            .unwrap_or_default();
        let tier = map
            .remove("tier")
            .map(|v| Tier::from_value(&v))
            .unwrap_or_default();
        Self {
            hotkeys,
            tier,
            extra: map,
        }
    }
}

impl<'de> Deserialize<'de> for AppConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Map::deserialize(deserializer)?.into())
    }
}
