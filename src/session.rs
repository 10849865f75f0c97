use crate::config::{CREDENTIALS_FILENAME, SESSION_FILENAME};
use crate::error::Result;
use crate::storage::{write_json_atomic, SnippetStore};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cached login tokens, so a restart does not ask to sign in again.
///
/// The file is written by the account login flow, which lives outside this
/// crate; klip only reports it in `status` and removes it on `logout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            saved_at: None,
        }
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(SESSION_FILENAME)
    }

    /// The cached session, if there is a readable one
    pub fn load(dir: &Path) -> Option<Session> {
        let path = Self::path(dir);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("ignoring unreadable {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let mut stamped = self.clone();
        stamped.saved_at = Some(Local::now().to_rfc3339());
        write_json_atomic(&Self::path(dir), &stamped)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogoutReport {
    pub removed_files: Vec<PathBuf>,
    pub cleared_credentials: bool,
}

impl LogoutReport {
    pub fn is_empty(&self) -> bool {
        self.removed_files.is_empty() && !self.cleared_credentials
    }
}

/// Forget the cached session, the credentials file, and any login stored in
/// `config.json`
pub fn logout(store: &SnippetStore) -> Result<LogoutReport> {
    let mut report = LogoutReport::default();

    for path in [
        Session::path(store.dir()),
        store.dir().join(CREDENTIALS_FILENAME),
    ] {
        match fs::remove_file(&path) {
            Ok(()) => report.removed_files.push(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    let mut config = store.read_config()?;
    if config.forget_credentials() {
        store.save_config(&config)?;
        report.cleared_credentials = true;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip_with_timestamp() {
        let dir = TempDir::new().unwrap();
        assert!(Session::load(dir.path()).is_none());

        Session::new("access", "refresh").save(dir.path()).unwrap();
        let loaded = Session::load(dir.path()).unwrap();
        assert_eq!(loaded.access_token, "access");
        assert!(loaded.saved_at.is_some());
    }

    #[test]
    fn unreadable_session_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(Session::path(dir.path()), "{}").unwrap();
        assert!(Session::load(dir.path()).is_none());
    }

    #[test]
    fn logout_removes_files_and_cached_login() {
        let dir = TempDir::new().unwrap();
        let store = SnippetStore::in_dir(dir.path());
        Session::new("a", "r").save(dir.path()).unwrap();
        fs::write(dir.path().join(CREDENTIALS_FILENAME), "{}").unwrap();
        fs::write(
            store.config_path(),
            r#"{"email": "a@b.c", "password": "pw", "supabase_url": "u"}"#,
        )
        .unwrap();

        let report = logout(&store).unwrap();
        assert_eq!(report.removed_files.len(), 2);
        assert!(report.cleared_credentials);
        assert!(Session::load(dir.path()).is_none());
        let config = store.load_config();
        assert!(!config.extra.contains_key("email"));
        assert_eq!(config.extra["supabase_url"], "u");

        assert!(logout(&store).unwrap().is_empty());
    }
}
