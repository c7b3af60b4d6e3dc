//! Session storage in `<base>/session.json`.
//!
//! The document is a JSON object; the session lives under [`SESSION_KEY`]
//! and any other keys are left untouched. Written atomically with
//! restricted permissions (0600) on unix. A document that no longer parses
//! fails reads but is replaced by the next write.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use super::{SESSION_KEY, Session, SessionStore};
use crate::config::paths;

type SessionDocument = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$MAMATRAK_HOME/session.json`.
    pub fn default_location() -> Self {
        Self::new(paths::session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        fs::read_to_string(&self.path)
            .map(Some)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))
    }

    fn load(&self) -> Result<SessionDocument> {
        let Some(contents) = self.read()? else {
            return Ok(SessionDocument::new());
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    /// Loads the document about to be rewritten. `None` means the file exists
    /// but is not a JSON object; it gets replaced wholesale.
    fn load_for_write(&self) -> Result<Option<SessionDocument>> {
        let Some(contents) = self.read()? else {
            return Ok(Some(SessionDocument::new()));
        };

        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(Some(doc)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "discarding unreadable session document"
                );
                Ok(None)
            }
        }
    }

    /// Writes the document atomically (temp file + rename).
    fn save(&self, doc: &SessionDocument) -> Result<()> {
        let path = &self.path;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(doc).context("Failed to serialize session document")?;

        let tmp_path = path.with_extension("json.tmp");

        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            // A leftover temp file keeps its old mode.
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
            file.sync_all()
                .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&tmp_path, contents)
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<Session>> {
        let mut doc = self.load()?;
        doc.remove(SESSION_KEY)
            .map(|value| {
                serde_json::from_value(value).with_context(|| {
                    format!("Malformed session in {}", self.path.display())
                })
            })
            .transpose()
    }

    fn set(&self, session: &Session) -> Result<()> {
        let mut doc = self.load_for_write()?.unwrap_or_default();
        let value = serde_json::to_value(session).context("Failed to serialize session")?;
        doc.insert(SESSION_KEY.to_string(), value);
        self.save(&doc)
    }

    fn clear(&self) -> Result<bool> {
        let Some(mut doc) = self.load_for_write()? else {
            self.save(&SessionDocument::new())?;
            return Ok(true);
        };
        if doc.remove(SESSION_KEY).is_none() {
            return Ok(false);
        }
        self.save(&doc)?;
        Ok(true)
    }
}
