//! Cached identity record ("am I logged in").

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Error type for identity cache operations.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for identity cache operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Who the client believes is logged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Application role (teacher, parent, admin).
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl IdentityRecord {
    /// Build a record from an identity check payload.
    ///
    /// Accepts the user object directly or wrapped in `{"user": …}`, with
    /// the id as a string or a number. Returns `None` without an id.
    pub fn from_profile(profile: &Value) -> Option<Self> {
        let user = profile.get("user").unwrap_or(profile);

        let user_id = match user.get("id")? {
            Value::String(id) if !id.is_empty() => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => return None,
        };

        let text = |key: &str| {
            user.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            user_id,
            email: text("email"),
            role: text("role"),
            display_name: text("displayName").or_else(|| text("name")),
            cached_at: Utc::now(),
        })
    }
}

/// Storage for the cached identity record.
pub trait IdentityCache: Send + Sync {
    fn load(&self) -> IdentityResult<Option<IdentityRecord>>;

    fn store(&self, record: &IdentityRecord) -> IdentityResult<()>;

    /// Remove the record. Clearing an empty cache is not an error.
    fn clear(&self) -> IdentityResult<()>;
}

/// Process-local identity cache.
#[derive(Default)]
pub struct MemoryIdentityCache {
    record: RwLock<Option<IdentityRecord>>,
}

impl MemoryIdentityCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityCache for MemoryIdentityCache {
    fn load(&self) -> IdentityResult<Option<IdentityRecord>> {
        Ok(self.record.read().clone())
    }

    fn store(&self, record: &IdentityRecord) -> IdentityResult<()> {
        *self.record.write() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> IdentityResult<()> {
        *self.record.write() = None;
        Ok(())
    }
}

/// Identity cache persisted as a JSON file.
pub struct FileIdentityCache {
    path: PathBuf,
}

impl FileIdentityCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl IdentityCache for FileIdentityCache {
    fn load(&self) -> IdentityResult<Option<IdentityRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn store(&self, record: &IdentityRecord) -> IdentityResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "Identity record written");
        Ok(())
    }

    fn clear(&self) -> IdentityResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
