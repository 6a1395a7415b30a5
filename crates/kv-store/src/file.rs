//! JSON file store backend
//!
//! Keeps the whole map in memory and persists it to a single JSON file after
//! every mutation. All writes use atomic temp-file + rename to prevent
//! corruption on crash, and the file is created 0600 because it holds OAuth
//! tokens. A tokio Mutex serializes concurrent writers.
//!
//! Mutations are staged on a copy of the map; the in-memory view only
//! changes once the file write has succeeded, so memory never claims a
//! value that disk doesn't have (or vice versa).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::{KvStore, StoreFuture};

/// A stored value. `expires` is a unix timestamp in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires: Option<u64>,
}

impl Entry {
    fn is_expired(&self, now_millis: u64) -> bool {
        self.expires.is_some_and(|at| at <= now_millis)
    }
}

/// Durable key-value store backed by one JSON file.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, Entry>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// If the file doesn't exist, creates it as `{}`.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading store file: {e}")))?;
            let entries: HashMap<String, Entry> = serde_json::from_str(&contents)
                .map_err(|e| Error::Serialization(format!("parsing store file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "opened store file");
            entries
        } else {
            info!(path = %path.display(), "store file not found, starting empty");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for FileStore {
    fn backend(&self) -> &str {
        "file"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries
                .get(key)
                .filter(|e| !e.is_expired(now_millis()))
                .map(|e| e.value.clone()))
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let now = now_millis();
            let mut entries = self.entries.lock().await;
            let mut next = entries.clone();
            next.retain(|_, e| !e.is_expired(now));
            next.insert(
                key.to_owned(),
                Entry {
                    value,
                    expires: ttl.map(|ttl| now + ttl.as_millis() as u64),
                },
            );
            write_atomic(&self.path, &next).await?;
            *entries = next;
            debug!(key, "stored value");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            if !entries.contains_key(key) {
                return Ok(());
            }
            let mut next = entries.clone();
            next.remove(key);
            write_atomic(&self.path, &next).await?;
            *entries = next;
            debug!(key, "deleted value");
            Ok(())
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Write the map to `path` via a sibling temp file and rename, mode 0600.
async fn write_atomic(path: &Path, entries: &HashMap<String, Entry>) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| Error::Serialization(format!("serializing store: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("store path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".kv-store.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp store file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting store file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted store");
    Ok(())
}
