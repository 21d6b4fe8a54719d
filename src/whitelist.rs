use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Flat JSON file holding the chat ids allowed to query the bot.
///
/// Known limitation: there is no locking and no atomic replace. Two handlers
/// doing read-modify-write at the same time race, and the last writer wins.
#[derive(Debug, Clone)]
pub struct WhitelistStore {
    path: PathBuf,
}

/// Entries are usually strings; anything else in the array is kept as-is
/// and matched by its JSON text (`42` matches `"42"`).
fn entry_id(entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl WhitelistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Raw array entries. A missing file is an empty list; an unreadable file
    /// or anything other than a JSON array is an error.
    async fn read_entries(&self) -> Result<Vec<Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read whitelist: {}", self.path.display()))
            }
        };

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse whitelist: {}", self.path.display()))
    }

    async fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write whitelist: {}", self.path.display()))
    }

    /// Returns the stored ids. A missing, unreadable or malformed file all
    /// yield an empty list; the cause is only logged.
    pub async fn load(&self) -> Vec<String> {
        match self.read_entries().await {
            Ok(entries) => entries.iter().map(entry_id).collect(),
            Err(e) => {
                warn!("{:#}", e);
                Vec::new()
            }
        }
    }

    /// Overwrites the file with the full list.
    pub async fn save(&self, ids: &[String]) -> Result<()> {
        self.write_json(ids).await
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.load().await.iter().any(|known| known == id)
    }

    /// Appends `id` and persists the whole list. Does not check for duplicates.
    /// Existing entries are written back untouched. Fails without writing when
    /// the current file cannot be read or parsed, so a damaged list is never
    /// replaced by a one-entry list.
    pub async fn register(&self, id: &str) -> Result<()> {
        let mut entries = self
            .read_entries()
            .await
            .context("Not overwriting existing whitelist")?;
        entries.push(Value::String(id.to_string()));
        self.write_json(&entries).await?;
        debug!("Registered {} ({} entries)", id, entries.len());
        Ok(())
    }
}
