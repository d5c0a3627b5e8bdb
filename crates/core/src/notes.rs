//! Per-lesson free-text notes, persisted as a flat key-value JSON file
//! under the user data directory. Read on load, written on save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::Result;

pub struct NotesStore {
    path: PathBuf,
    notes: BTreeMap<String, String>,
}

/// Default location of the notes file.
pub fn default_notes_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("kurs")
        .join("notes.json")
}

impl NotesStore {
    /// Load the store, starting empty when the file does not exist yet.
    pub async fn load(path: &Path) -> Result<Self> {
        let notes = match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            notes,
        })
    }

    pub fn get(&self, lesson_id: &str) -> Option<&str> {
        self.notes.get(lesson_id).map(String::as_str)
    }

    pub fn set(&mut self, lesson_id: &str, text: &str) {
        if text.trim().is_empty() {
            self.notes.remove(lesson_id);
        } else {
            self.notes.insert(lesson_id.to_string(), text.to_string());
        }
    }

    pub fn remove(&mut self, lesson_id: &str) -> Option<String> {
        self.notes.remove(lesson_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.notes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let pretty_json = serde_json::to_string_pretty(&self.notes)?;
        fs::write(&self.path, &pretty_json).await?;
        Ok(())
    }
}
