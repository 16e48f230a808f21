use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::naming::compose;

/// Extension as stored in an allow-list: trimmed, no leading dot, lowercase.
pub fn normalize_extension(raw: &str) -> String {
    let t = raw.trim();
    t.strip_prefix('.').unwrap_or(t).to_lowercase()
}

/// One emulator save root and the file extensions that count as saves there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatorProfile<H> {
    pub id: String,
    pub name: String,
    pub root: H,
    pub extensions: BTreeSet<String>,
}

impl<H> EmulatorProfile<H> {
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, root: H, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        EmulatorProfile { id: id.into(), name: name.into(), root, extensions }
    }

    pub fn allows(&self, extension: &str) -> bool {
        self.extensions.contains(&extension.to_lowercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile<H> {
    pub handle: H,
    pub filename: String,
    pub modified_at: Option<DateTime<Utc>>,
}

impl<H> SaveFile<H> {
    pub fn modified_label(&self) -> String {
        match self.modified_at {
            Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            None => "Unknown".to_string(),
        }
    }
}

/// Identity of a game group across scans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameKey {
    pub emulator_id: String,
    pub relative_dir: String,
    pub base_name: String,
    pub extension: String,
}

impl GameKey {
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.emulator_id, self.relative_dir, self.base_name, self.extension
        )
    }
}

/// Base save plus per-owner variants sharing emulator, folder, base name and
/// extension. Rebuilt from scratch on every scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameGroup<H> {
    pub key: GameKey,
    pub emulator_name: String,
    pub directory: H,
    pub base_save: Option<SaveFile<H>>,
    pub variant_saves: BTreeMap<String, SaveFile<H>>,
}

impl<H> GameGroup<H> {
    pub fn id(&self) -> String {
        self.key.id()
    }

    pub fn display_name(&self) -> &str {
        &self.key.base_name
    }

    pub fn base_filename(&self) -> String {
        compose(&self.key.base_name, &self.key.extension, None)
    }

    pub fn variant_filename(&self, owner: &str) -> String {
        compose(&self.key.base_name, &self.key.extension, Some(owner))
    }

    pub fn has_saves(&self) -> bool {
        self.base_save.is_some() || !self.variant_saves.is_empty()
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.variant_saves.keys().map(String::as_str)
    }
}

/// Result of one switch, export or import. Callers persist it as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchOutcome {
    pub succeeded: bool,
    pub message: String,
}

impl SwitchOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        SwitchOutcome { succeeded: true, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        SwitchOutcome { succeeded: false, message: message.into() }
    }
}

impl fmt::Display for SwitchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Read-only view of what a switch to `target_owner` would find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchPreview {
    pub base_exists: bool,
    pub base_modified_at: Option<DateTime<Utc>>,
    pub target_owner: String,
    pub target_variant_exists: bool,
    pub target_modified_at: Option<DateTime<Utc>>,
}
