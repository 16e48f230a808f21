use serde::Deserialize;
use ssw_core::EmulatorProfile;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "saveswitch.json";
pub const DEFAULT_HISTORY: &str = "saveswitch-history.jsonl";

#[derive(Debug, Deserialize)]
pub struct EmulatorConfig {
    pub id: String,
    pub name: String,
    pub root: PathBuf,
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub emulators: Vec<EmulatorConfig>,
    #[serde(default)]
    pub history: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<AppConfig, String> {
        let data = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        serde_json::from_str(&data).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn profiles(&self) -> Vec<EmulatorProfile<PathBuf>> {
        self.emulators
            .iter()
            .map(|e| EmulatorProfile::new(e.id.clone(), e.name.clone(), e.root.clone(), &e.extensions))
            .collect()
    }

    pub fn history_path(&self) -> PathBuf {
        self.history.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY))
    }
}
