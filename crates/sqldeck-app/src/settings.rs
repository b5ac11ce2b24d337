//! Settings file and well-known locations

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("sqldeck"))
}

pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .context("Could not determine data directory")
        .map(|p| p.join("sqldeck"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    /// Tab session file; defaults to `<data dir>/session.json`
    pub session_file: Option<PathBuf>,
    /// Saved connections; defaults to `<data dir>/connections.json`
    pub connections_file: Option<PathBuf>,
    pub restore_session: bool,
    /// Title prefix of new editors ("Script 3")
    pub new_editor_name: String,
    /// Data source provider for new editors
    pub datasource_key: String,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            session_file: None,
            connections_file: None,
            restore_session: true,
            new_editor_name: "Script".to_string(),
            datasource_key: "memory".to_string(),
        }
    }
}

impl DeckSettings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    /// Read settings, falling back to defaults when the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("settings.json"))
    }

    pub fn session_file(&self) -> Result<PathBuf> {
        match &self.session_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("session.json")),
        }
    }

    pub fn connections_file(&self) -> Result<PathBuf> {
        match &self.connections_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("connections.json")),
        }
    }

    /// Data source snapshots live next to the session file
    pub fn data_sources_file(&self) -> Result<PathBuf> {
        Ok(self.session_dir()?.join("data_sources.json"))
    }

    /// Scripts of file-backed editors
    pub fn scripts_dir(&self) -> Result<PathBuf> {
        Ok(self.session_dir()?.join("scripts"))
    }

    fn session_dir(&self) -> Result<PathBuf> {
        let session_file = self.session_file()?;
        Ok(session_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }
}
