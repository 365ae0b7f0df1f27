//! Application configuration management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Application configuration
///
/// Built once at startup and handed by reference to the components that
/// need it. Runtime changes go through [`SettingsBus`](super::settings::SettingsBus).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage settings
    pub storage: StorageConfig,
    /// Editor settings
    pub editor: EditorConfig,
    /// Autosave and draft retention settings
    pub autosave: AutosaveConfig,
    /// Preview rendering settings
    pub preview: PreviewSettings,
}

/// Color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Where documents and drafts are persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; `None` uses the platform data directory
    pub database_path: Option<PathBuf>,
}

/// Editor-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Color theme
    pub theme: Theme,
    /// Font size in pixels
    pub font_size: u32,
    /// Font family name
    pub font_family: String,
    /// Tab size in spaces
    pub tab_size: usize,
    /// Word wrap
    pub word_wrap: bool,
    /// Show the minimap
    pub show_minimap: bool,
}

/// Autosave settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Whether the background draft timer saves anything
    pub enabled: bool,
    /// Timer period in milliseconds
    pub interval_ms: u64,
    /// Drafts kept after a cleanup pass
    pub draft_retention: usize,
}

/// Preview rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// URL of the page hosting the preview, used to classify links
    pub base_url: String,
    /// Render soft line breaks as `<br />`
    pub breaks: bool,
    pub theme: Theme,
    pub show_line_numbers: bool,
    pub enable_scroll_sync: bool,
    /// Extra CSS injected by the presentation layer
    pub custom_css: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            font_size: 14,
            font_family: "JetBrains Mono".to_string(),
            tab_size: 2,
            word_wrap: true,
            show_minimap: true,
        }
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5000,
            draft_retention: 10,
        }
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/".to_string(),
            breaks: true,
            theme: Theme::Light,
            show_line_numbers: true,
            enable_scroll_sync: true,
            custom_css: String::new(),
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "inkdraft", "Inkdraft")
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from the platform config directory
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Self::load_from(&path)
    }

    /// Load configuration from a file, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform config directory
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to(&path)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Get the database path, defaulting to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.storage.database_path.clone().unwrap_or_else(|| {
            Self::project_dirs()
                .map(|dirs| dirs.data_dir().join("inkdraft.db"))
                .unwrap_or_else(|| PathBuf::from("inkdraft.db"))
        })
    }
}
