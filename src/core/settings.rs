//! Settings publish/subscribe
//!
//! The bus holds the current [`AppConfig`] and notifies subscribers only when
//! an update actually changes it. Subscribers read the sections they care
//! about from the published value.

use std::path::PathBuf;

use tokio::sync::watch;

use super::config::{AppConfig, Theme};

pub struct SettingsBus {
    tx: watch::Sender<AppConfig>,
    persist_to: Option<PathBuf>,
}

impl SettingsBus {
    pub fn new(config: AppConfig) -> Self {
        let (tx, _rx) = watch::channel(config);
        Self {
            tx,
            persist_to: None,
        }
    }

    /// Write every published change to `path`
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_to = Some(path.into());
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.tx.subscribe()
    }

    /// A copy of the current settings
    pub fn current(&self) -> AppConfig {
        self.tx.borrow().clone()
    }

    /// Apply `f` and publish the result if anything changed. Returns whether
    /// subscribers were notified.
    pub fn update(&self, f: impl FnOnce(&mut AppConfig)) -> bool {
        let changed = self.tx.send_if_modified(|config| {
            let before = config.clone();
            f(config);
            *config != before
        });

        if changed {
            tracing::debug!("Settings changed");
            self.persist();
        }
        changed
    }

    pub fn set_theme(&self, theme: Theme) -> bool {
        self.update(|config| {
            config.editor.theme = theme;
            config.preview.theme = theme;
        })
    }

    pub fn toggle_theme(&self) -> bool {
        let next = self.tx.borrow().editor.theme.toggled();
        self.set_theme(next)
    }

    /// Restore every setting to its default
    pub fn reset(&self) -> bool {
        self.update(|config| {
            let storage = config.storage.clone();
            *config = AppConfig {
                storage,
                ..AppConfig::default()
            };
        })
    }

    fn persist(&self) {
        let Some(path) = &self.persist_to else {
            return;
        };
        if let Err(e) = self.tx.borrow().save_to(path) {
            tracing::warn!("Failed to persist settings: {:#}", e);
        }
    }
}
