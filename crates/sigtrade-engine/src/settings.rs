//! Trade settings providers.
//!
//! The engine reads [`TradeSettings`] through [`SettingsProvider`] on every
//! operation, so updates take effect on the next signal without a restart.
//! Reads are served from memory; only [`SettingsProvider::save`] touches disk.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use sigtrade_core::error::TradeError;
use sigtrade_core::trading::TradeSettings;
use tracing::{info, warn};

/// File name of the persisted settings inside the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Source of the current trade settings.
pub trait SettingsProvider: Send + Sync {
    /// Current settings. Never fails; falls back to defaults.
    fn settings(&self) -> TradeSettings;

    /// Validate and replace the settings.
    fn save(&self, settings: TradeSettings) -> Result<(), TradeError>;
}

/// Reject settings the engine cannot trade with.
pub fn validate_settings(s: &TradeSettings) -> Result<(), TradeError> {
    if !(s.amount.is_finite() && s.amount > 0.0) {
        return Err(TradeError::Validation("amount must be greater than 0".into()));
    }
    if s.leverage < 1 {
        return Err(TradeError::Validation("leverage must be at least 1".into()));
    }
    if !(s.take_profit_percentage.is_finite() && s.take_profit_percentage > 0.0) {
        return Err(TradeError::Validation("takeProfitPercentage must be greater than 0".into()));
    }
    if !(s.stop_loss_percentage.is_finite() && s.stop_loss_percentage > 0.0) {
        return Err(TradeError::Validation("stopLossPercentage must be greater than 0".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

/// Settings stored as JSON in `settings.json`.
///
/// The file is read once in [`FileSettings::new`] and cached; saves write the
/// file first and then replace the cache.
pub struct FileSettings {
    path: PathBuf,
    cache: RwLock<TradeSettings>,
}

impl FileSettings {
    /// Load the settings file inside `data_dir`.
    ///
    /// A missing file is created with defaults. An unreadable one falls back
    /// to defaults and is left as is.
    pub fn new(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let settings = load(&path);
        Self {
            path,
            cache: RwLock::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> TradeSettings {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("[settings] {} unreadable ({e}), using defaults", path.display());
            TradeSettings::default()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = TradeSettings::default();
            match write(path, &defaults) {
                Ok(()) => info!("[settings] created {} with defaults", path.display()),
                Err(e) => warn!("[settings] failed to create {}: {e}", path.display()),
            }
            defaults
        }
        Err(e) => {
            warn!("[settings] failed to read {}: {e}", path.display());
            TradeSettings::default()
        }
    }
}

fn write(path: &Path, settings: &TradeSettings) -> Result<(), TradeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}

impl SettingsProvider for FileSettings {
    fn settings(&self) -> TradeSettings {
        self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    fn save(&self, settings: TradeSettings) -> Result<(), TradeError> {
        validate_settings(&settings)?;
        write(&self.path, &settings)?;
        info!(
            "[settings] saved: amount={} leverage={} tp={}% sl={}% mode={:?}",
            settings.amount,
            settings.leverage,
            settings.take_profit_percentage,
            settings.stop_loss_percentage,
            settings.trade_mode,
        );
        *self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = settings;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Settings held in memory only.
#[derive(Default)]
pub struct MemorySettings {
    inner: RwLock<TradeSettings>,
}

impl MemorySettings {
    pub fn new(settings: TradeSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }
}

impl SettingsProvider for MemorySettings {
    fn settings(&self) -> TradeSettings {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    fn save(&self, settings: TradeSettings) -> Result<(), TradeError> {
        validate_settings(&settings)?;
        *self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigtrade_core::enums::TradeMode;

    #[test]
    fn first_read_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSettings::new(dir.path());
        assert_eq!(provider.settings(), TradeSettings::default());
        assert!(provider.path().exists());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"amount": 100, "tradeMode": "short-only"}"#).unwrap();
        let s = FileSettings::new(dir.path()).settings();
        assert_eq!(s.amount, 100.0);
        assert_eq!(s.trade_mode, TradeMode::ShortOnly);
        assert_eq!(s.leverage, 25);
    }

    #[test]
    fn save_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSettings::new(dir.path());
        let updated = TradeSettings {
            amount: 15.0,
            take_profit_percentage: 2.5,
            trade_mode: TradeMode::LongOnly,
            ..TradeSettings::default()
        };
        provider.save(updated.clone()).unwrap();
        assert_eq!(provider.settings(), updated);
        assert_eq!(FileSettings::new(dir.path()).settings(), updated);
    }

    #[test]
    fn reads_are_served_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSettings::new(dir.path());
        let updated = TradeSettings {
            amount: 25.0,
            ..TradeSettings::default()
        };
        provider.save(updated.clone()).unwrap();
        std::fs::remove_file(provider.path()).unwrap();

        assert_eq!(provider.settings(), updated);
        assert!(!provider.path().exists());
    }

    #[test]
    fn rejected_save_keeps_file_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSettings::new(dir.path());
        let before = std::fs::read_to_string(provider.path()).unwrap();
        let bad = TradeSettings {
            leverage: 0,
            ..TradeSettings::default()
        };
        assert!(matches!(provider.save(bad), Err(TradeError::Validation(_))));
        assert_eq!(provider.settings(), TradeSettings::default());
        assert_eq!(std::fs::read_to_string(provider.path()).unwrap(), before);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let provider = MemorySettings::default();
        let bad = TradeSettings {
            amount: 0.0,
            ..TradeSettings::default()
        };
        assert!(matches!(provider.save(bad), Err(TradeError::Validation(_))));
        let bad = TradeSettings {
            stop_loss_percentage: -1.0,
            ..TradeSettings::default()
        };
        assert!(matches!(provider.save(bad), Err(TradeError::Validation(_))));
        assert_eq!(provider.settings(), TradeSettings::default());
    }

    #[test]
    fn garbage_file_falls_back_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "nope").unwrap();
        let provider = FileSettings::new(dir.path());
        assert_eq!(provider.settings(), TradeSettings::default());
        assert_eq!(std::fs::read_to_string(provider.path()).unwrap(), "nope");
    }
}
