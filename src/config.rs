//! Watcher settings, persisted in HKCU\Software\ActiveWindowWatcher

use crate::error::ConfigError;

#[cfg(windows)]
use winreg::RegKey;
#[cfg(windows)]
use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};

#[cfg_attr(not(windows), allow(dead_code))]
const SETTINGS_KEY: &str = r"Software\ActiveWindowWatcher";
#[cfg_attr(not(windows), allow(dead_code))]
const RAISE_EVENTS: &str = "RaiseEvents";
#[cfg_attr(not(windows), allow(dead_code))]
const SKIP_OWN_PROCESS: &str = "SkipOwnProcess";

/// Watcher settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Notify subscribers on change
    pub raise_events: bool,
    /// Ignore focus moving to this process's own windows
    pub skip_own_process: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            raise_events: true,
            skip_own_process: false,
        }
    }
}

/// Load settings; missing values fall back to defaults
#[cfg(windows)]
pub fn load() -> WatcherConfig {
    let defaults = WatcherConfig::default();
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let Ok(key) = hkcu.open_subkey_with_flags(SETTINGS_KEY, KEY_READ) else {
        return defaults;
    };
    let flag = |name: &str, default: bool| {
        key.get_value::<u32, _>(name)
            .map(|v| v != 0)
            .unwrap_or(default)
    };

    WatcherConfig {
        raise_events: flag(RAISE_EVENTS, defaults.raise_events),
        skip_own_process: flag(SKIP_OWN_PROCESS, defaults.skip_own_process),
    }
}

/// Load settings (no persistent store on this platform)
#[cfg(not(windows))]
pub fn load() -> WatcherConfig {
    WatcherConfig::default()
}

/// Persist settings
#[cfg(windows)]
pub fn save(config: &WatcherConfig) -> Result<(), ConfigError> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey(SETTINGS_KEY)?;
    key.set_value(RAISE_EVENTS, &(config.raise_events as u32))?;
    key.set_value(SKIP_OWN_PROCESS, &(config.skip_own_process as u32))?;
    Ok(())
}

/// Persist settings (no persistent store on this platform)
#[cfg(not(windows))]
pub fn save(_config: &WatcherConfig) -> Result<(), ConfigError> {
    Ok(())
}

/// Remove persisted settings
#[cfg(windows)]
pub fn clear() -> Result<(), ConfigError> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    match hkcu.delete_subkey_all(SETTINGS_KEY) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Remove persisted settings (no persistent store on this platform)
#[cfg(not(windows))]
pub fn clear() -> Result<(), ConfigError> {
    Ok(())
}
