use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::log::LogConfig;

/// Top-level configuration for shelltrack.
///
/// Loaded from `~/.config/shelltrack/config.toml`. Missing sections
/// fall back to defaults thanks to `#[serde(default)]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Polling fallback settings.
    pub polling: PollConfig,
    /// File logging settings.
    pub logging: LogConfig,
}

/// Polling fallback settings.
///
/// Polling reconciles tracked state on a timer for changes that never
/// produce a shell event, such as windows hidden without a destroy
/// notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Whether the periodic reconciliation sweep runs.
    pub enabled: bool,
    /// Milliseconds between reconciliation sweeps.
    pub interval_ms: u64,
    /// Milliseconds between bounds refreshes while a window is being
    /// moved or resized.
    pub moveresize_interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 500,
            moveresize_interval_ms: 100,
        }
    }
}

impl Config {
    /// Clamps polling intervals to safe ranges.
    ///
    /// Prevents intervals so short that the sweep starves the rest of
    /// the process.
    pub fn validate(&mut self) {
        self.polling.interval_ms = self.polling.interval_ms.clamp(50, 60_000);
        self.polling.moveresize_interval_ms = self.polling.moveresize_interval_ms.clamp(16, 1_000);
    }
}

/// Returns the config directory: `~/.config/shelltrack/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("shelltrack"))
}

/// Returns the config file path: `~/.config/shelltrack/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Tries to load and parse `config.toml`.
///
/// Returns `Ok(Config)` on success, or an error string describing
/// what went wrong (IO error, parse error, etc.).
pub fn try_load() -> Result<Config, String> {
    let path = config_path().ok_or("could not determine config path")?;
    let content = std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut config: Config =
        toml::from_str(&content).map_err(|e| format!("{}: {e}", path.display()))?;
    config.validate();
    Ok(config)
}

/// Loads the configuration from disk, falling back to defaults.
///
/// After loading, values are clamped to safe ranges via [`Config::validate`].
/// Non-existent files silently return defaults; other IO errors are logged.
pub fn load() -> Config {
    match try_load() {
        Ok(val) => val,
        Err(e) if is_file_not_found(&e) => Config::default(),
        Err(e) => {
            eprintln!("Warning: {e}");
            Config::default()
        }
    }
}

/// Returns true if the error message indicates a missing file.
fn is_file_not_found(e: &str) -> bool {
    e.contains("cannot find the path") || e.contains("The system cannot find")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        // Arrange / Act
        let config = Config::default();

        // Assert
        assert!(config.polling.enabled);
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.moveresize_interval_ms, 100);
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_sections() {
        // Arrange
        let toml_str = "[polling]\ninterval_ms = 1000\n";

        // Act
        let config: Config = toml::from_str(toml_str).unwrap();

        // Assert
        assert_eq!(config.polling.interval_ms, 1000);
        assert!(config.polling.enabled);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn validate_clamps_extreme_values() {
        // Arrange
        let mut config = Config::default();
        config.polling.interval_ms = 1;
        config.polling.moveresize_interval_ms = 100_000;

        // Act
        config.validate();

        // Assert
        assert_eq!(config.polling.interval_ms, 50);
        assert_eq!(config.polling.moveresize_interval_ms, 1_000);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        // Arrange
        let toml_str = "[polling]\nenabled = false\n\n[future]\nkey = 1\n";

        // Act
        let config: Config = toml::from_str(toml_str).unwrap();

        // Assert
        assert!(!config.polling.enabled);
    }
}
