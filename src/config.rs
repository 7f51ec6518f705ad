use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub anticheat: AntiCheatConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test: TestConfig::default(),
            anticheat: AntiCheatConfig::default(),
            store: StoreConfig::default(),
            ui: UiConfig::default(),
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> String {
    "mockprep.log".into()
}

// ============================================================================
// Test Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Length of an attempt in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Difficulty/context label carried into the submission record
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            difficulty: default_difficulty(),
        }
    }
}

fn default_duration_secs() -> u64 {
    30 * 60
}

fn default_difficulty() -> String {
    "intermediate".into()
}

// ============================================================================
// Anti-cheat Config
// ============================================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AntiCheatConfig {
    /// Count violations at all
    #[serde(default = "default_anticheat_enabled")]
    pub enabled: bool,

    /// Violation total that produces the final warning
    #[serde(default = "default_final_warning_at")]
    pub final_warning_at: u32,

    /// Violation total that forces submission
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Delay between the threshold warning and the automatic submission (ms)
    #[serde(default = "default_auto_submit_delay_ms")]
    pub auto_submit_delay_ms: u64,
}

impl Default for AntiCheatConfig {
    fn default() -> Self {
        Self {
            enabled: default_anticheat_enabled(),
            final_warning_at: default_final_warning_at(),
            threshold: default_threshold(),
            auto_submit_delay_ms: default_auto_submit_delay_ms(),
        }
    }
}

impl AntiCheatConfig {
    pub fn auto_submit_delay(&self) -> Duration {
        Duration::from_millis(self.auto_submit_delay_ms)
    }
}

fn default_anticheat_enabled() -> bool {
    true
}

fn default_final_warning_at() -> u32 {
    4
}

fn default_threshold() -> u32 {
    5
}

fn default_auto_submit_delay_ms() -> u64 {
    2000
}

// ============================================================================
// Store Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding the session handoff keys
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "mockprep-session.json".into()
}

// ============================================================================
// UI Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UiConfig {
    /// Remaining seconds at which the timer is highlighted
    #[serde(default = "default_low_time_secs")]
    pub low_time_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            low_time_secs: default_low_time_secs(),
        }
    }
}

fn default_low_time_secs() -> u64 {
    5 * 60
}

impl Config {
    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| Self::from_toml_str(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.test.duration_secs, 1800);
        assert_eq!(config.anticheat.threshold, 5);
        assert_eq!(config.anticheat.final_warning_at, 4);
        assert_eq!(config.anticheat.auto_submit_delay(), Duration::from_secs(2));
        assert_eq!(config.ui.low_time_secs, 300);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [test]
            duration_secs = 600

            [anticheat]
            threshold = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.test.duration_secs, 600);
        assert_eq!(config.test.difficulty, "intermediate");
        assert_eq!(config.anticheat.threshold, 3);
        assert!(config.anticheat.enabled);
        assert_eq!(config.store.path, "mockprep-session.json");
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load_from(Path::new("/definitely/not/here.toml"));
        assert_eq!(config.test.duration_secs, 1800);
    }
}
