//! # Configuration Module
//!
//! Handles loading and validating settings from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InstalogError, Result};
use crate::serial::SUPPORTED_BAUD_RATES;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,

    #[serde(default)]
    pub survey: SurveyConfig,

    /// Species abbreviations for quick entry, keyed in upper case
    #[serde(alias = "hotkeys")]
    pub shortcuts: HashMap<String, String>,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Line speed of the GPS receiver; there is no safe default
    pub baud_rate: u32,

    /// Ports to scan, in order; empty means every port the system reports
    #[serde(default)]
    pub ports: Vec<String>,
}

/// Observation sheet configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SurveyConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_observers")]
    pub observers: u32,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            observers: default_observers(),
        }
    }
}

// Default value functions
fn default_output_dir() -> PathBuf { PathBuf::from(".") }
fn default_observers() -> u32 { 1 }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Shortcut keys are upper-cased so lookups can ignore the case the
    /// surveyor types in.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails, including a missing `baud_rate` or `[shortcuts]`
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use instalog::config::Config;
    ///
    /// let config = Config::load("config/instalog.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.shortcuts = config
            .shortcuts
            .into_iter()
            .map(|(key, species)| (key.to_uppercase(), species))
            .collect();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            let rates: Vec<String> = SUPPORTED_BAUD_RATES.iter().map(u32::to_string).collect();
            return Err(InstalogError::Config(toml::de::Error::custom(format!(
                "baud_rate must be one of: {}",
                rates.join(", ")
            ))));
        }

        if self.serial.ports.iter().any(|port| port.trim().is_empty()) {
            return Err(InstalogError::Config(toml::de::Error::custom(
                "serial ports cannot be empty",
            )));
        }

        if self.shortcuts.is_empty() {
            return Err(InstalogError::Config(toml::de::Error::custom(
                "no shortcuts found in settings",
            )));
        }

        for (key, species) in &self.shortcuts {
            if key.trim().is_empty() || species.trim().is_empty() {
                return Err(InstalogError::Config(toml::de::Error::custom(format!(
                    "shortcut '{}' must have a non-empty key and species",
                    key
                ))));
            }
        }

        if self.survey.observers == 0 {
            return Err(InstalogError::Config(toml::de::Error::custom(
                "observers must be greater than 0",
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            serial: SerialConfig {
                baud_rate: 4800,
                ports: vec![],
            },
            survey: SurveyConfig::default(),
            shortcuts: HashMap::from([("AMRO".to_string(), "American Robin".to_string())]),
        }
    }

    fn load_str(contents: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_valid_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let config = load_str(
            r#"
[serial]
baud_rate = 9600
ports = ["/dev/ttyUSB0", "COM3"]

[survey]
output_dir = "/data/surveys"
observers = 2

[shortcuts]
amro = "American Robin"
BEWR = "Bewick's Wren"
"#,
        )
        .unwrap();

        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.ports, vec!["/dev/ttyUSB0", "COM3"]);
        assert_eq!(config.survey.output_dir, PathBuf::from("/data/surveys"));
        assert_eq!(config.survey.observers, 2);
        assert_eq!(config.shortcuts["AMRO"], "American Robin");
        assert_eq!(config.shortcuts["BEWR"], "Bewick's Wren");
        assert!(!config.shortcuts.contains_key("amro"));
    }

    #[test]
    fn test_survey_section_optional() {
        let config = load_str(
            r#"
[serial]
baud_rate = 4800

[shortcuts]
AMRO = "American Robin"
"#,
        )
        .unwrap();

        assert_eq!(config.survey.output_dir, PathBuf::from("."));
        assert_eq!(config.survey.observers, 1);
        assert!(config.serial.ports.is_empty());
    }

    #[test]
    fn test_hotkeys_alias() {
        let config = load_str(
            r#"
[serial]
baud_rate = 4800

[hotkeys]
osp = "Osprey"
"#,
        )
        .unwrap();
        assert_eq!(config.shortcuts["OSP"], "Osprey");
    }

    #[test]
    fn test_missing_baud_rate() {
        let result = load_str(
            r#"
[serial]

[shortcuts]
AMRO = "American Robin"
"#,
        );
        assert!(matches!(result, Err(InstalogError::Config(_))));
    }

    #[test]
    fn test_missing_shortcuts() {
        let result = load_str(
            r#"
[serial]
baud_rate = 4800
"#,
        );
        assert!(matches!(result, Err(InstalogError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/instalog.toml");
        assert!(matches!(result, Err(InstalogError::Io(_))));
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420000; // Not in the allowed list
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_empty_port_name() {
        let mut config = create_valid_config();
        config.serial.ports = vec!["/dev/ttyUSB0".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_shortcuts() {
        let mut config = create_valid_config();
        config.shortcuts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_shortcut_value() {
        let mut config = create_valid_config();
        config.shortcuts.insert("OSP".to_string(), String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_observers() {
        let mut config = create_valid_config();
        config.survey.observers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_output_dir(), PathBuf::from("."));
        assert_eq!(default_observers(), 1);
    }
}
