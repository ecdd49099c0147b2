//! Configuration
//!
//! Layered settings: built-in defaults, then `~/.hisoka/config.toml` (or an
//! explicit path), then `HISOKA__SECTION__KEY` environment variables, then
//! `PAIRING_NUMBER`. CLI flags are applied last by the binary.

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable read for phone-number pairing
pub const PAIRING_NUMBER_ENV: &str = "PAIRING_NUMBER";

/// Base directory for hisoka state: `~/.hisoka`
pub fn hisoka_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hisoka")
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    hisoka_home().join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bot: BotConfig,
    pub whatsapp: WhatsAppConfig,
    pub logging: LoggingConfig,
}

/// Command handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    /// Leading strings that mark a message as a command
    pub prefixes: Vec<String>,
    /// Phone numbers allowed to run commands; empty accepts everyone
    pub allowed_phones: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![".".to_string(), "!".to_string(), "/".to_string()],
            allowed_phones: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// SQLite file holding the multi-device session
    pub session_db: PathBuf,
    /// When set and the device is not yet paired, log in with a pair code
    pub pairing_number: Option<String>,
    /// Listen address of the QR page
    pub qr_listen: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            session_db: hisoka_home().join("session.db"),
            pairing_number: None,
            qr_listen: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
    /// Directory for daily rolling log files
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub pairing_number: Option<String>,
    pub qr_listen: Option<String>,
    pub session_db: Option<PathBuf>,
}

impl Config {
    /// Load from the default path (missing file is fine) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path(), false)
    }

    /// Load from `path`; a missing file is an error only when `required`
    pub fn load_from(path: &Path, required: bool) -> Result<Self> {
        Self::load_layers(path, required, std::env::vars().collect())
    }

    /// File layer, then the `HISOKA__*` and `PAIRING_NUMBER` entries of `env`
    pub fn load_layers(path: &Path, required: bool, env: config::Map<String, String>) -> Result<Self> {
        let pairing_number = env.get(PAIRING_NUMBER_ENV).cloned();

        let settings = config::Config::builder()
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                Environment::with_prefix("HISOKA")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bot.prefixes")
                    .with_list_parse_key("bot.allowed_phones")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .build()
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        if let Some(number) = pairing_number
            && !number.trim().is_empty()
        {
            config.whatsapp.pairing_number = Some(number);
        }

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line overrides, the last layer
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(number) = overrides.pairing_number {
            self.whatsapp.pairing_number = Some(number);
        }
        if let Some(listen) = overrides.qr_listen {
            self.whatsapp.qr_listen = listen;
        }
        if let Some(path) = overrides.session_db {
            self.whatsapp.session_db = path;
        }
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bot.prefixes, [".", "!", "/"]);
        assert!(config.bot.allowed_phones.is_empty());
        assert_eq!(config.whatsapp.qr_listen, "0.0.0.0:8080");
        assert!(config.whatsapp.session_db.ends_with(".hisoka/session.db"));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r##"
[bot]
prefixes = ["#"]
allowed_phones = ["628123456789"]

[whatsapp]
session_db = "/tmp/hisoka-test.db"
qr_listen = "127.0.0.1:9090"

[logging]
level = "debug"
"##
        )
        .unwrap();

        let config = Config::load_layers(file.path(), true, config::Map::new()).unwrap();
        assert_eq!(config.bot.prefixes, ["#"]);
        assert_eq!(config.bot.allowed_phones, ["628123456789"]);
        assert_eq!(config.whatsapp.session_db, PathBuf::from("/tmp/hisoka-test.db"));
        assert_eq!(config.whatsapp.qr_listen, "127.0.0.1:9090");
        assert_eq!(config.logging.level, "debug");
        // Untouched keys keep their defaults
        assert!(!config.logging.json);
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            Config::load_layers(&dir.path().join("absent.toml"), false, config::Map::new()).unwrap();
        assert_eq!(config.bot, BotConfig::default());
    }

    #[test]
    fn test_missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            Config::load_layers(&dir.path().join("absent.toml"), true, config::Map::new()).is_err()
        );
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[bot]"));
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_env_list_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_layers(
            &dir.path().join("absent.toml"),
            false,
            env(&[
                ("HISOKA__BOT__PREFIXES", ".,#"),
                ("HISOKA__BOT__ALLOWED_PHONES", "628111,628222"),
                ("HISOKA__LOGGING__JSON", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(config.bot.prefixes, [".", "#"]);
        assert_eq!(config.bot.allowed_phones, ["628111", "628222"]);
        assert!(config.logging.json);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file("[whatsapp]\nqr_listen = \"127.0.0.1:9090\"\n");
        let config = Config::load_layers(
            file.path(),
            true,
            env(&[("HISOKA__WHATSAPP__QR_LISTEN", "127.0.0.1:7070")]),
        )
        .unwrap();
        assert_eq!(config.whatsapp.qr_listen, "127.0.0.1:7070");
    }

    #[test]
    fn test_pairing_number_precedence() {
        let file = toml_file("[whatsapp]\npairing_number = \"111\"\n");

        let from_file = Config::load_layers(file.path(), true, config::Map::new()).unwrap();
        assert_eq!(from_file.whatsapp.pairing_number.as_deref(), Some("111"));

        let mut config =
            Config::load_layers(file.path(), true, env(&[(PAIRING_NUMBER_ENV, "222")])).unwrap();
        assert_eq!(config.whatsapp.pairing_number.as_deref(), Some("222"));

        config.apply_overrides(Overrides {
            pairing_number: Some("333".to_string()),
            ..Default::default()
        });
        assert_eq!(config.whatsapp.pairing_number.as_deref(), Some("333"));
    }

    #[test]
    fn test_blank_pairing_number_env_is_ignored() {
        let file = toml_file("[whatsapp]\npairing_number = \"111\"\n");
        let config =
            Config::load_layers(file.path(), true, env(&[(PAIRING_NUMBER_ENV, "  ")])).unwrap();
        assert_eq!(config.whatsapp.pairing_number.as_deref(), Some("111"));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Overrides {
            pairing_number: None,
            qr_listen: Some("127.0.0.1:8081".to_string()),
            session_db: Some(PathBuf::from("/var/lib/hisoka/session.db")),
        });
        assert_eq!(config.whatsapp.qr_listen, "127.0.0.1:8081");
        assert_eq!(
            config.whatsapp.session_db,
            PathBuf::from("/var/lib/hisoka/session.db")
        );
        assert!(config.whatsapp.pairing_number.is_none());
    }
}
