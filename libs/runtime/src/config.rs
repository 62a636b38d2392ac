//! Server configuration: typed global sections plus free-form per-module
//! sections, layered from built-in defaults, a YAML file and the environment.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::paths::resolve_home_dir;

/// Used under the user's home when `server.home_dir` is left empty.
pub const DEFAULT_HOME_SUBDIR: &str = ".jsonapi";

/// `JSONAPI__SERVER__PORT=9000` overrides `server.port`.
pub const ENV_PREFIX: &str = "JSONAPI__";

const DEFAULT_LOG_SECTION: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Without it only the in-memory collections are served.
    pub database: Option<DatabaseConfig>,
    pub logging: Option<LoggingConfig>,
    /// Raw `modules.<name>` sections; see [`AppConfig::module_config`].
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Base for relative log files and SQLite paths. Absolute after loading.
    #[serde(default)]
    pub home_dir: String,
    pub host: String,
    pub port: u16,
    /// Per-request timeout in seconds, 0 for none.
    #[serde(default)]
    pub timeout_sec: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// e.g. `sqlite://database/jsonapi.db?mode=rwc`; relative paths are
    /// anchored at `server.home_dir`.
    pub url: String,
    pub max_conns: Option<u32>,
}

/// Log sections keyed by target prefix.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// trace | debug | info | warn | error | off
    pub console_level: String,
    /// Empty keeps this section out of files.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            host: "127.0.0.1".into(),
            port: 8087,
            timeout_sec: 0,
        }
    }
}

impl ServerConfig {
    /// Replace `home_dir` by its absolute form and make sure it exists.
    fn resolve_home(&mut self) -> anyhow::Result<()> {
        let configured = Some(self.home_dir.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let resolved = resolve_home_dir(configured, DEFAULT_HOME_SUBDIR, true)
            .context("failed to resolve server.home_dir")?;
        self.home_dir = resolved.to_string_lossy().into_owned();
        Ok(())
    }
}

/// Console at info, everything at debug into `logs/jsonapi.log`.
pub fn default_logging_config() -> LoggingConfig {
    HashMap::from([(
        DEFAULT_LOG_SECTION.to_string(),
        Section {
            console_level: "info".into(),
            file: "logs/jsonapi.log".into(),
            file_level: "debug".into(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    )])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: Some(DatabaseConfig {
                url: "sqlite://database/jsonapi.db?mode=rwc".into(),
                max_conns: Some(10),
            }),
            logging: Some(default_logging_config()),
            modules: HashMap::new(),
        }
    }
}

/// Command-line values that win over every other layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    /// `-v` count: 1 raises the default console level to debug, 2+ to trace.
    pub verbose: u8,
}

impl AppConfig {
    /// Defaults, then the YAML file, then `JSONAPI__*` variables.
    ///
    /// Optional sections stay unset unless a layer provides them. The file
    /// must exist.
    pub fn load_layered(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("config file not found: {}", path.display());
        }

        let skeleton = AppConfig {
            database: None,
            logging: None,
            ..AppConfig::default()
        };
        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(skeleton))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("invalid config {}", path.display()))?;

        config.server.resolve_home()?;
        Ok(config)
    }

    /// [`load_layered`](Self::load_layered) when a path is given, the
    /// built-in defaults otherwise.
    pub fn load_or_default(path: Option<impl AsRef<Path>>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::load_layered(path);
        }
        let mut config = Self::default();
        config.server.resolve_home()?;
        Ok(config)
    }

    pub fn apply_cli_overrides(&mut self, cli: CliOverrides) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        let level = match cli.verbose {
            0 => return,
            1 => "debug",
            _ => "trace",
        };
        if let Some(section) = self
            .logging
            .get_or_insert_with(default_logging_config)
            .get_mut(DEFAULT_LOG_SECTION)
        {
            section.console_level = level.into();
        }
    }

    /// Deserialize `modules.<name>`, or `T::default()` when the section is
    /// absent.
    pub fn module_config<T: DeserializeOwned + Default>(&self, name: &str) -> anyhow::Result<T> {
        self.modules.get(name).map_or_else(
            || Ok(T::default()),
            |raw| {
                T::deserialize(raw).with_context(|| format!("invalid config for module `{name}`"))
            },
        )
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("failed to render config as YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Listing {
        default_per_page: u64,
        debug: bool,
    }

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("jsonapi.yaml");
        fs::write(&path, body).unwrap();
        path
    }

    fn home_line(dir: &TempDir) -> String {
        format!(
            "  home_dir: \"{}\"\n",
            dir.path().join("home").to_string_lossy().replace('\\', "/")
        )
    }

    #[test]
    fn defaults_serve_sqlite_on_8087() {
        let config = AppConfig::default();
        assert_eq!((config.server.host.as_str(), config.server.port), ("127.0.0.1", 8087));
        assert_eq!(config.server.timeout_sec, 0);
        assert!(config.server.home_dir.is_empty(), "resolved only when loading");
        let db = config.database.unwrap();
        assert_eq!(db.url, "sqlite://database/jsonapi.db?mode=rwc");
        assert_eq!(db.max_conns, Some(10));
        assert_eq!(config.logging.unwrap()["default"].file, "logs/jsonapi.log");
    }

    #[test]
    fn yaml_layer_fills_every_section() {
        let tmp = TempDir::new().unwrap();
        let body = format!(
            "server:\n{}  host: \"0.0.0.0\"\n  port: 9090\n  timeout_sec: 30\n\
             database:\n  url: \"sqlite::memory:\"\n\
             logging:\n  jsonapi_db:\n    console_level: debug\n    file: \"logs/sql.log\"\n\
             modules:\n  prefectures:\n    default_per_page: 10\n    debug: true\n",
            home_line(&tmp)
        );
        let config = AppConfig::load_layered(write(&tmp, &body)).unwrap();

        let home = PathBuf::from(&config.server.home_dir);
        assert!(home.is_absolute() && home.is_dir());
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.timeout_sec, 30);
        assert_eq!(config.database.as_ref().unwrap().url, "sqlite::memory:");
        assert_eq!(config.logging.as_ref().unwrap()["jsonapi_db"].file, "logs/sql.log");
        assert_eq!(
            config.module_config::<Listing>("prefectures").unwrap(),
            Listing {
                default_per_page: 10,
                debug: true
            }
        );
    }

    #[test]
    fn optional_sections_stay_unset() {
        let tmp = TempDir::new().unwrap();
        let body = format!("server:\n{}  host: \"localhost\"\n  port: 8080\n", home_line(&tmp));
        let config = AppConfig::load_layered(write(&tmp, &body)).unwrap();
        assert!(config.database.is_none());
        assert!(config.logging.is_none());
        assert_eq!(config.module_config::<Listing>("prefectures").unwrap(), Listing::default());
    }

    #[test]
    fn unknown_server_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "server:\n  host: \"h\"\n  port: 1\n  colour: blue\n");
        assert!(AppConfig::load_layered(path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn malformed_module_section_is_an_error() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "prefectures".into(),
            serde_json::json!({"default_per_page": "many"}),
        );
        let err = config.module_config::<Listing>("prefectures").unwrap_err();
        assert!(err.to_string().contains("prefectures"));
    }

    #[test]
    fn verbosity_raises_console_level() {
        for (verbose, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (5, "trace")] {
            let mut config = AppConfig::default();
            config.apply_cli_overrides(CliOverrides {
                port: Some(3000),
                verbose,
            });
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.logging.unwrap()["default"].console_level, expected);
        }
    }

    #[test]
    fn verbosity_without_logging_section_installs_defaults() {
        let mut config = AppConfig {
            logging: None,
            ..AppConfig::default()
        };
        config.apply_cli_overrides(CliOverrides {
            port: None,
            verbose: 1,
        });
        assert_eq!(config.logging.unwrap()["default"].console_level, "debug");
    }

    #[test]
    fn yaml_output_reloads() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        let reloaded: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reloaded.server.port, 8087);
        assert!(reloaded.database.is_some());
    }
}
