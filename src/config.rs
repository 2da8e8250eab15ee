//! Configuration: an optional TOML file, then command-line overrides.
//!
//! Every field has a default, so the server runs with no file at all:
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:1323"
//! max_body = "16M"
//!
//! [app]
//! body_limit = "2M"
//! assets_dir = "assets"
//! views_dir = "public/views"
//! image = "img/toka1.jpg"
//! redirect_to = "https://www.inter.it/jp"
//!
//! [log]
//! filter = "info"
//! format = "pretty"   # or "json"
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::middleware::parse_size;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("cannot parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("invalid size `{0}` (expected e.g. \"2M\", \"512K\")")]
    Size(String),

    #[error("invalid address `{0}`")]
    Addr(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Transport-level cap on buffered request bodies.
    pub max_body: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 1323)),
            max_body: "16M".to_owned(),
        }
    }
}

/// Settings of the demo application built by [`build_router`](crate::app::build_router).
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Route-level body limit enforced by the `BodyLimit` middleware.
    pub body_limit: String,
    pub assets_dir: PathBuf,
    pub views_dir: PathBuf,
    pub image: PathBuf,
    pub redirect_to: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            body_limit: "2M".to_owned(),
            assets_dir: PathBuf::from("assets"),
            views_dir: PathBuf::from("public/views"),
            image: PathBuf::from("img/toka1.jpg"),
            redirect_to: "https://www.inter.it/jp".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "info".to_owned(), format: LogFormat::Pretty }
    }
}

impl Config {
    /// Loads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.to_owned(), source },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|source| ConfigError::Parse { path: PathBuf::new(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.max_body_bytes()?;
        self.app.body_limit_bytes()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn max_body_bytes(&self) -> Result<usize, ConfigError> {
        parse_size(&self.max_body).ok_or_else(|| ConfigError::Size(self.max_body.clone()))
    }
}

impl AppConfig {
    pub fn body_limit_bytes(&self) -> Result<usize, ConfigError> {
        parse_size(&self.body_limit).ok_or_else(|| ConfigError::Size(self.body_limit.clone()))
    }
}

/// Command line of the `vireo` binary.
#[derive(Debug, Parser)]
#[command(name = "vireo", version, about = "Demo HTTP server")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "VIREO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overrides `server.addr`.
    #[arg(long)]
    pub addr: Option<String>,

    /// Log filter, overrides `log.filter`.
    #[arg(long)]
    pub log: Option<String>,

    /// Log format, overrides `log.format`.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// The file configuration (or defaults) with command-line overrides applied.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(addr) = &self.addr {
            config.server.addr = addr.parse().map_err(|_| ConfigError::Addr(addr.clone()))?;
        }
        if let Some(filter) = &self.log {
            config.log.filter = filter.clone();
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.addr.port(), 1323);
        assert_eq!(config.app.body_limit_bytes().unwrap(), 2 * 1024 * 1024);
        assert_eq!(config.app.views_dir, PathBuf::from("public/views"));
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn partial_files_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [server]
            addr = "127.0.0.1:8080"

            [log]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.server.max_body, "16M");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn rejects_bad_sizes_and_unknown_keys() {
        let err = Config::parse("[app]\nbody_limit = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Size(ref s) if s == "lots"));

        let err = Config::parse("[app]\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vireo.toml");
        std::fs::write(&path, "[server]\naddr = 1").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("vireo.toml"), "{err}");

        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn cli_overrides_the_file() {
        let cli = Cli::parse_from(["vireo", "--addr", "127.0.0.1:9000", "--log", "debug", "--log-format", "json"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.server.addr.port(), 9000);
        assert_eq!(config.log.filter, "debug");
        assert_eq!(config.log.format, LogFormat::Json);

        let cli = Cli::parse_from(["vireo", "--addr", "nowhere"]);
        assert!(matches!(cli.resolve(), Err(ConfigError::Addr(_))));
    }
}
