//! Configuration module for the microweb server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the web server
#[derive(Parser, Debug)]
#[command(name = "microweb")]
#[command(author = "microweb authors")]
#[command(version = "0.1.0")]
#[command(about = "A single-connection HTTP/1.1 server for small devices", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g., 0.0.0.0)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Read timeout per connection in milliseconds (unset = block forever)
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Write timeout per connection in milliseconds (unset = block forever)
    #[arg(long)]
    pub write_timeout_ms: Option<u64>,

    /// Maximum header block size in bytes (unset = unbounded)
    #[arg(long)]
    pub max_header_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Read timeout per connection in milliseconds
    pub read_timeout_ms: Option<u64>,
    /// Write timeout per connection in milliseconds
    pub write_timeout_ms: Option<u64>,
    /// Maximum header block size in bytes
    pub max_header_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_ms: None,
            write_timeout_ms: None,
            max_header_bytes: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub max_header_bytes: Option<usize>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let server = toml_config.server;
        Config {
            host: cli.host.unwrap_or(server.host),
            port: cli.port.unwrap_or(server.port),
            read_timeout: cli
                .read_timeout_ms
                .or(server.read_timeout_ms)
                .map(Duration::from_millis),
            write_timeout: cli
                .write_timeout_ms
                .or(server.write_timeout_ms)
                .map(Duration::from_millis),
            max_header_bytes: cli.max_header_bytes.or(server.max_header_bytes),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }

    /// Resolve host and port to the address to bind.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = || ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port));
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidAddress(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidAddress(addr) => {
                write!(f, "Cannot resolve listen address '{}'", addr)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("microweb").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 80);
        assert_eq!(config.server.read_timeout_ms, None);
        assert_eq!(config.server.max_header_bytes, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "192.168.4.1"
            port = 8080
            read_timeout_ms = 5000
            max_header_bytes = 4096

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "192.168.4.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.read_timeout_ms, Some(5000));
        assert_eq!(config.server.write_timeout_ms, None);
        assert_eq!(config.server.max_header_bytes, Some(4096));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_merge_defaults() {
        let config = Config::merge(cli(&[]), TomlConfig::default());
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 80);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.write_timeout, None);
        assert_eq!(config.max_header_bytes, None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.listen_addr().unwrap(), "0.0.0.0:80".parse().unwrap());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            port = 8080
            read_timeout_ms = 1000

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        let config = Config::merge(
            cli(&["-H", "127.0.0.1", "--port", "9000", "--log-level", "trace"]),
            file,
        );
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.read_timeout, Some(Duration::from_millis(1000)));
        assert_eq!(config.log_level, "trace");
    }
}
