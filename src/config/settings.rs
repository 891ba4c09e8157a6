//! Configuration settings for cmdwire.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::WireError;
use crate::protocol::DEFAULT_MAX_MESSAGE_SIZE;
use crate::router::UnknownCommandPolicy;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub socket: SocketConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

/// Socket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Path to the Unix socket file.
    pub path: PathBuf,
    /// Socket file permissions (e.g., "0660").
    #[serde(default = "default_socket_permissions")]
    pub permissions: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum line length in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Idle read and write timeout in seconds.
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_seconds: u64,
    /// Maximum concurrent connections.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_connections: usize,
}

/// Router behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    /// What to do with well-formed messages for unregistered commands.
    #[serde(default)]
    pub unknown_commands: UnknownCommandPolicy,
}

// Default value functions
fn default_socket_permissions() -> String {
    "0660".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_socket_timeout() -> u64 {
    300
}

fn default_max_concurrent() -> usize {
    64
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            socket_timeout_seconds: default_socket_timeout(),
            max_concurrent_connections: default_max_concurrent(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WireError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| WireError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::parse(&content).map_err(|e| WireError::Config {
            message: format!("Invalid config file '{}': {}", path.display(), e),
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn parse(content: &str) -> Result<Self, WireError> {
        let settings: Settings = toml::from_str(content).map_err(|e| WireError::Config {
            message: e.to_string(),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), WireError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(WireError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(WireError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        let permissions = &self.socket.permissions;
        if permissions.is_empty() || !permissions.chars().all(|c| c.is_digit(8)) {
            return Err(WireError::Config {
                message: format!(
                    "Invalid socket permissions '{}'. Must be octal (e.g., '0660')",
                    self.socket.permissions
                ),
            });
        }

        if self.limits.max_message_size == 0 || self.limits.max_concurrent_connections == 0 {
            return Err(WireError::Config {
                message: "limits.max_message_size and limits.max_concurrent_connections must be positive"
                    .to_string(),
            });
        }

        if self.limits.socket_timeout_seconds == 0 {
            return Err(WireError::Config {
                message: "limits.socket_timeout_seconds must be positive".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let settings = Settings::parse("[socket]\npath = \"/run/cmdwire.sock\"\n").unwrap();
        assert_eq!(settings.socket.path, PathBuf::from("/run/cmdwire.sock"));
        assert_eq!(settings.socket.permissions, "0660");
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, "pretty");
        assert_eq!(settings.limits.max_message_size, 65_536);
        assert_eq!(settings.limits.max_concurrent_connections, 64);
        assert_eq!(settings.router.unknown_commands, UnknownCommandPolicy::Reject);
    }

    #[test]
    fn test_full_config() {
        let settings = Settings::parse(
            r#"
            [socket]
            path = "/tmp/cmd.sock"
            permissions = "0600"

            [logging]
            level = "debug"
            format = "json"

            [limits]
            max_message_size = 1024
            socket_timeout_seconds = 5
            max_concurrent_connections = 2

            [router]
            unknown_commands = "ignore"
            "#,
        )
        .unwrap();

        assert_eq!(settings.socket.permissions, "0600");
        assert_eq!(settings.logging.format, "json");
        assert_eq!(settings.limits.socket_timeout_seconds, 5);
        assert_eq!(settings.router.unknown_commands, UnknownCommandPolicy::Ignore);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "[socket]\npath = \"/s\"\n[logging]\nlevel = \"loud\"\n",
            "[socket]\npath = \"/s\"\n[logging]\nformat = \"xml\"\n",
            "[socket]\npath = \"/s\"\npermissions = \"rw\"\n",
            "[socket]\npath = \"/s\"\npermissions = \"0980\"\n",
            "[socket]\npath = \"/s\"\n[router]\nunknown_commands = \"maybe\"\n",
            "[socket]\npath = \"/s\"\n[limits]\nmax_message_size = 0\n",
            "[socket]\npath = \"/s\"\npermissions = \"\"\n",
            "[socket]\npath = \"/s\"\n[limits]\nsocket_timeout_seconds = 0\n",
            "[logging]\nlevel = \"info\"\n",
        ];

        for case in cases {
            assert!(
                matches!(Settings::parse(case), Err(WireError::Config { .. })),
                "accepted: {case}"
            );
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = Settings::load("/nonexistent/cmdwire.toml");
        assert!(matches!(result, Err(WireError::Config { .. })));
    }
}
