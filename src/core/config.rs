use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub unix_socket: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_wal_path")]
    pub wal_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Idle lifetime of a session in seconds
    #[serde(default = "default_session_ttl")]
    pub ttl: i64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    #[serde(default)]
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// When false, `/feedback/{id}/delete` accepts any caller
    #[serde(default)]
    pub owner_check_on_feedback_delete: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            wal_path: default_wal_path(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl: default_session_ttl(),
            cleanup_interval: default_cleanup_interval(),
            secure_cookie: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
            owner_check_on_feedback_delete: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_wal_path() -> PathBuf {
    PathBuf::from("feedback.wal")
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_session_ttl() -> i64 {
    86_400 // 24 hours
}

fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port.is_none() && self.server.unix_socket.is_none() {
            bail!("Either port or unix_socket must be specified in server config");
        }

        if let Some(port) = self.server.port {
            if port == 0 {
                bail!("Server port must be greater than 0");
            }
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.storage.wal_path.as_os_str().is_empty() {
            bail!("wal_path must not be empty");
        }

        if self.session.cookie_name.is_empty() {
            bail!("cookie_name must not be empty");
        }

        if !self
            .session
            .cookie_name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            bail!(
                "Invalid cookie_name '{}'. Only letters, digits, '_' and '-' are allowed",
                self.session.cookie_name
            );
        }

        if self.session.ttl <= 0 {
            bail!("session ttl must be greater than 0");
        }

        if self.session.cleanup_interval == 0 {
            bail!("cleanup_interval must be greater than 0");
        }

        if self.session.ttl <= self.session.cleanup_interval as i64 {
            bail!(
                "session ttl ({}) must be greater than cleanup_interval ({})",
                self.session.ttl,
                self.session.cleanup_interval
            );
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            bail!(
                "bcrypt_cost ({}) must be between 4 and 31",
                self.auth.bcrypt_cost
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]
        port = 5000
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).expect("Failed to load config");

        assert_eq!(config.server.port, Some(5000));
        assert!(config.server.num_threads > 0);
        assert_eq!(config.storage.wal_path, PathBuf::from("feedback.wal"));
        assert_eq!(config.session.cookie_name, "session");
        assert_eq!(config.session.ttl, 86_400);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(!config.auth.owner_check_on_feedback_delete);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [server]
            unix_socket = "/tmp/feedback.sock"
            num_threads = 2

            [storage]
            wal_path = "/var/lib/feedback/feedback.wal"

            [session]
            cookie_name = "fb_session"
            ttl = 3600
            cleanup_interval = 60
            secure_cookie = true

            [auth]
            bcrypt_cost = 10
            owner_check_on_feedback_delete = true

            [logging]
            level = "debug"
            format = "console"
            console = true
            "#,
        )
        .expect("Failed to load config");

        assert_eq!(config.server.port, None);
        assert_eq!(config.server.unix_socket, Some(PathBuf::from("/tmp/feedback.sock")));
        assert_eq!(config.server.num_threads, 2);
        assert_eq!(config.session.cookie_name, "fb_session");
        assert!(config.session.secure_cookie);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert!(config.auth.owner_check_on_feedback_delete);
        assert_eq!(config.logging.format, "console");
    }

    #[test]
    fn test_requires_a_listener() {
        let result = Config::from_toml("[server]\nnum_threads = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_bcrypt_cost() {
        let result = Config::from_toml("[server]\nport = 5000\n[auth]\nbcrypt_cost = 3\n");
        assert!(result.is_err());

        let result = Config::from_toml("[server]\nport = 5000\n[auth]\nbcrypt_cost = 32\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_ttl_not_above_cleanup_interval() {
        let result = Config::from_toml(
            "[server]\nport = 5000\n[session]\nttl = 60\ncleanup_interval = 60\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_cookie_name() {
        let result = Config::from_toml("[server]\nport = 5000\n[session]\ncookie_name = \"a b;\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let result = Config::from_toml("[server]\nport = 5000\n[logging]\nformat = \"xml\"\n");
        assert!(result.is_err());
    }
}
