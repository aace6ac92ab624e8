//! Configuration types for launching a Kafka test container.
//!
//! Configuration is loaded from YAML files and validated before use. Every
//! section is optional; an empty file yields the defaults.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::kafka::{CoordinationMode, DEFAULT_IMAGE, DEFAULT_READY_MESSAGE, DEFAULT_TAG};
use crate::proxy::{DEFAULT_PROXY_IMAGE, DEFAULT_PROXY_TAG};

/// Root configuration for the launcher.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LauncherConfig {
    /// Broker image and startup settings.
    #[serde(default)]
    pub kafka: KafkaImageConfig,

    /// Proxy sidecar image.
    #[serde(default)]
    pub proxy: ProxyImageConfig,

    /// Embedded or external ZooKeeper.
    #[serde(default)]
    pub coordination: CoordinationMode,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Broker container configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KafkaImageConfig {
    /// Image repository.
    #[serde(default = "default_kafka_image")]
    pub image: String,

    /// Image tag.
    #[serde(default = "default_kafka_tag")]
    pub tag: String,

    /// Seconds to wait for the broker to report it has started.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Log line that marks the broker as ready.
    #[serde(default = "default_ready_message")]
    pub ready_message: String,

    /// Additional broker environment, applied after the defaults.
    /// Values support environment variable expansion: "${LOG_RETENTION}"
    #[serde(default)]
    pub extra_env: BTreeMap<String, String>,
}

/// Proxy sidecar configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyImageConfig {
    /// Image repository.
    #[serde(default = "default_proxy_image")]
    pub image: String,

    /// Image tag.
    #[serde(default = "default_proxy_tag")]
    pub tag: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

// Default value functions

fn default_kafka_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_kafka_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_startup_timeout_secs() -> u64 {
    120
}

fn default_ready_message() -> String {
    DEFAULT_READY_MESSAGE.to_string()
}

fn default_proxy_image() -> String {
    DEFAULT_PROXY_IMAGE.to_string()
}

fn default_proxy_tag() -> String {
    DEFAULT_PROXY_TAG.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations

impl Default for KafkaImageConfig {
    fn default() -> Self {
        Self {
            image: default_kafka_image(),
            tag: default_kafka_tag(),
            startup_timeout_secs: default_startup_timeout_secs(),
            ready_message: default_ready_message(),
            extra_env: BTreeMap::new(),
        }
    }
}

impl KafkaImageConfig {
    /// Startup timeout as a `Duration`.
    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl Default for ProxyImageConfig {
    fn default() -> Self {
        Self {
            image: default_proxy_image(),
            tag: default_proxy_tag(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Expand environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable `VAR_NAME`.
/// If the variable is not set, replaces with an empty string.
fn expand_env_vars(s: &str) -> String {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex");
    re.replace_all(s, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .to_string()
}

// Configuration loading and validation

impl LauncherConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        // An empty document deserializes to unit, not to an empty map.
        let mut config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.expand_env();
        config.validate()?;
        Ok(config)
    }

    /// Replace `${VAR}` references in image names, tags, the ZooKeeper
    /// connect string and extra broker environment.
    pub fn expand_env(&mut self) {
        self.kafka.image = expand_env_vars(&self.kafka.image);
        self.kafka.tag = expand_env_vars(&self.kafka.tag);
        for value in self.kafka.extra_env.values_mut() {
            *value = expand_env_vars(value);
        }
        self.proxy.image = expand_env_vars(&self.proxy.image);
        self.proxy.tag = expand_env_vars(&self.proxy.tag);
        if let CoordinationMode::External { connect } = &mut self.coordination {
            *connect = expand_env_vars(connect);
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation check fails.
    pub fn validate(&self) -> ConfigResult<()> {
        check_not_empty("kafka.image", &self.kafka.image)?;
        check_not_empty("kafka.tag", &self.kafka.tag)?;
        check_not_empty("proxy.image", &self.proxy.image)?;
        check_not_empty("proxy.tag", &self.proxy.tag)?;

        if self.kafka.startup_timeout_secs == 0 {
            return Err(ConfigError::ZeroStartupTimeout);
        }

        if let CoordinationMode::External { connect } = &self.coordination {
            validate_connect_string(connect)?;
        }

        Ok(())
    }
}

fn check_not_empty(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyImage(field.to_string()));
    }
    Ok(())
}

/// Validate a ZooKeeper connect string: `host:port[,host:port...][/chroot]`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidConnectString`] if any server entry lacks a
/// host or a valid port.
pub fn validate_connect_string(connect: &str) -> ConfigResult<()> {
    let invalid = || ConfigError::InvalidConnectString(connect.to_string());

    let servers = match connect.split_once('/') {
        Some((servers, _chroot)) => servers,
        None => connect,
    };
    if servers.is_empty() {
        return Err(invalid());
    }

    for server in servers.split(',') {
        let (host, port) = server.rsplit_once(':').ok_or_else(invalid)?;
        if host.trim().is_empty() {
            return Err(invalid());
        }
        match port.parse::<u16>() {
            Ok(p) if p > 0 => {}
            _ => return Err(invalid()),
        }
    }
    Ok(())
}
