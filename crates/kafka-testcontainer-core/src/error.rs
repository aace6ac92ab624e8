//! Domain error types for the Kafka test container.
//!
//! Uses `thiserror` for ergonomic error definitions with proper context.

use thiserror::Error;

/// Errors related to configuration parsing and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Image name or tag is empty.
    #[error("image {0} must not be empty")]
    EmptyImage(String),

    /// External ZooKeeper connect string is malformed.
    #[error("invalid zookeeper connect string: {0} (expected 'host:port[,host:port...][/chroot]')")]
    InvalidConnectString(String),

    /// Startup timeout must be positive.
    #[error("startup_timeout_secs must be at least 1")]
    ZeroStartupTimeout,
}

/// Errors that occur while starting or stopping containers.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The container runtime failed (image pull, create, start, stop).
    #[error("container runtime error for image {image}: {message}")]
    Runtime { image: String, message: String },

    /// A port was expected to be published but has no host mapping.
    #[error("port {port} is not mapped on container {container_id}")]
    PortNotMapped { container_id: String, port: u16 },

    /// The broker has no network alias to advertise.
    #[error("broker container has no network alias")]
    MissingNetworkAlias,

    /// The broker is not attached to a network the proxy can join.
    #[error("broker container has no network")]
    MissingNetwork,

    /// The container has not been started yet.
    #[error("container not started")]
    NotStarted,

    /// The container was already started.
    #[error("container already started")]
    AlreadyStarted,

    /// Failed to materialize a resource mount on the host.
    #[error("resource mount error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid launcher configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
