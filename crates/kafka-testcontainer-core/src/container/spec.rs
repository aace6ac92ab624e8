//! Container specification assembled before start.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default time allowed for a container to become ready.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);

/// How a runtime decides that a started container is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyCondition {
    /// Ready as soon as the container process is running.
    Running,
    /// Ready once the given line appears on stdout.
    StdoutMessage(String),
    /// Ready once the given line appears on stderr.
    StderrMessage(String),
}

/// A read-only file provided to the container from bundled contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMount {
    /// Logical resource name, used as the host-side file name.
    pub resource: String,
    /// File contents.
    pub contents: String,
    /// Absolute path inside the container.
    pub container_path: String,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

impl ResourceMount {
    /// Create a read-only resource mount.
    #[must_use]
    pub fn read_only(
        resource: impl Into<String>,
        contents: impl Into<String>,
        container_path: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            contents: contents.into(),
            container_path: container_path.into(),
            read_only: true,
        }
    }
}

/// Everything a runtime needs to create and start one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image repository, e.g. `confluentinc/cp-kafka`.
    pub image: String,
    /// Image tag.
    pub tag: String,
    /// Environment variables, ordered by key.
    pub env: BTreeMap<String, String>,
    /// Container ports to publish on the host, in exposure order.
    pub exposed_ports: Vec<u16>,
    /// Name of the network to attach to.
    pub network: Option<String>,
    /// DNS names of the container on `network`.
    pub network_aliases: Vec<String>,
    /// Entrypoint override.
    pub entrypoint: Option<String>,
    /// Command override.
    pub command: Option<Vec<String>>,
    /// Files provided to the container.
    pub mounts: Vec<ResourceMount>,
    /// Readiness condition.
    pub ready: ReadyCondition,
    /// Time allowed to reach `ready`.
    pub startup_timeout: Duration,
}

impl ContainerSpec {
    /// Create a spec for the given image with nothing else configured.
    #[must_use]
    pub fn new(image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tag: tag.into(),
            env: BTreeMap::new(),
            exposed_ports: Vec::new(),
            network: None,
            network_aliases: Vec::new(),
            entrypoint: None,
            command: None,
            mounts: Vec::new(),
            ready: ReadyCondition::Running,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Full image reference, `image:tag`.
    #[must_use]
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Set an environment variable, replacing any previous value.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Get an environment variable.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Publish a container port. Ports already exposed keep their position.
    pub fn expose_port(&mut self, port: u16) {
        if !self.exposed_ports.contains(&port) {
            self.exposed_ports.push(port);
        }
    }

    /// Whether a port is in the exposed set.
    #[must_use]
    pub fn exposes(&self, port: u16) -> bool {
        self.exposed_ports.contains(&port)
    }

    /// Append a network alias.
    pub fn add_network_alias(&mut self, alias: impl Into<String>) {
        self.network_aliases.push(alias.into());
    }

    /// The alias other containers should use to reach this one.
    #[must_use]
    pub fn first_network_alias(&self) -> Option<&str> {
        self.network_aliases.first().map(String::as_str)
    }
}
