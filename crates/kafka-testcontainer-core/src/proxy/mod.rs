//! TCP proxy sidecar.
//!
//! A `socat` container that joins the broker's network and republishes
//! selected ports of another container on host-mapped ports.

use crate::container::ContainerSpec;

/// Default proxy image.
pub const DEFAULT_PROXY_IMAGE: &str = "alpine/socat";

/// Default proxy image tag.
pub const DEFAULT_PROXY_TAG: &str = "1.0.3";

/// A port forwarded by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    /// Port the proxy listens on and publishes.
    pub listen_port: u16,
    /// Host to forward to, resolved on the shared network.
    pub host: String,
    /// Port on `host`.
    pub port: u16,
}

/// Builder for the proxy sidecar's container spec.
#[derive(Debug, Clone)]
pub struct SocatProxy {
    image: String,
    tag: String,
    network: Option<String>,
    targets: Vec<ProxyTarget>,
}

impl Default for SocatProxy {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_IMAGE, DEFAULT_PROXY_TAG)
    }
}

impl SocatProxy {
    /// Create a proxy using the given image.
    #[must_use]
    pub fn new(image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tag: tag.into(),
            network: None,
            targets: Vec::new(),
        }
    }

    /// Attach the proxy to a network.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Forward `port` to the same port on `host`.
    #[must_use]
    pub fn with_target(self, port: u16, host: impl Into<String>) -> Self {
        self.with_target_port(port, host, port)
    }

    /// Forward `listen_port` to `port` on `host`.
    #[must_use]
    pub fn with_target_port(mut self, listen_port: u16, host: impl Into<String>, port: u16) -> Self {
        self.targets.push(ProxyTarget {
            listen_port,
            host: host.into(),
            port,
        });
        self
    }

    /// Forwarded ports, in the order they were added.
    #[must_use]
    pub fn targets(&self) -> &[ProxyTarget] {
        &self.targets
    }

    /// The shell command that runs one `socat` per target.
    #[must_use]
    pub fn command(&self) -> String {
        self.targets
            .iter()
            .map(|t| {
                format!(
                    "socat TCP-LISTEN:{},fork,reuseaddr TCP:{}:{}",
                    t.listen_port, t.host, t.port
                )
            })
            .collect::<Vec<_>>()
            .join(" & ")
    }

    /// Build the container spec. The first target's port is exposed first.
    #[must_use]
    pub fn spec(&self) -> ContainerSpec {
        let mut spec = ContainerSpec::new(self.image.clone(), self.tag.clone());
        spec.network.clone_from(&self.network);
        spec.entrypoint = Some("/bin/sh".to_string());
        spec.command = Some(vec!["-c".to_string(), self.command()]);
        for target in &self.targets {
            spec.expose_port(target.listen_port);
        }
        spec
    }
}
