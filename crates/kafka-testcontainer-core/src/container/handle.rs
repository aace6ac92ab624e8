//! Handle to a running container.

use crate::error::{ContainerError, Result};

/// A container that a runtime has started.
///
/// Holds the host address and the container-to-host port mappings resolved at
/// start time, so reading them never goes back to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Runtime-assigned container id.
    pub id: String,
    /// `image:tag` the container runs.
    pub image: String,
    /// Host name or address where published ports are reachable.
    pub host: String,
    /// `(container_port, host_port)` in exposure order.
    pub port_mappings: Vec<(u16, u16)>,
}

impl ContainerHandle {
    /// Host address reachable from the test process.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host port published for a container port.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::PortNotMapped`] if the port was not exposed.
    pub fn mapped_port(&self, container_port: u16) -> Result<u16> {
        self.port_mappings
            .iter()
            .find(|(port, _)| *port == container_port)
            .map(|(_, host_port)| *host_port)
            .ok_or_else(|| ContainerError::PortNotMapped {
                container_id: self.id.clone(),
                port: container_port,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ContainerHandle {
        ContainerHandle {
            id: "proxy-1".to_string(),
            image: "alpine/socat:1.0.3".to_string(),
            host: "localhost".to_string(),
            port_mappings: vec![(9092, 49153), (2181, 49154)],
        }
    }

    #[test]
    fn test_mapped_port_lookup() {
        let handle = handle();
        assert_eq!(handle.mapped_port(2181).unwrap(), 49154);
        assert_eq!(handle.mapped_port(9092).unwrap(), 49153);
    }

    #[test]
    fn test_unmapped_port() {
        let handle = handle();
        assert!(matches!(
            handle.mapped_port(9093),
            Err(ContainerError::PortNotMapped { port: 9093, .. })
        ));
    }
}
