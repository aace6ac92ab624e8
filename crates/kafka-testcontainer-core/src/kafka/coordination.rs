//! ZooKeeper coordination mode.

use serde::{Deserialize, Serialize};

use crate::container::{ContainerSpec, ResourceMount};

use super::{env, ZOOKEEPER_PORT};

/// Properties file used to start the embedded ZooKeeper.
pub const ZOOKEEPER_PROPERTIES: &str = include_str!("../../resources/zookeeper.properties");

/// Path of the properties file inside the broker container.
pub const ZOOKEEPER_PROPERTIES_PATH: &str = "/zookeeper.properties";

/// Entrypoint of the Confluent broker image.
pub const BROKER_ENTRYPOINT: &str = "/etc/confluent/docker/run";

/// Where the broker finds ZooKeeper.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CoordinationMode {
    /// ZooKeeper runs in the broker container, started before the broker.
    #[default]
    Embedded,
    /// ZooKeeper runs elsewhere; nothing is started locally.
    External {
        /// ZooKeeper connect string, e.g. `zk:2181`.
        connect: String,
    },
}

impl CoordinationMode {
    /// External mode with the given connect string.
    #[must_use]
    pub fn external(connect: impl Into<String>) -> Self {
        Self::External {
            connect: connect.into(),
        }
    }

    /// Whether ZooKeeper runs inside the broker container.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded)
    }

    /// Value of `KAFKA_ZOOKEEPER_CONNECT` for this mode.
    #[must_use]
    pub fn connect_string(&self) -> String {
        match self {
            Self::Embedded => format!("localhost:{ZOOKEEPER_PORT}"),
            Self::External { connect } => connect.clone(),
        }
    }

    /// Apply this mode to the broker spec.
    ///
    /// Embedded mode also publishes the ZooKeeper port, mounts its properties
    /// read-only and starts it in the background ahead of the broker.
    pub fn apply(&self, spec: &mut ContainerSpec) {
        spec.set_env(env::ZOOKEEPER_CONNECT, self.connect_string());

        if self.is_embedded() {
            spec.expose_port(ZOOKEEPER_PORT);
            spec.mounts.push(ResourceMount::read_only(
                "zookeeper.properties",
                ZOOKEEPER_PROPERTIES,
                ZOOKEEPER_PROPERTIES_PATH,
            ));
            spec.command = Some(embedded_command());
        }
    }
}

/// Command that backgrounds ZooKeeper, then runs the broker entrypoint.
#[must_use]
pub fn embedded_command() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("zookeeper-server-start {ZOOKEEPER_PROPERTIES_PATH} & {BROKER_ENTRYPOINT}"),
    ]
}
