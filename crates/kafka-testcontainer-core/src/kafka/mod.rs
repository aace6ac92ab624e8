//! Kafka broker container.
//!
//! - [`KafkaContainer`] - configures and starts the broker and its proxy
//! - [`KafkaBuilder`] - hooks available to deferred configuration callbacks
//! - [`CoordinationMode`] - embedded or external ZooKeeper
//! - [`listeners`] - the dual listener topology

pub mod container;
pub mod coordination;
pub mod listeners;

pub use container::{BrokerConfig, KafkaBuilder, KafkaContainer};
pub use coordination::CoordinationMode;

/// Client (plaintext) port, published through the proxy.
pub const KAFKA_PORT: u16 = 9092;

/// Inter-broker port, reached by network alias.
pub const BROKER_PORT: u16 = 9093;

/// Embedded ZooKeeper client port.
pub const ZOOKEEPER_PORT: u16 = 2181;

/// Default broker image.
pub const DEFAULT_IMAGE: &str = "confluentinc/cp-kafka";

/// Default broker image tag (Confluent Platform version).
pub const DEFAULT_TAG: &str = "4.0.0";

/// Line the broker logs once it is serving requests.
pub const DEFAULT_READY_MESSAGE: &str = "started (kafka.server.KafkaServer)";

/// Environment variables understood by the Confluent broker image.
pub mod env {
    pub const LISTENERS: &str = "KAFKA_LISTENERS";
    pub const LISTENER_SECURITY_PROTOCOL_MAP: &str = "KAFKA_LISTENER_SECURITY_PROTOCOL_MAP";
    pub const INTER_BROKER_LISTENER_NAME: &str = "KAFKA_INTER_BROKER_LISTENER_NAME";
    pub const BROKER_ID: &str = "KAFKA_BROKER_ID";
    pub const OFFSETS_TOPIC_REPLICATION_FACTOR: &str = "KAFKA_OFFSETS_TOPIC_REPLICATION_FACTOR";
    pub const OFFSETS_TOPIC_NUM_PARTITIONS: &str = "KAFKA_OFFSETS_TOPIC_NUM_PARTITIONS";
    pub const LOG_FLUSH_INTERVAL_MESSAGES: &str = "KAFKA_LOG_FLUSH_INTERVAL_MESSAGES";
    pub const ADVERTISED_LISTENERS: &str = "KAFKA_ADVERTISED_LISTENERS";
    pub const ZOOKEEPER_CONNECT: &str = "KAFKA_ZOOKEEPER_CONNECT";
}
