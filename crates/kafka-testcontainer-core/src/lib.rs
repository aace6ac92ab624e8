//! Kafka Test Container Core Library
//!
//! This library launches a disposable Kafka broker (optionally with an embedded
//! ZooKeeper) for integration tests, together with a `socat` proxy sidecar that
//! publishes the broker to the test host.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Launcher configuration loading and validation
//! - [`error`] - Domain-specific error types
//! - [`kafka`] - Broker configuration, listener topology and lifecycle
//! - [`proxy`] - The `socat` proxy sidecar
//! - [`network`] - Isolated network names and broker aliases
//! - [`container`] - Runtime-neutral container specs and handles
//! - [`runtime`] - Container runtimes (Docker via `testcontainers`)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kafka_testcontainer_core::{DockerRuntime, KafkaContainer};
//!
//! let mut kafka = KafkaContainer::new(Arc::new(DockerRuntime::new()), "4.0.0")
//!     .with_external_zookeeper("zk:2181");
//! kafka.start().await?;
//! println!("{}", kafka.bootstrap_address()?);
//! kafka.stop().await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod container;
pub mod error;
pub mod kafka;
pub mod network;
pub mod proxy;
pub mod runtime;

/// Test utilities for integration testing.
///
/// This module is only available when compiling tests or when the `testing` feature is enabled.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::{LauncherConfig, LoggingConfig};
pub use container::{ContainerHandle, ContainerSpec};
pub use error::{ConfigError, ContainerError, Result};
pub use kafka::{CoordinationMode, KafkaBuilder, KafkaContainer};
pub use proxy::SocatProxy;
pub use runtime::{ContainerRuntime, DockerRuntime};
