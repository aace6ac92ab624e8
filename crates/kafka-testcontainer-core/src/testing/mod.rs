//! Test utilities for the Kafka test container.
//!
//! - [`MockRuntime`] - an in-memory [`ContainerRuntime`](crate::runtime::ContainerRuntime)
//!   that records calls instead of talking to Docker
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kafka_testcontainer_core::testing::MockRuntime;
//! use kafka_testcontainer_core::KafkaContainer;
//!
//! #[tokio::test]
//! async fn test_start() {
//!     let runtime = Arc::new(MockRuntime::new());
//!     let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
//!     kafka.start().await.unwrap();
//!
//!     assert_eq!(runtime.started_specs().await.len(), 2);
//! }
//! ```

pub mod mock_runtime;

pub use mock_runtime::{MockRuntime, RuntimeCall, FIRST_HOST_PORT};
