//! Runtime-neutral container descriptions.
//!
//! A [`ContainerSpec`] is what the Kafka configurator and the proxy sidecar
//! build up; a [`ContainerHandle`] is what a runtime hands back once the
//! container is live.

mod handle;
mod spec;

pub use handle::ContainerHandle;
pub use spec::{ContainerSpec, ReadyCondition, ResourceMount};
