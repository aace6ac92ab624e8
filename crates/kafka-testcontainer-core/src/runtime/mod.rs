//! Container runtimes.
//!
//! The Kafka configurator never talks to Docker directly. It hands a
//! [`ContainerSpec`] to a [`ContainerRuntime`] and gets a [`ContainerHandle`]
//! back.
//!
//! - [`DockerRuntime`] - runs containers through `testcontainers`
//! - `MockRuntime` (in [`crate::testing`]) - records calls without Docker

pub mod docker;

use async_trait::async_trait;

use crate::container::{ContainerHandle, ContainerSpec};
use crate::error::Result;

pub use docker::DockerRuntime;

/// Start/stop primitive shared by the broker and its proxy.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start a container, waiting until it is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be pulled, the container cannot be
    /// created, or it does not become ready in time.
    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle>;

    /// Stop a container started by this runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to stop or remove the container.
    async fn stop(&self, handle: &ContainerHandle) -> Result<()>;
}
