//! Docker runtime backed by `testcontainers`.

use async_trait::async_trait;
use dashmap::DashMap;
use tempfile::TempDir;
use testcontainers::core::{AccessMode, IntoContainerPort, Mount, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt, TestcontainersError};
use tracing::{debug, info, instrument, warn};

use crate::container::{ContainerHandle, ContainerSpec, ReadyCondition};
use crate::error::{ContainerError, Result};

use super::ContainerRuntime;

/// A container kept alive by the runtime, plus the host files it mounts.
struct LiveContainer {
    container: ContainerAsync<GenericImage>,
    _resources: Option<TempDir>,
}

/// Runs containers on the local Docker daemon.
///
/// Live containers are owned by the runtime and removed on [`stop`]. Anything
/// still running when the runtime is dropped is removed by `testcontainers`.
///
/// [`stop`]: ContainerRuntime::stop
#[derive(Default)]
pub struct DockerRuntime {
    containers: DashMap<String, LiveContainer>,
}

impl DockerRuntime {
    /// Create a new runtime with no live containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of containers started and not yet stopped.
    #[must_use]
    pub fn live_containers(&self) -> usize {
        self.containers.len()
    }

    /// Translate a spec into a `testcontainers` request.
    fn request(spec: &ContainerSpec, resources: Option<&TempDir>) -> ContainerRequest<GenericImage> {
        let mut image = GenericImage::new(spec.image.clone(), spec.tag.clone());
        for port in &spec.exposed_ports {
            image = image.with_exposed_port(port.tcp());
        }
        image = match &spec.ready {
            ReadyCondition::Running => image,
            ReadyCondition::StdoutMessage(msg) => image.with_wait_for(WaitFor::message_on_stdout(msg)),
            ReadyCondition::StderrMessage(msg) => image.with_wait_for(WaitFor::message_on_stderr(msg)),
        };
        if let Some(entrypoint) = &spec.entrypoint {
            image = image.with_entrypoint(entrypoint);
        }

        let mut request: ContainerRequest<GenericImage> = image.into();
        request = request.with_startup_timeout(spec.startup_timeout);
        for (key, value) in &spec.env {
            request = request.with_env_var(key, value);
        }
        if let Some(network) = &spec.network {
            request = request.with_network(network);
        }
        // Docker resolves a container by name on user-defined networks.
        if let Some((alias, rest)) = spec.network_aliases.split_first() {
            request = request.with_container_name(alias);
            if !rest.is_empty() {
                warn!(alias = %alias, ignored = ?rest, "only the first network alias is registered");
            }
        }
        if let Some(command) = &spec.command {
            request = request.with_cmd(command);
        }
        if let Some(dir) = resources {
            for mount in &spec.mounts {
                let source = dir.path().join(&mount.resource);
                let access = if mount.read_only {
                    AccessMode::ReadOnly
                } else {
                    AccessMode::ReadWrite
                };
                request = request.with_mount(
                    Mount::bind_mount(source.to_string_lossy().into_owned(), &mount.container_path)
                        .with_access_mode(access),
                );
            }
        }
        request
    }

    /// Write mount contents to a temporary directory on the host.
    async fn materialize(spec: &ContainerSpec) -> Result<Option<TempDir>> {
        if spec.mounts.is_empty() {
            return Ok(None);
        }
        let dir = tempfile::Builder::new().prefix("kafka-testcontainer-").tempdir()?;
        for mount in &spec.mounts {
            let path = dir.path().join(&mount.resource);
            tokio::fs::write(&path, mount.contents.as_bytes()).await?;
            debug!(resource = %mount.resource, path = %path.display(), "materialized resource");
        }
        Ok(Some(dir))
    }
}

fn runtime_error(image: String, err: TestcontainersError) -> ContainerError {
    ContainerError::Runtime {
        image,
        message: err.to_string(),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    #[instrument(skip(self, spec), fields(image = %spec.image_ref()))]
    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let image = spec.image_ref();
        let resources = Self::materialize(spec).await?;
        let request = Self::request(spec, resources.as_ref());

        let container = request
            .start()
            .await
            .map_err(|e| runtime_error(image.clone(), e))?;

        let host = container
            .get_host()
            .await
            .map_err(|e| runtime_error(image.clone(), e))?
            .to_string();

        let mut port_mappings = Vec::with_capacity(spec.exposed_ports.len());
        for &port in &spec.exposed_ports {
            let host_port = container
                .get_host_port_ipv4(port.tcp())
                .await
                .map_err(|e| runtime_error(image.clone(), e))?;
            port_mappings.push((port, host_port));
        }

        let handle = ContainerHandle {
            id: container.id().to_string(),
            image,
            host,
            port_mappings,
        };
        info!(id = %handle.id, host = %handle.host, ports = ?handle.port_mappings, "container started");

        self.containers.insert(
            handle.id.clone(),
            LiveContainer {
                container,
                _resources: resources,
            },
        );
        Ok(handle)
    }

    #[instrument(skip(self, handle), fields(id = %handle.id, image = %handle.image))]
    async fn stop(&self, handle: &ContainerHandle) -> Result<()> {
        let Some((_, live)) = self.containers.remove(&handle.id) else {
            debug!("container not live, nothing to stop");
            return Ok(());
        };

        live.container
            .stop()
            .await
            .map_err(|e| runtime_error(handle.image.clone(), e))?;
        live.container
            .rm()
            .await
            .map_err(|e| runtime_error(handle.image.clone(), e))?;

        info!("container stopped");
        Ok(())
    }
}
