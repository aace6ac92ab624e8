//! In-memory container runtime for testing.
//!
//! A runtime that:
//! - Records every start and stop with a snapshot of the spec
//! - Hands out deterministic host ports starting at 49152
//! - Fails starts or stops for chosen images on request

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::container::{ContainerHandle, ContainerSpec};
use crate::error::{ContainerError, Result};
use crate::runtime::ContainerRuntime;

/// First host port handed out, the start of the IANA ephemeral range.
pub const FIRST_HOST_PORT: u16 = 49152;

/// A recorded runtime call.
#[derive(Debug, Clone)]
pub enum RuntimeCall {
    /// A start, with the spec as it was when the runtime saw it.
    Start {
        /// Id assigned to the container (also for failed starts).
        id: String,
        /// Spec snapshot.
        spec: ContainerSpec,
    },
    /// A stop attempt.
    Stop {
        /// Id of the container.
        id: String,
        /// `image:tag` of the container.
        image: String,
    },
}

/// Mock container runtime for testing.
pub struct MockRuntime {
    host: String,
    next_port: AtomicU16,
    next_id: AtomicUsize,
    stop_delay: Duration,
    fail_start: HashSet<String>,
    fail_stop: HashSet<String>,
    fail_start_once: RwLock<HashSet<String>>,
    fail_stop_once: RwLock<HashSet<String>>,
    call_log: Arc<RwLock<Vec<RuntimeCall>>>,
    running: Arc<RwLock<HashMap<String, ContainerHandle>>>,
    stops_in_flight: AtomicUsize,
    max_stops_in_flight: AtomicUsize,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// Create a runtime whose containers are reachable at `localhost`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            next_port: AtomicU16::new(FIRST_HOST_PORT),
            next_id: AtomicUsize::new(1),
            stop_delay: Duration::ZERO,
            fail_start: HashSet::new(),
            fail_stop: HashSet::new(),
            fail_start_once: RwLock::new(HashSet::new()),
            fail_stop_once: RwLock::new(HashSet::new()),
            call_log: Arc::new(RwLock::new(Vec::new())),
            running: Arc::new(RwLock::new(HashMap::new())),
            stops_in_flight: AtomicUsize::new(0),
            max_stops_in_flight: AtomicUsize::new(0),
        }
    }

    /// Report `host` as the address of every container.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Fail every start of the given image repository.
    #[must_use]
    pub fn fail_start_for(mut self, image: impl Into<String>) -> Self {
        self.fail_start.insert(image.into());
        self
    }

    /// Fail every stop of the given image repository.
    #[must_use]
    pub fn fail_stop_for(mut self, image: impl Into<String>) -> Self {
        self.fail_stop.insert(image.into());
        self
    }

    /// Fail only the next start of the given image repository.
    #[must_use]
    pub fn fail_next_start_for(mut self, image: impl Into<String>) -> Self {
        self.fail_start_once.get_mut().insert(image.into());
        self
    }

    /// Fail only the next stop of the given image repository.
    #[must_use]
    pub fn fail_next_stop_for(mut self, image: impl Into<String>) -> Self {
        self.fail_stop_once.get_mut().insert(image.into());
        self
    }

    /// Hold each stop for `delay` before completing it.
    #[must_use]
    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    /// Get all recorded calls.
    pub async fn get_calls(&self) -> Vec<RuntimeCall> {
        self.call_log.read().await.clone()
    }

    /// Specs passed to start, in call order.
    pub async fn started_specs(&self) -> Vec<ContainerSpec> {
        self.call_log
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RuntimeCall::Start { spec, .. } => Some(spec.clone()),
                RuntimeCall::Stop { .. } => None,
            })
            .collect()
    }

    /// Spec of the first start of the given image repository.
    pub async fn started_spec_for(&self, image: &str) -> Option<ContainerSpec> {
        self.started_specs()
            .await
            .into_iter()
            .find(|spec| spec.image == image)
    }

    /// Ids passed to stop, in call order.
    pub async fn stopped_ids(&self) -> Vec<String> {
        self.call_log
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RuntimeCall::Stop { id, .. } => Some(id.clone()),
                RuntimeCall::Start { .. } => None,
            })
            .collect()
    }

    /// Containers started and not stopped.
    pub async fn running(&self) -> Vec<ContainerHandle> {
        let mut handles: Vec<_> = self.running.read().await.values().cloned().collect();
        handles.sort_by(|a, b| a.id.cmp(&b.id));
        handles
    }

    /// Whether the container is still running.
    pub async fn is_running(&self, id: &str) -> bool {
        self.running.read().await.contains_key(id)
    }

    /// Highest number of stops observed running at the same time.
    #[must_use]
    pub fn max_concurrent_stops(&self) -> usize {
        self.max_stops_in_flight.load(Ordering::SeqCst)
    }

    /// Clear the call log.
    pub async fn clear_calls(&self) {
        self.call_log.write().await.clear();
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.call_log.write().await.push(RuntimeCall::Start {
            id: id.clone(),
            spec: spec.clone(),
        });

        let injected = self.fail_start_once.write().await.remove(&spec.image);
        if injected || self.fail_start.contains(&spec.image) {
            return Err(ContainerError::Runtime {
                image: spec.image_ref(),
                message: "injected start failure".to_string(),
            });
        }

        let port_mappings = spec
            .exposed_ports
            .iter()
            .map(|&port| (port, self.next_port.fetch_add(1, Ordering::SeqCst)))
            .collect();
        let handle = ContainerHandle {
            id: id.clone(),
            image: spec.image_ref(),
            host: self.host.clone(),
            port_mappings,
        };
        self.running.write().await.insert(id, handle.clone());
        Ok(handle)
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<()> {
        let in_flight = self.stops_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_stops_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        self.call_log.write().await.push(RuntimeCall::Stop {
            id: handle.id.clone(),
            image: handle.image.clone(),
        });
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
        }

        let repository = handle
            .image
            .rsplit_once(':')
            .map_or(handle.image.as_str(), |(repo, _)| repo);
        let injected = self.fail_stop_once.write().await.remove(repository);
        let result = if injected || self.fail_stop.contains(repository) {
            Err(ContainerError::Runtime {
                image: handle.image.clone(),
                message: "injected stop failure".to_string(),
            })
        } else {
            self.running.write().await.remove(&handle.id);
            Ok(())
        };

        self.stops_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
