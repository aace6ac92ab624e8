//! Kafka broker container with a proxy sidecar.
//!
//! The broker lives on an isolated network under a random alias. On start a
//! `socat` proxy joins the same network and publishes the broker's client port
//! on the host; only then is the advertised listener known, so it is computed
//! between the two container starts.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::LauncherConfig;
use crate::container::{ContainerHandle, ContainerSpec, ReadyCondition};
use crate::error::{ContainerError, Result};
use crate::network::NetworkAllocator;
use crate::proxy::{SocatProxy, DEFAULT_PROXY_IMAGE, DEFAULT_PROXY_TAG};
use crate::runtime::ContainerRuntime;

use super::coordination::CoordinationMode;
use super::{env, listeners, DEFAULT_IMAGE, DEFAULT_READY_MESSAGE, DEFAULT_TAG, KAFKA_PORT, ZOOKEEPER_PORT};

/// Deferred configuration step, applied at start.
type Configurator = Box<dyn FnOnce(&mut KafkaBuilder<'_>) + Send>;

/// Mutable broker configuration, complete once start has applied every
/// deferred step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Container spec handed to the runtime.
    pub spec: ContainerSpec,
    /// Embedded or external ZooKeeper.
    pub coordination: CoordinationMode,
}

impl BrokerConfig {
    fn new(image: impl Into<String>, tag: impl Into<String>) -> Self {
        let mut spec = ContainerSpec::new(image, tag);
        spec.ready = ReadyCondition::StdoutMessage(DEFAULT_READY_MESSAGE.to_string());
        Self {
            spec,
            coordination: CoordinationMode::default(),
        }
    }

    /// Network alias the broker advertises to peers.
    #[must_use]
    pub fn network_alias(&self) -> Option<&str> {
        self.spec.first_network_alias()
    }
}

/// Configuration hooks handed to deferred callbacks.
pub struct KafkaBuilder<'a> {
    config: &'a mut BrokerConfig,
}

impl<'a> KafkaBuilder<'a> {
    fn new(config: &'a mut BrokerConfig) -> Self {
        Self { config }
    }

    /// Attach the broker to a network.
    pub fn with_network(&mut self, network: impl Into<String>) -> &mut Self {
        self.config.spec.network = Some(network.into());
        self
    }

    /// Add a network alias. The first alias is the one advertised.
    pub fn with_network_alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.config.spec.add_network_alias(alias);
        self
    }

    /// Drop every network alias, including the default one.
    pub fn clear_network_aliases(&mut self) -> &mut Self {
        self.config.spec.network_aliases.clear();
        self
    }

    /// Detach the broker from any network.
    pub fn without_network(&mut self) -> &mut Self {
        self.config.spec.network = None;
        self
    }

    /// Publish a container port.
    pub fn with_exposed_port(&mut self, port: u16) -> &mut Self {
        self.config.spec.expose_port(port);
        self
    }

    /// Set a broker environment variable.
    pub fn with_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.config.spec.set_env(key, value);
        self
    }

    /// Run ZooKeeper inside the broker container.
    pub fn use_embedded_coordination_service(&mut self) -> &mut Self {
        self.config.coordination = CoordinationMode::Embedded;
        self
    }

    /// Use an existing ZooKeeper at `connect`.
    pub fn use_external_coordination_service(&mut self, connect: impl Into<String>) -> &mut Self {
        self.config.coordination = CoordinationMode::external(connect);
        self
    }

    /// Configuration as it stands.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        self.config
    }
}

/// Network, alias, port and broker defaults for a single-node test broker.
fn apply_defaults(builder: &mut KafkaBuilder<'_>) {
    let allocation = NetworkAllocator::allocate();
    debug!(network = %allocation.network, alias = %allocation.alias, "allocated broker network");

    builder
        .with_network(allocation.network)
        .with_network_alias(allocation.alias.clone())
        .with_exposed_port(KAFKA_PORT)
        // Two named listeners make the broker talk to itself over BROKER
        // instead of the advertised PLAINTEXT address.
        .with_env(env::LISTENERS, listeners::listeners(&allocation.alias))
        .with_env(env::LISTENER_SECURITY_PROTOCOL_MAP, listeners::security_protocol_map())
        .with_env(env::INTER_BROKER_LISTENER_NAME, listeners::BROKER_LISTENER)
        .with_env(env::BROKER_ID, "1")
        .with_env(env::OFFSETS_TOPIC_REPLICATION_FACTOR, "1")
        .with_env(env::OFFSETS_TOPIC_NUM_PARTITIONS, "1")
        .with_env(env::LOG_FLUSH_INTERVAL_MESSAGES, i64::MAX.to_string());
}

/// A Kafka broker in a disposable container, reachable from the host through
/// a proxy sidecar.
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use kafka_testcontainer_core::{DockerRuntime, KafkaContainer};
///
/// let mut kafka = KafkaContainer::new(Arc::new(DockerRuntime::new()), "4.0.0");
/// kafka.start().await?;
/// let bootstrap = kafka.bootstrap_address()?;
/// // ...
/// kafka.stop().await?;
/// ```
pub struct KafkaContainer {
    runtime: Arc<dyn ContainerRuntime>,
    config: BrokerConfig,
    pending: Vec<Configurator>,
    proxy_image: String,
    proxy_tag: String,
    proxy: Option<ContainerHandle>,
    broker: Option<ContainerHandle>,
}

impl KafkaContainer {
    /// Broker at the default Confluent Platform version.
    #[must_use]
    pub fn with_runtime(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::new(runtime, DEFAULT_TAG)
    }

    /// Broker at the given Confluent Platform version with defaults applied.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, version: impl Into<String>) -> Self {
        Self::with_image(runtime, DEFAULT_IMAGE, version)
    }

    /// Broker from a custom image with defaults applied.
    #[must_use]
    pub fn with_image(
        runtime: Arc<dyn ContainerRuntime>,
        image: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        let mut config = BrokerConfig::new(image, tag);
        apply_defaults(&mut KafkaBuilder::new(&mut config));
        Self::from_parts(runtime, config, Vec::new())
    }

    /// Broker whose defaults and `configure` callback both run at start.
    ///
    /// The callback runs after the defaults, so it can replace the network,
    /// add aliases, override environment or pick the coordination mode.
    #[must_use]
    pub fn with_builder<F>(runtime: Arc<dyn ContainerRuntime>, version: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(&mut KafkaBuilder<'_>) + Send + 'static,
    {
        Self::with_builder_image(runtime, DEFAULT_IMAGE, version, configure)
    }

    /// Broker from a custom image whose defaults and `configure` callback run at start.
    #[must_use]
    pub fn with_builder_image<F>(
        runtime: Arc<dyn ContainerRuntime>,
        image: impl Into<String>,
        tag: impl Into<String>,
        configure: F,
    ) -> Self
    where
        F: FnOnce(&mut KafkaBuilder<'_>) + Send + 'static,
    {
        let config = BrokerConfig::new(image, tag);
        let defaults: Configurator = Box::new(apply_defaults);
        let configure: Configurator = Box::new(configure);
        Self::from_parts(runtime, config, vec![defaults, configure])
    }

    /// Broker described by a launcher configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn from_config(runtime: Arc<dyn ContainerRuntime>, config: &LauncherConfig) -> Result<Self> {
        config.validate()?;

        let mut container = Self::with_image(runtime, &config.kafka.image, &config.kafka.tag)
            .with_proxy_image(&config.proxy.image, &config.proxy.tag)
            .with_startup_timeout(config.kafka.startup_timeout());
        container.config.spec.ready = ReadyCondition::StdoutMessage(config.kafka.ready_message.clone());
        for (key, value) in &config.kafka.extra_env {
            container.config.spec.set_env(key, value);
        }
        container.config.coordination = config.coordination.clone();
        Ok(container)
    }

    fn from_parts(runtime: Arc<dyn ContainerRuntime>, config: BrokerConfig, pending: Vec<Configurator>) -> Self {
        Self {
            runtime,
            config,
            pending,
            proxy_image: DEFAULT_PROXY_IMAGE.to_string(),
            proxy_tag: DEFAULT_PROXY_TAG.to_string(),
            proxy: None,
            broker: None,
        }
    }

    /// Queue a switch to embedded ZooKeeper, applied at start.
    #[must_use]
    pub fn with_embedded_zookeeper(mut self) -> Self {
        self.pending
            .push(Box::new(|b: &mut KafkaBuilder<'_>| {
                b.use_embedded_coordination_service();
            }));
        self
    }

    /// Queue a switch to an external ZooKeeper, applied at start.
    #[must_use]
    pub fn with_external_zookeeper(mut self, connect: impl Into<String>) -> Self {
        let connect = connect.into();
        self.pending
            .push(Box::new(move |b: &mut KafkaBuilder<'_>| {
                b.use_external_coordination_service(connect);
            }));
        self
    }

    /// Set a broker environment variable now.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.spec.set_env(key, value);
        self
    }

    /// Use a different proxy image.
    #[must_use]
    pub fn with_proxy_image(mut self, image: impl Into<String>, tag: impl Into<String>) -> Self {
        self.proxy_image = image.into();
        self.proxy_tag = tag.into();
        self
    }

    /// Time allowed for the broker to become ready.
    #[must_use]
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.spec.startup_timeout = timeout;
        self
    }

    /// Run ZooKeeper inside the broker container.
    pub fn use_embedded_coordination_service(&mut self) {
        self.config.coordination = CoordinationMode::Embedded;
    }

    /// Use an existing ZooKeeper at `connect`.
    pub fn use_external_coordination_service(&mut self, connect: impl Into<String>) {
        self.config.coordination = CoordinationMode::external(connect);
    }

    /// Broker configuration. Deferred callbacks are reflected only after start.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Network alias the broker is reachable by on its network.
    #[must_use]
    pub fn network_alias(&self) -> Option<&str> {
        self.config.network_alias()
    }

    /// The running proxy sidecar.
    #[must_use]
    pub fn proxy(&self) -> Option<&ContainerHandle> {
        self.proxy.as_ref()
    }

    /// The running broker container.
    #[must_use]
    pub fn broker(&self) -> Option<&ContainerHandle> {
        self.broker.as_ref()
    }

    /// Whether the broker container is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.broker.is_some()
    }

    /// Bootstrap address for clients on the host, `PLAINTEXT://host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotStarted`] before the proxy is running.
    pub fn bootstrap_address(&self) -> Result<String> {
        let proxy = self.proxy.as_ref().ok_or(ContainerError::NotStarted)?;
        Ok(listeners::bootstrap_address(proxy.host(), proxy.mapped_port(KAFKA_PORT)?))
    }

    /// Bootstrap servers without the listener scheme, `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotStarted`] before the proxy is running.
    pub fn bootstrap_servers(&self) -> Result<String> {
        let proxy = self.proxy.as_ref().ok_or(ContainerError::NotStarted)?;
        Ok(format!("{}:{}", proxy.host(), proxy.mapped_port(KAFKA_PORT)?))
    }

    /// Start the proxy, then the broker.
    ///
    /// If the broker fails to start the proxy is left running and is
    /// released by [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns an error if the broker is already running, has no network or
    /// alias, or if either container fails to start.
    #[instrument(skip(self), fields(image = %self.config.spec.image_ref()))]
    pub async fn start(&mut self) -> Result<()> {
        if self.broker.is_some() {
            return Err(ContainerError::AlreadyStarted);
        }
        if let Some(stale) = &self.proxy {
            warn!(id = %stale.id, "stopping proxy left by a failed start");
            self.runtime.stop(stale).await?;
            self.proxy = None;
        }

        for configure in self.pending.drain(..) {
            configure(&mut KafkaBuilder::new(&mut self.config));
        }

        let alias = self
            .config
            .network_alias()
            .ok_or(ContainerError::MissingNetworkAlias)?
            .to_string();
        let network = self
            .config
            .spec
            .network
            .clone()
            .ok_or(ContainerError::MissingNetwork)?;

        let proxy_spec = SocatProxy::new(&self.proxy_image, &self.proxy_tag)
            .with_network(network)
            .with_target(KAFKA_PORT, &alias)
            .with_target(ZOOKEEPER_PORT, &alias)
            .spec();
        let proxy = self.proxy.insert(self.runtime.start(&proxy_spec).await?);
        let proxy_host = proxy.host().to_string();
        let proxy_port = proxy.mapped_port(KAFKA_PORT)?;
        debug!(host = %proxy_host, port = proxy_port, "proxy started");

        // Per-start copy; the configured spec is never mutated by start.
        let mut broker_spec = self.config.spec.clone();
        broker_spec.set_env(
            env::ADVERTISED_LISTENERS,
            listeners::advertised_listeners(&alias, &proxy_host, proxy_port),
        );
        self.config.coordination.apply(&mut broker_spec);

        let broker = self.runtime.start(&broker_spec).await?;
        info!(
            id = %broker.id,
            alias = %alias,
            bootstrap = %listeners::bootstrap_address(&proxy_host, proxy_port),
            embedded_zookeeper = self.config.coordination.is_embedded(),
            "kafka broker started"
        );
        self.broker = Some(broker);
        Ok(())
    }

    /// Stop the broker and the proxy concurrently.
    ///
    /// Both stops always run to completion. If either fails, the broker's
    /// error is returned first, then the proxy's.
    ///
    /// # Errors
    ///
    /// Returns the first failure reported by the runtime.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        let broker = self.broker.take();
        let proxy = self.proxy.take();
        let runtime = &self.runtime;

        let (broker_result, proxy_result) = tokio::join!(
            async {
                match &broker {
                    Some(handle) => runtime.stop(handle).await,
                    None => Ok(()),
                }
            },
            async {
                match &proxy {
                    Some(handle) => runtime.stop(handle).await,
                    None => Ok(()),
                }
            },
        );

        if let Err(e) = &broker_result {
            warn!(error = %e, "failed to stop kafka broker");
        }
        if let Err(e) = &proxy_result {
            warn!(error = %e, "failed to stop proxy");
        }
        if broker.is_some() || proxy.is_some() {
            info!("kafka broker stopped");
        }

        broker_result.and(proxy_result)
    }
}
