//! Lifecycle tests for `KafkaContainer` against the in-memory runtime.
//!
//! These cover start sequencing, coordination modes, the advertised listener
//! topology and concurrent teardown without needing Docker.

use std::sync::Arc;
use std::time::Duration;

use kafka_testcontainer_core::container::ContainerSpec;
use kafka_testcontainer_core::kafka::{env, BROKER_PORT, KAFKA_PORT, ZOOKEEPER_PORT};
use kafka_testcontainer_core::testing::{MockRuntime, RuntimeCall, FIRST_HOST_PORT};
use kafka_testcontainer_core::{ContainerError, CoordinationMode, KafkaContainer};

const KAFKA_IMAGE: &str = "confluentinc/cp-kafka";
const PROXY_IMAGE: &str = "alpine/socat";

async fn broker_spec(runtime: &MockRuntime) -> ContainerSpec {
    runtime
        .started_spec_for(KAFKA_IMAGE)
        .await
        .expect("broker was started")
}

async fn last_broker_spec(runtime: &MockRuntime) -> ContainerSpec {
    runtime
        .started_specs()
        .await
        .into_iter()
        .rfind(|spec| spec.image == KAFKA_IMAGE)
        .expect("broker was started")
}

fn assert_no_local_zookeeper(spec: &ContainerSpec, connect: &str) {
    assert_eq!(spec.env_var(env::ZOOKEEPER_CONNECT), Some(connect));
    assert!(!spec.exposes(ZOOKEEPER_PORT));
    assert!(spec.mounts.is_empty());
    assert!(spec.command.is_none());
}

async fn proxy_spec(runtime: &MockRuntime) -> ContainerSpec {
    runtime
        .started_spec_for(PROXY_IMAGE)
        .await
        .expect("proxy was started")
}

// =============================================================================
// Coordination modes
// =============================================================================

/// Default configuration embeds ZooKeeper and publishes its port.
#[tokio::test]
async fn test_default_embeds_zookeeper() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");

    kafka.start().await.unwrap();

    let spec = broker_spec(&runtime).await;
    assert!(spec.exposes(ZOOKEEPER_PORT));
    assert_eq!(spec.env_var(env::ZOOKEEPER_CONNECT), Some("localhost:2181"));
    assert_eq!(spec.mounts.len(), 1);
    assert_eq!(spec.mounts[0].container_path, "/zookeeper.properties");
    assert!(spec.mounts[0].read_only);
    assert_eq!(
        spec.command,
        Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            "zookeeper-server-start /zookeeper.properties & /etc/confluent/docker/run".to_string(),
        ])
    );
}

/// An external connect string is passed through and nothing runs locally.
#[tokio::test]
async fn test_external_zookeeper() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0").with_external_zookeeper("zk:2181");

    kafka.start().await.unwrap();

    let spec = broker_spec(&runtime).await;
    assert_eq!(spec.env_var(env::ZOOKEEPER_CONNECT), Some("zk:2181"));
    assert!(!spec.exposes(ZOOKEEPER_PORT));
    assert!(spec.mounts.is_empty());
    assert!(spec.command.is_none());
}

/// Switching to external mode in the builder callback suppresses the
/// ZooKeeper mount and command override.
#[tokio::test]
async fn test_builder_switch_to_external() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::with_builder(runtime.clone(), "4.0.0", |b| {
        b.use_embedded_coordination_service();
        b.use_external_coordination_service("zk:2181");
    });

    kafka.start().await.unwrap();

    let spec = broker_spec(&runtime).await;
    assert_eq!(kafka.config().coordination, CoordinationMode::external("zk:2181"));
    assert_eq!(spec.env_var(env::ZOOKEEPER_CONNECT), Some("zk:2181"));
    assert!(spec.mounts.is_empty());
    assert!(spec.command.is_none());
    assert!(!spec.exposes(ZOOKEEPER_PORT));
}

/// Queued coordination switches apply in order; the last one wins.
#[tokio::test]
async fn test_queued_switches_last_wins() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0")
        .with_external_zookeeper("zk:2181")
        .with_embedded_zookeeper();

    kafka.start().await.unwrap();

    let spec = broker_spec(&runtime).await;
    assert_eq!(spec.env_var(env::ZOOKEEPER_CONNECT), Some("localhost:2181"));
    assert!(spec.exposes(ZOOKEEPER_PORT));
}

// =============================================================================
// Listener topology and sequencing
// =============================================================================

/// The proxy starts first and forwards both ports to the broker alias.
#[tokio::test]
async fn test_proxy_started_before_broker() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    let alias = kafka.network_alias().unwrap().to_string();
    let network = kafka.config().spec.network.clone().unwrap();

    kafka.start().await.unwrap();

    let specs = runtime.started_specs().await;
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].image, PROXY_IMAGE);
    assert_eq!(specs[1].image, KAFKA_IMAGE);

    let proxy = proxy_spec(&runtime).await;
    assert_eq!(proxy.network.as_deref(), Some(network.as_str()));
    assert_eq!(proxy.exposed_ports, vec![KAFKA_PORT, ZOOKEEPER_PORT]);
    let command = proxy.command.unwrap().join(" ");
    assert!(command.contains(&format!("TCP:{alias}:9092")));
    assert!(command.contains(&format!("TCP:{alias}:2181")));
}

/// Advertised listeners combine the alias endpoint and the proxy mapping.
#[tokio::test]
async fn test_advertised_listeners_use_proxy_mapping() {
    let runtime = Arc::new(MockRuntime::new().with_host("docker.local"));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    let alias = kafka.network_alias().unwrap().to_string();

    kafka.start().await.unwrap();

    // The proxy took the first host port for 9092.
    let proxy_port = kafka.proxy().unwrap().mapped_port(KAFKA_PORT).unwrap();
    assert_eq!(proxy_port, FIRST_HOST_PORT);

    let spec = broker_spec(&runtime).await;
    let advertised = spec.env_var(env::ADVERTISED_LISTENERS).unwrap();
    assert!(advertised.contains(&format!("BROKER://{alias}:{BROKER_PORT}")));
    assert!(advertised.contains(&format!("PLAINTEXT://docker.local:{proxy_port}")));
    assert_eq!(
        spec.env_var(env::LISTENERS),
        Some(format!("PLAINTEXT://0.0.0.0:9092,BROKER://{alias}:9093").as_str())
    );
    assert_eq!(
        spec.env_var(env::LISTENER_SECURITY_PROTOCOL_MAP),
        Some("BROKER:PLAINTEXT,PLAINTEXT:PLAINTEXT")
    );
}

/// The bootstrap address is the proxy's host and mapped port.
#[tokio::test]
async fn test_bootstrap_address() {
    let runtime = Arc::new(MockRuntime::new().with_host("127.0.0.1"));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");

    assert!(matches!(
        kafka.bootstrap_address(),
        Err(ContainerError::NotStarted)
    ));

    kafka.start().await.unwrap();

    assert_eq!(
        kafka.bootstrap_address().unwrap(),
        format!("PLAINTEXT://127.0.0.1:{FIRST_HOST_PORT}")
    );
    assert_eq!(
        kafka.bootstrap_servers().unwrap(),
        format!("127.0.0.1:{FIRST_HOST_PORT}")
    );
}

/// A callback can replace the default network and alias.
#[tokio::test]
async fn test_builder_overrides_network() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::with_builder(runtime.clone(), "5.0.1", |b| {
        b.with_network("shared-net").with_env(env::BROKER_ID, "3");
    });

    kafka.start().await.unwrap();

    let broker = broker_spec(&runtime).await;
    let proxy = proxy_spec(&runtime).await;
    assert_eq!(broker.tag, "5.0.1");
    assert_eq!(broker.network.as_deref(), Some("shared-net"));
    assert_eq!(proxy.network.as_deref(), Some("shared-net"));
    assert_eq!(broker.env_var(env::BROKER_ID), Some("3"));
}

/// Without an alias there is nothing to advertise; no container starts.
#[tokio::test]
async fn test_missing_alias_fails_before_any_start() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::with_builder(runtime.clone(), "4.0.0", |b| {
        b.clear_network_aliases();
    });

    let result = kafka.start().await;

    assert!(matches!(result, Err(ContainerError::MissingNetworkAlias)));
    assert!(runtime.get_calls().await.is_empty());
}

/// Without a network the proxy cannot reach the broker.
#[tokio::test]
async fn test_missing_network_fails_before_any_start() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::with_builder(runtime.clone(), "4.0.0", |b| {
        b.without_network();
    });

    let result = kafka.start().await;

    assert!(matches!(result, Err(ContainerError::MissingNetwork)));
    assert!(runtime.get_calls().await.is_empty());
}

/// Starting twice is rejected.
#[tokio::test]
async fn test_start_twice() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");

    kafka.start().await.unwrap();
    assert!(kafka.is_running());

    assert!(matches!(
        kafka.start().await,
        Err(ContainerError::AlreadyStarted)
    ));
    assert_eq!(runtime.started_specs().await.len(), 2);
}

// =============================================================================
// Failure handling
// =============================================================================

/// A proxy start failure surfaces and the broker is never started.
#[tokio::test]
async fn test_proxy_start_failure() {
    let runtime = Arc::new(MockRuntime::new().fail_start_for(PROXY_IMAGE));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");

    let result = kafka.start().await;

    assert!(matches!(result, Err(ContainerError::Runtime { .. })));
    assert!(runtime.started_spec_for(KAFKA_IMAGE).await.is_none());
    assert!(kafka.proxy().is_none());
}

/// A broker start failure leaves the proxy running until stop.
#[tokio::test]
async fn test_broker_start_failure_keeps_proxy_for_stop() {
    let runtime = Arc::new(MockRuntime::new().fail_start_for(KAFKA_IMAGE));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");

    assert!(kafka.start().await.is_err());
    assert!(!kafka.is_running());
    let proxy_id = kafka.proxy().unwrap().id.clone();
    assert!(runtime.is_running(&proxy_id).await);

    kafka.stop().await.unwrap();

    assert!(!runtime.is_running(&proxy_id).await);
    assert_eq!(runtime.stopped_ids().await, vec![proxy_id]);
}

// =============================================================================
// Restart
// =============================================================================

/// Switching to external ZooKeeper after a failed start drops the embedded setup.
#[tokio::test]
async fn test_retry_after_failed_start_uses_external_zookeeper() {
    let runtime = Arc::new(MockRuntime::new().fail_next_start_for(KAFKA_IMAGE));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");

    assert!(kafka.start().await.is_err());
    let stale_proxy = kafka.proxy().unwrap().id.clone();

    kafka.use_external_coordination_service("zk:2181");
    kafka.start().await.unwrap();

    assert!(kafka.is_running());
    assert_no_local_zookeeper(&last_broker_spec(&runtime).await, "zk:2181");
    assert!(!runtime.is_running(&stale_proxy).await);
    assert_eq!(runtime.running().await.len(), 2);
}

/// Switching to external ZooKeeper between stop and start drops the embedded setup.
#[tokio::test]
async fn test_restart_after_stop_uses_external_zookeeper() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    kafka.start().await.unwrap();
    kafka.stop().await.unwrap();

    kafka.use_external_coordination_service("zk:2181");
    kafka.start().await.unwrap();

    assert_no_local_zookeeper(&last_broker_spec(&runtime).await, "zk:2181");
}

/// A restarted broker gets exactly one properties mount and one ZooKeeper port.
#[tokio::test]
async fn test_restart_keeps_single_properties_mount() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    kafka.start().await.unwrap();
    kafka.stop().await.unwrap();
    kafka.start().await.unwrap();

    let spec = last_broker_spec(&runtime).await;
    assert_eq!(spec.mounts.len(), 1);
    assert_eq!(spec.mounts[0].container_path, "/zookeeper.properties");
    assert_eq!(
        spec.exposed_ports.iter().filter(|&&p| p == ZOOKEEPER_PORT).count(),
        1
    );

    // Advertised listener follows the new proxy mapping.
    let bootstrap = kafka.bootstrap_address().unwrap();
    let advertised = spec.env_var(env::ADVERTISED_LISTENERS).unwrap();
    assert!(advertised.ends_with(&format!(",{bootstrap}")));
}

/// A failed stop of a leftover proxy keeps its handle so stop can release it.
#[tokio::test]
async fn test_stale_proxy_stop_failure_keeps_handle() {
    let runtime = Arc::new(
        MockRuntime::new()
            .fail_next_start_for(KAFKA_IMAGE)
            .fail_next_stop_for(PROXY_IMAGE),
    );
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    assert!(kafka.start().await.is_err());
    let proxy_id = kafka.proxy().unwrap().id.clone();

    let result = kafka.start().await;

    assert!(matches!(result, Err(ContainerError::Runtime { .. })));
    assert_eq!(kafka.proxy().map(|p| p.id.as_str()), Some(proxy_id.as_str()));
    assert!(runtime.is_running(&proxy_id).await);

    kafka.stop().await.unwrap();

    assert!(!runtime.is_running(&proxy_id).await);
    assert!(runtime.running().await.is_empty());
}

// =============================================================================
// Teardown
// =============================================================================

/// Stop brings both containers down, concurrently.
#[tokio::test]
async fn test_stop_stops_both_concurrently() {
    let runtime = Arc::new(MockRuntime::new().with_stop_delay(Duration::from_millis(50)));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    kafka.start().await.unwrap();
    assert_eq!(runtime.running().await.len(), 2);

    kafka.stop().await.unwrap();

    assert!(runtime.running().await.is_empty());
    assert_eq!(runtime.stopped_ids().await.len(), 2);
    assert_eq!(runtime.max_concurrent_stops(), 2);
    assert!(kafka.proxy().is_none());
    assert!(kafka.broker().is_none());
}

/// A failing broker stop still stops the proxy and surfaces the failure.
#[tokio::test]
async fn test_stop_broker_failure_still_stops_proxy() {
    let runtime = Arc::new(MockRuntime::new().fail_stop_for(KAFKA_IMAGE));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    kafka.start().await.unwrap();
    let broker_id = kafka.broker().unwrap().id.clone();
    let proxy_id = kafka.proxy().unwrap().id.clone();

    let result = kafka.stop().await;

    assert!(matches!(result, Err(ContainerError::Runtime { .. })));
    assert!(!runtime.is_running(&proxy_id).await);
    assert!(runtime.is_running(&broker_id).await);
    assert_eq!(runtime.stopped_ids().await.len(), 2);
}

/// A failing proxy stop still stops the broker and surfaces the failure.
#[tokio::test]
async fn test_stop_proxy_failure_still_stops_broker() {
    let runtime = Arc::new(MockRuntime::new().fail_stop_for(PROXY_IMAGE));
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    kafka.start().await.unwrap();
    let broker_id = kafka.broker().unwrap().id.clone();

    let result = kafka.stop().await;

    match result {
        Err(ContainerError::Runtime { image, .. }) => assert!(image.starts_with(PROXY_IMAGE)),
        other => panic!("expected proxy stop failure, got {other:?}"),
    }
    assert!(!runtime.is_running(&broker_id).await);
}

/// Stopping a container that never started is a no-op.
#[tokio::test]
async fn test_stop_without_start() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");

    kafka.stop().await.unwrap();

    assert!(runtime.get_calls().await.is_empty());
}

/// The runtime sees starts and stops in lifecycle order.
#[tokio::test]
async fn test_call_log_order() {
    let runtime = Arc::new(MockRuntime::new());
    let mut kafka = KafkaContainer::new(runtime.clone(), "4.0.0");
    kafka.start().await.unwrap();
    kafka.stop().await.unwrap();

    let calls = runtime.get_calls().await;
    assert_eq!(calls.len(), 4);
    assert!(matches!(&calls[0], RuntimeCall::Start { spec, .. } if spec.image == PROXY_IMAGE));
    assert!(matches!(&calls[1], RuntimeCall::Start { spec, .. } if spec.image == KAFKA_IMAGE));
    assert!(matches!(&calls[2], RuntimeCall::Stop { .. }));
    assert!(matches!(&calls[3], RuntimeCall::Stop { .. }));
}
