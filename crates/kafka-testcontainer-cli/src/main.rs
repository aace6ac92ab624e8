//! Kafka Test Container CLI
//!
//! Launches a disposable Kafka broker with its proxy sidecar, prints the
//! bootstrap address, and tears both containers down on Ctrl-C or SIGTERM.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kafka_testcontainer_core::config::{LauncherConfig, LoggingConfig};
use kafka_testcontainer_core::{CoordinationMode, DockerRuntime, KafkaContainer};

/// Disposable Kafka broker for integration testing.
#[derive(Parser)]
#[command(name = "kafka-testcontainer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the broker image tag.
    #[arg(long)]
    tag: Option<String>,

    /// Use an existing ZooKeeper instead of the embedded one.
    #[arg(long, value_name = "CONNECT")]
    external_zookeeper: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => LauncherConfig::from_file(path)?,
        None => LauncherConfig::default(),
    };

    // Apply CLI overrides
    if let Some(tag) = args.tag {
        config.kafka.tag = tag;
    }
    if let Some(connect) = args.external_zookeeper {
        config.coordination = CoordinationMode::external(connect);
    }
    config.validate()?;

    // Override log level from verbosity flag
    let log_config = match args.verbose {
        0 => config.logging.clone(),
        1 => LoggingConfig {
            level: "debug".to_string(),
            ..config.logging.clone()
        },
        _ => LoggingConfig {
            level: "trace".to_string(),
            ..config.logging.clone()
        },
    };

    // Setup tracing
    setup_tracing(&log_config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        image = %config.kafka.image,
        tag = %config.kafka.tag,
        embedded_zookeeper = config.coordination.is_embedded(),
        "starting kafka test container"
    );

    // Run the async runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move { run_broker(config).await })
}

fn setup_tracing(config: &LoggingConfig) {
    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer()).init();
    }
}

async fn run_broker(config: LauncherConfig) -> anyhow::Result<()> {
    let docker = Arc::new(DockerRuntime::new());
    let mut kafka = KafkaContainer::from_config(docker, &config)?;

    kafka.start().await?;

    let bootstrap = kafka.bootstrap_address()?;
    info!(bootstrap = %bootstrap, alias = ?kafka.network_alias(), "kafka broker ready");
    println!("{bootstrap}");

    shutdown_signal().await;
    info!("shutdown signal received, stopping containers");

    kafka.stop().await?;

    info!("kafka test container shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
