//! Dual listener topology.
//!
//! The broker binds two named listeners. `BROKER` is bound to the network
//! alias and used for inter-broker traffic, so peers on the network reach the
//! broker by alias. `PLAINTEXT` is advertised at the proxy's host-mapped port
//! for clients outside the network, which cannot resolve the alias.

use super::{BROKER_PORT, KAFKA_PORT};

/// Listener for clients, reached through the proxy.
pub const PLAINTEXT_LISTENER: &str = "PLAINTEXT";

/// Listener for inter-broker traffic, reached by network alias.
pub const BROKER_LISTENER: &str = "BROKER";

/// `KAFKA_LISTENERS` for a broker known as `alias`.
#[must_use]
pub fn listeners(alias: &str) -> String {
    format!("{PLAINTEXT_LISTENER}://0.0.0.0:{KAFKA_PORT},{BROKER_LISTENER}://{alias}:{BROKER_PORT}")
}

/// `KAFKA_LISTENER_SECURITY_PROTOCOL_MAP`.
#[must_use]
pub fn security_protocol_map() -> String {
    format!("{BROKER_LISTENER}:PLAINTEXT,{PLAINTEXT_LISTENER}:PLAINTEXT")
}

/// `KAFKA_ADVERTISED_LISTENERS`, once the proxy's mapped port is known.
#[must_use]
pub fn advertised_listeners(alias: &str, proxy_host: &str, proxy_port: u16) -> String {
    format!(
        "{BROKER_LISTENER}://{alias}:{BROKER_PORT},{}",
        bootstrap_address(proxy_host, proxy_port)
    )
}

/// Client bootstrap address, `PLAINTEXT://host:port`.
#[must_use]
pub fn bootstrap_address(host: &str, port: u16) -> String {
    format!("{PLAINTEXT_LISTENER}://{host}:{port}")
}
