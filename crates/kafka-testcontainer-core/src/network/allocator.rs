//! Isolated network and alias allocation.

use super::base58;

/// Prefix of every broker alias.
pub const ALIAS_PREFIX: &str = "kafka-";

/// Prefix of every allocated network name.
pub const NETWORK_PREFIX: &str = "kafka-net-";

const ALIAS_ID_LEN: usize = 6;
const NETWORK_ID_LEN: usize = 16;

/// A network name and the alias the broker is known by on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAllocation {
    /// Name of the network. The runtime creates it on first use.
    pub network: String,
    /// DNS name of the broker on `network`.
    pub alias: String,
}

/// Hands out fresh network names and broker aliases.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkAllocator;

impl NetworkAllocator {
    /// Allocate a new isolated network and a random broker alias on it.
    #[must_use]
    pub fn allocate() -> NetworkAllocation {
        NetworkAllocation {
            network: Self::network_name(),
            alias: Self::alias(),
        }
    }

    /// A fresh `kafka-<6 base58>` alias.
    #[must_use]
    pub fn alias() -> String {
        format!("{ALIAS_PREFIX}{}", base58::random_string(ALIAS_ID_LEN))
    }

    /// A fresh `kafka-net-<16 base58>` network name.
    #[must_use]
    pub fn network_name() -> String {
        format!("{NETWORK_PREFIX}{}", base58::random_string(NETWORK_ID_LEN))
    }
}
