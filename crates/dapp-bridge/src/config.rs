use dapp_bridge_core::{
    TransactionDefaults,
    transaction::{DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE, MAX_GAS_LIMIT},
};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Default file [`BridgeConfig::figment`] reads from.
pub const CONFIG_FILE: &str = "dapp-bridge.toml";
/// Prefix of the environment variables [`BridgeConfig::figment`] reads from.
pub const ENV_PREFIX: &str = "DAPP_BRIDGE_";
/// Default upper bound of pending page calls.
pub const DEFAULT_MAX_PENDING_CALLS: usize = 64;

/// Configuration of a bridge instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Gas limit of page transactions that do not set one
    pub default_gas_limit: u64,
    /// Gas price in wei of page transactions that do not set one
    pub default_gas_price: u128,
    /// Highest gas limit a page may request
    pub max_gas_limit: u64,
    /// How many page calls may be pending at once
    pub max_pending_calls: usize,
    /// Whether request summaries are logged for the user
    pub user_logs: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_gas_limit: DEFAULT_GAS_LIMIT,
            default_gas_price: DEFAULT_GAS_PRICE,
            max_gas_limit: MAX_GAS_LIMIT,
            max_pending_calls: DEFAULT_MAX_PENDING_CALLS,
            user_logs: true,
        }
    }
}

impl BridgeConfig {
    /// Returns the default figment: defaults, then [`CONFIG_FILE`], then `DAPP_BRIDGE_*`
    /// environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads the configuration from [`BridgeConfig::figment`].
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    #[must_use]
    pub fn with_default_gas_limit(mut self, gas_limit: u64) -> Self {
        self.default_gas_limit = gas_limit;
        self
    }

    #[must_use]
    pub fn with_default_gas_price(mut self, gas_price: u128) -> Self {
        self.default_gas_price = gas_price;
        self
    }

    #[must_use]
    pub fn with_max_gas_limit(mut self, max_gas_limit: u64) -> Self {
        self.max_gas_limit = max_gas_limit;
        self
    }

    #[must_use]
    pub fn with_max_pending_calls(mut self, max_pending_calls: usize) -> Self {
        self.max_pending_calls = max_pending_calls;
        self
    }

    #[must_use]
    pub fn with_user_logs(mut self, user_logs: bool) -> Self {
        self.user_logs = user_logs;
        self
    }

    /// The values used to complete partially specified page transactions.
    pub fn transaction_defaults(&self) -> TransactionDefaults {
        TransactionDefaults {
            gas_limit: self.default_gas_limit,
            gas_price: self.default_gas_price,
            max_gas_limit: self.max_gas_limit,
        }
    }
}
