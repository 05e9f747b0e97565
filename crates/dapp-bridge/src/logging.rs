//! User facing log output.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{Metadata, subscriber::Interest};
use tracing_subscriber::{Layer, layer::Context};

/// The target that carries request summaries meant for the user.
pub const BRIDGE_USER_LOG_TARGET: &str = "dapp_bridge::user";

/// A [`Layer`] that gates [`BRIDGE_USER_LOG_TARGET`] on the [`LoggingManager`].
#[derive(Clone, Debug, Default)]
pub struct BridgeLogLayer {
    state: LoggingManager,
    other_targets: bool,
}

impl BridgeLogLayer {
    /// Returns a layer that only lets user logs through.
    pub fn new(state: LoggingManager) -> Self {
        Self { state, other_targets: false }
    }

    /// Also lets every other target through, leaving filtering to an `EnvFilter`.
    pub fn with_other_targets(mut self) -> Self {
        self.other_targets = true;
        self
    }
}

impl<S> Layer<S> for BridgeLogLayer
where
    S: tracing::Subscriber,
{
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if metadata.target() == BRIDGE_USER_LOG_TARGET || self.other_targets {
            // the user target must be re-evaluated on every event since it can be toggled
            Interest::sometimes()
        } else {
            Interest::never()
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        if metadata.target() == BRIDGE_USER_LOG_TARGET {
            self.state.is_enabled()
        } else {
            self.other_targets
        }
    }
}

/// Contains the configuration of the user logger.
#[derive(Clone, Debug)]
pub struct LoggingManager {
    /// Whether the user logs are printed
    pub enabled: Arc<RwLock<bool>>,
}

impl LoggingManager {
    pub fn new(enabled: bool) -> Self {
        Self { enabled: Arc::new(RwLock::new(enabled)) }
    }

    /// Returns true if user logs are enabled.
    pub fn is_enabled(&self) -> bool {
        *self.enabled.read()
    }

    /// Updates the `enabled` state.
    pub fn set_enabled(&self, enabled: bool) {
        *self.enabled.write() = enabled;
    }
}

impl Default for LoggingManager {
    fn default() -> Self {
        Self::new(true)
    }
}
