//! # dapp-bridge
//!
//! The wallet side of the bridge between an embedded web page and the user's keys.
//!
//! Page script posts calls keyed by a callback id. The [`BridgeDispatcher`] decodes them,
//! registers them with the [`CallbackRegistry`], and runs one [`ConfirmationFlow`] per call that
//! asks the user, signs and, for `sendTransaction`, broadcasts. Every registered call receives
//! exactly one response, including when the bridge is torn down.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod macros;

pub mod config;
pub mod confirm;
pub mod dialog;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod keystore;
pub mod logging;
pub mod network;
pub mod registry;
pub mod session;

pub use config::BridgeConfig;
pub use confirm::{
    Approval, ConfirmType, ConfirmationRequest, ConfirmationUi,
    flow::{ConfirmationFlow, FlowReport, FlowState},
};
pub use dapp_bridge_core::{Action, CallbackValue, SignedResult};
pub use dapp_bridge_rpc::{
    error::{ErrorCode, RpcError},
    request::{CallbackId, InboundCall},
    response::{CallbackResponse, ResponseResult},
};
pub use dialog::{
    DialogAnswer, DialogCompletion, DialogId, DialogKind, DialogRequest, Dialogs, PendingDialog,
};
pub use dispatcher::{BridgeChannels, BridgeDispatcher, BridgeServices, PageMessage};
pub use error::{FlowError, NetworkError, RegistryError, SigningError};
pub use event::{HostEvent, Violation};
pub use keystore::{Keystore, LocalKeystore, SignPayload};
pub use logging::LoggingManager;
pub use network::Broadcaster;
pub use registry::{CallbackRegistry, Outcome, PendingCall};
pub use session::{Account, AccountKind, NetworkContext, SessionContext, SessionHandle};

use logging::BridgeLogLayer;

/// Installs the global tracing subscriber and returns the manager that toggles user logs.
///
/// Without `RUST_LOG` only the one-line request summaries are printed.
pub fn init_tracing() -> LoggingManager {
    use tracing_subscriber::prelude::*;

    let manager = LoggingManager::default();
    let _ = if let Ok(filter) = std::env::var("RUST_LOG") {
        tracing_subscriber::Registry::default()
            .with(BridgeLogLayer::new(manager.clone()).with_other_targets())
            .with(tracing_subscriber::EnvFilter::new(filter))
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    } else {
        tracing_subscriber::Registry::default()
            .with(BridgeLogLayer::new(manager.clone()))
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_target(false)
                    .with_level(false),
            )
            .try_init()
    };

    manager
}
