//! Notifications for the hosting application.
//!
//! Unlike page responses these carry full diagnostics: which account, which network and what
//! exactly went wrong.

use crate::error::{FlowError, RegistryError};
use alloy_primitives::{Address, ChainId, TxHash};
use dapp_bridge_core::DecodeError;
use dapp_bridge_rpc::request::CallbackId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// A signing request arrived while the active account has no key.
    OnlyWatchAccount { callback_id: CallbackId, account: Option<Address> },
    /// A transaction was signed on behalf of the page.
    TransactionSigned { callback_id: CallbackId, hash: TxHash },
    /// A transaction was signed and accepted by the network.
    TransactionSent { callback_id: CallbackId, hash: TxHash },
    /// A request ended in `Failed` or `Rejected`.
    RequestFailed {
        callback_id: CallbackId,
        method: &'static str,
        error: FlowError,
        account: Option<Address>,
        chain_id: ChainId,
    },
    /// The page broke the call protocol.
    ProtocolViolation { callback_id: Option<CallbackId>, violation: Violation },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// the call could not be parsed at all
    Malformed,
    Decode(DecodeError),
    Registry(RegistryError),
}
