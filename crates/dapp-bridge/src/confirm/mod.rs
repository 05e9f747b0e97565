//! User confirmation of page requests.

use crate::session::{Account, NetworkContext};
use alloy_primitives::U256;
use async_trait::async_trait;
use dapp_bridge_core::{Action, TransactionKind};
use dapp_bridge_rpc::request::CallbackId;
use std::fmt;

pub mod flow;

/// The user's decision on a [`ConfirmationRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Approval {
    Approved,
    /// explicit rejection or dismissal
    Rejected,
}

/// What happens to the signature after approval, shown before the user decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmType {
    /// the signature is returned to the page
    Sign,
    /// the signed transaction is broadcast, the page only learns its hash
    SignThenSend,
}

impl fmt::Display for ConfirmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sign => f.write_str("sign"),
            Self::SignThenSend => f.write_str("sign and send"),
        }
    }
}

/// Everything the confirmation UI renders for one request.
#[derive(Clone, Debug)]
pub struct ConfirmationRequest {
    pub callback_id: CallbackId,
    /// the action with its nonce already filled in
    pub action: Action,
    pub account: Account,
    pub network: NetworkContext,
    pub confirm_type: ConfirmType,
    /// `None` for message signatures
    pub transaction_kind: Option<TransactionKind>,
}

impl ConfirmationRequest {
    /// Total the transaction may cost the user, if this is a transaction.
    pub fn max_cost(&self) -> Option<U256> {
        self.action.transaction().map(|tx| tx.max_cost())
    }
}

/// Presents requests to the user.
///
/// At most one request is presented at a time. A request stays presented until the user decides,
/// or the returned future is dropped because the bridge was torn down.
#[async_trait]
pub trait ConfirmationUi: Send + Sync + fmt::Debug {
    async fn confirm(&self, request: &ConfirmationRequest) -> Approval;
}
