//! Aggregated error types of the bridge

use crate::registry::Outcome;
use alloy_primitives::Address;
use dapp_bridge_core::CallbackValue;
use dapp_bridge_rpc::{error::RpcError, request::CallbackId};
use tracing::error;

/// Errors of the keystore collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("no key available for {0}")]
    UnknownAccount(Address),
    #[error("transaction has no nonce")]
    MissingNonce,
    #[error("nothing to sign for `{0}`")]
    Unsupported(&'static str),
    #[error("signer error: {0}")]
    Signer(String),
}

impl From<alloy_signer::Error> for SigningError {
    fn from(err: alloy_signer::Error) -> Self {
        Self::Signer(err.to_string())
    }
}

/// Errors of the network collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("transaction rejected by node: {0}")]
    Rejected(String),
}

/// Why a confirmation flow did not complete.
///
/// The `Display` output carries diagnostics for the hosting application; the page only ever sees
/// the [`RpcError`] returned by [`FlowError::to_page_error`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("account cannot sign")]
    NoSigningCapability,
    #[error("request is for {requested} but the active account is {active}")]
    AccountMismatch { active: Address, requested: Address },
    #[error("rejected by the user")]
    UserRejected,
    #[error("bridge was torn down")]
    Cancelled,
    #[error(transparent)]
    Signing(#[from] SigningError),
    /// signed, but the broadcast failed
    #[error("broadcast failed: {0}")]
    Network(#[from] NetworkError),
    #[error("could not fetch nonce: {0}")]
    NonceUnavailable(NetworkError),
}

impl FlowError {
    /// The opaque failure delivered to the page.
    pub fn to_page_error(&self) -> RpcError {
        match self {
            Self::NoSigningCapability | Self::AccountMismatch { .. } => RpcError::unauthorized(),
            Self::UserRejected => RpcError::user_rejected(),
            Self::Cancelled => RpcError::disconnected(),
            Self::Signing(_) => RpcError::internal_error(),
            Self::Network(_) => RpcError::transaction_rejected(),
            Self::NonceUnavailable(_) => RpcError::resource_unavailable(),
        }
    }
}

/// Correlation errors of the [`CallbackRegistry`](crate::CallbackRegistry).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("callback {0} is already pending")]
    DuplicateId(CallbackId),
    #[error("callback {0} is not pending")]
    UnknownId(CallbackId),
    #[error("too many pending callbacks (max {0})")]
    Full(usize),
    #[error("registry is closed")]
    Closed,
}

impl RegistryError {
    /// Whether this is a page protocol violation rather than a race with cancellation.
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::DuplicateId(_) | Self::Full(_))
    }
}

/// Helper trait to convert flow results into registry outcomes
pub(crate) trait ToOutcome {
    fn to_outcome(self) -> Outcome;
}

impl ToOutcome for Result<CallbackValue, FlowError> {
    fn to_outcome(self) -> Outcome {
        match self {
            Ok(value) => Outcome::Success(value),
            Err(err) => {
                if let FlowError::Signing(ref inner) = err {
                    error!(target: "bridge::flow", %inner, "signing failed");
                }
                Outcome::Failure(err.to_page_error())
            }
        }
    }
}
