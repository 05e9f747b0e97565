//! The per request confirmation state machine.
//!
//! ```text
//! Created ──> AwaitingApproval ──> Signing ──> Completed
//!    │               │                │
//!    │               ├──> Rejected    │
//!    └───────────────┴────────────────┴──> Failed
//! ```
//!
//! Every flow ends in exactly one of the terminal states, which the dispatcher turns into the
//! page response.

use crate::{
    confirm::{Approval, ConfirmType, ConfirmationRequest},
    dispatcher::BridgeServices,
    error::{FlowError, SigningError},
    keystore::SignPayload,
    session::{Account, SessionContext},
};
use dapp_bridge_core::{Action, CallbackValue, SignedResult};
use dapp_bridge_rpc::request::CallbackId;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    Created,
    AwaitingApproval,
    Signing,
    Completed(CallbackValue),
    Rejected,
    Failed(FlowError),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Rejected | Self::Failed(_))
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::AwaitingApproval | Self::Failed(_))
                | (Self::AwaitingApproval, Self::Signing | Self::Rejected | Self::Failed(_))
                | (Self::Signing, Self::Completed(_) | Self::Failed(_))
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AwaitingApproval => "awaiting approval",
            Self::Signing => "signing",
            Self::Completed(_) => "completed",
            Self::Rejected => "rejected",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(err) => write!(f, "failed: {err}"),
            state => f.write_str(state.name()),
        }
    }
}

/// One page request on its way from `Created` to a terminal state.
///
/// The session is captured on creation: the flow signs with the account and network it was
/// created with even if the session changes while the user is deciding.
#[derive(Debug)]
pub struct ConfirmationFlow {
    callback_id: CallbackId,
    action: Action,
    context: SessionContext,
    state: FlowState,
    history: Vec<FlowState>,
}

impl ConfirmationFlow {
    pub fn new(callback_id: CallbackId, action: Action, context: SessionContext) -> Self {
        Self {
            callback_id,
            action,
            context,
            state: FlowState::Created,
            history: vec![FlowState::Created],
        }
    }

    pub fn callback_id(&self) -> CallbackId {
        self.callback_id
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Every state entered so far, the current one last.
    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    /// Checks that need neither the user nor a collaborator.
    ///
    /// A flow that fails here moves straight to `Failed` and must not be presented.
    pub fn admit(&mut self) -> Result<(), FlowError> {
        match self.admission() {
            Ok(_) => Ok(()),
            Err(err) => {
                self.transition(FlowState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Drives the flow to a terminal state.
    ///
    /// Once `cancel` fires no collaborator is called anymore and the flow fails with
    /// [`FlowError::Cancelled`].
    pub async fn run(
        mut self,
        services: &BridgeServices,
        cancel: &CancellationToken,
    ) -> FlowReport {
        if !self.state.is_terminal()
            && let Err(err) = self.execute(services, cancel).await
        {
            self.transition(FlowState::Failed(err));
        }
        self.into_report()
    }

    /// Ends a flow that never got to run.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.transition(FlowState::Failed(FlowError::Cancelled));
        }
    }

    /// Consumes the flow, cancelling it first if it has not terminated.
    pub fn into_report(mut self) -> FlowReport {
        self.cancel();
        FlowReport {
            callback_id: self.callback_id,
            method: self.action.method(),
            context: self.context,
            state: self.state,
            history: self.history,
        }
    }

    fn admission(&self) -> Result<Account, FlowError> {
        let account = *self.context.signing_account().ok_or(FlowError::NoSigningCapability)?;
        if !self.action.requires_signing() {
            return Err(SigningError::Unsupported(self.action.method()).into());
        }
        if let Some(requested) = self.action.transaction().and_then(|tx| tx.from)
            && requested != account.address
        {
            return Err(FlowError::AccountMismatch { active: account.address, requested });
        }
        Ok(account)
    }

    async fn execute(
        &mut self,
        services: &BridgeServices,
        cancel: &CancellationToken,
    ) -> Result<(), FlowError> {
        let account = self.admission()?;
        self.fill_nonce(&account, services, cancel).await?;

        self.transition(FlowState::AwaitingApproval);
        let request = self.confirmation_request(account);
        let approval = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FlowError::Cancelled),
            approval = services.ui.confirm(&request) => approval,
        };
        if approval == Approval::Rejected {
            self.transition(FlowState::Rejected);
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(FlowError::Cancelled);
        }

        self.transition(FlowState::Signing);
        let network = &self.context.network;
        let payload = SignPayload::from_action(&self.action)
            .ok_or(SigningError::Unsupported(self.action.method()))?;
        let signed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FlowError::Cancelled),
            signed = services.keystore.sign(&account, payload, network) => signed?,
        };

        let value = if self.action.broadcasts() {
            if cancel.is_cancelled() {
                return Err(FlowError::Cancelled);
            }
            let hash = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FlowError::Cancelled),
                sent = services.broadcaster.send_raw_transaction(signed, network) => sent?,
            };
            SignedResult::SentTransaction(hash).into()
        } else if let Some(kind) = self.action.message_type() {
            CallbackValue::signed_message(kind, signed)
        } else {
            SignedResult::SignedTransaction(signed).into()
        };
        self.transition(FlowState::Completed(value));
        Ok(())
    }

    /// Asks the network for the nonce of a transaction that came without one.
    async fn fill_nonce(
        &mut self,
        account: &Account,
        services: &BridgeServices,
        cancel: &CancellationToken,
    ) -> Result<(), FlowError> {
        let tx = match &mut self.action {
            Action::SignTransaction(tx) | Action::SendTransaction(tx) if tx.nonce.is_none() => tx,
            _ => return Ok(()),
        };
        let nonce = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FlowError::Cancelled),
            nonce = services.broadcaster.next_nonce(account.address, &self.context.network) => {
                nonce.map_err(FlowError::NonceUnavailable)?
            }
        };
        tx.nonce = Some(nonce);
        Ok(())
    }

    fn confirmation_request(&self, account: Account) -> ConfirmationRequest {
        ConfirmationRequest {
            callback_id: self.callback_id,
            action: self.action.clone(),
            account,
            network: self.context.network.clone(),
            confirm_type: if self.action.broadcasts() {
                ConfirmType::SignThenSend
            } else {
                ConfirmType::Sign
            },
            transaction_kind: self.action.transaction().map(|tx| tx.kind()),
        }
    }

    fn transition(&mut self, next: FlowState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        trace!(target: "bridge::flow", id = %self.callback_id, from = %self.state, to = %next);
        self.state = next.clone();
        self.history.push(next);
    }
}

/// The terminal state of a flow together with what it ran against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowReport {
    pub callback_id: CallbackId,
    pub method: &'static str,
    pub context: SessionContext,
    pub state: FlowState,
    pub history: Vec<FlowState>,
}

impl FlowReport {
    /// The value or error the page is answered with.
    pub fn outcome(&self) -> Result<CallbackValue, FlowError> {
        match &self.state {
            FlowState::Completed(value) => Ok(value.clone()),
            FlowState::Rejected => Err(FlowError::UserRejected),
            FlowState::Failed(err) => Err(err.clone()),
            // reports are only built from terminal flows
            _ => Err(FlowError::Cancelled),
        }
    }
}
