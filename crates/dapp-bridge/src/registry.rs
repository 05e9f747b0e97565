//! Correlation of in-flight page calls with their single response.

use crate::error::RegistryError;
use dapp_bridge_core::{Action, CallbackValue};
use dapp_bridge_rpc::{
    error::RpcError,
    request::CallbackId,
    response::{CallbackResponse, ResponseResult},
};
use futures::channel::mpsc::UnboundedSender;
use parking_lot::Mutex;
use std::{collections::HashMap, time::Instant};
use tracing::{debug, trace, warn};

/// A registered call that has not been answered yet.
#[derive(Clone, Debug)]
pub struct PendingCall {
    pub id: CallbackId,
    pub action: Action,
    pub created_at: Instant,
}

/// How a pending call ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(CallbackValue),
    Failure(RpcError),
}

impl From<Outcome> for ResponseResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(value) => Self::success(value),
            Outcome::Failure(err) => Self::error(err),
        }
    }
}

#[derive(Debug)]
struct Inner {
    pending: HashMap<CallbackId, PendingCall>,
    closed: bool,
}

/// Owns every pending call from registration until its one response was delivered.
///
/// Removal and delivery happen under the same lock, so a call can never be answered twice and
/// responses reach the page in the order the calls were resolved.
#[derive(Debug)]
pub struct CallbackRegistry {
    inner: Mutex<Inner>,
    responses: UnboundedSender<CallbackResponse>,
    capacity: usize,
}

impl CallbackRegistry {
    /// Creates a registry that delivers responses to `responses` and holds at most `capacity`
    /// pending calls.
    pub fn new(responses: UnboundedSender<CallbackResponse>, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { pending: HashMap::new(), closed: false }),
            responses,
            capacity,
        }
    }

    pub fn register(&self, id: CallbackId, action: Action) -> Result<PendingCall, RegistryError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(RegistryError::Closed);
        }
        if inner.pending.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        if inner.pending.len() >= self.capacity {
            return Err(RegistryError::Full(self.capacity));
        }
        let call = PendingCall { id, action, created_at: Instant::now() };
        inner.pending.insert(id, call.clone());
        trace!(target: "bridge::registry", %id, method = call.action.method(), "registered");
        Ok(call)
    }

    /// Answers and removes a pending call.
    ///
    /// Resolving an id that is not pending has no effect besides the returned error.
    pub fn resolve(&self, id: CallbackId, outcome: Outcome) -> Result<PendingCall, RegistryError> {
        let mut inner = self.inner.lock();
        let call = inner.pending.remove(&id).ok_or(RegistryError::UnknownId(id))?;
        self.deliver(CallbackResponse::new(id, outcome));
        trace!(
            target: "bridge::registry",
            %id,
            elapsed = ?call.created_at.elapsed(),
            "resolved"
        );
        Ok(call)
    }

    /// Fails every pending call with `reason` and returns how many were answered.
    pub fn cancel_all(&self, reason: RpcError) -> usize {
        let mut inner = self.inner.lock();
        let mut ids = inner.pending.drain().map(|(id, _)| id).collect::<Vec<_>>();
        // deterministic order for the page
        ids.sort_unstable();
        for id in &ids {
            self.deliver(CallbackResponse::new(*id, reason.clone()));
        }
        if !ids.is_empty() {
            debug!(target: "bridge::registry", count = ids.len(), %reason, "cancelled pending");
        }
        ids.len()
    }

    /// Rejects all future registrations.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Answers a call that was never registered, e.g. one that could not be decoded.
    pub fn reply_unregistered(&self, id: CallbackId, error: RpcError) {
        // keep the delivery order consistent with `resolve`
        let _inner = self.inner.lock();
        self.deliver(CallbackResponse::new(id, error));
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.inner.lock().pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn deliver(&self, response: CallbackResponse) {
        let id = response.callback_id;
        if self.responses.unbounded_send(response).is_err() {
            warn!(target: "bridge::registry", %id, "page is gone, dropping response");
        }
    }
}
