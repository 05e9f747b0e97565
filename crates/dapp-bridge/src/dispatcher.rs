//! The single entry point for page calls and the single exit point for their responses.

use crate::{
    config::BridgeConfig,
    confirm::{
        ConfirmationUi,
        flow::{ConfirmationFlow, FlowReport},
    },
    dialog::{Dialogs, PendingDialog},
    error::{FlowError, ToOutcome},
    event::{HostEvent, Violation},
    keystore::Keystore,
    logging::LoggingManager,
    macros::bridge_info,
    network::Broadcaster,
    registry::CallbackRegistry,
    session::SessionHandle,
};
use alloy_primitives::keccak256;
use dapp_bridge_core::{Action, CallbackValue, TransactionDefaults};
use dapp_bridge_rpc::{
    error::RpcError,
    request::{CallbackId, InboundCall, ParsedCall},
    response::CallbackResponse,
};
use futures::{
    StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// The external collaborators confirmation flows call into.
#[derive(Clone, Debug)]
pub struct BridgeServices {
    pub keystore: Arc<dyn Keystore>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub ui: Arc<dyn ConfirmationUi>,
}

impl BridgeServices {
    pub fn new(
        keystore: Arc<dyn Keystore>,
        broadcaster: Arc<dyn Broadcaster>,
        ui: Arc<dyn ConfirmationUi>,
    ) -> Self {
        Self { keystore, broadcaster, ui }
    }
}

/// Everything the page can post to the bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageMessage {
    Call(InboundCall),
    /// raw JSON text of a call
    Raw(String),
    /// the page navigated, this does not affect pending calls
    UrlChanged(String),
}

/// The receiving ends handed to the hosting application.
#[derive(Debug)]
pub struct BridgeChannels {
    /// responses to push into the page, see [`CallbackResponse::to_script`]
    pub responses: UnboundedReceiver<CallbackResponse>,
    pub events: UnboundedReceiver<HostEvent>,
    pub dialogs: UnboundedReceiver<PendingDialog>,
}

/// Decodes page calls, registers them and runs their confirmation flows.
///
/// Confirmations are presented one at a time in arrival order by a worker task. Calls that can
/// be answered without the user (malformed calls, duplicate ids, accounts without a key) are
/// answered right away. Dropping the dispatcher tears the bridge down.
#[derive(Debug)]
pub struct BridgeDispatcher {
    defaults: TransactionDefaults,
    session: SessionHandle,
    registry: Arc<CallbackRegistry>,
    reporter: Reporter,
    queue: UnboundedSender<ConfirmationFlow>,
    shutdown: CancellationToken,
    dialogs: Dialogs,
    logging: LoggingManager,
}

impl BridgeDispatcher {
    /// Creates the bridge and spawns its confirmation worker.
    ///
    /// `logging` is usually the manager returned by [`crate::init_tracing`], so toggling it
    /// through [`Self::logging`] reaches the installed subscriber. It is seeded from
    /// [`BridgeConfig::user_logs`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &BridgeConfig,
        session: SessionHandle,
        services: BridgeServices,
        logging: LoggingManager,
    ) -> (Self, BridgeChannels) {
        logging.set_enabled(config.user_logs);
        let (responses_tx, responses) = mpsc::unbounded();
        let (events_tx, events) = mpsc::unbounded();
        let (queue, queue_rx) = mpsc::unbounded();
        let (dialogs, dialogs_rx) = Dialogs::new();

        let registry = Arc::new(CallbackRegistry::new(responses_tx, config.max_pending_calls));
        let reporter = Reporter { registry: Arc::clone(&registry), events: events_tx };
        let shutdown = CancellationToken::new();

        let worker = ConfirmationWorker {
            queue: queue_rx,
            services,
            reporter: reporter.clone(),
            shutdown: shutdown.clone(),
        };
        tokio::spawn(worker.run());

        let dispatcher = Self {
            defaults: config.transaction_defaults(),
            session,
            registry,
            reporter,
            queue,
            shutdown,
            dialogs,
            logging,
        };
        (dispatcher, BridgeChannels { responses, events, dialogs: dialogs_rx })
    }

    pub fn handle_message(&self, message: PageMessage) {
        match message {
            PageMessage::Call(call) => self.handle_call(call),
            PageMessage::Raw(raw) => self.handle_raw(&raw),
            PageMessage::UrlChanged(url) => {
                trace!(target: "bridge::dispatch", %url, "ignoring url change");
            }
        }
    }

    /// Handles the JSON text of a call.
    pub fn handle_raw(&self, raw: &str) {
        match ParsedCall::from_json(raw) {
            ParsedCall::Valid(call) => self.handle_call(call),
            ParsedCall::Invalid { id } => {
                warn!(target: "bridge::dispatch", ?id, "malformed page call");
                self.reporter.emit(HostEvent::ProtocolViolation {
                    callback_id: id,
                    violation: Violation::Malformed,
                });
                // without an id there is nobody to answer
                if let Some(id) = id {
                    self.registry.reply_unregistered(id, RpcError::invalid_request());
                }
            }
        }
    }

    pub fn handle_call(&self, call: InboundCall) {
        let InboundCall { callback_id: id, method, params } = call;
        if self.logging.is_enabled() {
            bridge_info!("{method} ({id})");
        }
        if self.shutdown.is_cancelled() {
            self.registry.reply_unregistered(id, RpcError::disconnected());
            return;
        }

        let action = match Action::decode_known(&method, params, &self.defaults) {
            Ok(action) => action,
            Err(err) => {
                debug!(target: "bridge::dispatch", %id, %method, %err, "failed to decode call");
                self.reject(id, Violation::Decode(err));
                return;
            }
        };

        if let Err(err) = self.registry.register(id, action.clone()) {
            if err.is_violation() {
                warn!(target: "bridge::dispatch", %id, %err, "rejecting call");
                self.reject(id, Violation::Registry(err));
            } else {
                // lost the race with teardown
                self.registry.reply_unregistered(id, RpcError::disconnected());
            }
            return;
        }

        let mut flow = ConfirmationFlow::new(id, action, self.session.snapshot());
        if flow.admit().is_err() {
            self.reporter.finish(flow.into_report());
            return;
        }
        if let Err(err) = self.queue.unbounded_send(flow) {
            // the worker only stops after teardown
            self.reporter.finish(err.into_inner().into_report());
        }
    }

    /// Answers every pending call with `Disconnected` and stops the worker.
    ///
    /// Calls arriving afterwards are answered with `Disconnected` right away.
    pub fn teardown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.registry.close();
        self.shutdown.cancel();
        let cancelled = self.registry.cancel_all(RpcError::disconnected());
        debug!(target: "bridge::dispatch", cancelled, "bridge torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.registry.is_closed()
    }

    /// Number of calls that have not been answered yet.
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn dialogs(&self) -> &Dialogs {
        &self.dialogs
    }

    pub fn logging(&self) -> &LoggingManager {
        &self.logging
    }

    fn reject(&self, id: CallbackId, violation: Violation) {
        self.registry.reply_unregistered(id, RpcError::invalid_request());
        self.reporter
            .emit(HostEvent::ProtocolViolation { callback_id: Some(id), violation });
    }
}

impl Drop for BridgeDispatcher {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Turns finished flows into page responses and host events.
#[derive(Clone, Debug)]
struct Reporter {
    registry: Arc<CallbackRegistry>,
    events: UnboundedSender<HostEvent>,
}

impl Reporter {
    fn emit(&self, event: HostEvent) {
        if self.events.unbounded_send(event).is_err() {
            trace!(target: "bridge::dispatch", "host stopped listening to events");
        }
    }

    fn finish(&self, report: FlowReport) {
        let id = report.callback_id;
        let outcome = report.outcome();
        trace!(target: "bridge::dispatch", %id, state = %report.state, "flow finished");

        match &outcome {
            Ok(CallbackValue::SignTransaction(raw)) => {
                self.emit(HostEvent::TransactionSigned { callback_id: id, hash: keccak256(raw) });
            }
            Ok(CallbackValue::SentTransaction(hash)) => {
                self.emit(HostEvent::TransactionSent { callback_id: id, hash: *hash });
            }
            Ok(_) | Err(FlowError::Cancelled) => {}
            Err(FlowError::NoSigningCapability) => {
                self.emit(HostEvent::OnlyWatchAccount {
                    callback_id: id,
                    account: report.context.account.map(|account| account.address),
                });
            }
            Err(err) => {
                self.emit(HostEvent::RequestFailed {
                    callback_id: id,
                    method: report.method,
                    error: err.clone(),
                    account: report.context.account.map(|account| account.address),
                    chain_id: report.context.network.chain_id,
                });
            }
        }

        if let Err(err) = self.registry.resolve(id, outcome.to_outcome()) {
            // lost the race against teardown, the page already got its answer
            debug!(target: "bridge::dispatch", %id, %err, "dropping late result");
        }
    }
}

/// Presents queued flows one at a time.
struct ConfirmationWorker {
    queue: UnboundedReceiver<ConfirmationFlow>,
    services: BridgeServices,
    reporter: Reporter,
    shutdown: CancellationToken,
}

impl ConfirmationWorker {
    async fn run(mut self) {
        loop {
            let flow = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                flow = self.queue.next() => match flow {
                    Some(flow) => flow,
                    None => break,
                },
            };
            let report = flow.run(&self.services, &self.shutdown).await;
            self.reporter.finish(report);
        }

        self.queue.close();
        while let Ok(Some(flow)) = self.queue.try_next() {
            self.reporter.finish(flow.into_report());
        }
        debug!(target: "bridge::dispatch", "confirmation worker stopped");
    }
}
