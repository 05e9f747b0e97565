//! Emulation of the page's blocking `alert`, `confirm` and `prompt` panels.
//!
//! Dialogs are unrelated to page calls: they have their own id space and are answered through a
//! one-shot [`DialogCompletion`] instead of the callback registry. A frame shows at most one
//! dialog at a time, since page script in that frame is blocked until it is answered.

use futures::channel::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    oneshot,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::{debug, trace};

/// Identifies one dialog, unrelated to callback ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DialogId(pub u64);

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt { default_text: Option<String> },
}

impl DialogKind {
    /// The answer of a dismissed dialog.
    pub fn cancelled_answer(&self) -> DialogAnswer {
        match self {
            Self::Alert => DialogAnswer::Acknowledged,
            Self::Confirm => DialogAnswer::Confirmed(false),
            Self::Prompt { .. } => DialogAnswer::Text(None),
        }
    }

    /// Coerces `answer` into the shape this kind of dialog returns.
    fn normalize(&self, answer: DialogAnswer) -> DialogAnswer {
        match (self, answer) {
            (Self::Alert, _) => DialogAnswer::Acknowledged,
            (Self::Confirm, answer @ DialogAnswer::Confirmed(_)) => answer,
            (Self::Prompt { .. }, answer @ DialogAnswer::Text(_)) => answer,
            (kind, _) => kind.cancelled_answer(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogAnswer {
    /// alert was closed
    Acknowledged,
    Confirmed(bool),
    /// prompt text, `None` if cancelled
    Text(Option<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogRequest {
    pub id: DialogId,
    /// the frame whose script is blocked
    pub frame: String,
    pub message: String,
    pub kind: DialogKind,
}

/// A dialog waiting for the host to show it.
#[derive(Debug)]
pub struct PendingDialog {
    pub request: DialogRequest,
    pub completion: DialogCompletion,
}

/// Delivers the single answer to a dialog.
///
/// Dropping it without answering dismisses the dialog.
#[derive(Debug)]
pub struct DialogCompletion {
    kind: DialogKind,
    sender: oneshot::Sender<DialogAnswer>,
}

impl DialogCompletion {
    pub fn kind(&self) -> &DialogKind {
        &self.kind
    }

    /// The user pressed OK. A prompt without entered text yields its default text.
    pub fn accept(self, text: Option<String>) {
        let answer = match &self.kind {
            DialogKind::Alert => DialogAnswer::Acknowledged,
            DialogKind::Confirm => DialogAnswer::Confirmed(true),
            DialogKind::Prompt { default_text } => {
                DialogAnswer::Text(text.or_else(|| default_text.clone()))
            }
        };
        self.complete(answer);
    }

    /// The user pressed cancel.
    pub fn dismiss(self) {
        let answer = self.kind.cancelled_answer();
        self.complete(answer);
    }

    pub fn complete(self, answer: DialogAnswer) {
        let answer = self.kind.normalize(answer);
        // the page side may have gone away in the meantime
        let _ = self.sender.send(answer);
    }
}

#[derive(Debug)]
struct Inner {
    next_id: AtomicU64,
    frames: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    host: UnboundedSender<PendingDialog>,
}

/// Forwards page dialogs to the host one frame at a time.
#[derive(Clone, Debug)]
pub struct Dialogs {
    inner: Arc<Inner>,
}

impl Dialogs {
    /// Returns the dialog front and the receiver the host shows dialogs from.
    pub fn new() -> (Self, UnboundedReceiver<PendingDialog>) {
        let (host, rx) = mpsc::unbounded();
        let inner = Inner { next_id: AtomicU64::new(1), frames: Mutex::default(), host };
        (Self { inner: Arc::new(inner) }, rx)
    }

    /// Shows a dialog and waits for its one answer.
    ///
    /// Waits for earlier dialogs of the same frame first. If the host is gone or drops the
    /// completion the dialog counts as dismissed.
    pub async fn present(
        &self,
        frame: impl Into<String>,
        message: impl Into<String>,
        kind: DialogKind,
    ) -> DialogAnswer {
        let frame = self.enter_frame(frame.into());
        let _turn = frame.lock.lock().await;
        self.show(frame.name.clone(), message.into(), kind).await
    }

    pub async fn alert(&self, frame: impl Into<String>, message: impl Into<String>) {
        self.present(frame, message, DialogKind::Alert).await;
    }

    pub async fn confirm(&self, frame: impl Into<String>, message: impl Into<String>) -> bool {
        matches!(
            self.present(frame, message, DialogKind::Confirm).await,
            DialogAnswer::Confirmed(true)
        )
    }

    pub async fn prompt(
        &self,
        frame: impl Into<String>,
        message: impl Into<String>,
        default_text: Option<String>,
    ) -> Option<String> {
        match self.present(frame, message, DialogKind::Prompt { default_text }).await {
            DialogAnswer::Text(text) => text,
            _ => None,
        }
    }

    async fn show(&self, frame: String, message: String, kind: DialogKind) -> DialogAnswer {
        let id = DialogId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = oneshot::channel();
        let request = DialogRequest { id, frame, message, kind: kind.clone() };
        trace!(target: "bridge::dialog", %id, frame = %request.frame, "presenting dialog");

        let completion = DialogCompletion { kind: kind.clone(), sender };
        if self.inner.host.unbounded_send(PendingDialog { request, completion }).is_err() {
            debug!(target: "bridge::dialog", %id, "host is gone, dismissing dialog");
            return kind.cancelled_answer();
        }
        receiver.await.unwrap_or_else(|_| kind.cancelled_answer())
    }

    fn enter_frame(&self, name: String) -> FrameEntry<'_> {
        let lock = self.inner.frames.lock().entry(name.clone()).or_default().clone();
        FrameEntry { inner: &self.inner, name, lock }
    }
}

/// A place in the line of one frame's dialogs.
///
/// Dropping it forgets the frame's lock once nobody else is waiting on it, also when the
/// dialog future is abandoned half way.
struct FrameEntry<'a> {
    inner: &'a Inner,
    name: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for FrameEntry<'_> {
    fn drop(&mut self) {
        let mut frames = self.inner.frames.lock();
        // one reference in the map, one held here
        if Arc::strong_count(&self.lock) == 2 {
            frames.remove(&self.name);
        }
    }
}
