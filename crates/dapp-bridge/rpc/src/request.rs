use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Correlation key pairing one page request with its one response.
///
/// Assigned by the page side provider; the bridge only guarantees it is never answered twice
/// while outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(pub u64);

impl From<u64> for CallbackId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A call posted by page script.
///
/// The legacy provider field names `id`, `name` and `object` are accepted as well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCall {
    #[serde(rename = "callbackID", alias = "id")]
    pub callback_id: CallbackId,
    #[serde(alias = "name")]
    pub method: String,
    #[serde(default, alias = "object")]
    pub params: Value,
}

impl InboundCall {
    pub fn new(
        callback_id: impl Into<CallbackId>,
        method: impl Into<String>,
        params: Value,
    ) -> Self {
        Self { callback_id: callback_id.into(), method: method.into(), params }
    }
}

/// Outcome of parsing a raw page message into an [`InboundCall`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedCall {
    /// well formed call
    Valid(InboundCall),
    /// not a call, but the callback id could still be recovered (if any)
    Invalid { id: Option<CallbackId> },
}

impl ParsedCall {
    /// Parses the JSON text posted by the page.
    pub fn from_json(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return Self::Invalid { id: None };
        };
        let id = value
            .get("callbackID")
            .or_else(|| value.get("id"))
            .and_then(Value::as_u64)
            .map(CallbackId);
        match serde_json::from_value::<InboundCall>(value) {
            Ok(call) => Self::Valid(call),
            Err(_) => Self::Invalid { id },
        }
    }
}
