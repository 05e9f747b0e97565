use crate::message::SignMessageType;
use alloy_primitives::{Bytes, TxHash};
use serde::{Deserialize, Serialize};

/// Outcome of an approved transaction request.
///
/// A page that asked to send never sees the signed bytes, only the resulting transaction hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignedResult {
    /// signed, not broadcast
    SignedTransaction(Bytes),
    /// signed and accepted by the network
    SentTransaction(TxHash),
}

/// The success value of a page callback, tagged by the request that produced it.
///
/// Serialized as `{"<variant>": <value>}`, e.g. `{"signPersonalMessage": "0x…"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallbackValue {
    SignTransaction(Bytes),
    SentTransaction(TxHash),
    SignMessage(Bytes),
    SignPersonalMessage(Bytes),
    SignTypedMessage(Bytes),
}

impl CallbackValue {
    /// Tags a message signature with the request kind it answers.
    pub fn signed_message(kind: SignMessageType, signature: Bytes) -> Self {
        match kind {
            SignMessageType::Message => Self::SignMessage(signature),
            SignMessageType::PersonalMessage => Self::SignPersonalMessage(signature),
            SignMessageType::TypedMessage => Self::SignTypedMessage(signature),
        }
    }
}

impl From<SignedResult> for CallbackValue {
    fn from(result: SignedResult) -> Self {
        match result {
            SignedResult::SignedTransaction(raw) => Self::SignTransaction(raw),
            SignedResult::SentTransaction(hash) => Self::SentTransaction(hash),
        }
    }
}
