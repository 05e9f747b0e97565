use crate::{
    error::DecodeError,
    message::{self, SignMessageType, TypedMessage},
    transaction::{TransactionDefaults, UnconfirmedTransaction},
};
use alloy_primitives::Bytes;
use serde_json::Value;

/// An operation requested by page script.
///
/// Immutable once decoded. Every variant except [`Action::Unknown`] ends in a signature.
#[derive(Clone, Debug)]
pub enum Action {
    /// sign a transaction and hand the raw signed bytes back to the page
    SignTransaction(UnconfirmedTransaction),
    /// sign a transaction and broadcast it, the page only learns the hash
    SendTransaction(UnconfirmedTransaction),
    /// `eth_sign` style message
    SignMessage(Bytes),
    /// `personal_sign` style message
    SignPersonalMessage(Bytes),
    /// EIP-712 typed data
    SignTypedMessage(TypedMessage),
    /// a method the bridge does not know
    Unknown,
}

impl Action {
    /// Decodes a page call.
    ///
    /// Unrecognized method names yield [`Action::Unknown`], malformed params of a known method
    /// yield an error.
    pub fn decode(
        method: &str,
        params: Value,
        defaults: &TransactionDefaults,
    ) -> Result<Self, DecodeError> {
        let action = match method {
            "signTransaction" => {
                Self::SignTransaction(UnconfirmedTransaction::decode(params, defaults)?)
            }
            "sendTransaction" => {
                Self::SendTransaction(UnconfirmedTransaction::decode(params, defaults)?)
            }
            "signMessage" => Self::SignMessage(message::decode_message(params)?),
            "signPersonalMessage" => {
                Self::SignPersonalMessage(message::decode_personal_message(params)?)
            }
            "signTypedMessage" => Self::SignTypedMessage(message::decode_typed_message(params)?),
            _ => Self::Unknown,
        };
        Ok(action)
    }

    /// Like [`Action::decode`], but an unknown method is an error.
    pub fn decode_known(
        method: &str,
        params: Value,
        defaults: &TransactionDefaults,
    ) -> Result<Self, DecodeError> {
        match Self::decode(method, params, defaults)? {
            Self::Unknown => Err(DecodeError::UnknownMethod(method.to_string())),
            action => Ok(action),
        }
    }

    /// The page method name this action answers to.
    pub fn method(&self) -> &'static str {
        match self {
            Self::SignTransaction(_) => "signTransaction",
            Self::SendTransaction(_) => "sendTransaction",
            Self::SignMessage(_) => "signMessage",
            Self::SignPersonalMessage(_) => "signPersonalMessage",
            Self::SignTypedMessage(_) => "signTypedMessage",
            Self::Unknown => "unknown",
        }
    }

    pub fn message_type(&self) -> Option<SignMessageType> {
        match self {
            Self::SignMessage(_) => Some(SignMessageType::Message),
            Self::SignPersonalMessage(_) => Some(SignMessageType::PersonalMessage),
            Self::SignTypedMessage(_) => Some(SignMessageType::TypedMessage),
            _ => None,
        }
    }

    pub fn transaction(&self) -> Option<&UnconfirmedTransaction> {
        match self {
            Self::SignTransaction(tx) | Self::SendTransaction(tx) => Some(tx),
            _ => None,
        }
    }

    /// Whether a successful signature is followed by a broadcast.
    pub fn broadcasts(&self) -> bool {
        matches!(self, Self::SendTransaction(_))
    }

    /// Whether this action needs the user's key.
    pub fn requires_signing(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}
