use crate::{error::DecodeError, serde_helpers};
use alloy_dyn_abi::TypedData;
use alloy_primitives::{B256, Bytes};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which of the three message signing requests produced a signature.
///
/// They share one signing primitive per kind but are answered with differently shaped callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignMessageType {
    Message,
    PersonalMessage,
    TypedMessage,
}

/// An [EIP-712](https://eips.ethereum.org/EIPS/eip-712) payload the page asked to have signed.
#[derive(Clone, Debug)]
pub struct TypedMessage(pub TypedData);

impl TypedMessage {
    /// The digest that ends up being signed.
    pub fn signing_hash(&self) -> Result<B256, DecodeError> {
        self.0.eip712_signing_hash().map_err(|err| DecodeError::InvalidParams(err.to_string()))
    }

    /// The primary type name, for display.
    pub fn primary_type(&self) -> &str {
        &self.0.primary_type
    }
}

/// Extracts the `data` member, accepting a bare value as well.
fn data_param(params: Value) -> Result<Value, DecodeError> {
    match serde_helpers::unwrap_single(params) {
        Value::Object(mut object) => object
            .remove("data")
            .ok_or_else(|| DecodeError::InvalidParams("missing `data`".to_string())),
        Value::Null => Err(DecodeError::InvalidParams("missing `data`".to_string())),
        other => Ok(other),
    }
}

/// Decodes the hex payload of `signMessage`.
pub fn decode_message(params: Value) -> Result<Bytes, DecodeError> {
    match data_param(params)? {
        Value::String(s) => serde_helpers::decode_hex("data", &s),
        other => Err(DecodeError::InvalidParams(format!("expected hex string, got {other}"))),
    }
}

/// Decodes the payload of `signPersonalMessage`.
///
/// Only `0x`-prefixed strings are decoded as hex. Anything else is signed as its UTF-8 bytes,
/// even text that happens to look like hex.
pub fn decode_personal_message(params: Value) -> Result<Bytes, DecodeError> {
    match data_param(params)? {
        Value::String(s) if s.starts_with("0x") => serde_helpers::decode_hex("data", &s),
        Value::String(s) => Ok(s.into_bytes().into()),
        other => Err(DecodeError::InvalidParams(format!("expected string, got {other}"))),
    }
}

/// Decodes the payload of `signTypedMessage`: a typed data object or a JSON string of one.
pub fn decode_typed_message(params: Value) -> Result<TypedMessage, DecodeError> {
    let typed = match data_param(params)? {
        Value::String(s) => serde_json::from_str::<TypedData>(&s)?,
        value => serde_json::from_value::<TypedData>(value)?,
    };
    let message = TypedMessage(typed);
    // reject payloads that cannot be hashed before anyone is asked to sign them
    message.signing_hash()?;
    Ok(message)
}
