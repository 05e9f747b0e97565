//! Lenient decoding of page supplied values.
//!
//! Page script is untrusted and inconsistent about encodings: quantities arrive as `0x` hex,
//! decimal strings or JSON numbers, byte strings arrive with or without a `0x` prefix. Everything
//! is parsed through [`serde_json::Value`] so the behavior does not depend on how the number was
//! buffered.

use crate::error::DecodeError;
use alloy_primitives::{Address, Bytes, U256, hex};
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use std::str::FromStr;

/// Parses a quantity from a `0x` hex or decimal string. The empty string and a bare `0x` are zero.
pub fn parse_quantity(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if s.is_empty() || s == "0x" || s == "0X" {
        return Ok(U256::ZERO);
    }
    let parsed = if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(digits, 16)
    } else {
        U256::from_str_radix(s, 10)
    };
    parsed.map_err(|err| format!("invalid quantity `{s}`: {err}"))
}

/// Decodes hex with an optional `0x` prefix.
pub fn decode_hex(field: &'static str, s: &str) -> Result<Bytes, DecodeError> {
    hex::decode(s.trim()).map(Bytes::from).map_err(|_| DecodeError::InvalidHex { field })
}

/// Returns the sole element of a one element params array, or the params themselves.
///
/// Providers differ on whether they wrap the request object in a JSON-RPC style sequence.
pub fn unwrap_single(params: Value) -> Value {
    match params {
        Value::Array(mut items) if items.len() == 1 => items.pop().unwrap_or(Value::Null),
        other => other,
    }
}

/// Optional quantity: string, number or absent.
pub mod quantity_opt {
    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => parse_quantity(&s).map(Some).map_err(de::Error::custom),
            Some(Value::Number(n)) => {
                parse_quantity(&n.to_string()).map(Some).map_err(de::Error::custom)
            }
            Some(other) => Err(de::Error::custom(format!("expected quantity, got {other}"))),
        }
    }
}

/// Optional byte string: hex with or without prefix, or absent.
pub mod bytes_opt {
    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<Option<Bytes>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) => hex::decode(s.trim())
                .map(|bytes| Some(Bytes::from(bytes)))
                .map_err(|_| de::Error::custom("invalid hex data")),
        }
    }
}

/// Optional address where the empty string or bare `0x` also mean "no address".
pub mod address_opt {
    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<Option<Address>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) if matches!(s.trim(), "" | "0x" | "0X") => Ok(None),
            Some(s) => Address::from_str(s.trim()).map(Some).map_err(de::Error::custom),
        }
    }
}
