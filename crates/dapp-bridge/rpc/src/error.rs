//! Page-facing error bindings
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{borrow::Cow, fmt};

/// The failure delivered to page script.
///
/// Only the code and the code's fixed message ever cross the bridge. Anything that describes the
/// wallet (accounts, networks, keystore diagnostics) stays on the host side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcError {
    pub code: ErrorCode,
    /// error message
    pub message: Cow<'static, str>,
}

impl RpcError {
    /// New [`RpcError`] with the given [`ErrorCode`].
    pub const fn new(code: ErrorCode) -> Self {
        Self { message: Cow::Borrowed(code.message()), code }
    }

    /// Creates a new `InvalidRequest` error.
    pub const fn invalid_request() -> Self {
        Self::new(ErrorCode::InvalidRequest)
    }

    /// Creates a new `UserRejected` error.
    pub const fn user_rejected() -> Self {
        Self::new(ErrorCode::UserRejected)
    }

    /// Creates a new `Unauthorized` error.
    pub const fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized)
    }

    /// Creates a new `Disconnected` error.
    pub const fn disconnected() -> Self {
        Self::new(ErrorCode::Disconnected)
    }

    /// Creates a new `InternalError` error.
    pub const fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError)
    }

    /// Creates a new `TransactionRejected` error.
    pub const fn transaction_rejected() -> Self {
        Self::new(ErrorCode::TransactionRejected)
    }

    /// Creates a new `ResourceUnavailable` error.
    pub const fn resource_unavailable() -> Self {
        Self::new(ErrorCode::ResourceUnavailable)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code.code())
    }
}

/// List of page-facing error codes
///
/// See also <https://eips.ethereum.org/EIPS/eip-1193#provider-errors> and
/// <https://eips.ethereum.org/EIPS/eip-1474#error-codes>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// malformed call, unknown method or reused callback id
    InvalidRequest,
    /// the user declined the request
    UserRejected,
    /// the active account cannot sign, or is not the account the page asked for
    Unauthorized,
    /// the bridge was torn down before the request completed
    Disconnected,
    /// the keystore failed to produce a signature
    InternalError,
    /// the signed transaction could not be broadcast
    TransactionRejected,
    /// a value required to build the request could not be fetched
    ResourceUnavailable,
    /// Used for codes this bridge does not produce itself.
    ServerError(i64),
}

impl ErrorCode {
    /// Returns the error code as `i64`
    pub fn code(&self) -> i64 {
        match *self {
            Self::InvalidRequest => -32600,
            Self::UserRejected => 4001,
            Self::Unauthorized => 4100,
            Self::Disconnected => 4900,
            Self::InternalError => -32603,
            Self::TransactionRejected => -32003,
            Self::ResourceUnavailable => -32002,
            Self::ServerError(c) => c,
        }
    }

    /// Returns the message associated with the error
    pub const fn message(&self) -> &'static str {
        match *self {
            Self::InvalidRequest => "Invalid request",
            Self::UserRejected => "User rejected the request",
            Self::Unauthorized => "Unauthorized",
            Self::Disconnected => "Disconnected",
            Self::InternalError => "Internal error",
            Self::TransactionRejected => "Transaction rejected",
            Self::ResourceUnavailable => "Resource unavailable",
            Self::ServerError(_) => "Server error",
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'a> Deserialize<'a> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        i64::deserialize(deserializer).map(Into::into)
    }
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        match code {
            -32600 => Self::InvalidRequest,
            4001 => Self::UserRejected,
            4100 => Self::Unauthorized,
            4900 => Self::Disconnected,
            -32603 => Self::InternalError,
            -32003 => Self::TransactionRejected,
            -32002 => Self::ResourceUnavailable,
            _ => Self::ServerError(code),
        }
    }
}
