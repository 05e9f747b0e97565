use crate::{error::RpcError, request::CallbackId};
use serde::{Deserialize, Serialize};
use tracing::error;

/// The single response delivered for a page call
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CallbackResponse {
    #[serde(rename = "callbackID")]
    pub callback_id: CallbackId,
    #[serde(flatten)]
    pub result: ResponseResult,
}

impl CallbackResponse {
    pub fn new(callback_id: CallbackId, content: impl Into<ResponseResult>) -> Self {
        Self { callback_id, result: content.into() }
    }

    pub fn invalid_request(callback_id: CallbackId) -> Self {
        Self::new(callback_id, RpcError::invalid_request())
    }

    /// Whether this response resolves the page promise successfully.
    pub fn is_success(&self) -> bool {
        matches!(self.result, ResponseResult::Success(_))
    }

    /// Renders the response as the page side callback invocation:
    /// `executeCallback(id, error, value)`.
    ///
    /// Both arguments are JSON literals, so the script is safe to evaluate verbatim.
    pub fn to_script(&self) -> String {
        let id = self.callback_id;
        match &self.result {
            ResponseResult::Success(value) => format!("executeCallback({id}, null, {value})"),
            ResponseResult::Error(err) => {
                let message = serde_json::Value::from(err.message.as_ref());
                format!("executeCallback({id}, {message}, null)")
            }
        }
    }
}

/// Represents the result of a call either success or error
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub enum ResponseResult {
    #[serde(rename = "result")]
    Success(serde_json::Value),
    #[serde(rename = "error")]
    Error(RpcError),
}

impl ResponseResult {
    /// Serializes `content` as the success value.
    ///
    /// A value that fails to serialize is answered with an internal error, so the page still
    /// gets its one response.
    pub fn success<S>(content: S) -> Self
    where
        S: Serialize,
    {
        match serde_json::to_value(&content) {
            Ok(value) => Self::Success(value),
            Err(err) => {
                error!(target: "bridge::rpc", %err, "failed to serialize callback value");
                Self::Error(RpcError::internal_error())
            }
        }
    }

    pub fn error(error: RpcError) -> Self {
        Self::Error(error)
    }
}

impl From<RpcError> for ResponseResult {
    fn from(err: RpcError) -> Self {
        Self::error(err)
    }
}
