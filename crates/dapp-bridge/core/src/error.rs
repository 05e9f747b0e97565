/// Reasons a page call cannot be turned into an [`Action`](crate::Action).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("invalid hex in `{field}`")]
    InvalidHex { field: &'static str },
    #[error("`{field}` does not fit into {bits} bits")]
    ValueOverflow { field: &'static str, bits: u32 },
    #[error("gas limit {requested} exceeds the maximum of {max}")]
    GasLimitTooHigh { requested: u64, max: u64 },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidParams(err.to_string())
    }
}
