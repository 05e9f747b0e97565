use crate::{error::NetworkError, session::NetworkContext};
use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use std::fmt;

/// The node connection used to complete and broadcast transactions.
#[async_trait]
pub trait Broadcaster: Send + Sync + fmt::Debug {
    /// Submits a signed transaction envelope and returns its hash.
    async fn send_raw_transaction(
        &self,
        raw: Bytes,
        network: &NetworkContext,
    ) -> Result<TxHash, NetworkError>;

    /// The nonce the next transaction of `account` must use.
    async fn next_nonce(
        &self,
        account: Address,
        network: &NetworkContext,
    ) -> Result<u64, NetworkError>;
}
