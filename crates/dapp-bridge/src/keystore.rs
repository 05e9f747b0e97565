//! Signing backends.

use crate::{
    error::SigningError,
    session::{Account, NetworkContext},
};
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, Signature, TxKind};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use dapp_bridge_core::{Action, TypedMessage, UnconfirmedTransaction};
use std::{collections::HashMap, fmt};

/// What the keystore is asked to sign, borrowed from the [`Action`] that requested it.
#[derive(Clone, Copy, Debug)]
pub enum SignPayload<'a> {
    Transaction(&'a UnconfirmedTransaction),
    Message(&'a [u8]),
    PersonalMessage(&'a [u8]),
    TypedMessage(&'a TypedMessage),
}

impl<'a> SignPayload<'a> {
    /// Returns `None` for actions that carry nothing to sign.
    pub fn from_action(action: &'a Action) -> Option<Self> {
        match action {
            Action::SignTransaction(tx) | Action::SendTransaction(tx) => {
                Some(Self::Transaction(tx))
            }
            Action::SignMessage(data) => Some(Self::Message(data)),
            Action::SignPersonalMessage(data) => Some(Self::PersonalMessage(data)),
            Action::SignTypedMessage(typed) => Some(Self::TypedMessage(typed)),
            Action::Unknown => None,
        }
    }
}

/// Holds the user's keys and signs on their behalf.
///
/// Transactions are returned as the raw signed envelope, messages as the 65 byte signature.
/// Implementations are never called for watch only accounts.
#[async_trait]
pub trait Keystore: Send + Sync + fmt::Debug {
    async fn sign(
        &self,
        account: &Account,
        payload: SignPayload<'_>,
        network: &NetworkContext,
    ) -> Result<Bytes, SigningError>;
}

/// A [`Keystore`] over in-memory private keys.
#[derive(Clone, Debug, Default)]
pub struct LocalKeystore {
    signers: HashMap<Address, PrivateKeySigner>,
}

impl LocalKeystore {
    pub fn new(signers: impl IntoIterator<Item = PrivateKeySigner>) -> Self {
        Self { signers: signers.into_iter().map(|signer| (signer.address(), signer)).collect() }
    }

    async fn sign_transaction(
        signer: &PrivateKeySigner,
        tx: &UnconfirmedTransaction,
        network: &NetworkContext,
    ) -> Result<Bytes, SigningError> {
        let nonce = tx.nonce.ok_or(SigningError::MissingNonce)?;
        let legacy = TxLegacy {
            chain_id: Some(network.chain_id),
            nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: tx.to.map_or(TxKind::Create, TxKind::Call),
            value: tx.value,
            input: tx.data.clone().unwrap_or_default(),
        };
        let signature = signer.sign_hash(&legacy.signature_hash()).await?;
        let envelope = TxEnvelope::from(legacy.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

#[async_trait]
impl Keystore for LocalKeystore {
    async fn sign(
        &self,
        account: &Account,
        payload: SignPayload<'_>,
        network: &NetworkContext,
    ) -> Result<Bytes, SigningError> {
        let signer = self
            .signers
            .get(&account.address)
            .ok_or(SigningError::UnknownAccount(account.address))?;

        let signature = match payload {
            SignPayload::Transaction(tx) => {
                return Self::sign_transaction(signer, tx, network).await;
            }
            SignPayload::Message(data) | SignPayload::PersonalMessage(data) => {
                signer.sign_message(data).await?
            }
            SignPayload::TypedMessage(typed) => {
                let hash = typed
                    .signing_hash()
                    .map_err(|err| SigningError::Signer(err.to_string()))?;
                signer.sign_hash(&hash).await?
            }
        };
        Ok(signature_bytes(&signature))
    }
}

fn signature_bytes(signature: &Signature) -> Bytes {
    Bytes::copy_from_slice(&signature.as_bytes())
}
