//! The account and network requests are signed for.
//!
//! The hosting application owns the live [`SessionHandle`]. Every confirmation flow works on a
//! [`SessionContext`] snapshot taken when the flow is created, so switching accounts or networks
//! never changes what an already presented request signs with.

use alloy_primitives::{Address, ChainId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Whether the wallet holds a key for an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountKind {
    Signing,
    /// known address without a private key
    WatchOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub kind: AccountKind,
}

impl Account {
    pub const fn signing(address: Address) -> Self {
        Self { address, kind: AccountKind::Signing }
    }

    pub const fn watch_only(address: Address) -> Self {
        Self { address, kind: AccountKind::WatchOnly }
    }

    pub fn can_sign(&self) -> bool {
        self.kind == AccountKind::Signing
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AccountKind::Signing => write!(f, "{}", self.address),
            AccountKind::WatchOnly => write!(f, "{} (watch only)", self.address),
        }
    }
}

/// The network requests are signed for and broadcast to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContext {
    pub chain_id: ChainId,
    pub name: String,
}

impl NetworkContext {
    pub fn new(chain_id: ChainId, name: impl Into<String>) -> Self {
        Self { chain_id, name: name.into() }
    }

    pub fn mainnet() -> Self {
        Self::new(1, "mainnet")
    }
}

impl fmt::Display for NetworkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

/// An immutable view of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    /// `None` if the wallet has no account selected
    pub account: Option<Account>,
    pub network: NetworkContext,
}

impl SessionContext {
    pub fn new(account: Option<Account>, network: NetworkContext) -> Self {
        Self { account, network }
    }

    /// The selected account, if it can sign.
    pub fn signing_account(&self) -> Option<&Account> {
        self.account.as_ref().filter(|account| account.can_sign())
    }
}

/// Shared, mutable session owned by the hosting application.
#[derive(Clone, Debug)]
pub struct SessionHandle(Arc<RwLock<SessionContext>>);

impl SessionHandle {
    pub fn new(context: SessionContext) -> Self {
        Self(Arc::new(RwLock::new(context)))
    }

    /// Returns a copy of the current context.
    pub fn snapshot(&self) -> SessionContext {
        self.0.read().clone()
    }

    pub fn set_account(&self, account: Option<Account>) {
        self.0.write().account = account;
    }

    pub fn set_network(&self, network: NetworkContext) {
        self.0.write().network = network;
    }
}
