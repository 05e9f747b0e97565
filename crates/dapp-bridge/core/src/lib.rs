//! # dapp-bridge-core
//!
//! The closed set of operations a page may request from the wallet, how they are decoded from
//! untrusted `(method, params)` pairs, and the values handed back once they complete.
//!
//! Decoding never has side effects: it either yields an [`Action`] or a [`DecodeError`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod action;
pub mod callback;
pub mod error;
pub mod message;
pub mod serde_helpers;
pub mod transaction;

pub use action::Action;
pub use callback::{CallbackValue, SignedResult};
pub use error::DecodeError;
pub use message::{SignMessageType, TypedMessage};
pub use transaction::{TransactionDefaults, TransactionKind, UnconfirmedTransaction};
