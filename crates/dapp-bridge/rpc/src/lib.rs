//! # dapp-bridge-rpc
//!
//! The envelope exchanged between page script and the wallet bridge: inbound calls keyed by a
//! [`CallbackId`](request::CallbackId), and the single outbound response each call receives.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod error;
pub mod request;
pub mod response;
