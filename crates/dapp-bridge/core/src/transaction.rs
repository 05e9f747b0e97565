use crate::{error::DecodeError, serde_helpers};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 1 gwei in wei
const GWEI: u128 = 1_000_000_000;

/// Default gas limit for page transactions that do not specify one
pub const DEFAULT_GAS_LIMIT: u64 = 90_000;
/// Default gas price for page transactions that do not specify one
pub const DEFAULT_GAS_PRICE: u128 = 24 * GWEI;
/// Upper bound for the gas limit a page may request
pub const MAX_GAS_LIMIT: u64 = 1_000_000;

/// Values used to complete a transaction the page only partially specified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDefaults {
    pub gas_limit: u64,
    pub gas_price: u128,
    pub max_gas_limit: u64,
}

impl Default for TransactionDefaults {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: DEFAULT_GAS_PRICE,
            max_gas_limit: MAX_GAS_LIMIT,
        }
    }
}

/// Transaction fields exactly as posted by the page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    #[serde(default, deserialize_with = "serde_helpers::address_opt::deserialize")]
    pub from: Option<Address>,
    #[serde(default, deserialize_with = "serde_helpers::address_opt::deserialize")]
    pub to: Option<Address>,
    #[serde(default, deserialize_with = "serde_helpers::quantity_opt::deserialize")]
    pub value: Option<U256>,
    #[serde(
        default,
        alias = "gasLimit",
        deserialize_with = "serde_helpers::quantity_opt::deserialize"
    )]
    pub gas: Option<U256>,
    #[serde(default, deserialize_with = "serde_helpers::quantity_opt::deserialize")]
    pub gas_price: Option<U256>,
    #[serde(default, alias = "input", deserialize_with = "serde_helpers::bytes_opt::deserialize")]
    pub data: Option<Bytes>,
    #[serde(default, deserialize_with = "serde_helpers::quantity_opt::deserialize")]
    pub nonce: Option<U256>,
}

/// What a transaction does, as shown to the user before approval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    /// plain value transfer to an account
    Transfer,
    /// call into a contract with call data
    ContractCall,
    /// no recipient: deploys the call data as a contract
    ContractCreation,
}

/// A transaction the page asked the wallet to sign, not yet approved.
///
/// The nonce may be absent; it is filled in before the user is asked to approve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnconfirmedTransaction {
    /// sender the page expects, if it named one
    pub from: Option<Address>,
    /// recipient, `None` for contract creation
    pub to: Option<Address>,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    /// call data, never empty when present
    pub data: Option<Bytes>,
    pub nonce: Option<u64>,
}

impl UnconfirmedTransaction {
    /// Decodes a transaction object, completing absent gas fields from `defaults`.
    pub fn decode(params: Value, defaults: &TransactionDefaults) -> Result<Self, DecodeError> {
        let params: TransactionParams =
            serde_json::from_value(serde_helpers::unwrap_single(params))?;
        Self::from_params(params, defaults)
    }

    pub fn from_params(
        params: TransactionParams,
        defaults: &TransactionDefaults,
    ) -> Result<Self, DecodeError> {
        let gas_limit = match params.gas {
            Some(gas) => u64::try_from(gas)
                .map_err(|_| DecodeError::ValueOverflow { field: "gas", bits: 64 })?,
            None => defaults.gas_limit,
        };
        if gas_limit > defaults.max_gas_limit {
            return Err(DecodeError::GasLimitTooHigh {
                requested: gas_limit,
                max: defaults.max_gas_limit,
            });
        }
        let gas_price = match params.gas_price {
            Some(price) => u128::try_from(price)
                .map_err(|_| DecodeError::ValueOverflow { field: "gasPrice", bits: 128 })?,
            None => defaults.gas_price,
        };
        let nonce = params
            .nonce
            .map(u64::try_from)
            .transpose()
            .map_err(|_| DecodeError::ValueOverflow { field: "nonce", bits: 64 })?;

        Ok(Self {
            from: params.from,
            to: params.to,
            value: params.value.unwrap_or_default(),
            gas_limit,
            gas_price,
            data: params.data.filter(|data| !data.is_empty()),
            nonce,
        })
    }

    pub fn kind(&self) -> TransactionKind {
        match (&self.to, &self.data) {
            (None, _) => TransactionKind::ContractCreation,
            (Some(_), Some(_)) => TransactionKind::ContractCall,
            (Some(_), None) => TransactionKind::Transfer,
        }
    }

    /// Upper bound of what the transaction may spend: `value + gas_limit * gas_price`.
    pub fn max_cost(&self) -> U256 {
        let fee = U256::from(self.gas_limit).saturating_mul(U256::from(self.gas_price));
        self.value.saturating_add(fee)
    }
}
