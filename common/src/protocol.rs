//! JSON bodies exchanged between a sponsor client and a pool

use crate::{conditions::PoolConditions, error::SponsorError, hash::KeyHash, TxHash, TxInput};
use serde::{Deserialize, Serialize};

/// Caller-pinned sponsor output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoRef {
    pub tx_hash: TxHash,
    pub output_index: u64,
}

impl From<UtxoRef> for TxInput {
    fn from(r: UtxoRef) -> Self {
        TxInput::new(r.tx_hash, r.output_index)
    }
}

/// `POST /` body. With `pool_id` the pool sponsors, validates and signs;
/// without it the pool only validates and countersigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRequest {
    pub tx_cbor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utxo: Option<UtxoRef>,
}

impl PoolRequest {
    pub fn countersign(tx_cbor: String) -> Self {
        Self {
            tx_cbor,
            pool_id: None,
            utxo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&SponsorError> for ErrorBody {
    fn from(error: &SponsorError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// `POST /` reply: the hex transaction on success, a reason otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolResponse {
    pub data: Option<String>,
    pub error: Option<ErrorBody>,
    pub success: bool,
}

impl PoolResponse {
    pub fn ok(tx_cbor: String) -> Self {
        Self {
            data: Some(tx_cbor),
            error: None,
            success: true,
        }
    }

    pub fn failed(error: &SponsorError) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            success: false,
        }
    }
}

/// `GET /conditions` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsResponse {
    pub pub_key: KeyHash,
    pub conditions: PoolConditions,
}
