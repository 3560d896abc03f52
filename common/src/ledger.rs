//! Ledger query collaborator

use crate::{
    address::Address, asset::Unit, protocol_params::ProtocolParameters, types::TxInput, UTxO,
};
use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;

/// Quantity held per unit across every output at an address
pub type AssetBalances = BTreeMap<Unit, u64>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Ledger service unreachable: {0}")]
    Transport(String),

    #[error("Ledger service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Cannot decode ledger service response: {0}")]
    Decode(String),
}

/// Read access to the ledger. Implementations may be remote and slow; callers
/// never cache answers across requests.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// The output at `input`, if it exists and is unspent
    async fn fetch_utxo(&self, input: &TxInput) -> Result<Option<UTxO>, QueryError>;

    async fn fetch_utxos_at_address(&self, address: &Address) -> Result<Vec<UTxO>, QueryError>;

    async fn fetch_address_asset_balances(
        &self,
        address: &Address,
    ) -> Result<AssetBalances, QueryError>;

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, QueryError>;
}

#[async_trait]
impl<T: LedgerQuery + ?Sized> LedgerQuery for Arc<T> {
    async fn fetch_utxo(&self, input: &TxInput) -> Result<Option<UTxO>, QueryError> {
        (**self).fetch_utxo(input).await
    }

    async fn fetch_utxos_at_address(&self, address: &Address) -> Result<Vec<UTxO>, QueryError> {
        (**self).fetch_utxos_at_address(address).await
    }

    async fn fetch_address_asset_balances(
        &self,
        address: &Address,
    ) -> Result<AssetBalances, QueryError> {
        (**self).fetch_address_asset_balances(address).await
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, QueryError> {
        (**self).fetch_protocol_parameters().await
    }
}
