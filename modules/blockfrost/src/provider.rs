//! `LedgerQuery` over the Blockfrost REST API

use crate::{
    configuration::BlockfrostConfig,
    types::{
        AddressRest, AddressUtxoRest, AmountRest, EpochParametersRest, ScriptCborRest,
        ScriptJsonRest, ScriptRest, TxUtxosRest, to_address, to_balances, to_value,
    },
};
use async_trait::async_trait;
use gasless_common::{
    Address, AssetBalances, LedgerQuery, ProtocolParameters, QueryError, TxInput, UTxO,
    script::{NativeScript, ReferenceScript, ScriptType},
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Entries Blockfrost returns per page at most
const PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to initialize HTTP client: {0}")]
    ClientInit(#[from] reqwest::Error),

    #[error("No Blockfrost URL configured and project id {0:?} names no known network")]
    UnknownNetwork(String),
}

pub struct BlockfrostProvider {
    client: Client,
    base_url: String,
    project_id: String,
}

impl BlockfrostProvider {
    pub fn new(config: &BlockfrostConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url()
            .ok_or_else(|| ProviderError::UnknownNetwork(config.project_id.clone()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            project_id: config.project_id.clone(),
        })
    }

    /// GET `path`, with a 404 read as absent
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, QueryError> {
        let url = format!("{}{path}", self.base_url);
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header("project_id", &self.project_id)
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map(Some).map_err(|e| QueryError::Decode(e.to_string()))
    }

    /// The script behind `hash` as the bytes a reference to it is billed for
    async fn fetch_reference_script(&self, hash: &str) -> Result<Option<ReferenceScript>, QueryError> {
        let Some(info) = self.get::<ScriptRest>(&format!("/scripts/{hash}")).await? else {
            return Ok(None);
        };

        let script_type = match info.script_type.as_str() {
            "timelock" => ScriptType::Native,
            "plutusV1" => ScriptType::PlutusV1,
            "plutusV2" => ScriptType::PlutusV2,
            "plutusV3" => ScriptType::PlutusV3,
            other => return Err(QueryError::Decode(format!("unknown script type {other}"))),
        };

        let bytes = if script_type == ScriptType::Native {
            let json = self.get::<ScriptJsonRest>(&format!("/scripts/{hash}/json")).await?;
            match json.and_then(|j| j.json) {
                Some(json) => minicbor::to_vec(NativeScript::from(json))
                    .map_err(|e| QueryError::Decode(e.to_string()))?,
                None => return Ok(None),
            }
        } else {
            let cbor = self.get::<ScriptCborRest>(&format!("/scripts/{hash}/cbor")).await?;
            match cbor.and_then(|c| c.cbor) {
                Some(cbor) => hex::decode(cbor).map_err(|e| QueryError::Decode(e.to_string()))?,
                None => return Ok(None),
            }
        };

        Ok(Some(ReferenceScript::new(script_type, bytes)))
    }

    async fn to_utxo(
        &self,
        input: TxInput,
        address: &str,
        amount: &[AmountRest],
        reference_script_hash: Option<&str>,
    ) -> Result<UTxO, QueryError> {
        let reference_script = match reference_script_hash {
            Some(hash) => self.fetch_reference_script(hash).await?,
            None => None,
        };
        Ok(UTxO {
            input,
            address: to_address(address)?,
            value: to_value(amount)?,
            reference_script,
        })
    }
}

#[async_trait]
impl LedgerQuery for BlockfrostProvider {
    async fn fetch_utxo(&self, input: &TxInput) -> Result<Option<UTxO>, QueryError> {
        let Some(tx) = self.get::<TxUtxosRest>(&format!("/txs/{}/utxos", input.tx_hash)).await?
        else {
            return Ok(None);
        };

        let unspent = tx
            .outputs
            .iter()
            .find(|output| output.output_index == input.index && output.consumed_by_tx.is_none());
        match unspent {
            Some(output) => Ok(Some(
                self.to_utxo(
                    *input,
                    &output.address,
                    &output.amount,
                    output.reference_script_hash.as_deref(),
                )
                .await?,
            )),
            None => Ok(None),
        }
    }

    async fn fetch_utxos_at_address(&self, address: &Address) -> Result<Vec<UTxO>, QueryError> {
        let mut utxos = Vec::new();
        for page in 1.. {
            let entries = self
                .get::<Vec<AddressUtxoRest>>(&format!(
                    "/addresses/{address}/utxos?page={page}&count={PAGE_SIZE}"
                ))
                .await?
                .unwrap_or_default();

            let last = entries.len() < PAGE_SIZE;
            for entry in entries {
                let input = TxInput::new(entry.tx_hash, entry.output_index);
                utxos.push(
                    self.to_utxo(
                        input,
                        &entry.address,
                        &entry.amount,
                        entry.reference_script_hash.as_deref(),
                    )
                    .await?,
                );
            }
            if last {
                break;
            }
        }
        debug!("{} UTxOs at {address}", utxos.len());
        Ok(utxos)
    }

    async fn fetch_address_asset_balances(
        &self,
        address: &Address,
    ) -> Result<AssetBalances, QueryError> {
        match self.get::<AddressRest>(&format!("/addresses/{address}")).await? {
            Some(info) => to_balances(&info.amount),
            None => Ok(AssetBalances::new()),
        }
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, QueryError> {
        self.get::<EpochParametersRest>("/epochs/latest/parameters")
            .await?
            .ok_or_else(|| QueryError::Decode("no protocol parameters".to_string()))?
            .to_parameters()
    }
}
