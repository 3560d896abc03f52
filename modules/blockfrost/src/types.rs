//! Blockfrost response bodies and their conversion to ledger types

use gasless_common::{
    Address, AssetBalances, KeyHash, ProtocolParameters, QueryError, TxHash, Unit, Value,
    protocol_params::decimal_to_ratio, script::NativeScript,
};
use num_rational::Ratio;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AmountRest {
    pub unit: String,
    pub quantity: String, // u64 in string
}

/// One output of `GET /txs/{hash}/utxos`
#[derive(Debug, Deserialize)]
pub struct TxOutputRest {
    pub address: String,
    pub amount: Vec<AmountRest>,
    pub output_index: u64,
    #[serde(default)]
    pub reference_script_hash: Option<String>,
    /// Set once a later transaction has spent the output
    #[serde(default)]
    pub consumed_by_tx: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TxUtxosRest {
    pub outputs: Vec<TxOutputRest>,
}

/// One entry of `GET /addresses/{address}/utxos`
#[derive(Debug, Deserialize)]
pub struct AddressUtxoRest {
    pub address: String,
    pub tx_hash: TxHash,
    pub output_index: u64,
    pub amount: Vec<AmountRest>,
    #[serde(default)]
    pub reference_script_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddressRest {
    pub amount: Vec<AmountRest>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptRest {
    #[serde(rename = "type")]
    pub script_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ScriptCborRest {
    pub cbor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptJsonRest {
    pub json: Option<NativeScriptJson>,
}

/// Timelock script in the cardano-cli JSON form
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NativeScriptJson {
    Sig {
        #[serde(rename = "keyHash")]
        key_hash: KeyHash,
    },
    All {
        scripts: Vec<NativeScriptJson>,
    },
    Any {
        scripts: Vec<NativeScriptJson>,
    },
    AtLeast {
        required: u32,
        scripts: Vec<NativeScriptJson>,
    },
    After {
        slot: u64,
    },
    Before {
        slot: u64,
    },
}

impl From<NativeScriptJson> for NativeScript {
    fn from(json: NativeScriptJson) -> Self {
        let all = |scripts: Vec<NativeScriptJson>| -> Vec<NativeScript> {
            scripts.into_iter().map(NativeScript::from).collect()
        };
        match json {
            NativeScriptJson::Sig { key_hash } => NativeScript::ScriptPubkey(key_hash),
            NativeScriptJson::All { scripts } => NativeScript::ScriptAll(all(scripts)),
            NativeScriptJson::Any { scripts } => NativeScript::ScriptAny(all(scripts)),
            NativeScriptJson::AtLeast { required, scripts } => {
                NativeScript::ScriptNOfK(required, all(scripts))
            }
            NativeScriptJson::After { slot } => NativeScript::InvalidBefore(slot),
            NativeScriptJson::Before { slot } => NativeScript::InvalidHereafter(slot),
        }
    }
}

/// `GET /epochs/latest/parameters`, the fields the fee needs
#[derive(Debug, Deserialize)]
pub struct EpochParametersRest {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    #[serde(default)]
    pub min_fee_ref_script_cost_per_byte: Option<serde_json::Number>,
    #[serde(default)]
    pub price_mem: Option<serde_json::Number>,
    #[serde(default)]
    pub price_step: Option<serde_json::Number>,
}

fn decode_error(e: impl std::fmt::Display) -> QueryError {
    QueryError::Decode(e.to_string())
}

fn ratio(number: &Option<serde_json::Number>) -> Result<Ratio<u64>, QueryError> {
    match number {
        Some(n) => decimal_to_ratio(&n.to_string()).map_err(decode_error),
        None => Ok(Ratio::from_integer(0)),
    }
}

impl EpochParametersRest {
    pub fn to_parameters(&self) -> Result<ProtocolParameters, QueryError> {
        Ok(ProtocolParameters {
            min_fee_a: self.min_fee_a,
            min_fee_b: self.min_fee_b,
            min_fee_ref_script_cost_per_byte: ratio(&self.min_fee_ref_script_cost_per_byte)?,
            price_mem: ratio(&self.price_mem)?,
            price_step: ratio(&self.price_step)?,
        })
    }
}

fn quantity(amount: &AmountRest) -> Result<(Unit, u64), QueryError> {
    let unit: Unit = amount.unit.parse().map_err(decode_error)?;
    let quantity = amount.quantity.parse::<u64>().map_err(decode_error)?;
    Ok((unit, quantity))
}

pub fn to_value(amounts: &[AmountRest]) -> Result<Value, QueryError> {
    let mut value = Value::default();
    for amount in amounts {
        match quantity(amount)? {
            (Unit::Lovelace, q) => value.lovelace += q,
            (Unit::Asset(asset), q) => value = value.with_asset(asset, q),
        }
    }
    Ok(value)
}

pub fn to_balances(amounts: &[AmountRest]) -> Result<AssetBalances, QueryError> {
    let mut balances = AssetBalances::new();
    for amount in amounts {
        let (unit, q) = quantity(amount)?;
        if q > 0 {
            *balances.entry(unit).or_default() += q;
        }
    }
    Ok(balances)
}

pub fn to_address(text: &str) -> Result<Address, QueryError> {
    text.parse().map_err(decode_error)
}
