//! Pool-side checks on a sponsored transaction before it is countersigned

use crate::augment::resolve_inputs;
use gasless_codec::{Transaction, TxOutput};
use gasless_common::{
    Address, AssetBalances, AssetId, KeyHash, LedgerQuery, Lovelace, PoolConditions,
    SponsorError, TokenRequirement, UTxO, Unit, Value,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Values on the pool's side of a transaction, and the inputs on the other side
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub consumed: Vec<&'a Value>,
    pub produced: Vec<&'a Value>,
    pub others: Vec<&'a UTxO>,
}

/// Split by whether `pool` is the payment credential
pub fn partition<'a>(spent: &'a [UTxO], outputs: &'a [TxOutput], pool: &KeyHash) -> Partition<'a> {
    let mut split = Partition::default();
    for utxo in spent {
        if utxo.address.is_controlled_by(pool) {
            split.consumed.push(&utxo.value);
        } else {
            split.others.push(utxo);
        }
    }
    split.produced = outputs
        .iter()
        .filter(|output| output.address.is_controlled_by(pool))
        .map(|output| &output.value)
        .collect();
    split
}

/// The pool's lovelace going in less what comes back must be the fee
pub fn check_fee_balance(
    consumed: &[&Value],
    produced: &[&Value],
    fee: Lovelace,
) -> Result<(), SponsorError> {
    let total = |values: &[&Value]| values.iter().map(|v| v.lovelace as i128).sum::<i128>();
    let observed = total(consumed) - total(produced);
    if observed != fee as i128 {
        return Err(SponsorError::FeeMismatch {
            observed,
            expected: fee,
        });
    }
    Ok(())
}

fn asset_totals<'a>(values: &[&'a Value]) -> BTreeMap<&'a AssetId, u128> {
    let mut totals = BTreeMap::new();
    for value in values {
        for (asset, quantity) in &value.assets {
            *totals.entry(asset).or_default() += *quantity as u128;
        }
    }
    totals
}

/// Every native asset the pool spends must come back to it in full. Assets
/// the pool receives beyond that are not checked.
pub fn check_asset_conservation(consumed: &[&Value], produced: &[&Value]) -> Result<(), SponsorError> {
    let returned = asset_totals(produced);
    for (asset, quantity) in asset_totals(consumed) {
        if returned.get(asset).copied().unwrap_or_default() < quantity {
            return Err(SponsorError::AssetMismatch {
                unit: Unit::Asset(asset.clone()),
            });
        }
    }
    Ok(())
}

/// The first requirement whose unit the balances hold decides: a passing
/// comparison qualifies, a failing one is an error. Units not held are skipped.
fn requirement_met(
    balances: &AssetBalances,
    requirements: &[TokenRequirement],
) -> Result<bool, SponsorError> {
    for requirement in requirements {
        let held = balances.get(&requirement.unit).copied().unwrap_or_default();
        if held == 0 {
            continue;
        }
        if !requirement.comparison.holds(held, requirement.quantity) {
            return Err(SponsorError::AssetValueCheckFailed {
                unit: requirement.unit.clone(),
                comparison: requirement.comparison,
                threshold: requirement.quantity,
                held,
            });
        }
        return Ok(true);
    }
    Ok(false)
}

/// Some non-pool input address must hold a required token. Each address is
/// queried once per call.
pub async fn check_token_requirements<L: LedgerQuery + ?Sized>(
    ledger: &L,
    others: &[&UTxO],
    requirements: Option<&[TokenRequirement]>,
) -> Result<(), SponsorError> {
    let requirements = requirements.ok_or(SponsorError::NoTokenRequirements)?;

    let mut balances: HashMap<&Address, AssetBalances> = HashMap::new();
    let mut found = false;
    for &utxo in others {
        if !balances.contains_key(&utxo.address) {
            let fetched = ledger.fetch_address_asset_balances(&utxo.address).await?;
            balances.insert(&utxo.address, fetched);
        }
        if let Some(held) = balances.get(&utxo.address) {
            found |= requirement_met(held, requirements)?;
        }
    }

    if !found {
        return Err(SponsorError::MissingRequiredAsset);
    }
    Ok(())
}

/// Some non-pool input must sit at an address written in the whitelist
pub fn check_whitelist(others: &[&UTxO], whitelist: Option<&[String]>) -> Result<(), SponsorError> {
    let whitelist = whitelist.ok_or(SponsorError::NoWhitelist)?;
    let listed = others
        .iter()
        .any(|utxo| whitelist.iter().any(|entry| *entry == utxo.address.to_string()));
    if !listed {
        return Err(SponsorError::AddressNotWhitelisted);
    }
    Ok(())
}

/// Run every check `conditions` asks for against `tx`, with `pool` as the
/// sponsoring party
pub async fn validate_transaction<L: LedgerQuery + ?Sized>(
    ledger: &L,
    tx: &Transaction,
    pool: &KeyHash,
    conditions: &PoolConditions,
) -> Result<(), SponsorError> {
    let resolved = resolve_inputs(ledger, &tx.body.inputs).await?;
    let spent: Vec<UTxO> = tx
        .body
        .inputs
        .iter()
        .filter_map(|input| resolved.get(input).cloned())
        .collect();

    let split = partition(&spent, &tx.body.outputs, pool);
    debug!(
        consumed = split.consumed.len(),
        produced = split.produced.len(),
        others = split.others.len(),
        "Partitioned transaction"
    );

    check_fee_balance(&split.consumed, &split.produced, tx.body.fee)?;
    check_asset_conservation(&split.consumed, &split.produced)?;

    if conditions.token_requirements.is_some() {
        check_token_requirements(ledger, &split.others, conditions.token_requirements.as_deref())
            .await?;
    }
    if conditions.whitelist.is_some() {
        check_whitelist(&split.others, conditions.whitelist.as_deref())?;
    }
    Ok(())
}
