//! Minimum fee of a transaction: size, reference scripts and script execution

use gasless_codec::{CodecError, Redeemer, Transaction};
use gasless_common::{Lovelace, ProtocolParameters};
use num_bigint::BigInt;
use num_rational::{BigRational, Ratio};
use num_traits::{ToPrimitive, Zero};
use tracing::debug;

/// Bytes of reference script billed at one multiplier
pub const REFERENCE_SCRIPT_TIER_SIZE: u64 = 25_600;

/// `min_fee_b + size * min_fee_a`
pub fn linear_fee(params: &ProtocolParameters, tx_size: u64) -> u128 {
    params.min_fee_b as u128 + tx_size as u128 * params.min_fee_a as u128
}

fn to_big(ratio: &Ratio<u64>) -> BigRational {
    BigRational::new(BigInt::from(*ratio.numer()), BigInt::from(*ratio.denom()))
}

/// Tiered reference script surcharge.
///
/// The multiplier starts at 6/5 and is squared after every full tier; the
/// trailing partial tier is billed at whatever value it reached. Exact
/// arithmetic, floored once at the end, saturating at `u128::MAX`.
pub fn reference_script_fee(cost_per_byte: &Ratio<u64>, total_bytes: u64) -> u128 {
    if cost_per_byte.is_zero() || total_bytes == 0 {
        return 0;
    }

    let cost = to_big(cost_per_byte);
    let cap = BigRational::from_integer(BigInt::from(u128::MAX));
    let mut multiplier = BigRational::new(BigInt::from(6), BigInt::from(5));
    let mut fee = BigRational::zero();
    let mut remaining = total_bytes;

    while remaining >= REFERENCE_SCRIPT_TIER_SIZE {
        fee += BigRational::from_integer(BigInt::from(REFERENCE_SCRIPT_TIER_SIZE)) * &multiplier * &cost;
        if fee >= cap {
            return u128::MAX;
        }
        remaining -= REFERENCE_SCRIPT_TIER_SIZE;
        multiplier = &multiplier * &multiplier;
    }
    if remaining > 0 {
        fee += BigRational::from_integer(BigInt::from(remaining)) * &multiplier * &cost;
    }

    fee.floor().to_integer().to_u128().unwrap_or(u128::MAX)
}

fn price_units(units: u64, price: &Ratio<u64>) -> u128 {
    units as u128 * *price.numer() as u128 / *price.denom() as u128 + 1
}

/// Execution cost of every redeemer, each component floored plus one
pub fn script_execution_fee(params: &ProtocolParameters, redeemers: &[Redeemer]) -> u128 {
    redeemers
        .iter()
        .map(|r| {
            price_units(r.ex_units.mem, &params.price_mem)
                + price_units(r.ex_units.steps, &params.price_step)
        })
        .sum()
}

/// Fee for `sizing_tx`, a stand-in carrying as many signatures as the final
/// transaction will
pub fn compute_fee(
    params: &ProtocolParameters,
    sizing_tx: &Transaction,
    reference_script_bytes: u64,
) -> Result<Lovelace, CodecError> {
    let size = sizing_tx.encoded_len()? as u64;
    let base = linear_fee(params, size);
    let reference = reference_script_fee(&params.min_fee_ref_script_cost_per_byte, reference_script_bytes);
    let execution = script_execution_fee(params, sizing_tx.witness_set.redeemers());

    debug!(size, base, reference, execution, "Computed fee");
    let total = base.saturating_add(reference).saturating_add(execution);
    Ok(Lovelace::try_from(total).unwrap_or(Lovelace::MAX))
}

/// Copy of `tx` whose vkey witnesses are `count` fixed-size placeholders
pub fn sizing_transaction(tx: &Transaction, count: usize) -> Transaction {
    tx.with_witness_set(tx.witness_set.with_placeholder_vkeys(count))
}
