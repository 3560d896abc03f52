//! Adding the sponsor input and change output to a transaction and sizing
//! its fee

use gasless_cardano::{
    fees::{compute_fee, sizing_transaction},
    witnesses::count_required_witnesses,
};
use gasless_codec::{Transaction, TxOutput};
use gasless_common::{
    KeyHash, LedgerQuery, Lovelace, ProtocolParameters, SponsorError, TxInput, UTxO,
    script::ReferenceScript,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Fee written before sizing so the body has its final shape
pub const PLACEHOLDER_FEE: Lovelace = 100_000;

/// Resolve each input in order, failing on the first the ledger does not know
pub async fn resolve_inputs<L: LedgerQuery + ?Sized>(
    ledger: &L,
    inputs: &[TxInput],
) -> Result<HashMap<TxInput, UTxO>, SponsorError> {
    let mut resolved = HashMap::new();
    for input in inputs {
        let utxo = ledger
            .fetch_utxo(input)
            .await?
            .ok_or(SponsorError::MissingInputUtxo(*input))?;
        resolved.insert(*input, utxo);
    }
    Ok(resolved)
}

/// Bytes of every reference script the transaction touches: those behind its
/// reference inputs plus the one on the sponsor output, if any
pub async fn reference_script_bytes<L: LedgerQuery + ?Sized>(
    ledger: &L,
    reference_inputs: &[TxInput],
    sponsor: &UTxO,
) -> Result<u64, SponsorError> {
    let mut total = sponsor.reference_script.as_ref().map_or(0, ReferenceScript::size);
    for input in reference_inputs {
        let utxo = ledger
            .fetch_utxo(input)
            .await?
            .ok_or(SponsorError::MissingReferenceScriptUtxo(*input))?;
        total += utxo.reference_script.as_ref().map_or(0, ReferenceScript::size);
    }
    Ok(total)
}

/// Add `sponsor` as an input, return its value to its own address less the
/// fee, and require `signer`.
///
/// The witness set of `base` is returned untouched; placeholder signatures
/// exist only on the copy used to measure the encoded size.
pub async fn sponsor_transaction<L: LedgerQuery + ?Sized>(
    ledger: &L,
    base: Transaction,
    sponsor: &UTxO,
    signer: KeyHash,
    params: &ProtocolParameters,
) -> Result<Transaction, SponsorError> {
    let resolved = resolve_inputs(ledger, &base.body.inputs).await?;
    let input_scripts: Vec<Vec<u8>> = resolved
        .values()
        .filter_map(|utxo| match &utxo.reference_script {
            Some(ReferenceScript::Native(bytes)) => Some(bytes.clone()),
            _ => None,
        })
        .collect();

    // collateral owners sign too
    let mut spent = resolve_inputs(ledger, base.body.collateral()).await?;
    spent.extend(resolved);

    let mut tx = base;
    tx.body.inputs.push(sponsor.input);
    tx.body.outputs.push(TxOutput::new(sponsor.address.clone(), sponsor.value.clone()));
    let change_index = tx.body.outputs.len() - 1;

    if !tx.body.required_signers.contains(&signer) {
        tx.body.required_signers.push(signer);
    }
    tx.body.fee = PLACEHOLDER_FEE;

    let reference_bytes = reference_script_bytes(ledger, tx.body.reference_inputs(), sponsor).await?;

    let scripts = tx
        .witness_set
        .native_scripts()
        .iter()
        .chain(&input_scripts)
        .map(Vec::as_slice);
    let witnesses = count_required_witnesses(&tx.body, &spent, scripts);
    debug!(witnesses, reference_bytes, "Sizing sponsored transaction");

    let fee = compute_fee(params, &sizing_transaction(&tx, witnesses), reference_bytes)?;
    let available = sponsor.value.lovelace;
    if fee > available {
        return Err(SponsorError::InsufficientSponsorFunds { available, fee });
    }

    tx.body.fee = fee;
    tx.body.outputs[change_index] = tx.body.outputs[change_index].with_lovelace(available - fee);

    info!("Sponsored transaction with fee {fee} from {}", sponsor.input);
    Ok(tx)
}
