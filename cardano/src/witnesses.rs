//! How many distinct keys must sign a transaction

use gasless_codec::TxBody;
use gasless_common::{KeyHash, TxInput, UTxO, script::NativeScript};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Key hashes whose vkey witnesses `body` needs.
///
/// `utxos` resolves spent and collateral inputs; inputs it does not know about
/// contribute nothing. `scripts` are native script encodings supplied with the
/// transaction or by reference; any that fail to decode are skipped.
pub fn required_witnesses<'a>(
    body: &TxBody,
    utxos: &HashMap<TxInput, UTxO>,
    scripts: impl IntoIterator<Item = &'a [u8]>,
) -> HashSet<KeyHash> {
    let mut keys = HashSet::new();

    for input in body.inputs.iter().chain(body.collateral()) {
        if let Some(key) = utxos
            .get(input)
            .and_then(|utxo| utxo.address.payment_credential())
            .and_then(|credential| credential.key_hash())
        {
            keys.insert(key);
        }
    }

    for account in body.withdrawals() {
        keys.insert(*account.credential().hash());
    }

    for certificate in body.certificates() {
        keys.extend(certificate.witness_hashes());
    }

    for bytes in scripts {
        match minicbor::decode::<NativeScript>(bytes) {
            Ok(script) => script.collect_key_hashes(&mut keys),
            Err(e) => warn!("Skipping undecodable native script {}: {e}", hex::encode(bytes)),
        }
    }

    keys.extend(body.required_signers.iter().copied());
    keys
}

pub fn count_required_witnesses<'a>(
    body: &TxBody,
    utxos: &HashMap<TxInput, UTxO>,
    scripts: impl IntoIterator<Item = &'a [u8]>,
) -> usize {
    required_witnesses(body, utxos, scripts).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_codec::Transaction;
    use gasless_common::{Credential, Value};
    use gasless_test_utils::{
        TxBuilder, address, credential_certificate, key_hash, reward_account, script_address,
        tx_input, utxo,
    };
    use quickcheck_macros::quickcheck;

    const NO_SCRIPTS: [&[u8]; 0] = [];

    fn body(builder: TxBuilder) -> TxBody {
        Transaction::decode(&builder.build()).unwrap().body
    }

    fn resolved(entries: &[(TxInput, gasless_common::Address)]) -> HashMap<TxInput, UTxO> {
        entries
            .iter()
            .map(|(input, address)| (*input, utxo(*input, address.clone(), Value::new(2_000_000))))
            .collect()
    }

    #[test]
    fn inputs_and_collateral_count_once_per_key() {
        let utxos = resolved(&[
            (tx_input(1, 0), address(1)),
            (tx_input(1, 1), address(1)),
            (tx_input(2, 0), address(2)),
            (tx_input(3, 0), script_address(3)),
        ]);
        let body = body(
            TxBuilder::new()
                .input(tx_input(1, 0))
                .input(tx_input(1, 1))
                .input(tx_input(3, 0))
                .collateral(tx_input(2, 0))
                .collateral(tx_input(1, 0)),
        );

        let keys = required_witnesses(&body, &utxos, NO_SCRIPTS);
        assert_eq!(keys, HashSet::from([key_hash(1), key_hash(2)]));
    }

    #[test]
    fn unknown_inputs_contribute_nothing() {
        let body = body(TxBuilder::new().input(tx_input(9, 0)));
        assert_eq!(count_required_witnesses(&body, &HashMap::new(), NO_SCRIPTS), 0);
    }

    #[test]
    fn withdrawals_certificates_and_signers_share_one_set() {
        let utxos = resolved(&[(tx_input(1, 0), address(1))]);
        let body = body(
            TxBuilder::new()
                .input(tx_input(1, 0))
                .withdrawal(reward_account(4), 10)
                .certificate(credential_certificate(1, Credential::AddrKeyHash(key_hash(5))))
                .certificate(credential_certificate(1, Credential::AddrKeyHash(key_hash(4))))
                .required_signer(key_hash(1))
                .required_signer(key_hash(6)),
        );

        let keys = required_witnesses(&body, &utxos, NO_SCRIPTS);
        assert_eq!(
            keys,
            HashSet::from([key_hash(1), key_hash(4), key_hash(5), key_hash(6)])
        );
    }

    #[test]
    fn native_script_keys_are_included_and_junk_is_skipped() {
        let script = NativeScript::ScriptAll(vec![
            NativeScript::ScriptPubkey(key_hash(7)),
            NativeScript::ScriptAny(vec![
                NativeScript::ScriptPubkey(key_hash(8)),
                NativeScript::InvalidBefore(10),
            ]),
        ]);
        let encoded = minicbor::to_vec(&script).unwrap();
        let junk = [0xffu8, 0x00];
        let body = body(TxBuilder::new().required_signer(key_hash(7)));

        let count = count_required_witnesses(
            &body,
            &HashMap::new(),
            [encoded.as_slice(), junk.as_slice()],
        );
        assert_eq!(count, 2);
    }

    #[quickcheck]
    fn signer_order_does_not_change_the_count(seeds: Vec<u8>) -> bool {
        let forward = seeds
            .iter()
            .fold(TxBuilder::new(), |b, seed| b.required_signer(key_hash(*seed)));
        let backward = seeds
            .iter()
            .rev()
            .fold(TxBuilder::new(), |b, seed| b.required_signer(key_hash(*seed)));
        let distinct: HashSet<u8> = seeds.iter().copied().collect();

        let utxos = HashMap::new();
        let a = count_required_witnesses(&body(forward), &utxos, NO_SCRIPTS);
        let b = count_required_witnesses(&body(backward), &utxos, NO_SCRIPTS);
        a == b && a == distinct.len()
    }

    #[quickcheck]
    fn input_order_does_not_change_the_count(seeds: Vec<u8>) -> bool {
        let utxos: HashMap<TxInput, UTxO> = seeds
            .iter()
            .map(|seed| {
                let input = tx_input(*seed, 0);
                (input, utxo(input, address(seed % 5), Value::new(1_000_000)))
            })
            .collect();
        let forward = seeds.iter().fold(TxBuilder::new(), |b, seed| b.input(tx_input(*seed, 0)));
        let backward =
            seeds.iter().rev().fold(TxBuilder::new(), |b, seed| b.input(tx_input(*seed, 0)));
        let owners: HashSet<u8> = seeds.iter().map(|seed| seed % 5).collect();

        let a = count_required_witnesses(&body(forward), &utxos, NO_SCRIPTS);
        let b = count_required_witnesses(&body(backward), &utxos, NO_SCRIPTS);
        a == b && a == owners.len()
    }
}
