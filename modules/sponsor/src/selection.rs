//! Choosing the pool output that pays the fee

use gasless_common::{Address, LedgerQuery, Lovelace, SponsorError, TxInput, UTxO};
use std::cmp::Reverse;
use tracing::debug;

/// Lovelace an output should hold to be preferred as the fee source
pub const DEFAULT_FEE_RESERVATION: Lovelace = 3_000_000;

/// Smallest output covering `reservation`, fewer assets winning ties. When no
/// output covers it the largest one is used and the fee check decides later.
pub fn choose_sponsor_utxo(candidates: Vec<UTxO>, reservation: Lovelace) -> Option<UTxO> {
    let covering = candidates
        .iter()
        .filter(|utxo| utxo.value.lovelace >= reservation)
        .min_by_key(|utxo| (utxo.value.lovelace, utxo.value.asset_count(), utxo.input))
        .cloned();

    covering.or_else(|| {
        candidates.into_iter().max_by_key(|utxo| {
            (utxo.value.lovelace, Reverse(utxo.value.asset_count()), Reverse(utxo.input))
        })
    })
}

/// The output to spend for the fee. A pinned reference is the only
/// candidate when given; otherwise everything at `pool_address` is.
pub async fn select_sponsor_utxo<L: LedgerQuery + ?Sized>(
    ledger: &L,
    pool_address: &Address,
    pinned: Option<TxInput>,
    reservation: Lovelace,
) -> Result<UTxO, SponsorError> {
    let candidates = match pinned {
        Some(input) => {
            let utxo = ledger.fetch_utxo(&input).await?;
            if utxo.as_ref().is_some_and(|utxo| &utxo.address != pool_address) {
                return Err(SponsorError::SponsorUtxoNotAtPool(input));
            }
            utxo.into_iter().collect()
        }
        None => ledger.fetch_utxos_at_address(pool_address).await?,
    };
    debug!("{} candidate sponsor UTxOs", candidates.len());

    let chosen = choose_sponsor_utxo(candidates, reservation).ok_or_else(|| {
        SponsorError::NoFundsAvailable(match pinned {
            Some(input) => format!("provided UTxO {input}"),
            None => pool_address.to_string(),
        })
    })?;

    debug!("Sponsoring from {} holding {} lovelace", chosen.input, chosen.value.lovelace);
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_common::{AssetId, AssetName, PolicyId, Value};
    use gasless_test_utils::{InMemoryLedger, address, tx_input, utxo};

    fn token() -> AssetId {
        AssetId::new(PolicyId::new([9; 28]), AssetName::new(b"tok").unwrap())
    }

    #[test]
    fn smallest_covering_output_wins() {
        let chosen = choose_sponsor_utxo(
            vec![
                utxo(tx_input(1, 0), address(1), Value::new(10_000_000)),
                utxo(tx_input(2, 0), address(1), Value::new(4_000_000)),
                utxo(tx_input(3, 0), address(1), Value::new(2_000_000)),
            ],
            DEFAULT_FEE_RESERVATION,
        )
        .unwrap();
        assert_eq!(chosen.input, tx_input(2, 0));
    }

    #[test]
    fn fewer_assets_break_ties() {
        let chosen = choose_sponsor_utxo(
            vec![
                utxo(tx_input(1, 0), address(1), Value::new(5_000_000).with_asset(token(), 1)),
                utxo(tx_input(2, 0), address(1), Value::new(5_000_000)),
            ],
            DEFAULT_FEE_RESERVATION,
        )
        .unwrap();
        assert_eq!(chosen.input, tx_input(2, 0));
    }

    #[test]
    fn falls_back_to_largest_when_nothing_covers() {
        let chosen = choose_sponsor_utxo(
            vec![
                utxo(tx_input(1, 0), address(1), Value::new(1_000_000)),
                utxo(tx_input(2, 0), address(1), Value::new(2_500_000)),
            ],
            DEFAULT_FEE_RESERVATION,
        )
        .unwrap();
        assert_eq!(chosen.input, tx_input(2, 0));
        assert!(choose_sponsor_utxo(vec![], DEFAULT_FEE_RESERVATION).is_none());
    }

    #[tokio::test]
    async fn pinned_reference_is_the_only_candidate() {
        let ledger = InMemoryLedger::default();
        ledger.add_utxo(utxo(tx_input(1, 0), address(1), Value::new(50_000_000)));
        ledger.add_utxo(utxo(tx_input(2, 0), address(1), Value::new(1_000_000)));

        let chosen =
            select_sponsor_utxo(&ledger, &address(1), Some(tx_input(2, 0)), DEFAULT_FEE_RESERVATION)
                .await
                .unwrap();
        assert_eq!(chosen.input, tx_input(2, 0));
    }

    #[tokio::test]
    async fn pinned_output_must_belong_to_the_pool() {
        let ledger = InMemoryLedger::default();
        ledger.add_utxo(utxo(tx_input(3, 0), address(3), Value::new(9_000_000)));

        let err =
            select_sponsor_utxo(&ledger, &address(1), Some(tx_input(3, 0)), DEFAULT_FEE_RESERVATION)
                .await
                .unwrap_err();
        assert_eq!(err, SponsorError::SponsorUtxoNotAtPool(tx_input(3, 0)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn empty_pool_has_no_funds() {
        let ledger = InMemoryLedger::default();

        let err = select_sponsor_utxo(&ledger, &address(1), None, DEFAULT_FEE_RESERVATION)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NoFundsAvailable");

        let err =
            select_sponsor_utxo(&ledger, &address(1), Some(tx_input(7, 1)), DEFAULT_FEE_RESERVATION)
                .await
                .unwrap_err();
        assert!(matches!(err, SponsorError::NoFundsAvailable(msg) if msg.contains("provided UTxO")));
    }
}
