//! The two sides of a sponsorship: whoever adds the fee input, and the pool
//! that checks and countersigns

use crate::{
    augment::sponsor_transaction,
    selection::{DEFAULT_FEE_RESERVATION, select_sponsor_utxo},
    validation::validate_transaction,
};
use async_trait::async_trait;
use gasless_codec::Transaction;
use gasless_common::{
    Address, KeyHash, LedgerQuery, Lovelace, PoolConditions, Signer, SponsorError, TxInput,
    protocol::PoolRequest,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// What a client asks to have sponsored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorTxParams {
    /// Hex CBOR of the unsigned transaction
    pub tx_cbor: String,
    /// Address of the pool paying the fee
    pub pool_id: String,
    /// Pool output to spend, instead of letting the pool choose
    pub utxo: Option<TxInput>,
}

impl TryFrom<PoolRequest> for SponsorTxParams {
    type Error = SponsorError;

    fn try_from(request: PoolRequest) -> Result<Self, Self::Error> {
        let pool_id = request
            .pool_id
            .ok_or_else(|| SponsorError::InvalidRequest("missing poolId".to_string()))?;
        Ok(Self {
            tx_cbor: request.tx_cbor,
            pool_id,
            utxo: request.utxo.map(TxInput::from),
        })
    }
}

/// Adds a fee-paying input and change output, leaving the result unsigned
#[async_trait]
pub trait SponsorAugmentation: Send + Sync {
    async fn sponsor_tx(&self, params: SponsorTxParams) -> Result<String, SponsorError>;
}

/// Checks a sponsored transaction against a pool's conditions and returns it
/// countersigned
#[async_trait]
pub trait PoolValidation: Send + Sync {
    async fn validate_tx(&self, tx_cbor: &str) -> Result<String, SponsorError>;
}

pub(crate) fn decode_hex_tx(tx_cbor: &str) -> Result<(Vec<u8>, Transaction), SponsorError> {
    let bytes = hex::decode(tx_cbor.trim())
        .map_err(|e| SponsorError::InvalidTransaction(e.to_string()))?;
    let tx = Transaction::decode(&bytes)?;
    Ok((bytes, tx))
}

/// Sponsorship without a server: any pool address, the caller's ledger view
pub struct Sponsor<L> {
    ledger: L,
    reservation: Lovelace,
}

impl<L: LedgerQuery> Sponsor<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            reservation: DEFAULT_FEE_RESERVATION,
        }
    }

    /// Lovelace an output should hold before it is preferred as fee source
    pub fn with_reservation(mut self, reservation: Lovelace) -> Self {
        self.reservation = reservation;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Sponsor from the pool at `params.pool_id`, returning the decoded result
    pub async fn sponsor(&self, params: &SponsorTxParams) -> Result<Transaction, SponsorError> {
        let pool_address: Address = params
            .pool_id
            .parse()
            .map_err(|e| SponsorError::InvalidRequest(format!("poolId: {e}")))?;
        let signer = pool_address
            .payment_credential()
            .and_then(|credential| credential.key_hash())
            .ok_or_else(|| {
                SponsorError::InvalidRequest("poolId must be paid to a key".to_string())
            })?;

        let sponsor_utxo =
            select_sponsor_utxo(&self.ledger, &pool_address, params.utxo, self.reservation).await?;
        let (_, base) = decode_hex_tx(&params.tx_cbor)?;
        let protocol_params = self.ledger.fetch_protocol_parameters().await?;

        sponsor_transaction(&self.ledger, base, &sponsor_utxo, signer, &protocol_params).await
    }
}

#[async_trait]
impl<L: LedgerQuery> SponsorAugmentation for Sponsor<L> {
    async fn sponsor_tx(&self, params: SponsorTxParams) -> Result<String, SponsorError> {
        Ok(self.sponsor(&params).await?.to_hex()?)
    }
}

/// A pool: sponsors from its own address, validates against its live
/// conditions and countersigns with its key
pub struct Pool<L, S> {
    sponsor: Sponsor<L>,
    signer: S,
    address: Address,
    conditions: RwLock<Arc<PoolConditions>>,
}

impl<L: LedgerQuery, S: Signer> Pool<L, S> {
    pub fn new(ledger: L, signer: S, address: Address, conditions: PoolConditions) -> Self {
        Self {
            sponsor: Sponsor::new(ledger),
            signer,
            address,
            conditions: RwLock::new(Arc::new(conditions)),
        }
    }

    pub fn with_reservation(mut self, reservation: Lovelace) -> Self {
        self.sponsor = self.sponsor.with_reservation(reservation);
        self
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn key_hash(&self) -> KeyHash {
        self.signer.key_hash()
    }

    /// The conditions in force right now
    pub fn conditions(&self) -> Arc<PoolConditions> {
        self.conditions.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the conditions; requests already running keep the old ones
    pub fn set_conditions(&self, conditions: PoolConditions) {
        *self.conditions.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(conditions);
        info!("Pool conditions replaced");
    }

    /// Serve one request: sponsor, validate and sign when it names a pool,
    /// otherwise validate and countersign only
    pub async fn handle(&self, request: PoolRequest) -> Result<String, SponsorError> {
        if request.pool_id.is_none() {
            return self.validate_tx(&request.tx_cbor).await;
        }

        let params = SponsorTxParams::try_from(request)?;
        let requested: Address = params
            .pool_id
            .parse()
            .map_err(|e| SponsorError::InvalidRequest(format!("poolId: {e}")))?;
        if requested != self.address {
            return Err(SponsorError::InvalidRequest(format!(
                "this pool sponsors from {}, not {requested}",
                self.address
            )));
        }

        let sponsored = self.sponsor.sponsor_tx(params).await?;
        self.validate_tx(&sponsored).await
    }
}

#[async_trait]
impl<L: LedgerQuery, S: Signer> SponsorAugmentation for Pool<L, S> {
    async fn sponsor_tx(&self, params: SponsorTxParams) -> Result<String, SponsorError> {
        self.sponsor.sponsor_tx(params).await
    }
}

#[async_trait]
impl<L: LedgerQuery, S: Signer> PoolValidation for Pool<L, S> {
    async fn validate_tx(&self, tx_cbor: &str) -> Result<String, SponsorError> {
        let (bytes, tx) = decode_hex_tx(tx_cbor)?;
        let conditions = self.conditions();
        validate_transaction(self.sponsor.ledger(), &tx, &self.key_hash(), &conditions).await?;

        let signed = self.signer.sign(&bytes)?;
        info!("Countersigned transaction with fee {}", tx.body.fee);
        Ok(hex::encode(signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_codec::add_vkey_witness;
    use gasless_common::{SignerError, Value, VKeyWitness};
    use gasless_test_utils::{InMemoryLedger, TxBuilder, address, key_hash, tx_input, utxo};

    const POOL: u8 = 2;

    /// Signs with a fixed fake witness
    struct FakeSigner;

    impl Signer for FakeSigner {
        fn key_hash(&self) -> KeyHash {
            key_hash(POOL)
        }

        fn sign(&self, tx: &[u8]) -> Result<Vec<u8>, SignerError> {
            add_vkey_witness(tx, VKeyWitness::placeholder(POOL))
                .map_err(|e| SignerError::Transaction(e.to_string()))
        }
    }

    fn ledger() -> Arc<InMemoryLedger> {
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.add_utxo(utxo(tx_input(1, 0), address(1), Value::new(10_000_000)));
        ledger.add_utxo(utxo(tx_input(2, 0), address(POOL), Value::new(5_000_000)));
        ledger.add_utxo(utxo(tx_input(2, 1), address(POOL), Value::new(20_000_000)));
        ledger
    }

    fn pool(ledger: Arc<InMemoryLedger>) -> Pool<Arc<InMemoryLedger>, FakeSigner> {
        Pool::new(ledger, FakeSigner, address(POOL), PoolConditions::default())
    }

    fn user_tx() -> String {
        TxBuilder::new()
            .input(tx_input(1, 0))
            .output(address(3), Value::new(9_000_000))
            .build_hex()
    }

    fn sponsor_request() -> PoolRequest {
        PoolRequest {
            tx_cbor: user_tx(),
            pool_id: Some(address(POOL).to_string()),
            utxo: None,
        }
    }

    #[tokio::test]
    async fn pool_sponsors_validates_and_signs() {
        let pool = pool(ledger());

        let signed = pool.handle(sponsor_request()).await.unwrap();
        let tx = Transaction::from_hex(&signed).unwrap();
        assert_eq!(tx.body.inputs, vec![tx_input(1, 0), tx_input(2, 0)]);
        assert_eq!(tx.witness_set.vkeys, vec![VKeyWitness::placeholder(POOL)]);

        // countersigning again leaves it unchanged
        assert_eq!(pool.validate_tx(&signed).await.unwrap(), signed);
    }

    #[tokio::test]
    async fn library_sponsor_matches_pool_sponsorship() {
        let ledger = ledger();
        let sponsor = Sponsor::new(ledger.clone());
        let params = SponsorTxParams {
            tx_cbor: user_tx(),
            pool_id: address(POOL).to_string(),
            utxo: Some(tx_input(2, 1)),
        };

        let unsigned = sponsor.sponsor_tx(params).await.unwrap();
        let tx = Transaction::from_hex(&unsigned).unwrap();
        assert_eq!(tx.body.inputs[1], tx_input(2, 1));
        assert!(tx.witness_set.vkeys.is_empty());

        pool(ledger).validate_tx(&unsigned).await.unwrap();
    }

    #[tokio::test]
    async fn library_sponsor_refuses_outputs_outside_the_pool() {
        let sponsor = Sponsor::new(ledger());
        let params = SponsorTxParams {
            tx_cbor: user_tx(),
            pool_id: address(POOL).to_string(),
            utxo: Some(tx_input(1, 0)),
        };

        let err = sponsor.sponsor_tx(params).await.unwrap_err();
        assert_eq!(err, SponsorError::SponsorUtxoNotAtPool(tx_input(1, 0)));
    }

    #[tokio::test]
    async fn other_pools_are_refused() {
        let pool = pool(ledger());
        let mut request = sponsor_request();
        request.pool_id = Some(address(5).to_string());

        let err = pool.handle(request).await.unwrap_err();
        assert_eq!(err.code(), "InvalidRequest");
    }

    #[tokio::test]
    async fn script_pool_address_is_rejected() {
        let sponsor = Sponsor::new(ledger());
        let params = SponsorTxParams {
            tx_cbor: user_tx(),
            pool_id: gasless_test_utils::script_address(POOL).to_string(),
            utxo: None,
        };
        let err = sponsor.sponsor_tx(params).await.unwrap_err();
        assert_eq!(err.code(), "InvalidRequest");
    }

    #[tokio::test]
    async fn new_conditions_apply_to_later_requests() {
        let pool = pool(ledger());
        let before = pool.conditions();

        pool.set_conditions(PoolConditions {
            whitelist: Some(vec![address(8).to_string()]),
            ..Default::default()
        });
        assert!(before.whitelist.is_none());
        assert!(pool.conditions().whitelist.is_some());

        let err = pool.handle(sponsor_request()).await.unwrap_err();
        assert_eq!(err, SponsorError::AddressNotWhitelisted);
    }

    #[tokio::test]
    async fn garbage_is_an_invalid_transaction() {
        let pool = pool(ledger());
        let err = pool.validate_tx("not hex").await.unwrap_err();
        assert_eq!(err.code(), "InvalidTransaction");
        let err = pool.validate_tx("8201").await.unwrap_err();
        assert_eq!(err.code(), "InvalidTransaction");
    }

    #[test]
    fn request_without_pool_id_cannot_be_sponsored() {
        let request = PoolRequest::countersign(user_tx());
        assert!(SponsorTxParams::try_from(request).is_err());
    }
}
