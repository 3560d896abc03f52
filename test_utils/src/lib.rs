//! Fixtures and an in-memory ledger shared by the gasless test suites

use async_trait::async_trait;
use gasless_common::{
    Address, AssetBalances, Credential, ExUnits, KeyHash, LedgerQuery, NetworkId,
    ProtocolParameters, QueryError, TxHash, TxInput, UTxO, Unit, VKeyWitness, Value,
    protocol_params::decimal_to_ratio, script::NativeScript,
};
use minicbor::{Encoder, data::Tag};
use num_rational::Ratio;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

pub fn key_hash(byte: u8) -> KeyHash {
    KeyHash::new([byte; 28])
}

/// Enterprise testnet address paying to `key_hash(byte)`
pub fn address(byte: u8) -> Address {
    Address::enterprise(NetworkId::Testnet, Credential::AddrKeyHash(key_hash(byte)))
        .expect("enterprise address")
}

/// Enterprise testnet address locked by script hash `[byte; 28]`
pub fn script_address(byte: u8) -> Address {
    Address::enterprise(NetworkId::Testnet, Credential::ScriptHash(key_hash(byte)))
        .expect("enterprise script address")
}

pub fn tx_input(byte: u8, index: u64) -> TxInput {
    TxInput::new(TxHash::new([byte; 32]), index)
}

pub fn utxo(input: TxInput, address: Address, value: Value) -> UTxO {
    UTxO {
        input,
        address,
        value,
        reference_script: None,
    }
}

/// Preprod-like fee parameters
pub fn test_params() -> ProtocolParameters {
    ProtocolParameters {
        min_fee_a: 44,
        min_fee_b: 155_381,
        min_fee_ref_script_cost_per_byte: Ratio::from_integer(15),
        price_mem: decimal_to_ratio("0.0577").expect("price"),
        price_step: decimal_to_ratio("0.0000721").expect("price"),
    }
}

/// `[kind, credential]`, the shape shared by the simple stake certificates
pub fn credential_certificate(kind: u8, credential: Credential) -> Vec<u8> {
    let mut e = Encoder::new(Vec::new());
    e.array(2).and_then(|e| e.u8(kind)).and_then(|e| e.encode(credential)).expect("encode");
    e.into_writer()
}

/// Reward account bytes for a key credential on testnet
pub fn reward_account(byte: u8) -> Vec<u8> {
    let mut bytes = vec![0xe0];
    bytes.extend_from_slice(&[byte; 28]);
    bytes
}

/// Builds Conway transaction CBOR for tests
#[derive(Debug, Default, Clone)]
pub struct TxBuilder {
    inputs: Vec<TxInput>,
    outputs: Vec<(Address, Value)>,
    fee: u64,
    certificates: Vec<Vec<u8>>,
    withdrawals: Vec<(Vec<u8>, u64)>,
    collateral: Vec<TxInput>,
    required_signers: Vec<KeyHash>,
    reference_inputs: Vec<TxInput>,
    vkeys: Vec<VKeyWitness>,
    native_scripts: Vec<NativeScript>,
    redeemers: Vec<ExUnits>,
}

impl TxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: TxInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, address: Address, value: Value) -> Self {
        self.outputs.push((address, value));
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn certificate(mut self, encoded: Vec<u8>) -> Self {
        self.certificates.push(encoded);
        self
    }

    pub fn withdrawal(mut self, account: Vec<u8>, amount: u64) -> Self {
        self.withdrawals.push((account, amount));
        self
    }

    pub fn collateral(mut self, input: TxInput) -> Self {
        self.collateral.push(input);
        self
    }

    pub fn required_signer(mut self, key: KeyHash) -> Self {
        self.required_signers.push(key);
        self
    }

    pub fn reference_input(mut self, input: TxInput) -> Self {
        self.reference_inputs.push(input);
        self
    }

    pub fn vkey(mut self, witness: VKeyWitness) -> Self {
        self.vkeys.push(witness);
        self
    }

    pub fn native_script(mut self, script: NativeScript) -> Self {
        self.native_scripts.push(script);
        self
    }

    pub fn redeemer(mut self, mem: u64, steps: u64) -> Self {
        self.redeemers.push(ExUnits { mem, steps });
        self
    }

    fn set<T: minicbor::Encode<()>>(e: &mut Encoder<Vec<u8>>, items: &[T]) {
        e.tag(Tag::new(258)).and_then(|e| e.array(items.len() as u64)).expect("encode");
        for item in items {
            e.encode(item).expect("encode");
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut e = Encoder::new(Vec::new());
        e.array(4).expect("encode");

        let optional = [
            !self.certificates.is_empty(),
            !self.withdrawals.is_empty(),
            !self.collateral.is_empty(),
            !self.required_signers.is_empty(),
            !self.reference_inputs.is_empty(),
        ];
        let fields = 3 + optional.iter().filter(|present| **present).count() as u64;
        e.map(fields).expect("encode");

        e.u8(0).expect("encode");
        Self::set(&mut e, &self.inputs);

        e.u8(1).and_then(|e| e.array(self.outputs.len() as u64)).expect("encode");
        for (address, value) in &self.outputs {
            e.map(2).expect("encode");
            e.u8(0).and_then(|e| e.bytes(address.as_bytes())).expect("encode");
            e.u8(1).expect("encode");
            encode_value(&mut e, value);
        }

        e.u8(2).and_then(|e| e.u64(self.fee)).expect("encode");

        if !self.certificates.is_empty() {
            e.u8(4).and_then(|e| e.array(self.certificates.len() as u64)).expect("encode");
            for cert in &self.certificates {
                e.writer_mut().extend_from_slice(cert);
            }
        }
        if !self.withdrawals.is_empty() {
            e.u8(5).and_then(|e| e.map(self.withdrawals.len() as u64)).expect("encode");
            for (account, amount) in &self.withdrawals {
                e.bytes(account).and_then(|e| e.u64(*amount)).expect("encode");
            }
        }
        if !self.collateral.is_empty() {
            e.u8(13).expect("encode");
            Self::set(&mut e, &self.collateral);
        }
        if !self.required_signers.is_empty() {
            e.u8(14).expect("encode");
            Self::set(&mut e, &self.required_signers);
        }
        if !self.reference_inputs.is_empty() {
            e.u8(18).expect("encode");
            Self::set(&mut e, &self.reference_inputs);
        }

        let witness_fields = [
            !self.vkeys.is_empty(),
            !self.native_scripts.is_empty(),
            !self.redeemers.is_empty(),
        ];
        e.map(witness_fields.iter().filter(|present| **present).count() as u64)
            .expect("encode");
        if !self.vkeys.is_empty() {
            e.u8(0).expect("encode");
            Self::set(&mut e, &self.vkeys);
        }
        if !self.native_scripts.is_empty() {
            e.u8(1).expect("encode");
            Self::set(&mut e, &self.native_scripts);
        }
        if !self.redeemers.is_empty() {
            e.u8(5).and_then(|e| e.array(self.redeemers.len() as u64)).expect("encode");
            for (index, units) in self.redeemers.iter().enumerate() {
                e.array(4)
                    .and_then(|e| e.u8(0))
                    .and_then(|e| e.u64(index as u64))
                    .and_then(|e| e.u8(0))
                    .and_then(|e| e.array(2))
                    .and_then(|e| e.u64(units.mem))
                    .and_then(|e| e.u64(units.steps))
                    .expect("encode");
            }
        }

        e.bool(true).and_then(|e| e.null()).expect("encode");
        e.into_writer()
    }

    pub fn build_hex(&self) -> String {
        hex::encode(self.build())
    }
}

fn encode_value(e: &mut Encoder<Vec<u8>>, value: &Value) {
    if value.assets.is_empty() {
        e.u64(value.lovelace).expect("encode");
        return;
    }
    e.array(2).and_then(|e| e.u64(value.lovelace)).expect("encode");
    e.map(value.assets.len() as u64).expect("encode");
    for (asset, quantity) in &value.assets {
        e.encode(asset.policy)
            .and_then(|e| e.map(1))
            .and_then(|e| e.bytes(asset.name.as_slice()))
            .and_then(|e| e.u64(*quantity))
            .expect("encode");
    }
}

/// Ledger held in memory. Address balances default to the sum of the
/// outputs sitting at the address unless set explicitly.
#[derive(Debug)]
pub struct InMemoryLedger {
    utxos: Mutex<HashMap<TxInput, UTxO>>,
    balances: Mutex<HashMap<Address, AssetBalances>>,
    params: ProtocolParameters,
    balance_queries: AtomicUsize,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self {
            utxos: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            params: test_params(),
            balance_queries: AtomicUsize::new(0),
        }
    }
}

impl InMemoryLedger {

    pub fn add_utxo(&self, utxo: UTxO) {
        self.utxos.lock().expect("ledger lock").insert(utxo.input, utxo);
    }

    pub fn set_balance(&self, address: &Address, unit: Unit, quantity: u64) {
        self.balances
            .lock()
            .expect("ledger lock")
            .entry(address.clone())
            .or_default()
            .insert(unit, quantity);
    }

    /// How many balance lookups have been made
    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerQuery for InMemoryLedger {
    async fn fetch_utxo(&self, input: &TxInput) -> Result<Option<UTxO>, QueryError> {
        Ok(self.utxos.lock().expect("ledger lock").get(input).cloned())
    }

    async fn fetch_utxos_at_address(&self, address: &Address) -> Result<Vec<UTxO>, QueryError> {
        let mut utxos: Vec<UTxO> = self
            .utxos
            .lock()
            .expect("ledger lock")
            .values()
            .filter(|utxo| &utxo.address == address)
            .cloned()
            .collect();
        utxos.sort_by_key(|utxo| utxo.input);
        Ok(utxos)
    }

    async fn fetch_address_asset_balances(
        &self,
        address: &Address,
    ) -> Result<AssetBalances, QueryError> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(balances) = self.balances.lock().expect("ledger lock").get(address) {
            return Ok(balances.clone());
        }

        let mut balances = AssetBalances::new();
        for utxo in self.fetch_utxos_at_address(address).await? {
            for (unit, quantity) in utxo.value.units() {
                *balances.entry(unit).or_default() += quantity;
            }
        }
        Ok(balances)
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, QueryError> {
        Ok(self.params.clone())
    }
}
