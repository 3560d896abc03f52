//! Conway transactions: `[body, witness_set, is_valid, auxiliary_data]`

use crate::{
    output::TxOutput,
    utils::{CodecError, encode_set_header, to_bytes, write_raw},
    witness::WitnessSet,
};
use gasless_common::{
    KeyHash, TxHash, TxInput, VKeyWitness,
    cbor::{at_break, for_each_in_set, raw_item},
    certificate::TxCertificate,
    crypto::blake2b_256,
    types::RewardAccount,
};
use minicbor::{Decoder, Encoder, decode, encode};
use std::collections::BTreeMap;

const INPUTS: u64 = 0;
const OUTPUTS: u64 = 1;
const FEE: u64 = 2;
const CERTIFICATES: u64 = 4;
const WITHDRAWALS: u64 = 5;
const COLLATERAL: u64 = 13;
const REQUIRED_SIGNERS: u64 = 14;
const REFERENCE_INPUTS: u64 = 18;

/// Transaction body. Inputs, outputs, fee and required signers are editable;
/// everything else is read-only and re-emitted from its original encoding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    pub required_signers: Vec<KeyHash>,
    certificates: Vec<TxCertificate>,
    withdrawals: Vec<RewardAccount>,
    collateral: Vec<TxInput>,
    reference_inputs: Vec<TxInput>,
    set_tagged: bool,
    raw_fields: BTreeMap<u64, Vec<u8>>,
}

impl TxBody {
    pub fn certificates(&self) -> &[TxCertificate] {
        &self.certificates
    }

    pub fn withdrawals(&self) -> &[RewardAccount] {
        &self.withdrawals
    }

    pub fn collateral(&self) -> &[TxInput] {
        &self.collateral
    }

    pub fn reference_inputs(&self) -> &[TxInput] {
        &self.reference_inputs
    }

    fn decode_inputs(&mut self, d: &mut Decoder<'_>) -> Result<Vec<TxInput>, decode::Error> {
        let mut inputs = Vec::new();
        let tagged = for_each_in_set(d, |d| {
            inputs.push(d.decode()?);
            Ok(())
        })?;
        self.set_tagged |= tagged;
        Ok(inputs)
    }

    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        let mut body = TxBody::default();
        let len = d.map()?;
        let mut seen = 0;
        loop {
            match len {
                Some(n) if seen == n => break,
                None if at_break(d)? => break,
                _ => {}
            }
            seen += 1;

            let key = d.u64()?;
            let start = d.position();
            match key {
                INPUTS => {
                    body.inputs = body.decode_inputs(d)?;
                    continue;
                }
                OUTPUTS => {
                    let mut outputs = Vec::new();
                    match d.array()? {
                        Some(n) => {
                            for _ in 0..n {
                                outputs.push(TxOutput::decode(d)?);
                            }
                        }
                        None => {
                            while !at_break(d)? {
                                outputs.push(TxOutput::decode(d)?);
                            }
                        }
                    }
                    body.outputs = outputs;
                    continue;
                }
                FEE => {
                    body.fee = d.u64()?;
                    continue;
                }
                REQUIRED_SIGNERS => {
                    let mut signers = Vec::new();
                    body.set_tagged |= for_each_in_set(d, |d| {
                        signers.push(d.decode()?);
                        Ok(())
                    })?;
                    body.required_signers = signers;
                    continue;
                }
                CERTIFICATES => {
                    let mut certificates = Vec::new();
                    for_each_in_set(d, |d| {
                        certificates.push(d.decode()?);
                        Ok(())
                    })?;
                    body.certificates = certificates;
                }
                WITHDRAWALS => {
                    let mut withdrawals = Vec::new();
                    let len = d.map()?;
                    let mut entries = 0;
                    loop {
                        match len {
                            Some(n) if entries == n => break,
                            None if at_break(d)? => break,
                            _ => {}
                        }
                        entries += 1;
                        let account = RewardAccount::from_bytes(d.bytes()?)
                            .ok_or_else(|| decode::Error::message("invalid reward account"))?;
                        d.skip()?;
                        withdrawals.push(account);
                    }
                    body.withdrawals = withdrawals;
                }
                COLLATERAL => body.collateral = body.decode_inputs(d)?,
                REFERENCE_INPUTS => body.reference_inputs = body.decode_inputs(d)?,
                _ => d.skip()?,
            }
            body.raw_fields.insert(key, d.input()[start..d.position()].to_vec());
        }
        Ok(body)
    }

    pub fn encode<W: encode::Write>(&self, e: &mut Encoder<W>) -> Result<(), encode::Error<W::Error>> {
        let has_signers = !self.required_signers.is_empty();
        let typed = 3 + u64::from(has_signers);
        e.map(self.raw_fields.len() as u64 + typed)?;

        // Canonical key order: 0, 1, 2, raw fields below 14, 14, the rest
        e.u64(INPUTS)?;
        encode_set_header(e, self.set_tagged, self.inputs.len())?;
        for input in &self.inputs {
            e.encode(input)?;
        }

        e.u64(OUTPUTS)?;
        e.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            output.encode(e)?;
        }

        e.u64(FEE)?.u64(self.fee)?;

        for (key, raw) in self.raw_fields.range(..REQUIRED_SIGNERS) {
            e.u64(*key)?;
            write_raw(e, raw)?;
        }

        if has_signers {
            e.u64(REQUIRED_SIGNERS)?;
            encode_set_header(e, self.set_tagged, self.required_signers.len())?;
            for signer in &self.required_signers {
                e.encode(signer)?;
            }
        }

        for (key, raw) in self.raw_fields.range(REQUIRED_SIGNERS + 1..) {
            e.u64(*key)?;
            write_raw(e, raw)?;
        }
        Ok(())
    }
}

/// A whole transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub body: TxBody,
    pub witness_set: WitnessSet,
    is_valid: Option<bool>,
    auxiliary_data: Vec<u8>,
}

impl Transaction {
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut d = Decoder::new(bytes);
        let len = d.array()?;
        let body = TxBody::decode(&mut d)?;
        let mut witness_set = WitnessSet::decode(&mut d)?;
        if witness_set.vkeys.is_empty() {
            witness_set.vkeys_tagged = body.set_tagged;
        }

        let is_valid = match len {
            Some(3) => None,
            _ => match d.datatype()? {
                minicbor::data::Type::Bool => Some(d.bool()?),
                _ => None,
            },
        };
        let auxiliary_data = raw_item(&mut d)?.to_vec();
        if len.is_none() && !at_break(&mut d)? {
            return Err(decode::Error::message("transaction has trailing items").into());
        }

        Ok(Self {
            body,
            witness_set,
            is_valid,
            auxiliary_data,
        })
    }

    pub fn from_hex(text: &str) -> Result<Self, CodecError> {
        Self::decode(&hex::decode(text.trim())?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        to_bytes(|e| {
            e.array(if self.is_valid.is_some() { 4 } else { 3 })?;
            self.body.encode(e)?;
            self.witness_set.encode(e)?;
            if let Some(valid) = self.is_valid {
                e.bool(valid)?;
            }
            write_raw(e, &self.auxiliary_data)
        })
    }

    pub fn to_hex(&self) -> Result<String, CodecError> {
        Ok(hex::encode(self.encode()?))
    }

    pub fn encoded_len(&self) -> Result<usize, CodecError> {
        Ok(self.encode()?.len())
    }

    /// Same body and auxiliary data with a different witness set
    pub fn with_witness_set(&self, witness_set: WitnessSet) -> Self {
        Self {
            body: self.body.clone(),
            witness_set,
            is_valid: self.is_valid,
            auxiliary_data: self.auxiliary_data.clone(),
        }
    }
}

/// Blake2b-256 of the body exactly as encoded in `tx`
pub fn body_hash(tx: &[u8]) -> Result<TxHash, CodecError> {
    let mut d = Decoder::new(tx);
    d.array()?;
    Ok(blake2b_256(raw_item(&mut d)?))
}

/// Attach a vkey witness without re-encoding the body, so signatures that
/// earlier parties made over the body hash stay valid.
pub fn add_vkey_witness(tx: &[u8], witness: VKeyWitness) -> Result<Vec<u8>, CodecError> {
    let mut d = Decoder::new(tx);
    let len = d.array()?;
    let body = raw_item(&mut d)?;
    let mut witness_set = WitnessSet::decode(&mut d)?;
    witness_set.add_vkey(witness);

    let mut rest = Vec::new();
    match len {
        Some(n) => {
            for _ in 2..n {
                rest.push(raw_item(&mut d)?);
            }
        }
        None => {
            while !at_break(&mut d)? {
                rest.push(raw_item(&mut d)?);
            }
        }
    }

    to_bytes(|e| {
        e.array(2 + rest.len() as u64)?;
        write_raw(e, body)?;
        witness_set.encode(e)?;
        for raw in &rest {
            write_raw(e, raw)?;
        }
        Ok(())
    })
}
