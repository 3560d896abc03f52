//! Core ledger types shared by the sponsor and pool roles

use crate::{
    address::{Address, Credential},
    asset::Value,
    hash::{KeyHash, TxHash},
    script::ReferenceScript,
};
use std::{fmt, str::FromStr};

/// Reference to a transaction output
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
pub struct TxInput {
    #[n(0)]
    pub tx_hash: TxHash,
    #[n(1)]
    pub index: u64,
}

impl TxInput {
    pub fn new(tx_hash: TxHash, index: u64) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for TxInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

/// `<tx hash hex>#<output index>`
impl FromStr for TxInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) =
            s.split_once('#').ok_or_else(|| format!("expected hash#index, got {s}"))?;
        let tx_hash = hash.parse::<TxHash>().map_err(|e| format!("{hash}: {e}"))?;
        let index = index.parse().map_err(|e| format!("{index}: {e}"))?;
        Ok(Self::new(tx_hash, index))
    }
}

/// An unspent output and everything locked at it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UTxO {
    pub input: TxInput,
    pub address: Address,
    pub value: Value,
    pub reference_script: Option<ReferenceScript>,
}

/// Script execution budget
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
pub struct ExUnits {
    #[n(0)]
    pub mem: u64,
    #[n(1)]
    pub steps: u64,
}

/// Verification key and the signature it made
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct VKeyWitness {
    #[cbor(n(0), with = "minicbor::bytes")]
    pub vkey: Vec<u8>,
    #[cbor(n(1), with = "minicbor::bytes")]
    pub signature: Vec<u8>,
}

impl VKeyWitness {
    pub fn new(vkey: Vec<u8>, signature: Vec<u8>) -> Self {
        Self { vkey, signature }
    }

    /// Stand-in of the real encoded size, used only to measure a transaction
    pub fn placeholder(seed: u8) -> Self {
        Self::new(vec![seed; 32], vec![seed; 64])
    }
}

/// Header byte plus 28-byte stake credential hash
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RewardAccount(Vec<u8>);

impl RewardAccount {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == 29).then(|| Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hash backing the account; bit 4 of the header marks a script
    pub fn credential(&self) -> Credential {
        let mut hash = [0u8; 28];
        hash.copy_from_slice(&self.0[1..29]);
        if self.0[0] & 0x10 == 0 {
            Credential::AddrKeyHash(KeyHash::new(hash))
        } else {
            Credential::ScriptHash(KeyHash::new(hash))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_input_text_form() {
        let input = TxInput::new(TxHash::new([0xab; 32]), 1);
        assert_eq!(input.to_string().parse::<TxInput>(), Ok(input));
        assert!("abab#1".parse::<TxInput>().is_err());
        assert!(format!("{}", TxHash::new([0; 32])).parse::<TxInput>().is_err());
    }

    #[test]
    fn tx_input_cbor_is_pair() {
        let input = TxInput::new(TxHash::new([1; 32]), 3);
        let bytes = minicbor::to_vec(input).unwrap();
        assert_eq!(bytes[0], 0x82);
        assert_eq!(*bytes.last().unwrap(), 0x03);
        assert_eq!(minicbor::decode::<TxInput>(&bytes).unwrap(), input);
        assert_eq!(input.to_string(), format!("{}#3", "01".repeat(32)));
    }

    #[test]
    fn placeholder_witness_encodes_at_real_size() {
        let bytes = minicbor::to_vec(VKeyWitness::placeholder(0)).unwrap();
        // array header, 2 + 32 byte key, 2 + 64 byte signature
        assert_eq!(bytes.len(), 1 + 34 + 66);
    }

    #[test]
    fn reward_account_credential_kind() {
        let mut bytes = vec![0xe0];
        bytes.extend_from_slice(&[5; 28]);
        let account = RewardAccount::from_bytes(&bytes).unwrap();
        assert_eq!(account.credential(), Credential::AddrKeyHash(KeyHash::new([5; 28])));

        bytes[0] = 0xf1;
        let account = RewardAccount::from_bytes(&bytes).unwrap();
        assert_eq!(account.credential(), Credential::ScriptHash(KeyHash::new([5; 28])));

        assert!(RewardAccount::from_bytes(&bytes[..20]).is_none());
    }
}
