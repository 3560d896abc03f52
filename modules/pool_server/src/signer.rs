//! Ed25519 payment key signer
//!
//! Accepts the key as 64 hex characters, as the `cborHex` of a cardano-cli
//! text envelope (`5820` followed by the seed), or as the envelope itself.

use cryptoxide::ed25519;
use gasless_codec::{add_vkey_witness, body_hash};
use gasless_common::{
    Address, Credential, KeyHash, NetworkId, Signer, SignerError, VKeyWitness, crypto::blake2b_224,
};
use serde::Deserialize;
use std::{fmt, path::Path};

const SEED_LENGTH: usize = 32;

/// CBOR byte-string header for 32 bytes
const CBOR_SEED_PREFIX: [u8; 2] = [0x58, 0x20];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextEnvelope {
    cbor_hex: String,
}

pub struct KeySigner {
    keypair: [u8; 64],
    public: [u8; 32],
    key_hash: KeyHash,
}

impl KeySigner {
    pub fn from_seed(seed: &[u8; SEED_LENGTH]) -> Self {
        let (keypair, public) = ed25519::keypair(seed);
        Self {
            keypair,
            public,
            key_hash: blake2b_224(&public),
        }
    }

    /// Parse hex or a text envelope
    pub fn from_text(text: &str) -> Result<Self, SignerError> {
        let text = text.trim();
        let cbor_hex = if text.starts_with('{') {
            serde_json::from_str::<TextEnvelope>(text)
                .map_err(|e| SignerError::InvalidKey(format!("text envelope: {e}")))?
                .cbor_hex
        } else {
            text.to_string()
        };

        let bytes = hex::decode(cbor_hex.trim())
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let seed = match bytes.strip_prefix(&CBOR_SEED_PREFIX) {
            Some(seed) if seed.len() == SEED_LENGTH => seed,
            _ => bytes.as_slice(),
        };
        let seed: &[u8; SEED_LENGTH] = seed.try_into().map_err(|_| {
            SignerError::InvalidKey(format!("expected a {SEED_LENGTH} byte key, got {}", seed.len()))
        })?;
        Ok(Self::from_seed(seed))
    }

    pub fn from_file(path: &Path) -> Result<Self, SignerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SignerError::InvalidKey(format!("{}: {e}", path.display())))?;
        Self::from_text(&text)
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public
    }

    /// Enterprise address paid to this key
    pub fn address(&self, network: NetworkId) -> Result<Address, SignerError> {
        Address::enterprise(network, Credential::AddrKeyHash(self.key_hash))
            .map_err(|e| SignerError::InvalidKey(e.to_string()))
    }
}

impl fmt::Debug for KeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySigner").field("key_hash", &self.key_hash).finish_non_exhaustive()
    }
}

impl Signer for KeySigner {
    fn key_hash(&self) -> KeyHash {
        self.key_hash
    }

    fn sign(&self, tx: &[u8]) -> Result<Vec<u8>, SignerError> {
        let hash = body_hash(tx).map_err(|e| SignerError::Transaction(e.to_string()))?;
        let signature = ed25519::signature(hash.as_ref(), &self.keypair);
        let witness = VKeyWitness::new(self.public.to_vec(), signature.to_vec());
        add_vkey_witness(tx, witness).map_err(|e| SignerError::Transaction(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_codec::Transaction;
    use gasless_common::Value;
    use gasless_test_utils::{TxBuilder, address, tx_input};
    use std::io::Write;

    // RFC 8032, test 1
    const SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn tx() -> Vec<u8> {
        TxBuilder::new()
            .input(tx_input(1, 0))
            .output(address(3), Value::new(2_000_000))
            .fee(170_000)
            .build()
    }

    #[test]
    fn plain_hex_key() {
        let signer = KeySigner::from_text(SEED).unwrap();
        assert_eq!(hex::encode(signer.public_key()), PUBLIC);
        assert_eq!(signer.key_hash(), blake2b_224(&hex::decode(PUBLIC).unwrap()));
    }

    #[test]
    fn cli_envelope_key() {
        let envelope = format!(
            r#"{{"type": "PaymentSigningKeyShelley_ed25519", "description": "", "cborHex": "5820{SEED}"}}"#
        );
        let signer = KeySigner::from_text(&envelope).unwrap();
        assert_eq!(hex::encode(signer.public_key()), PUBLIC);

        let cbor_only = KeySigner::from_text(&format!("5820{SEED}\n")).unwrap();
        assert_eq!(cbor_only.key_hash(), signer.key_hash());
    }

    #[test]
    fn key_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cborHex": "5820{SEED}"}}"#).unwrap();

        let signer = KeySigner::from_file(file.path()).unwrap();
        assert_eq!(hex::encode(signer.public_key()), PUBLIC);
    }

    #[test]
    fn short_key_is_rejected() {
        let err = KeySigner::from_text("5820abcd").unwrap_err();
        assert!(matches!(err, SignerError::InvalidKey(_)));
        assert!(KeySigner::from_text("not hex").is_err());
    }

    #[test]
    fn signature_covers_the_body_hash() {
        let signer = KeySigner::from_text(SEED).unwrap();
        let unsigned = tx();

        let signed = signer.sign(&unsigned).unwrap();
        let decoded = Transaction::decode(&signed).unwrap();
        let witness = &decoded.witness_set.vkeys[0];
        assert_eq!(witness.vkey, signer.public_key().to_vec());

        let hash = body_hash(&unsigned).unwrap();
        let signature: [u8; 64] = witness.signature.as_slice().try_into().unwrap();
        assert!(ed25519::verify(hash.as_ref(), signer.public_key(), &signature));
        assert_eq!(body_hash(&signed).unwrap(), hash);
    }

    #[test]
    fn signing_twice_changes_nothing() {
        let signer = KeySigner::from_text(SEED).unwrap();
        let once = signer.sign(&tx()).unwrap();
        let twice = signer.sign(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn address_is_paid_to_the_key() {
        let signer = KeySigner::from_text(SEED).unwrap();
        let address = signer.address(NetworkId::Testnet).unwrap();
        assert!(address.is_controlled_by(&signer.key_hash()));
        assert!(address.to_string().starts_with("addr_test1v"));
    }
}
