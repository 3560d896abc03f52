//! Wallet collaborator: adds one signature to an encoded transaction

use crate::hash::KeyHash;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Cannot sign transaction: {0}")]
    Transaction(String),
}

pub trait Signer: Send + Sync {
    /// Hash of the verification key, as it appears in required signers
    fn key_hash(&self) -> KeyHash;

    /// Returns `tx` with this key's witness attached
    fn sign(&self, tx: &[u8]) -> Result<Vec<u8>, SignerError>;
}
