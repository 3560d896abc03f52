//! Reason codes for every way a sponsorship or validation can fail

use crate::{
    asset::Unit, conditions::Comparison, ledger::QueryError, signer::SignerError, types::TxInput,
};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SponsorError {
    #[error("No UTxOs found for {0}. Please ensure the address has sufficient funds.")]
    NoFundsAvailable(String),

    #[error("No UTxO found for input {0}")]
    MissingInputUtxo(TxInput),

    #[error("Provided UTxO {0} is not held by the pool address")]
    SponsorUtxoNotAtPool(TxInput),

    #[error("Reference script UTxO not found for {0}")]
    MissingReferenceScriptUtxo(TxInput),

    #[error("Fee difference {observed} does not match expected fee {expected}")]
    FeeMismatch { observed: i128, expected: u64 },

    #[error("Missing asset {unit} in produced UTxOs")]
    AssetMismatch { unit: Unit },

    #[error("Expected {comparison:?} {threshold} of {unit}, but found {held}")]
    AssetValueCheckFailed {
        unit: Unit,
        comparison: Comparison,
        threshold: u64,
        held: u64,
    },

    #[error("No input address holds any of the required assets")]
    MissingRequiredAsset,

    #[error("Address is not in the whitelist")]
    AddressNotWhitelisted,

    #[error("No token requirements specified in pool conditions")]
    NoTokenRequirements,

    #[error("No whitelist specified in pool conditions")]
    NoWhitelist,

    #[error("Signing server error: {0}")]
    SigningServerError(String),

    #[error("Sponsor UTxO holds {available} lovelace, cannot pay fee {fee}")]
    InsufficientSponsorFunds { available: u64, fee: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Signing(#[from] SignerError),
}

impl SponsorError {
    /// Stable reason code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            SponsorError::NoFundsAvailable(_) => "NoFundsAvailable",
            SponsorError::MissingInputUtxo(_) => "MissingInputUtxo",
            SponsorError::SponsorUtxoNotAtPool(_) => "SponsorUtxoNotAtPool",
            SponsorError::MissingReferenceScriptUtxo(_) => "MissingReferenceScriptUtxo",
            SponsorError::FeeMismatch { .. } => "FeeMismatch",
            SponsorError::AssetMismatch { .. } => "AssetMismatch",
            SponsorError::AssetValueCheckFailed { .. } => "AssetValueCheckFailed",
            SponsorError::MissingRequiredAsset => "MissingRequiredAsset",
            SponsorError::AddressNotWhitelisted => "AddressNotWhitelisted",
            SponsorError::NoTokenRequirements => "NoTokenRequirements",
            SponsorError::NoWhitelist => "NoWhitelist",
            SponsorError::SigningServerError(_) => "SigningServerError",
            SponsorError::InsufficientSponsorFunds { .. } => "InsufficientSponsorFunds",
            SponsorError::InvalidRequest(_) => "InvalidRequest",
            SponsorError::InvalidTransaction(_) => "InvalidTransaction",
            SponsorError::Query(_) => "QueryFailed",
            SponsorError::Signing(_) => "SigningFailed",
        }
    }

    /// HTTP status for the pool server
    pub fn status_code(&self) -> u16 {
        match self {
            SponsorError::InvalidRequest(_)
            | SponsorError::InvalidTransaction(_)
            | SponsorError::SponsorUtxoNotAtPool(_) => 400,
            SponsorError::Query(_) | SponsorError::SigningServerError(_) => 502,
            SponsorError::Signing(_) => 500,
            _ => 422,
        }
    }
}
