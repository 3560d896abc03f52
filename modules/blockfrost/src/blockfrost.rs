//! Ledger queries served by Blockfrost

mod configuration;
mod provider;
mod types;

pub use configuration::BlockfrostConfig;
pub use provider::{BlockfrostProvider, ProviderError};
