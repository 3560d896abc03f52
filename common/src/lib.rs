// Gasless common library - main library exports

pub mod address;
pub mod asset;
pub mod cbor;
pub mod certificate;
pub mod conditions;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod protocol;
pub mod protocol_params;
pub mod script;
pub mod signer;
pub mod types;

// Flattened re-exports
pub use self::address::{Address, Credential, NetworkId};
pub use self::asset::{AssetId, AssetName, Lovelace, Unit, Value};
pub use self::conditions::{Comparison, PoolConditions, TokenRequirement};
pub use self::error::SponsorError;
pub use self::hash::{Hash, KeyHash, PolicyId, ScriptHash, TxHash};
pub use self::ledger::{AssetBalances, LedgerQuery, QueryError};
pub use self::protocol_params::ProtocolParameters;
pub use self::signer::{Signer, SignerError};
pub use self::types::*;
