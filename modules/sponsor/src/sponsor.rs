//! Gasless fee sponsorship
//! Adds a pool-funded fee input to a user's transaction, sizes the fee to
//! the ledger's rules and checks a sponsored transaction against the pool's
//! conditions before it is countersigned

pub mod augment;
pub mod roles;
pub mod selection;
pub mod validation;

pub use roles::{Pool, PoolValidation, Sponsor, SponsorAugmentation, SponsorTxParams};
