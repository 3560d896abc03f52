//! Cardano ledger rules the sponsor relies on: minimum fee and required signers

pub mod fees;
pub mod witnesses;
