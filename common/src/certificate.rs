//! Transaction certificates, reduced to the credentials that must sign them

use crate::{address::Credential, cbor::skip_rest, hash::KeyHash};
use minicbor::Decoder;

/// Conway certificate, keeping only the parties whose keys authorise it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxCertificate {
    StakeRegistration(Credential),
    StakeDeregistration(Credential),
    StakeDelegation(Credential),
    PoolRegistration {
        operator: KeyHash,
        owners: Vec<KeyHash>,
    },
    PoolRetirement(KeyHash),
    GenesisKeyDelegation {
        genesis_delegate: KeyHash,
    },
    MoveInstantaneousReward,
    Registration(Credential),
    Unregistration(Credential),
    VoteDelegation(Credential),
    StakeVoteDelegation(Credential),
    StakeRegistrationDelegation(Credential),
    VoteRegistrationDelegation(Credential),
    StakeVoteRegistrationDelegation(Credential),
    AuthCommitteeHot {
        cold: Credential,
        hot: Credential,
    },
    ResignCommitteeCold(Credential),
    RegDRep(Credential),
    UnregDRep(Credential),
    UpdateDRep(Credential),
}

impl TxCertificate {
    /// Hashes whose vkey witnesses this certificate demands.
    ///
    /// Credentials count by hash whether they are key or script credentials;
    /// a committee hot key authorisation is signed by the cold credential.
    pub fn witness_hashes(&self) -> Vec<KeyHash> {
        match self {
            TxCertificate::StakeRegistration(c)
            | TxCertificate::StakeDeregistration(c)
            | TxCertificate::StakeDelegation(c)
            | TxCertificate::Registration(c)
            | TxCertificate::Unregistration(c)
            | TxCertificate::VoteDelegation(c)
            | TxCertificate::StakeVoteDelegation(c)
            | TxCertificate::StakeRegistrationDelegation(c)
            | TxCertificate::VoteRegistrationDelegation(c)
            | TxCertificate::StakeVoteRegistrationDelegation(c)
            | TxCertificate::AuthCommitteeHot { cold: c, .. }
            | TxCertificate::ResignCommitteeCold(c)
            | TxCertificate::RegDRep(c)
            | TxCertificate::UnregDRep(c)
            | TxCertificate::UpdateDRep(c) => vec![*c.hash()],

            TxCertificate::PoolRegistration { operator, owners } => {
                owners.iter().copied().chain(std::iter::once(*operator)).collect()
            }
            TxCertificate::PoolRetirement(pool) => vec![*pool],
            TxCertificate::GenesisKeyDelegation { genesis_delegate } => vec![*genesis_delegate],
            TxCertificate::MoveInstantaneousReward => vec![],
        }
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TxCertificate {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let len = d.array()?;
        let variant = d.u16()?;

        let (cert, consumed) = match variant {
            0 => (TxCertificate::StakeRegistration(d.decode_with(ctx)?), 2),
            1 => (TxCertificate::StakeDeregistration(d.decode_with(ctx)?), 2),
            2 => (TxCertificate::StakeDelegation(d.decode_with(ctx)?), 2),
            3 => {
                // [3, operator, vrf, pledge, cost, margin, reward account, owners, ..]
                let operator = d.decode_with(ctx)?;
                for _ in 0..5 {
                    d.skip()?;
                }
                let mut owners: Vec<KeyHash> = Vec::new();
                crate::cbor::for_each_in_set(d, |d| {
                    owners.push(d.decode_with(ctx)?);
                    Ok(())
                })?;
                (TxCertificate::PoolRegistration { operator, owners }, 8)
            }
            4 => (TxCertificate::PoolRetirement(d.decode_with(ctx)?), 2),
            5 => {
                d.skip()?;
                let genesis_delegate = d.decode_with(ctx)?;
                (TxCertificate::GenesisKeyDelegation { genesis_delegate }, 3)
            }
            6 => (TxCertificate::MoveInstantaneousReward, 1),
            7 => (TxCertificate::Registration(d.decode_with(ctx)?), 2),
            8 => (TxCertificate::Unregistration(d.decode_with(ctx)?), 2),
            9 => (TxCertificate::VoteDelegation(d.decode_with(ctx)?), 2),
            10 => (TxCertificate::StakeVoteDelegation(d.decode_with(ctx)?), 2),
            11 => (TxCertificate::StakeRegistrationDelegation(d.decode_with(ctx)?), 2),
            12 => (TxCertificate::VoteRegistrationDelegation(d.decode_with(ctx)?), 2),
            13 => (TxCertificate::StakeVoteRegistrationDelegation(d.decode_with(ctx)?), 2),
            14 => {
                let cold = d.decode_with(ctx)?;
                let hot = d.decode_with(ctx)?;
                (TxCertificate::AuthCommitteeHot { cold, hot }, 3)
            }
            15 => (TxCertificate::ResignCommitteeCold(d.decode_with(ctx)?), 2),
            16 => (TxCertificate::RegDRep(d.decode_with(ctx)?), 2),
            17 => (TxCertificate::UnregDRep(d.decode_with(ctx)?), 2),
            18 => (TxCertificate::UpdateDRep(d.decode_with(ctx)?), 2),
            _ => {
                return Err(minicbor::decode::Error::message(
                    "unknown certificate type",
                ))
            }
        };

        skip_rest(d, len, consumed)?;
        Ok(cert)
    }
}
