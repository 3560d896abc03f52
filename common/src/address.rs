//! Cardano address and credential definitions

use crate::hash::{Hash, KeyHash, ScriptHash};
use pallas::ledger::addresses as pallas_addresses;
use std::{fmt, hash::Hasher, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address {0}: {1}")]
    Invalid(String, String),

    #[error("Cannot encode address: {0}")]
    Encoding(String),
}

/// Network discriminant carried in Shelley address headers
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    #[default]
    Testnet,
}

/// Payment or stake credential
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
)]
pub enum Credential {
    /// Controlled by a verification key
    AddrKeyHash(KeyHash),

    /// Controlled by a script
    ScriptHash(ScriptHash),
}

impl Credential {
    /// The 28-byte hash regardless of credential kind
    pub fn hash(&self) -> &Hash<28> {
        match self {
            Credential::AddrKeyHash(h) | Credential::ScriptHash(h) => h,
        }
    }

    /// Only key credentials need a vkey witness
    pub fn key_hash(&self) -> Option<KeyHash> {
        match self {
            Credential::AddrKeyHash(h) => Some(*h),
            Credential::ScriptHash(_) => None,
        }
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Credential {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        let credential = match d.u8()? {
            0 => Credential::AddrKeyHash(d.decode_with(ctx)?),
            1 => Credential::ScriptHash(d.decode_with(ctx)?),
            _ => return Err(minicbor::decode::Error::message("unknown credential kind")),
        };
        Ok(credential)
    }
}

impl<C> minicbor::Encode<C> for Credential {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Credential::AddrKeyHash(h) => e.u8(0)?.encode_with(h, ctx)?,
            Credential::ScriptHash(h) => e.u8(1)?.encode_with(h, ctx)?,
        };
        Ok(())
    }
}

/// A ledger address: raw bytes, canonical text and the credentials it carries.
///
/// Byron addresses have no credentials; stake addresses only a delegation part.
#[derive(Clone)]
pub struct Address {
    bytes: Vec<u8>,
    text: String,
    payment: Option<Credential>,
    delegation: Option<Credential>,
}

fn to_hash<const N: usize>(pallas_hash: &pallas::crypto::hash::Hash<N>) -> Hash<N> {
    Hash::new(**pallas_hash)
}

fn to_pallas_network(network: NetworkId) -> pallas_addresses::Network {
    match network {
        NetworkId::Mainnet => pallas_addresses::Network::Mainnet,
        NetworkId::Testnet => pallas_addresses::Network::Testnet,
    }
}

impl Address {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let address = pallas_addresses::Address::from_bytes(bytes)
            .map_err(|e| AddressError::Invalid(hex::encode(bytes), e.to_string()))?;
        Self::from_pallas(&address)
    }

    /// Enterprise address (no delegation part) for a payment credential
    pub fn enterprise(network: NetworkId, payment: Credential) -> Result<Self, AddressError> {
        let payment = match payment {
            Credential::AddrKeyHash(h) => pallas_addresses::ShelleyPaymentPart::Key(
                pallas::crypto::hash::Hash::new(h.into_inner()),
            ),
            Credential::ScriptHash(h) => pallas_addresses::ShelleyPaymentPart::Script(
                pallas::crypto::hash::Hash::new(h.into_inner()),
            ),
        };
        let shelley = pallas_addresses::ShelleyAddress::new(
            to_pallas_network(network),
            payment,
            pallas_addresses::ShelleyDelegationPart::Null,
        );
        Self::from_pallas(&pallas_addresses::Address::Shelley(shelley))
    }

    fn from_pallas(address: &pallas_addresses::Address) -> Result<Self, AddressError> {
        let (text, payment, delegation) = match address {
            pallas_addresses::Address::Byron(byron) => (byron.to_base58(), None, None),

            pallas_addresses::Address::Shelley(shelley) => {
                let payment = match shelley.payment() {
                    pallas_addresses::ShelleyPaymentPart::Key(hash) => {
                        Credential::AddrKeyHash(to_hash(hash))
                    }
                    pallas_addresses::ShelleyPaymentPart::Script(hash) => {
                        Credential::ScriptHash(to_hash(hash))
                    }
                };
                let delegation = match shelley.delegation() {
                    pallas_addresses::ShelleyDelegationPart::Key(hash) => {
                        Some(Credential::AddrKeyHash(to_hash(hash)))
                    }
                    pallas_addresses::ShelleyDelegationPart::Script(hash) => {
                        Some(Credential::ScriptHash(to_hash(hash)))
                    }
                    _ => None,
                };
                let text =
                    address.to_bech32().map_err(|e| AddressError::Encoding(e.to_string()))?;
                (text, Some(payment), delegation)
            }

            pallas_addresses::Address::Stake(stake) => {
                let delegation = match stake.payload() {
                    pallas_addresses::StakePayload::Stake(hash) => {
                        Credential::AddrKeyHash(to_hash(hash))
                    }
                    pallas_addresses::StakePayload::Script(hash) => {
                        Credential::ScriptHash(to_hash(hash))
                    }
                };
                let text =
                    address.to_bech32().map_err(|e| AddressError::Encoding(e.to_string()))?;
                (text, None, Some(delegation))
            }
        };

        Ok(Self {
            bytes: address.to_vec(),
            text,
            payment,
            delegation,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn payment_credential(&self) -> Option<&Credential> {
        self.payment.as_ref()
    }

    pub fn delegation_credential(&self) -> Option<&Credential> {
        self.delegation.as_ref()
    }

    /// Hash of the payment part, key or script alike
    pub fn payment_hash(&self) -> Option<&Hash<28>> {
        self.payment.as_ref().map(Credential::hash)
    }

    /// True when the payment part hashes to `hash`
    pub fn is_controlled_by(&self, hash: &Hash<28>) -> bool {
        self.payment_hash() == Some(hash)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let address = pallas_addresses::Address::from_bech32(s)
            .or_else(|_| {
                pallas_addresses::ByronAddress::from_base58(s).map(pallas_addresses::Address::Byron)
            })
            .map_err(|e| AddressError::Invalid(s.to_string(), e.to_string()))?;
        Self::from_pallas(&address)
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Address").field(&self.text).finish()
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enterprise_address_round_trips_through_text_and_bytes() {
        let key = KeyHash::new([0x11; 28]);
        let address = Address::enterprise(NetworkId::Testnet, Credential::AddrKeyHash(key)).unwrap();
        assert!(address.to_string().starts_with("addr_test1"));
        assert_eq!(address.as_bytes()[0], 0x60);

        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
        assert_eq!(Address::from_bytes(address.as_bytes()).unwrap(), address);
        assert!(parsed.is_controlled_by(&key));
        assert!(parsed.delegation_credential().is_none());
    }

    #[test]
    fn script_payment_part_is_reported_as_script() {
        let script = ScriptHash::new([0x22; 28]);
        let address = Address::enterprise(NetworkId::Mainnet, Credential::ScriptHash(script)).unwrap();
        assert!(address.to_string().starts_with("addr1"));
        assert_eq!(address.payment_credential(), Some(&Credential::ScriptHash(script)));
        assert_eq!(address.payment_credential().and_then(Credential::key_hash), None);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-an-address".parse::<Address>().is_err());
    }

    #[test]
    fn credential_cbor_shape() {
        let credential = Credential::AddrKeyHash(KeyHash::new([3; 28]));
        let bytes = minicbor::to_vec(credential).unwrap();
        assert_eq!(&bytes[..2], &[0x82, 0x00]);
        assert_eq!(minicbor::decode::<Credential>(&bytes).unwrap(), credential);
    }
}
