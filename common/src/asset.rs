//! Native assets and multi-asset values

use crate::hash::PolicyId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

pub type Lovelace = u64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("Asset name longer than 32 bytes")]
    NameTooLong,

    #[error("Invalid asset unit {0}")]
    InvalidUnit(String),
}

/// Asset name, at most 32 arbitrary bytes
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub fn new(bytes: &[u8]) -> Result<Self, AssetError> {
        if bytes.len() > 32 {
            return Err(AssetError::NameTooLong);
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Policy id plus asset name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId {
    pub policy: PolicyId,
    pub name: AssetName,
}

impl AssetId {
    pub fn new(policy: PolicyId, name: AssetName) -> Self {
        Self { policy, name }
    }
}

/// Hex policy id immediately followed by the hex asset name
impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.policy, self.name)
    }
}

impl FromStr for AssetId {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AssetError::InvalidUnit(s.to_string());
        if s.len() < 56 || !s.is_char_boundary(56) {
            return Err(invalid());
        }
        let (policy, name) = s.split_at(56);
        let policy = policy.parse().map_err(|_| invalid())?;
        let name = hex::decode(name).map_err(|_| invalid())?;
        Ok(Self::new(policy, AssetName::new(&name)?))
    }
}

/// Anything a value can hold a quantity of
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    Lovelace,
    Asset(AssetId),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Lovelace => f.write_str("lovelace"),
            Unit::Asset(asset) => write!(f, "{asset}"),
        }
    }
}

impl FromStr for Unit {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "lovelace" {
            Ok(Unit::Lovelace)
        } else {
            Ok(Unit::Asset(s.parse()?))
        }
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Lovelace plus native asset quantities. Zero quantities are never stored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Value {
    pub lovelace: Lovelace,
    pub assets: BTreeMap<AssetId, u64>,
}

impl Value {
    pub fn new(lovelace: Lovelace) -> Self {
        Self {
            lovelace,
            assets: BTreeMap::new(),
        }
    }

    pub fn with_asset(mut self, asset: AssetId, quantity: u64) -> Self {
        if quantity > 0 {
            *self.assets.entry(asset).or_default() += quantity;
        }
        self
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn quantity_of(&self, unit: &Unit) -> u64 {
        match unit {
            Unit::Lovelace => self.lovelace,
            Unit::Asset(asset) => self.assets.get(asset).copied().unwrap_or_default(),
        }
    }

    /// Every unit with a non-zero quantity, lovelace first
    pub fn units(&self) -> impl Iterator<Item = (Unit, u64)> + '_ {
        std::iter::once((Unit::Lovelace, self.lovelace))
            .chain(self.assets.iter().map(|(asset, quantity)| (Unit::Asset(asset.clone()), *quantity)))
            .filter(|(_, quantity)| *quantity > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PolicyId {
        PolicyId::new([0xab; 28])
    }

    #[test]
    fn unit_text_round_trip() {
        let unit: Unit = format!("{}{}", "ab".repeat(28), hex::encode("TOKEN")).parse().unwrap();
        assert_eq!(
            unit,
            Unit::Asset(AssetId::new(policy(), AssetName::new(b"TOKEN").unwrap()))
        );
        assert_eq!(unit.to_string(), format!("{}544f4b454e", "ab".repeat(28)));
        assert_eq!("lovelace".parse::<Unit>().unwrap(), Unit::Lovelace);
    }

    #[test]
    fn unit_with_empty_name() {
        let unit: Unit = "ab".repeat(28).parse().unwrap();
        assert_eq!(unit, Unit::Asset(AssetId::new(policy(), AssetName::default())));
    }

    #[test]
    fn bad_units_are_rejected() {
        assert!("abcd".parse::<Unit>().is_err());
        assert!(format!("{}zz", "ab".repeat(28)).parse::<Unit>().is_err());
        assert!(AssetName::new(&[0; 33]).is_err());
    }

    #[test]
    fn value_quantities() {
        let asset = AssetId::new(policy(), AssetName::new(b"A").unwrap());
        let value = Value::new(5).with_asset(asset.clone(), 7).with_asset(asset.clone(), 0);
        assert_eq!(value.quantity_of(&Unit::Lovelace), 5);
        assert_eq!(value.quantity_of(&Unit::Asset(asset)), 7);
        assert_eq!(value.units().count(), 2);
        assert_eq!(Value::new(0).units().count(), 0);
    }
}
