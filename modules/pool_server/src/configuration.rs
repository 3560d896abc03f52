use crate::signer::KeySigner;
use gasless_common::{Address, Lovelace, NetworkId, Signer, SignerError};
use serde::Deserialize;
use std::path::PathBuf;

/// `[pool]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PoolServerConfig {
    #[serde(default = "defaults::bind")]
    pub bind: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    #[serde(default)]
    pub network: NetworkId,
    /// Hex seed or `cborHex`; ignored when a key file is given
    #[serde(default)]
    pub signing_key: String,
    #[serde(default)]
    pub signing_key_file: Option<PathBuf>,
    /// Sponsoring address; the key's enterprise address when unset
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "defaults::fee_reservation")]
    pub fee_reservation: Lovelace,
}

impl Default for PoolServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            port: defaults::port(),
            network: NetworkId::default(),
            signing_key: String::new(),
            signing_key_file: None,
            address: None,
            fee_reservation: defaults::fee_reservation(),
        }
    }
}

impl PoolServerConfig {
    pub fn load_signer(&self) -> Result<KeySigner, SignerError> {
        match &self.signing_key_file {
            Some(path) => KeySigner::from_file(path),
            None if self.signing_key.is_empty() => {
                Err(SignerError::InvalidKey("no signing key configured".to_string()))
            }
            None => KeySigner::from_text(&self.signing_key),
        }
    }

    /// The configured address, which must be paid to `signer`
    pub fn pool_address(&self, signer: &KeySigner) -> anyhow::Result<Address> {
        let Some(text) = &self.address else {
            return Ok(signer.address(self.network)?);
        };
        let address: Address = text.parse()?;
        let key_hash = signer.key_hash();
        if !address.is_controlled_by(&key_hash) {
            anyhow::bail!("Pool address {address} is not paid to signing key {key_hash}");
        }
        Ok(address)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

mod defaults {
    pub fn bind() -> String {
        "0.0.0.0".to_string()
    }
    pub fn port() -> u16 {
        8080
    }
    pub fn fee_reservation() -> u64 {
        3_000_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_test_utils::address;

    const SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn defaults_fill_missing_keys() {
        let config: PoolServerConfig =
            serde_json::from_str(r#"{"signing-key": "abc", "port": 9000}"#).unwrap();
        assert_eq!(config.listen_address(), "0.0.0.0:9000");
        assert_eq!(config.network, NetworkId::Testnet);
        assert_eq!(config.fee_reservation, 3_000_000);
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = PoolServerConfig::default().load_signer().unwrap_err();
        assert!(matches!(err, SignerError::InvalidKey(_)));
    }

    #[test]
    fn address_defaults_to_the_key() {
        let config = PoolServerConfig {
            signing_key: SEED.to_string(),
            ..Default::default()
        };
        let signer = config.load_signer().unwrap();
        let pool = config.pool_address(&signer).unwrap();
        assert!(pool.is_controlled_by(&signer.key_hash()));
    }

    #[test]
    fn foreign_address_is_refused() {
        let config = PoolServerConfig {
            signing_key: SEED.to_string(),
            address: Some(address(4).to_string()),
            ..Default::default()
        };
        let signer = config.load_signer().unwrap();
        assert!(config.pool_address(&signer).is_err());
    }
}
