use anyhow::Result;
use config::{Config, File, FileFormat};
use gasless_common::PoolConditions;
use gasless_module_blockfrost::BlockfrostConfig;
use gasless_module_pool_server::PoolServerConfig;
use serde::Deserialize;
use std::path::Path;

const ENV_PREFIX: &str = "GASLESS_";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub pool: PoolServerConfig,
    #[serde(default)]
    pub blockfrost: BlockfrostConfig,
    #[serde(default)]
    pub conditions: PoolConditions,
}

impl Settings {
    /// Embedded defaults, then `path`, then `GASLESS_*` variables
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        Self::load_with(path, required, std::env::vars())
    }

    fn load_with(
        path: &Path,
        required: bool,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::from_str(
                include_str!("../config.default.toml"),
                FileFormat::Toml,
            ))
            .add_source(File::from(path).required(required));
        for (key, value) in env_overrides(vars) {
            builder = builder.set_override(key, value)?;
        }
        Ok(builder.build()?.try_deserialize()?)
    }
}

/// `GASLESS_POOL__SIGNING_KEY` sets `pool.signing-key`
fn env_overrides(vars: impl IntoIterator<Item = (String, String)>) -> Vec<(String, String)> {
    vars.into_iter()
        .filter_map(|(name, value)| {
            let rest = name.strip_prefix(ENV_PREFIX)?;
            let key = rest.to_lowercase().replace("__", ".").replace('_', "-");
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_common::{Comparison, NetworkId, Unit};
    use std::io::Write;

    fn file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_a_file() {
        let settings =
            Settings::load_with(Path::new("does-not-exist.toml"), false, Vec::new()).unwrap();
        assert_eq!(settings.pool.port, 8080);
        assert_eq!(settings.pool.network, NetworkId::Testnet);
        assert_eq!(settings.blockfrost.timeout_secs, 30);
        assert_eq!(settings.conditions, PoolConditions::default());
    }

    #[test]
    fn missing_required_file_fails() {
        assert!(Settings::load_with(Path::new("does-not-exist.toml"), true, Vec::new()).is_err());
    }

    #[test]
    fn file_sets_conditions() {
        let file = file(
            r#"
            [pool]
            port = 9090

            [conditions]
            token-requirements = [{ unit = "lovelace", quantity = 1000000, comparison = "gte" }]
            whitelist = ["addr_test1abc"]
            "#,
        );
        let settings = Settings::load_with(file.path(), true, Vec::new()).unwrap();
        assert_eq!(settings.pool.port, 9090);
        assert_eq!(settings.pool.bind, "0.0.0.0");

        let requirements = settings.conditions.token_requirements.unwrap();
        assert_eq!(requirements[0].unit, Unit::Lovelace);
        assert_eq!(requirements[0].comparison, Comparison::Gte);
        assert_eq!(settings.conditions.whitelist, Some(vec!["addr_test1abc".to_string()]));
    }

    #[test]
    fn environment_overrides_file() {
        let file = file("[pool]\nsigning-key = \"from-file\"\n");
        let vars = vec![
            ("GASLESS_POOL__SIGNING_KEY".to_string(), "from-env".to_string()),
            ("GASLESS_BLOCKFROST__PROJECT_ID".to_string(), "preprodX".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];
        let settings = Settings::load_with(file.path(), true, vars).unwrap();
        assert_eq!(settings.pool.signing_key, "from-env");
        assert_eq!(settings.blockfrost.project_id, "preprodX");
    }

    #[test]
    fn variable_names_map_to_kebab_keys() {
        let vars = vec![("GASLESS_POOL__FEE_RESERVATION".to_string(), "5".to_string())];
        assert_eq!(
            env_overrides(vars),
            vec![("pool.fee-reservation".to_string(), "5".to_string())]
        );
    }
}
