use serde::Deserialize;

/// Blockfrost connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BlockfrostConfig {
    #[serde(default)]
    pub project_id: String,
    /// Base URL; derived from the project id's network prefix when unset
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for BlockfrostConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            url: None,
            timeout_secs: defaults::timeout(),
        }
    }
}

impl BlockfrostConfig {
    /// The configured URL, or the public endpoint for the network the project
    /// id belongs to
    pub fn base_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.trim_end_matches('/').to_string());
        }
        ["mainnet", "preprod", "preview"]
            .into_iter()
            .find(|network| self.project_id.starts_with(network))
            .map(|network| format!("https://cardano-{network}.blockfrost.io/api/v0"))
    }
}

mod defaults {
    pub fn timeout() -> u64 {
        30
    }
}
