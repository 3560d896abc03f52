//! Policy a pool enforces before it countersigns

use crate::asset::Unit;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    /// `held <op> threshold`
    pub fn holds(&self, held: u64, threshold: u64) -> bool {
        match self {
            Comparison::Eq => held == threshold,
            Comparison::Neq => held != threshold,
            Comparison::Gt => held > threshold,
            Comparison::Gte => held >= threshold,
            Comparison::Lt => held < threshold,
            Comparison::Lte => held <= threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequirement {
    pub unit: Unit,
    pub quantity: u64,
    pub comparison: Comparison,
}

/// Replaced wholesale, never edited in place
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConditions {
    #[serde(default, alias = "token-requirements", skip_serializing_if = "Option::is_none")]
    pub token_requirements: Option<Vec<TokenRequirement>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,

    #[serde(default, alias = "cors-settings", skip_serializing_if = "Option::is_none")]
    pub cors_settings: Option<Vec<String>>,
}

impl PoolConditions {
    /// True if `origin` may call the pool from a browser. No settings allows all.
    pub fn allows_origin(&self, origin: &str) -> bool {
        match &self.cors_settings {
            None => true,
            Some(origins) => origins.iter().any(|o| o == "*" || o == origin),
        }
    }
}
