// src/validation/route.rs

use crate::math::U256;
use crate::math::full_math::u256_dec;
use crate::pools::TokenAmount;
use serde::{Deserialize, Serialize};

/// Un chemin de la route : une suite de pools, et les tokens traversés (un de plus que de hops).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    pub pool_addresses: Vec<String>,
    pub tokens: Vec<String>,
    pub input: TokenAmount,
}

/// Route déjà choisie par le moteur de recherche, à rejouer avant d'être rendue à l'appelant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub token_in: String,
    pub token_out: String,
    pub paths: Vec<Path>,
}

impl Path {
    /// Raison du rejet si la forme du chemin est incohérente avec la route.
    pub(crate) fn shape_error(&self, route: &Route) -> Option<String> {
        if self.pool_addresses.is_empty() {
            return Some("aucun pool".to_string());
        }
        if self.tokens.len() != self.pool_addresses.len() + 1 {
            return Some(format!(
                "{} tokens pour {} pools",
                self.tokens.len(),
                self.pool_addresses.len()
            ));
        }
        if self.tokens.first() != Some(&self.input.token) || self.input.token != route.token_in {
            return Some(format!("entrée {} différente de {}", self.input.token, route.token_in));
        }
        if self.tokens.last() != Some(&route.token_out) {
            return Some(format!("ne se termine pas par {}", route.token_out));
        }
        None
    }
}

/// Un swap rejoué, tel que rendu à l'appelant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSummary {
    pub pool: String,
    pub pool_type: String,
    pub exchange: String,
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    pub fee: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub token_in: String,
    pub token_out: String,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    pub gas: u64,
    #[serde(with = "u256_dec")]
    pub metered_volume: U256,
    /// Le volume mesuré dépasse le quota du venue ; la route est quand même rendue.
    pub quota_exceeded: bool,
    pub route: Vec<Vec<SwapSummary>>,
}
