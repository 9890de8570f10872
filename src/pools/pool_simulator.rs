// src/pools/pool_simulator.rs

use crate::math::tick_math::TickMathError;
use crate::math::U256;
use crate::math::full_math::u256_dec;
use crate::oracle::OracleError;
use crate::state::volume_meter::VolumeWindow;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: String,
    #[serde(with = "u256_dec")]
    pub amount: U256,
}

impl TokenAmount {
    pub fn new(token: impl Into<String>, amount: U256) -> Self {
        Self { token: token.into(), amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcAmountOutResult<S> {
    pub token_amount_out: TokenAmount,
    pub fee: TokenAmount,
    pub gas: u64,
    pub swap_info: S,
}

/// Ce qu'un pool reçoit pour appliquer un swap déjà simulé à son propre état.
#[derive(Debug, Clone)]
pub struct UpdateBalanceParams<S> {
    pub token_amount_in: TokenAmount,
    pub token_amount_out: TokenAmount,
    pub fee: TokenAmount,
    pub swap_info: S,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("Le token {token} n'appartient pas au pool {pool}")]
    TokenNotInPool { pool: String, token: String },
    #[error("Réserve nulle dans le pool {pool}")]
    ZeroReserve { pool: String },
    #[error("Liquidité insuffisante dans {pool} : demandé {requested}, disponible {available}")]
    InsufficientLiquidity { pool: String, requested: U256, available: U256 },
    #[error("Débordement arithmétique dans le pool {pool}")]
    Overflow { pool: String },
    #[error("Prix invalide pour le pool {pool} : {reason}")]
    InvalidPrice { pool: String, reason: String },
    #[error("Prix au tick incalculable pour le pool {pool} : {source}")]
    TickMath {
        pool: String,
        #[source]
        source: TickMathError,
    },
    #[error("Oracle du pool {pool} illisible : {source}")]
    Oracle {
        pool: String,
        #[source]
        source: OracleError,
    },
}

impl PoolError {
    /// Label court pour les métriques.
    pub fn reason(&self) -> &'static str {
        match self {
            PoolError::TokenNotInPool { .. } => "token_not_in_pool",
            PoolError::ZeroReserve { .. } => "zero_reserve",
            PoolError::InsufficientLiquidity { .. } => "insufficient_liquidity",
            PoolError::Overflow { .. } => "overflow",
            PoolError::InvalidPrice { .. } => "invalid_price",
            PoolError::TickMath { .. } => "tick_math",
            PoolError::Oracle { .. } => "oracle",
        }
    }
}

/// Le contrat qu'un venue expose au validateur de routes.
///
/// Le validateur ne connaît rien de la formule de swap : il calcule, puis applique le résultat
/// sur un clone du pool pour que les hops suivants voient l'état post-trade.
pub trait PoolSimulator: Clone + Send + Sync {
    type SwapInfo: Clone + Debug + Send + Sync;

    fn address(&self) -> &str;
    fn pool_type(&self) -> &'static str;

    fn calc_amount_out(
        &self,
        token_amount_in: &TokenAmount,
        token_out: &str,
    ) -> Result<CalcAmountOutResult<Self::SwapInfo>, PoolError>;

    fn update_balance(&mut self, params: UpdateBalanceParams<Self::SwapInfo>);

    /// Les venues soumis à un quota par période s'exposent ici.
    fn as_metered(&self) -> Option<&dyn MeteredPool> {
        None
    }
}

pub trait MeteredPool {
    /// Volume compté contre le quota du venue pour ce swap, `None` si non applicable.
    fn metered_volume(&self, token_amount_in: &TokenAmount, token_out: &str) -> Option<U256>;

    /// Fenêtre de quota courante, telle que suivie par le pipeline de tracking.
    fn volume_window(&self) -> VolumeWindow;
}

/// Identifie le sens du swap dans un pool à deux tokens. `true` si `token_in` est le token0.
pub(crate) fn swap_direction(
    pool: &str,
    token_0: &str,
    token_1: &str,
    token_in: &str,
    token_out: &str,
) -> Result<bool, PoolError> {
    let not_in_pool = |token: &str| PoolError::TokenNotInPool { pool: pool.to_string(), token: token.to_string() };
    if token_in == token_0 && token_out == token_1 {
        Ok(true)
    } else if token_in == token_1 && token_out == token_0 {
        Ok(false)
    } else if token_in != token_0 && token_in != token_1 {
        Err(not_in_pool(token_in))
    } else {
        Err(not_in_pool(token_out))
    }
}
