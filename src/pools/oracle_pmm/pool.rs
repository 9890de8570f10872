// src/pools/oracle_pmm/pool.rs

use super::math::{split_fee_bps, twap_tick};
use crate::math::full_math::u256_dec;
use crate::math::tick_math::quote_at_tick;
use crate::math::U256;
use crate::oracle::{Observation, ObservationRing, OracleError, Tick24};
use crate::pools::pool_simulator::{
    swap_direction, CalcAmountOutResult, PoolError, PoolSimulator, TokenAmount, UpdateBalanceParams,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const POOL_TYPE: &str = "oracle-pmm";
pub const SWAP_GAS: u64 = 110_000;

/// Market maker qui cote au prix TWAP de son propre oracle de ticks plutôt qu'au prix spot.
///
/// Le ring d'observations n'est écrit que par le pipeline de rafraîchissement
/// ([`OraclePmmPool::record_tick`]) ; pendant une cotation il est seulement lu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OraclePmmPool {
    pub address: String,
    pub token_0: String,
    pub token_1: String,
    #[serde(with = "u256_dec")]
    pub reserve_0: U256,
    #[serde(with = "u256_dec")]
    pub reserve_1: U256,
    pub fee_bps: u32,
    pub twap_seconds_ago: u32,
    pub min_interval: u32,
    pub block_timestamp: u32,
    pub current_tick: Tick24,
    pub intermediate: Observation,
    pub ring: ObservationRing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OraclePmmSwapInfo {
    pub zero_for_one: bool,
    pub twap_tick: i32,
}

impl OraclePmmPool {
    /// Enregistre le tick du bloc `block_timestamp` dans l'oracle. Chemin de rafraîchissement uniquement.
    pub fn record_tick(&mut self, block_timestamp: u32, tick: Tick24) -> Result<(), OracleError> {
        self.intermediate = self.ring.write(&self.intermediate, block_timestamp, tick, self.min_interval)?;
        self.block_timestamp = block_timestamp;
        self.current_tick = tick;
        debug!(
            pool = %self.address,
            block_timestamp,
            tick = tick.get(),
            index = self.ring.index,
            cardinality = self.ring.cardinality,
            "Tick enregistré dans l'oracle"
        );
        Ok(())
    }

    pub fn twap_tick(&self) -> Result<i32, OracleError> {
        twap_tick(&self.ring, &self.intermediate, self.block_timestamp, self.twap_seconds_ago, self.current_tick)
    }
}

impl PoolSimulator for OraclePmmPool {
    type SwapInfo = OraclePmmSwapInfo;

    fn address(&self) -> &str {
        &self.address
    }

    fn pool_type(&self) -> &'static str {
        POOL_TYPE
    }

    fn calc_amount_out(
        &self,
        token_amount_in: &TokenAmount,
        token_out: &str,
    ) -> Result<CalcAmountOutResult<Self::SwapInfo>, PoolError> {
        let zero_for_one = swap_direction(&self.address, &self.token_0, &self.token_1, &token_amount_in.token, token_out)?;

        let mean_tick = self
            .twap_tick()
            .map_err(|source| PoolError::Oracle { pool: self.address.clone(), source })?;

        let gross_out = quote_at_tick(mean_tick, token_amount_in.amount, zero_for_one)
            .map_err(|source| PoolError::TickMath { pool: self.address.clone(), source })?;
        let (amount_out, fee) =
            split_fee_bps(gross_out, self.fee_bps).ok_or_else(|| PoolError::Overflow { pool: self.address.clone() })?;

        let out_reserve = if zero_for_one { self.reserve_1 } else { self.reserve_0 };
        if amount_out > out_reserve {
            return Err(PoolError::InsufficientLiquidity {
                pool: self.address.clone(),
                requested: amount_out,
                available: out_reserve,
            });
        }

        Ok(CalcAmountOutResult {
            token_amount_out: TokenAmount::new(token_out, amount_out),
            fee: TokenAmount::new(token_out, fee),
            gas: SWAP_GAS,
            swap_info: OraclePmmSwapInfo { zero_for_one, twap_tick: mean_tick },
        })
    }

    fn update_balance(&mut self, params: UpdateBalanceParams<Self::SwapInfo>) {
        let (in_reserve, out_reserve) = if params.swap_info.zero_for_one {
            (&mut self.reserve_0, &mut self.reserve_1)
        } else {
            (&mut self.reserve_1, &mut self.reserve_0)
        };
        *in_reserve = in_reserve.saturating_add(params.token_amount_in.amount);
        *out_reserve = out_reserve.saturating_sub(params.token_amount_out.amount);
    }
}
