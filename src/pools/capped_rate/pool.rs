// src/pools/capped_rate/pool.rs

use crate::math::full_math::u256_dec;
use crate::math::{MulDiv, U256};
use crate::pools::pool_simulator::{
    swap_direction, CalcAmountOutResult, MeteredPool, PoolError, PoolSimulator, TokenAmount, UpdateBalanceParams,
};
use crate::state::volume_meter::{VolumeBaseline, VolumeWindow};
use serde::{Deserialize, Serialize};

pub const POOL_TYPE: &str = "capped-rate";
pub const SWAP_GAS: u64 = 85_000;

/// Venue à taux fixe (market maker) dont le notionnel échangé par bloc est plafonné.
///
/// Le taux est exprimé en token1 par token0 (`rate_numerator / rate_denominator`).
/// Le plafond et le volume de référence sont suivis par le pipeline de tracking ;
/// le validateur les relit via [`MeteredPool::volume_window`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CappedRatePool {
    pub address: String,
    pub token_0: String,
    pub token_1: String,
    #[serde(with = "u256_dec")]
    pub reserve_0: U256,
    #[serde(with = "u256_dec")]
    pub reserve_1: U256,
    #[serde(with = "u256_dec")]
    pub rate_numerator: U256,
    #[serde(with = "u256_dec")]
    pub rate_denominator: U256,
    pub block_timestamp: u32,
    #[serde(with = "u256_dec")]
    pub volume_cap: U256,
    #[serde(default)]
    pub baseline: Option<VolumeBaseline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedRateSwapInfo {
    pub zero_for_one: bool,
    pub notional: U256,
}

impl CappedRatePool {
    fn invalid_rate(&self) -> PoolError {
        PoolError::InvalidPrice { pool: self.address.clone(), reason: "taux nul".to_string() }
    }

    /// Convertit un montant du sens `zero_for_one` vers l'autre token au taux fixe, arrondi vers le bas.
    fn convert(&self, amount: U256, zero_for_one: bool) -> Result<U256, PoolError> {
        if self.rate_numerator.is_zero() || self.rate_denominator.is_zero() {
            return Err(self.invalid_rate());
        }
        let converted = if zero_for_one {
            amount.mul_div_floor(self.rate_numerator, self.rate_denominator)
        } else {
            amount.mul_div_floor(self.rate_denominator, self.rate_numerator)
        };
        converted.ok_or_else(|| PoolError::Overflow { pool: self.address.clone() })
    }

    /// Notionnel du swap exprimé en unités de token0.
    fn notional(&self, amount_in: U256, zero_for_one: bool) -> Result<U256, PoolError> {
        if zero_for_one { Ok(amount_in) } else { self.convert(amount_in, false) }
    }
}

impl PoolSimulator for CappedRatePool {
    type SwapInfo = CappedRateSwapInfo;

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
        let amount_out = self.convert(token_amount_in.amount, zero_for_one)?;
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
            fee: TokenAmount::new(token_amount_in.token.clone(), U256::zero()),
            gas: SWAP_GAS,
            swap_info: CappedRateSwapInfo {
                zero_for_one,
                notional: self.notional(token_amount_in.amount, zero_for_one)?,
            },
        })
    }

    fn update_balance(&mut self, params: UpdateBalanceParams<Self::SwapInfo>) {
        // Seules les réserves bougent : le relevé de volume appartient au tracker.
        let (in_reserve, out_reserve) = if params.swap_info.zero_for_one {
            (&mut self.reserve_0, &mut self.reserve_1)
        } else {
            (&mut self.reserve_1, &mut self.reserve_0)
        };
        *in_reserve = in_reserve.saturating_add(params.token_amount_in.amount);
        *out_reserve = out_reserve.saturating_sub(params.token_amount_out.amount);
    }

    fn as_metered(&self) -> Option<&dyn MeteredPool> {
        Some(self)
    }
}

impl MeteredPool for CappedRatePool {
    fn metered_volume(&self, token_amount_in: &TokenAmount, token_out: &str) -> Option<U256> {
        let zero_for_one =
            swap_direction(&self.address, &self.token_0, &self.token_1, &token_amount_in.token, token_out).ok()?;
        self.notional(token_amount_in.amount, zero_for_one).ok()
    }

    fn volume_window(&self) -> VolumeWindow {
        VolumeWindow {
            block_timestamp: self.block_timestamp,
            cap: self.volume_cap,
            baseline: self.baseline.clone(),
        }
    }
}
