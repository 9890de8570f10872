// src/pools/constant_product/pool.rs

use crate::math::full_math::u256_dec;
use crate::math::{MulDiv, U256};
use crate::pools::pool_simulator::{
    swap_direction, CalcAmountOutResult, PoolError, PoolSimulator, TokenAmount, UpdateBalanceParams,
};
use serde::{Deserialize, Serialize};

pub const POOL_TYPE: &str = "constant-product";
pub const SWAP_GAS: u64 = 60_000;

// Les frais sont exprimés en millionièmes, comme `trade_fee_rate` on-chain.
const FEE_DENOMINATOR: u64 = 1_000_000;

/// Pool x·y=k à deux tokens avec frais de trading prélevés sur l'entrée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantProductPool {
    pub address: String,
    pub token_0: String,
    pub token_1: String,
    #[serde(with = "u256_dec")]
    pub reserve_0: U256,
    #[serde(with = "u256_dec")]
    pub reserve_1: U256,
    pub trade_fee_rate: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantProductSwapInfo {
    pub zero_for_one: bool,
}

impl ConstantProductPool {
    fn overflow(&self) -> PoolError {
        PoolError::Overflow { pool: self.address.clone() }
    }
}

impl PoolSimulator for ConstantProductPool {
    type SwapInfo = ConstantProductSwapInfo;

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
        let (in_reserve, out_reserve) = if zero_for_one {
            (self.reserve_0, self.reserve_1)
        } else {
            (self.reserve_1, self.reserve_0)
        };

        if in_reserve.is_zero() || out_reserve.is_zero() {
            return Err(PoolError::ZeroReserve { pool: self.address.clone() });
        }

        // Étape 1 : frais de trading arrondis au plafond, réplique du code on-chain.
        let trade_fee = token_amount_in
            .amount
            .mul_div_ceil(U256::from(self.trade_fee_rate), U256::from(FEE_DENOMINATOR))
            .ok_or_else(|| self.overflow())?;
        let amount_in_less_fees = token_amount_in.amount.saturating_sub(trade_fee);

        // Étape 2 : formule de produit constant pure.
        let denominator = in_reserve
            .checked_add(amount_in_less_fees)
            .ok_or_else(|| self.overflow())?;
        let amount_out = amount_in_less_fees
            .mul_div_floor(out_reserve, denominator)
            .ok_or_else(|| self.overflow())?;

        if amount_out >= out_reserve {
            return Err(PoolError::InsufficientLiquidity {
                pool: self.address.clone(),
                requested: amount_out,
                available: out_reserve,
            });
        }

        Ok(CalcAmountOutResult {
            token_amount_out: TokenAmount::new(token_out, amount_out),
            fee: TokenAmount::new(token_amount_in.token.clone(), trade_fee),
            gas: SWAP_GAS,
            swap_info: ConstantProductSwapInfo { zero_for_one },
        })
    }

    fn update_balance(&mut self, params: UpdateBalanceParams<Self::SwapInfo>) {
        // Les frais restent dans le pool : la réserve d'entrée reçoit le montant brut.
        let (in_reserve, out_reserve) = if params.swap_info.zero_for_one {
            (&mut self.reserve_0, &mut self.reserve_1)
        } else {
            (&mut self.reserve_1, &mut self.reserve_0)
        };
        *in_reserve = in_reserve.saturating_add(params.token_amount_in.amount);
        *out_reserve = out_reserve.saturating_sub(params.token_amount_out.amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ConstantProductPool {
        ConstantProductPool {
            address: "cp-1".into(),
            token_0: "weth".into(),
            token_1: "usdc".into(),
            reserve_0: U256::from(1_000_000u64),
            reserve_1: U256::from(2_000_000u64),
            trade_fee_rate: 2_500,
        }
    }

    #[test]
    fn quote_applies_a_ceil_rounded_fee() {
        let pool = pool();
        let result = pool.calc_amount_out(&TokenAmount::new("weth", U256::from(1_001u64)), "usdc").unwrap();

        // 1001 * 2500 / 1e6 = 2.5025 -> 3
        assert_eq!(result.fee, TokenAmount::new("weth", U256::from(3u64)));
        // 998 * 2_000_000 / (1_000_000 + 998) = 1994.01... -> 1994
        assert_eq!(result.token_amount_out, TokenAmount::new("usdc", U256::from(1_994u64)));
        assert_eq!(result.gas, SWAP_GAS);
        assert!(result.swap_info.zero_for_one);
    }

    #[test]
    fn update_balance_moves_both_reserves() {
        let mut pool = pool();
        let amount_in = TokenAmount::new("usdc", U256::from(10_000u64));
        let result = pool.calc_amount_out(&amount_in, "weth").unwrap();
        let out = result.token_amount_out.amount;

        pool.update_balance(UpdateBalanceParams {
            token_amount_in: amount_in,
            token_amount_out: result.token_amount_out,
            fee: result.fee,
            swap_info: result.swap_info,
        });

        assert_eq!(pool.reserve_1, U256::from(2_010_000u64));
        assert_eq!(pool.reserve_0, U256::from(1_000_000u64) - out);
    }

    #[test]
    fn rejects_foreign_tokens_and_empty_reserves() {
        let mut pool = pool();
        assert!(matches!(
            pool.calc_amount_out(&TokenAmount::new("dai", U256::one()), "usdc"),
            Err(PoolError::TokenNotInPool { .. })
        ));

        pool.reserve_1 = U256::zero();
        assert_eq!(
            pool.calc_amount_out(&TokenAmount::new("weth", U256::one()), "usdc"),
            Err(PoolError::ZeroReserve { pool: "cp-1".into() })
        );
    }

    #[test]
    fn snapshot_amounts_are_decimal_strings() {
        let json = r#"{"address":"cp-1","token0":"weth","token1":"usdc","reserve0":"1000000","reserve1":"2000000","tradeFeeRate":2500}"#;
        let decoded: ConstantProductPool = serde_json::from_str(json).unwrap();
        assert_eq!(decoded, pool());
    }
}
