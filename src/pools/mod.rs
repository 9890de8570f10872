// src/pools/mod.rs

use serde::{Deserialize, Serialize};
use tracing::warn;

// --- 1. Déclarer tous nos modules principaux ---
pub mod pool_simulator;
pub mod registry;
pub mod constant_product;
pub mod capped_rate;
pub mod oracle_pmm;

// --- 2. Importer le contrat ---
pub use pool_simulator::{
    CalcAmountOutResult, MeteredPool, PoolError, PoolSimulator, TokenAmount, UpdateBalanceParams,
};

// --- 3. L'enum unifié des venues supportés ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Pool {
    ConstantProduct(constant_product::ConstantProductPool),
    CappedRate(capped_rate::CappedRatePool),
    OraclePmm(oracle_pmm::OraclePmmPool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapInfo {
    ConstantProduct(constant_product::ConstantProductSwapInfo),
    CappedRate(capped_rate::CappedRateSwapInfo),
    OraclePmm(oracle_pmm::OraclePmmSwapInfo),
}

fn map_result<S>(result: CalcAmountOutResult<S>, wrap: impl FnOnce(S) -> SwapInfo) -> CalcAmountOutResult<SwapInfo> {
    CalcAmountOutResult {
        token_amount_out: result.token_amount_out,
        fee: result.fee,
        gas: result.gas,
        swap_info: wrap(result.swap_info),
    }
}

fn with_info<S>(params: UpdateBalanceParams<SwapInfo>, swap_info: S) -> UpdateBalanceParams<S> {
    UpdateBalanceParams {
        token_amount_in: params.token_amount_in,
        token_amount_out: params.token_amount_out,
        fee: params.fee,
        swap_info,
    }
}

// --- 4. Implémenter le contrat pour l'enum ---
impl PoolSimulator for Pool {
    type SwapInfo = SwapInfo;

    fn address(&self) -> &str {
        match self {
            Pool::ConstantProduct(p) => p.address(),
            Pool::CappedRate(p) => p.address(),
            Pool::OraclePmm(p) => p.address(),
        }
    }

    fn pool_type(&self) -> &'static str {
        match self {
            Pool::ConstantProduct(p) => p.pool_type(),
            Pool::CappedRate(p) => p.pool_type(),
            Pool::OraclePmm(p) => p.pool_type(),
        }
    }

    fn calc_amount_out(
        &self,
        token_amount_in: &TokenAmount,
        token_out: &str,
    ) -> Result<CalcAmountOutResult<SwapInfo>, PoolError> {
        match self {
            Pool::ConstantProduct(p) => p.calc_amount_out(token_amount_in, token_out).map(|r| map_result(r, SwapInfo::ConstantProduct)),
            Pool::CappedRate(p) => p.calc_amount_out(token_amount_in, token_out).map(|r| map_result(r, SwapInfo::CappedRate)),
            Pool::OraclePmm(p) => p.calc_amount_out(token_amount_in, token_out).map(|r| map_result(r, SwapInfo::OraclePmm)),
        }
    }

    fn update_balance(&mut self, params: UpdateBalanceParams<SwapInfo>) {
        match (self, params.swap_info) {
            (Pool::ConstantProduct(p), SwapInfo::ConstantProduct(info)) => p.update_balance(with_info(params, info)),
            (Pool::CappedRate(p), SwapInfo::CappedRate(info)) => p.update_balance(with_info(params, info)),
            (Pool::OraclePmm(p), SwapInfo::OraclePmm(info)) => p.update_balance(with_info(params, info)),
            (pool, info) => {
                warn!(pool = pool.address(), ?info, "SwapInfo d'un autre type de pool, mise à jour ignorée");
            }
        }
    }

    fn as_metered(&self) -> Option<&dyn MeteredPool> {
        match self {
            Pool::ConstantProduct(p) => p.as_metered(),
            Pool::CappedRate(p) => p.as_metered(),
            Pool::OraclePmm(p) => p.as_metered(),
        }
    }
}
