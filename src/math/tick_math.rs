// src/math/tick_math.rs

use super::full_math::{MulDiv, U256};
use thiserror::Error;

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;

// 1/sqrt(1.0001)^(2^i) en Q128.128, bit i de |tick|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TickMathError {
    #[error("Tick {0} hors des bornes [-887272, 887272]")]
    TickOutOfBounds(i32),
    #[error("Débordement lors de la conversion au tick {0}")]
    Overflow(i32),
}

const RATIO_STEPS: [(u32, &str); 19] = [
    (0x2, "fff97272373d413259a46990580e213a"),
    (0x4, "fff2e50f5f656932ef12357cf3c7fdcc"),
    (0x8, "ffe5caca7e10e4e61c3624eaa0941cd0"),
    (0x10, "ffcb9843d60f6159c9db58835c926644"),
    (0x20, "ff973b41fa98c081472e6896dfb254c0"),
    (0x40, "ff2ea16466c96a3843ec78b326b52861"),
    (0x80, "fe5dee046a99a2a811c461f1969c3053"),
    (0x100, "fcbe86c7900a88aedcffc83b479aa3a4"),
    (0x200, "f987a7253ac413176f2b074cf7815e54"),
    (0x400, "f3392b0822b70005940c7a398e4b70f3"),
    (0x800, "e7159475a2c29b7443b29c7fa6e889d9"),
    (0x1000, "d097f3bdfd2022b8845ad8f792aa5825"),
    (0x2000, "a9f746462d870fdf8a65dc1f90e061e5"),
    (0x4000, "70d869a156d2a1b890bb3df62baf32f7"),
    (0x8000, "31be135f97d08fd981231505542fcfa6"),
    (0x10000, "9aa508b5b7a84e1c677de54f3e99bc9"),
    (0x20000, "5d6af8dedb81196699c329225ee604"),
    (0x40000, "2216e584f5fa1ea926041bedfe98"),
    (0x80000, "48a170391f7dc42444e8fa2"),
];

fn hex_u256(s: &str) -> U256 {
    // Les constantes ci-dessus sont statiques et valides.
    U256::from_str_radix(s, 16).unwrap_or_default()
}

/// Calcule sqrt(1.0001^tick) en Q64.96, réplique de `TickMath.getSqrtRatioAtTick`.
pub fn tick_to_sqrt_price_x96(tick: i32) -> Result<U256, TickMathError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(TickMathError::TickOutOfBounds(tick));
    }
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        hex_u256("fffcb933bd6fad37aa2d162d1a594001")
    } else {
        U256::one() << 128
    };
    for (bit, step) in RATIO_STEPS.iter() {
        if abs_tick & bit != 0 {
            ratio = (ratio * hex_u256(step)) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Arrondi au plafond pour que le résultat soit toujours >= la vraie valeur.
    let round_up = if (ratio & U256::from(u32::MAX)).is_zero() { U256::zero() } else { U256::one() };
    Ok((ratio >> 32) + round_up)
}

/// Montant de `quote` obtenu pour `base_amount` au prix du tick donné,
/// comme `OracleLibrary.getQuoteAtTick`. `base_is_token0` indique le sens de conversion.
pub fn quote_at_tick(tick: i32, base_amount: U256, base_is_token0: bool) -> Result<U256, TickMathError> {
    let sqrt_price_x96 = tick_to_sqrt_price_x96(tick)?;
    let overflow = || TickMathError::Overflow(tick);

    if sqrt_price_x96 <= U256::from(u128::MAX) {
        let ratio_x192 = sqrt_price_x96 * sqrt_price_x96;
        let q192 = U256::one() << 192;
        if base_is_token0 {
            ratio_x192.mul_div_floor(base_amount, q192).ok_or_else(overflow)
        } else {
            q192.mul_div_floor(base_amount, ratio_x192).ok_or_else(overflow)
        }
    } else {
        let ratio_x128 = sqrt_price_x96.mul_div_floor(sqrt_price_x96, U256::one() << 64).ok_or_else(overflow)?;
        let q128 = U256::one() << 128;
        if base_is_token0 {
            ratio_x128.mul_div_floor(base_amount, q128).ok_or_else(overflow)
        } else {
            q128.mul_div_floor(base_amount, ratio_x128).ok_or_else(overflow)
        }
    }
}
