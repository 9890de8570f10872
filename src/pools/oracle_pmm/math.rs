// src/pools/oracle_pmm/math.rs

use crate::math::{MulDiv, U256};
use crate::oracle::{arithmetic_mean_tick, Observation, ObservationRing, OracleError, Tick24};

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Tick moyen sur les `seconds_ago` dernières secondes, lu dans le ring sans le modifier.
pub fn twap_tick(
    ring: &ObservationRing,
    intermediate: &Observation,
    time: u32,
    seconds_ago: u32,
    current_tick: Tick24,
) -> Result<i32, OracleError> {
    let [past, now] = ring.observe_double(intermediate, time, [seconds_ago, 0], current_tick)?;
    arithmetic_mean_tick(past, now, seconds_ago)
}

/// Sépare `amount` en `(net, frais)` pour un taux en points de base, frais arrondis vers le bas.
pub fn split_fee_bps(amount: U256, fee_bps: u32) -> Option<(U256, U256)> {
    let fee = amount.mul_div_floor(U256::from(fee_bps), U256::from(BPS_DENOMINATOR))?;
    Some((amount.checked_sub(fee)?, fee))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_split_rounds_in_favour_of_the_trader() {
        assert_eq!(split_fee_bps(U256::from(10_000u64), 30), Some((U256::from(9_970u64), U256::from(30u64))));
        assert_eq!(split_fee_bps(U256::from(333u64), 30), Some((U256::from(333u64), U256::zero())));
        assert_eq!(split_fee_bps(U256::from(100u64), 20_000), None);
    }

    #[test]
    fn twap_averages_the_recorded_ticks() {
        let (mut ring, mut intermediate) = ObservationRing::initialize(1_000, Tick24::new(0).unwrap());
        ring.grow(8);
        intermediate = ring.write(&intermediate, 1_060, Tick24::new(0).unwrap(), 1).unwrap();
        intermediate = ring.write(&intermediate, 1_090, Tick24::new(600).unwrap(), 1).unwrap();

        // 30s à 600 sur une fenêtre de 60s.
        assert_eq!(twap_tick(&ring, &intermediate, 1_090, 60, Tick24::new(600).unwrap()), Ok(300));
        assert_eq!(twap_tick(&ring, &intermediate, 1_090, 30, Tick24::new(600).unwrap()), Ok(600));
    }
}
