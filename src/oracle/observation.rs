// src/oracle/observation.rs

use serde::{Deserialize, Serialize};
use super::OracleError;

/// Déplacement maximal du tick enregistré entre deux observations.
/// Le tick stocké diverge volontairement du tick spot : cette divergence doit être reproduite telle quelle.
pub const MAX_ABS_TICK_MOVE: i32 = 9116;

/// Tick sur 24 bits signés (`int24` on-chain).
///
/// Les conversions depuis une valeur plus large tronquent aux 24 bits de poids faible
/// puis étendent le signe, exactement comme un cast `int24(x)` dans un bloc `unchecked`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Tick24(i32);

impl Tick24 {
    pub const MIN: i32 = -(1 << 23);
    pub const MAX: i32 = (1 << 23) - 1;

    pub fn new(value: i32) -> Result<Self, OracleError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OracleError::TickOutOfRange(value as i64))
        }
    }

    pub const fn wrapping(value: i64) -> Self {
        Self(((value << 40) >> 40) as i32)
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Tick24 {
    type Error = OracleError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tick24> for i32 {
    fn from(tick: Tick24) -> Self {
        tick.0
    }
}

/// Accumulateur de tick sur 56 bits signés (`int56` on-chain).
///
/// Toute l'arithmétique boucle modulo 2^56 : un débordement ne doit jamais être
/// "corrigé" en élargissant le type, sinon la lecture diverge de celle du contrat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TickCumulative56(i64);

impl TickCumulative56 {
    pub const MIN: i64 = -(1 << 55);
    pub const MAX: i64 = (1 << 55) - 1;

    pub fn new(value: i64) -> Result<Self, OracleError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OracleError::CumulativeOutOfRange(value))
        }
    }

    pub const fn wrapping(value: i128) -> Self {
        Self(((value << 72) >> 72) as i64)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub const fn wrapping_add(self, rhs: Self) -> Self {
        Self::wrapping(self.0 as i128 + rhs.0 as i128)
    }

    pub const fn wrapping_sub(self, rhs: Self) -> Self {
        Self::wrapping(self.0 as i128 - rhs.0 as i128)
    }

    pub const fn wrapping_mul(self, rhs: i64) -> Self {
        Self::wrapping(self.0 as i128 * rhs as i128)
    }

    /// Division tronquée vers zéro, comme la division signée de Solidity.
    pub const fn div_trunc(self, rhs: i64) -> Self {
        Self::wrapping(self.0 as i128 / rhs as i128)
    }
}

impl TryFrom<i64> for TickCumulative56 {
    type Error = OracleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TickCumulative56> for i64 {
    fn from(value: TickCumulative56) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub block_timestamp: u32,
    pub prev_tick: Tick24,
    pub tick_cumulative: TickCumulative56,
    pub initialized: bool,
}

/// Fait avancer `last` jusqu'à `block_timestamp` avec le tick courant, borné à ±MAX_ABS_TICK_MOVE
/// autour du tick précédemment enregistré.
pub fn transform(last: &Observation, block_timestamp: u32, tick: Tick24) -> Observation {
    let prev = last.prev_tick.get() as i64;
    let move_ = tick.get() as i64 - prev;
    let clamped = if move_ > MAX_ABS_TICK_MOVE as i64 {
        Tick24::wrapping(prev + MAX_ABS_TICK_MOVE as i64)
    } else if move_ < -(MAX_ABS_TICK_MOVE as i64) {
        Tick24::wrapping(prev - MAX_ABS_TICK_MOVE as i64)
    } else {
        tick
    };

    let delta = block_timestamp.wrapping_sub(last.block_timestamp);
    let increment = TickCumulative56::wrapping(clamped.get() as i128 * delta as i128);

    Observation {
        block_timestamp,
        prev_tick: clamped,
        tick_cumulative: last.tick_cumulative.wrapping_add(increment),
        initialized: true,
    }
}

/// `a <= b` chronologiquement, relativement à `time`, en tenant compte du débordement des timestamps 32 bits.
/// Les deux valeurs sont supposées dans la fenêtre [time - 2^32, time].
pub fn lte(time: u32, a: u32, b: u32) -> bool {
    if a <= time && b <= time {
        return a <= b;
    }
    let a_adjusted = if a > time { a as u64 } else { a as u64 + (1u64 << 32) };
    let b_adjusted = if b > time { b as u64 } else { b as u64 + (1u64 << 32) };
    a_adjusted <= b_adjusted
}
