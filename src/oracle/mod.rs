// src/oracle/mod.rs

//! Oracle TWAP des pools à hook : buffer circulaire d'observations de tick.
//! La lecture doit reproduire au bit près celle du contrat, débordements compris.

pub mod observation;
pub mod ring;

use thiserror::Error;

pub use observation::{Observation, Tick24, TickCumulative56, MAX_ABS_TICK_MOVE};
pub use ring::{arithmetic_mean_tick, ObservationRing, MAX_CARDINALITY};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("Tick {0} hors de la plage int24")]
    TickOutOfRange(i64),
    #[error("Accumulateur {0} hors de la plage int56")]
    CumulativeOutOfRange(i64),
    #[error("Oracle non initialisé (cardinalité nulle)")]
    ZeroCardinality,
    #[error("Cible {target} antérieure à la plus ancienne observation ({oldest})")]
    TargetPredatesOldestObservation { target: u32, oldest: u32 },
    #[error("Aucune paire d'observations n'encadre la cible {target} : ring incohérent")]
    InconsistentRing { target: u32 },
    #[error("Fenêtre TWAP nulle")]
    ZeroTwapWindow,
}
