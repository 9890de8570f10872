// src/state/volume_meter.rs

use crate::math::U256;
use crate::math::full_math::u256_dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Dernier volume connu d'un venue, relevé par le tracker pour une période donnée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBaseline {
    pub timestamp: u32,
    #[serde(with = "u256_dec")]
    pub volume: U256,
}

/// Fenêtre de quota d'un venue : période courante, plafond et volume déjà consommé.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeWindow {
    pub block_timestamp: u32,
    #[serde(with = "u256_dec")]
    pub cap: U256,
    pub baseline: Option<VolumeBaseline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeterError {
    #[error("Période {0} non disponible")]
    PeriodUnknown(u32),
    #[error("Quota dépassé pour la période {period} : demandé {requested}, restant {remaining}")]
    QuotaExceeded { period: u32, requested: U256, remaining: U256 },
    #[error("Aucun relevé de volume pour la période {period}")]
    MissingBaselineRecord { period: u32 },
}

/// Table partagée des quotas restants, indexée par timestamp de bloc.
///
/// Les quotas ne font que décroître entre deux rafraîchissements du tracker.
/// Une période absente vaut un quota nul.
#[derive(Debug, Default)]
pub struct VolumeMeter {
    limits: Mutex<HashMap<u32, U256>>,
}

/// Quotas tels que persistés par le tracker : `{"<période>": "<quota décimal>"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LimitsSnapshot(pub HashMap<u32, Quota>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quota(#[serde(with = "u256_dec")] pub U256);

impl From<LimitsSnapshot> for HashMap<u32, U256> {
    fn from(snapshot: LimitsSnapshot) -> Self {
        snapshot.0.into_iter().map(|(k, v)| (k, v.0)).collect()
    }
}

impl VolumeMeter {
    pub fn new(limits: HashMap<u32, U256>) -> Self {
        Self { limits: Mutex::new(limits) }
    }

    // Aucune section critique ne peut laisser la table à moitié modifiée :
    // un verrou empoisonné reste lisible.
    fn lock(&self) -> MutexGuard<'_, HashMap<u32, U256>> {
        self.limits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copie du quota restant, zéro si la période est inconnue.
    pub fn get_limit(&self, key: u32) -> U256 {
        self.lock().get(&key).copied().unwrap_or_default()
    }

    /// Consomme `delta` sur la période `key`. Retourne `(restant, consommé)`.
    /// En cas de dépassement la valeur stockée n'est pas modifiée.
    pub fn update_limit(&self, key: u32, delta: U256) -> Result<(U256, U256), MeterError> {
        let mut limits = self.lock();
        let remaining = limits.get_mut(&key).ok_or(MeterError::PeriodUnknown(key))?;

        if delta > *remaining {
            return Err(MeterError::QuotaExceeded { period: key, requested: delta, remaining: *remaining });
        }

        *remaining -= delta;
        let left = *remaining;
        debug!(period = key, consumed = %delta, remaining = %left, "Quota consommé");
        Ok((left, delta))
    }

    /// Rafraîchissement par le tracker d'une période.
    pub fn refresh_limit(&self, key: u32, quota: U256) {
        self.lock().insert(key, quota);
    }

    /// Remplace toute la table (nouveau snapshot du tracker).
    pub fn replace_limits(&self, limits: HashMap<u32, U256>) {
        *self.lock() = limits;
    }

    /// Vérifie qu'ajouter `volume` à la période `block_timestamp` reste sous `cap`.
    ///
    /// Sans relevé, la vérification échoue. Un relevé d'une autre période compte pour zéro.
    pub fn check(
        block_timestamp: u32,
        volume: U256,
        cap: U256,
        baseline: Option<&VolumeBaseline>,
    ) -> Result<(), MeterError> {
        let baseline = baseline.ok_or(MeterError::MissingBaselineRecord { period: block_timestamp })?;

        let spent = if baseline.timestamp == block_timestamp { baseline.volume } else { U256::zero() };
        let requested = spent.saturating_add(volume);

        if requested > cap {
            return Err(MeterError::QuotaExceeded {
                period: block_timestamp,
                requested,
                remaining: cap.saturating_sub(spent),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn baseline(timestamp: u32, volume: u64) -> VolumeBaseline {
        VolumeBaseline { timestamp, volume: u(volume) }
    }

    #[test]
    fn check_without_baseline_is_a_hard_failure() {
        assert_eq!(
            VolumeMeter::check(100, u(100_000), u(1_000_000), None),
            Err(MeterError::MissingBaselineRecord { period: 100 })
        );
    }

    #[test]
    fn check_rejects_volume_above_the_cap() {
        let err = VolumeMeter::check(100, u(1_100_000), u(1_000_000), Some(&baseline(200, 200_000))).unwrap_err();
        assert!(matches!(err, MeterError::QuotaExceeded { period: 100, .. }));
    }

    #[test]
    fn check_counts_the_baseline_of_the_same_period() {
        assert_eq!(VolumeMeter::check(100, u(100_000), u(1_000_000), Some(&baseline(100, 200_000))), Ok(()));
        assert_eq!(
            VolumeMeter::check(100, u(900_000), u(1_000_000), Some(&baseline(100, 200_000))),
            Err(MeterError::QuotaExceeded { period: 100, requested: u(1_100_000), remaining: u(800_000) })
        );
    }

    #[test]
    fn check_ignores_a_baseline_from_another_period() {
        assert_eq!(VolumeMeter::check(100, u(100_000), u(1_000_000), Some(&baseline(200, 200_000))), Ok(()));
    }

    #[test]
    fn unknown_period_has_no_quota() {
        let meter = VolumeMeter::default();
        assert_eq!(meter.get_limit(7), U256::zero());
        assert_eq!(meter.update_limit(7, u(1)), Err(MeterError::PeriodUnknown(7)));
    }

    #[test]
    fn over_consumption_leaves_the_quota_untouched() {
        let meter = VolumeMeter::new(HashMap::from([(100, u(500))]));

        assert_eq!(meter.update_limit(100, u(200)), Ok((u(300), u(200))));
        assert_eq!(
            meter.update_limit(100, u(301)),
            Err(MeterError::QuotaExceeded { period: 100, requested: u(301), remaining: u(300) })
        );
        assert_eq!(meter.get_limit(100), u(300));
        assert_eq!(meter.update_limit(100, u(300)), Ok((U256::zero(), u(300))));
    }

    #[test]
    fn tracker_refresh_replaces_quotas() {
        let meter = VolumeMeter::new(HashMap::from([(100, u(5))]));
        meter.refresh_limit(101, u(50));
        assert_eq!(meter.get_limit(101), u(50));

        meter.replace_limits(HashMap::from([(102, u(9))]));
        assert_eq!(meter.get_limit(100), U256::zero());
        assert_eq!(meter.get_limit(102), u(9));
    }

    #[test]
    fn limits_snapshot_is_keyed_by_period() {
        let snapshot: LimitsSnapshot = serde_json::from_str(r#"{"100":"1000000","200":"0"}"#).unwrap();
        let limits: HashMap<u32, U256> = snapshot.into();
        assert_eq!(limits.get(&100), Some(&u(1_000_000)));
        assert_eq!(limits.get(&200), Some(&U256::zero()));
    }

    proptest! {
        #[test]
        fn quota_only_decreases_and_never_underflows(
            initial in 0u64..1_000_000,
            deltas in prop::collection::vec(0u64..300_000, 1..20),
        ) {
            let meter = VolumeMeter::new(HashMap::from([(1, u(initial))]));
            let mut expected = initial;

            for delta in deltas {
                let before = meter.get_limit(1);
                match meter.update_limit(1, u(delta)) {
                    Ok((remaining, consumed)) => {
                        prop_assert!(delta <= expected);
                        expected -= delta;
                        prop_assert_eq!(remaining, u(expected));
                        prop_assert_eq!(consumed, u(delta));
                    }
                    Err(MeterError::QuotaExceeded { remaining, .. }) => {
                        prop_assert!(delta > expected);
                        prop_assert_eq!(remaining, before);
                    }
                    Err(other) => prop_assert!(false, "erreur inattendue : {}", other),
                }
                prop_assert!(meter.get_limit(1) <= before);
                prop_assert_eq!(meter.get_limit(1), u(expected));
            }
        }
    }
}
