// src/oracle/ring.rs

use serde::{Deserialize, Serialize};
use super::observation::{lte, transform, Observation, Tick24, TickCumulative56};
use super::OracleError;

/// Capacité maximale du buffer circulaire (taille du tableau on-chain).
pub const MAX_CARDINALITY: u32 = 65535;

/// Historique circulaire des observations d'un pool, tel que persisté par le pipeline de tracking.
///
/// `index` désigne toujours le dernier slot écrit. `cardinality` ne fait que croître.
/// Le vecteur peut être plus court que `cardinality_next` : un slot absent est lu comme non initialisé.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRing {
    pub index: u32,
    pub cardinality: u32,
    pub cardinality_next: u32,
    pub observations: Vec<Observation>,
}

impl ObservationRing {
    /// Premier enregistrement du pool : slot 0 à `time`, accumulateur nul.
    /// Retourne l'observation intermédiaire à conserver à côté du ring.
    pub fn initialize(time: u32, tick: Tick24) -> (Self, Observation) {
        let first = Observation {
            block_timestamp: time,
            prev_tick: tick,
            tick_cumulative: TickCumulative56::default(),
            initialized: true,
        };
        let ring = Self {
            index: 0,
            cardinality: 1,
            cardinality_next: 1,
            observations: vec![first],
        };
        (ring, first)
    }

    /// Prépare la croissance du ring. Ne réduit jamais `cardinality_next`.
    pub fn grow(&mut self, next: u32) -> u32 {
        let next = next.min(MAX_CARDINALITY);
        if next > self.cardinality_next {
            self.cardinality_next = next;
        }
        self.cardinality_next
    }

    fn slot(&self, i: u32) -> Observation {
        self.observations.get(i as usize).copied().unwrap_or_default()
    }

    fn set_slot(&mut self, i: u32, observation: Observation) {
        let i = i as usize;
        if self.observations.len() <= i {
            self.observations.resize(i + 1, Observation::default());
        }
        self.observations[i] = observation;
    }

    /// Écrit une observation si l'intervalle minimal est écoulé depuis le dernier slot.
    ///
    /// Retourne toujours l'observation intermédiaire mise à jour ; `index` et `cardinality`
    /// ne changent que lorsqu'un slot est effectivement ajouté.
    pub fn write(
        &mut self,
        intermediate: &Observation,
        block_timestamp: u32,
        tick: Tick24,
        min_interval: u32,
    ) -> Result<Observation, OracleError> {
        // Déjà écrit dans ce bloc.
        if intermediate.block_timestamp == block_timestamp {
            return Ok(*intermediate);
        }

        let updated = transform(intermediate, block_timestamp, tick);

        // Trop tôt depuis le dernier slot : on ne garde que l'intermédiaire.
        if block_timestamp.wrapping_sub(self.slot(self.index).block_timestamp) < min_interval {
            return Ok(updated);
        }

        let cardinality_updated = if self.cardinality_next > self.cardinality
            && self.index == self.cardinality.wrapping_sub(1)
        {
            self.cardinality_next
        } else {
            self.cardinality
        };
        if cardinality_updated == 0 {
            return Err(OracleError::ZeroCardinality);
        }

        let index_updated = self.index.wrapping_add(1) % cardinality_updated;
        self.set_slot(index_updated, updated);
        self.index = index_updated;
        self.cardinality = cardinality_updated;

        Ok(updated)
    }

    /// Recherche dichotomique des deux observations qui encadrent `target`.
    /// Ne doit être appelée que si `target` est dans l'historique disponible.
    fn binary_search(&self, time: u32, target: u32) -> Result<(Observation, Observation), OracleError> {
        let cardinality = self.cardinality as u64;
        let mut l = (self.index as u64 + 1) % cardinality; // plus ancienne
        let mut r = l + cardinality - 1; // plus récente

        while l <= r {
            let i = (l + r) / 2;
            let before_or_at = self.slot((i % cardinality) as u32);

            // Slot jamais écrit : on avance la borne gauche.
            if !before_or_at.initialized {
                l = i + 1;
                continue;
            }

            let at_or_after = self.slot(((i + 1) % cardinality) as u32);
            let target_at_or_after = lte(time, before_or_at.block_timestamp, target);

            if target_at_or_after && lte(time, target, at_or_after.block_timestamp) {
                return Ok((before_or_at, at_or_after));
            }

            if !target_at_or_after {
                if i == 0 {
                    break;
                }
                r = i - 1;
            } else {
                l = i + 1;
            }
        }

        Err(OracleError::InconsistentRing { target })
    }

    /// Renvoie les observations `(before_or_at, at_or_after)` autour de `target`.
    /// Si `target` tombe exactement sur une observation, la seconde valeur n'est pas significative.
    fn surrounding_observations(
        &self,
        intermediate: &Observation,
        time: u32,
        target: u32,
        tick: Tick24,
    ) -> Result<(Observation, Observation), OracleError> {
        // Cas le plus fréquent : la cible est "maintenant" ou après l'intermédiaire.
        if lte(time, intermediate.block_timestamp, target) {
            if intermediate.block_timestamp == target {
                return Ok((*intermediate, Observation::default()));
            }
            return Ok((*intermediate, transform(intermediate, target, tick)));
        }

        let newest = self.slot(self.index);
        if lte(time, newest.block_timestamp, target) {
            if newest.block_timestamp == target {
                return Ok((newest, Observation::default()));
            }
            return Ok((newest, *intermediate));
        }

        let mut oldest = self.slot((self.index + 1) % self.cardinality);
        if !oldest.initialized {
            oldest = self.slot(0);
        }

        if !lte(time, oldest.block_timestamp, target) {
            return Err(OracleError::TargetPredatesOldestObservation {
                target,
                oldest: oldest.block_timestamp,
            });
        }

        self.binary_search(time, target)
    }

    /// Valeur de l'accumulateur `seconds_ago` secondes avant `time`.
    pub fn observe_single(
        &self,
        intermediate: &Observation,
        time: u32,
        seconds_ago: u32,
        tick: Tick24,
    ) -> Result<TickCumulative56, OracleError> {
        if self.cardinality == 0 {
            return Err(OracleError::ZeroCardinality);
        }

        if seconds_ago == 0 {
            if intermediate.block_timestamp != time {
                return Ok(transform(intermediate, time, tick).tick_cumulative);
            }
            return Ok(intermediate.tick_cumulative);
        }

        let target = time.wrapping_sub(seconds_ago);
        let (before_or_at, at_or_after) = self.surrounding_observations(intermediate, time, target, tick)?;

        if target == before_or_at.block_timestamp {
            return Ok(before_or_at.tick_cumulative);
        }
        if target == at_or_after.block_timestamp {
            return Ok(at_or_after.tick_cumulative);
        }

        // Interpolation : division AVANT multiplication, tronquée, comme on-chain.
        let observation_time_delta = at_or_after.block_timestamp.wrapping_sub(before_or_at.block_timestamp) as i64;
        let target_delta = target.wrapping_sub(before_or_at.block_timestamp) as i64;
        let slope = at_or_after
            .tick_cumulative
            .wrapping_sub(before_or_at.tick_cumulative)
            .div_trunc(observation_time_delta);

        Ok(before_or_at.tick_cumulative.wrapping_add(slope.wrapping_mul(target_delta)))
    }

    fn observe_many<const N: usize>(
        &self,
        intermediate: &Observation,
        time: u32,
        seconds_agos: [u32; N],
        tick: Tick24,
    ) -> Result<[TickCumulative56; N], OracleError> {
        let mut out = [TickCumulative56::default(); N];
        for (slot, seconds_ago) in out.iter_mut().zip(seconds_agos) {
            *slot = self.observe_single(intermediate, time, seconds_ago, tick)?;
        }
        Ok(out)
    }

    pub fn observe_double(
        &self,
        intermediate: &Observation,
        time: u32,
        seconds_agos: [u32; 2],
        tick: Tick24,
    ) -> Result<[TickCumulative56; 2], OracleError> {
        self.observe_many(intermediate, time, seconds_agos, tick)
    }

    pub fn observe_triple(
        &self,
        intermediate: &Observation,
        time: u32,
        seconds_agos: [u32; 3],
        tick: Tick24,
    ) -> Result<[TickCumulative56; 3], OracleError> {
        self.observe_many(intermediate, time, seconds_agos, tick)
    }
}

/// Tick moyen arithmétique sur `seconds_ago`, arrondi vers -∞ comme `OracleLibrary.consult`.
pub fn arithmetic_mean_tick(
    tick_cumulative_past: TickCumulative56,
    tick_cumulative_now: TickCumulative56,
    seconds_ago: u32,
) -> Result<i32, OracleError> {
    if seconds_ago == 0 {
        return Err(OracleError::ZeroTwapWindow);
    }
    let delta = tick_cumulative_now.wrapping_sub(tick_cumulative_past).get();
    let window = seconds_ago as i64;
    let mut mean = delta / window;
    if delta < 0 && delta % window != 0 {
        mean -= 1;
    }
    Ok(Tick24::wrapping(mean).get())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(v: i32) -> Tick24 {
        Tick24::new(v).unwrap()
    }

    /// Ring initialisé à t=1000 puis une observation toutes les 10s avec un tick constant.
    fn seeded_ring(writes: u32, cardinality_next: u32, t: i32) -> (ObservationRing, Observation) {
        let (mut ring, mut intermediate) = ObservationRing::initialize(1_000, tick(t));
        ring.grow(cardinality_next);
        for n in 1..=writes {
            intermediate = ring.write(&intermediate, 1_000 + n * 10, tick(t), 10).unwrap();
        }
        (ring, intermediate)
    }

    #[test]
    fn write_is_idempotent_within_a_block() {
        let (mut ring, intermediate) = seeded_ring(3, 8, 50);
        let (index, cardinality) = (ring.index, ring.cardinality);

        let again = ring.write(&intermediate, intermediate.block_timestamp, tick(70), 10).unwrap();

        assert_eq!(again, intermediate);
        assert_eq!(ring.index, index);
        assert_eq!(ring.cardinality, cardinality);
    }

    #[test]
    fn write_throttles_below_min_interval() {
        let (mut ring, intermediate) = seeded_ring(1, 8, 50);
        assert_eq!(ring.index, 1);

        let updated = ring.write(&intermediate, intermediate.block_timestamp + 3, tick(50), 10).unwrap();

        assert_eq!(ring.index, 1, "aucun slot ajouté");
        assert_eq!(updated.block_timestamp, intermediate.block_timestamp + 3);
        assert_eq!(updated.tick_cumulative.get(), intermediate.tick_cumulative.get() + 50 * 3);
        assert_eq!(ring.slot(1), intermediate);
    }

    #[test]
    fn cardinality_grows_only_at_the_end_of_the_ring() {
        let (mut ring, mut intermediate) = ObservationRing::initialize(0, tick(0));
        assert_eq!(ring.cardinality, 1);

        ring.grow(3);
        intermediate = ring.write(&intermediate, 10, tick(0), 1).unwrap();
        assert_eq!((ring.index, ring.cardinality), (1, 3));

        intermediate = ring.write(&intermediate, 20, tick(0), 1).unwrap();
        intermediate = ring.write(&intermediate, 30, tick(0), 1).unwrap();
        assert_eq!((ring.index, ring.cardinality), (0, 3), "le ring boucle sur le slot 0");

        // Croissance demandée alors que l'index n'est pas en fin de ring : différée.
        ring.grow(5);
        ring.write(&intermediate, 40, tick(0), 1).unwrap();
        assert_eq!((ring.index, ring.cardinality), (1, 3));
        assert_eq!(ring.grow(2), 5, "cardinality_next ne diminue jamais");
    }

    #[test]
    fn observe_now_extrapolates_from_the_last_write() {
        let (ring, intermediate) = seeded_ring(5, 16, 42);
        let now = intermediate.block_timestamp + 7;

        let observed = ring.observe_single(&intermediate, now, 0, tick(60)).unwrap();

        assert_eq!(observed, transform(&intermediate, now, tick(60)).tick_cumulative);
        assert_eq!(
            ring.observe_single(&intermediate, intermediate.block_timestamp, 0, tick(60)).unwrap(),
            intermediate.tick_cumulative
        );
    }

    #[test]
    fn observe_returns_exact_samples_verbatim() {
        let (ring, intermediate) = seeded_ring(5, 16, 42);
        let now = intermediate.block_timestamp;
        // t = 1020 est un slot écrit : cumul = 42 * 20.
        let observed = ring.observe_single(&intermediate, now, now - 1_020, tick(42)).unwrap();
        assert_eq!(observed.get(), 42 * 20);
    }

    #[test]
    fn observe_interpolates_with_truncating_division() {
        let (mut ring, mut intermediate) = ObservationRing::initialize(0, tick(0));
        ring.grow(4);
        intermediate = ring.write(&intermediate, 3, tick(10), 1).unwrap(); // cumul 30
        intermediate = ring.write(&intermediate, 10, tick(-1), 1).unwrap(); // cumul 30 - 7 = 23
        intermediate = ring.write(&intermediate, 20, tick(0), 1).unwrap(); // cumul 23

        // Cible t=5 entre (3, 30) et (10, 23) : 30 + (-7 / 7) * 2 = 28
        let at_5 = ring.observe_single(&intermediate, 20, 15, tick(0)).unwrap();
        assert_eq!(at_5.get(), 28);

        // Cible t=1 entre (0, 0) et (3, 30) : 0 + (30 / 3) * 1 = 10
        let at_1 = ring.observe_single(&intermediate, 20, 19, tick(0)).unwrap();
        assert_eq!(at_1.get(), 10);
    }

    #[test]
    fn interpolation_divides_before_multiplying() {
        let (mut ring, mut intermediate) = ObservationRing::initialize(0, tick(0));
        ring.grow(4);
        intermediate = ring.write(&intermediate, 4, tick(1), 4).unwrap(); // slot 1 : (4, 4)
        intermediate = ring.write(&intermediate, 5, tick(7), 4).unwrap(); // throttlé : intermédiaire (5, 11)
        intermediate = ring.write(&intermediate, 8, tick(0), 4).unwrap(); // slot 2 : (8, 11)
        assert_eq!(ring.index, 2);

        // Entre (4, 4) et (8, 11) à t=7 : 4 + (7 / 4) * 3 = 7, et non 4 + 21 / 4 = 9.
        let at_7 = ring.observe_single(&intermediate, 8, 1, tick(0)).unwrap();
        assert_eq!(at_7.get(), 7);
    }

    #[test]
    fn observe_between_the_newest_slot_and_a_throttled_intermediate() {
        let (mut ring, mut intermediate) = ObservationRing::initialize(0, tick(10));
        ring.grow(4);
        intermediate = ring.write(&intermediate, 10, tick(10), 10).unwrap(); // slot 1 : (10, 100)
        intermediate = ring.write(&intermediate, 15, tick(10), 10).unwrap(); // throttlé : intermédiaire (15, 150)
        assert_eq!(ring.index, 1);
        assert_eq!(intermediate.tick_cumulative.get(), 150);

        // t=12 : entre le dernier slot et l'intermédiaire, sans recherche dichotomique.
        let at_12 = ring.observe_single(&intermediate, 15, 3, tick(10)).unwrap();
        assert_eq!(at_12.get(), 120);
    }

    #[test]
    fn observe_fails_before_the_oldest_observation() {
        let (ring, intermediate) = seeded_ring(3, 3, 5);
        // Ring plein sur 3 slots : t=1010, 1020, 1030 (t=1000 écrasé).
        let now = intermediate.block_timestamp;
        let err = ring.observe_single(&intermediate, now, now - 1_005, tick(5)).unwrap_err();
        assert_eq!(err, OracleError::TargetPredatesOldestObservation { target: 1_005, oldest: 1_010 });
    }

    #[test]
    fn zero_cardinality_is_fatal() {
        let ring = ObservationRing::default();
        let err = ring.observe_single(&Observation::default(), 10, 0, tick(0)).unwrap_err();
        assert_eq!(err, OracleError::ZeroCardinality);
    }

    #[test]
    fn binary_search_across_a_full_ring() {
        let (ring, intermediate) = seeded_ring(40, 16, 7);
        let now = intermediate.block_timestamp;
        // Les 16 derniers slots couvrent t = 1250..=1400.
        for target in [1_250u32, 1_255, 1_301, 1_339, 1_390] {
            let observed = ring.observe_single(&intermediate, now, now - target, tick(7)).unwrap();
            assert_eq!(observed.get(), 7 * (target as i64 - 1_000), "cible {}", target);
        }
    }

    #[test]
    fn observe_across_the_u32_wraparound() {
        let start = u32::MAX - 25;
        let (mut ring, mut intermediate) = ObservationRing::initialize(start, tick(2));
        ring.grow(8);
        for n in 1..=5u32 {
            intermediate = ring.write(&intermediate, start.wrapping_add(n * 10), tick(2), 10).unwrap();
        }
        let now = intermediate.block_timestamp; // a bouclé : 24
        assert!(now < start);

        // Cible 15s après `start`, avant le débordement.
        let seconds_ago = now.wrapping_sub(start.wrapping_add(15));
        let observed = ring.observe_single(&intermediate, now, seconds_ago, tick(2)).unwrap();
        assert_eq!(observed.get(), 2 * 15);
    }

    #[test]
    fn batch_observations_keep_the_caller_order_and_fail_as_a_whole() {
        let (ring, intermediate) = seeded_ring(5, 16, 3);
        let now = intermediate.block_timestamp;

        let [a, b] = ring.observe_double(&intermediate, now, [20, 0], tick(3)).unwrap();
        assert_eq!(b.get() - a.get(), 3 * 20);

        let triple = ring.observe_triple(&intermediate, now, [0, 10, 50], tick(3)).unwrap();
        assert_eq!(triple.map(|c| c.get()), [150, 120, 0]);

        assert!(ring.observe_triple(&intermediate, now, [0, 10, 500], tick(3)).is_err());
    }

    #[test]
    fn mean_tick_rounds_towards_negative_infinity() {
        let past = TickCumulative56::new(0).unwrap();
        assert_eq!(arithmetic_mean_tick(past, TickCumulative56::new(25).unwrap(), 10).unwrap(), 2);
        assert_eq!(arithmetic_mean_tick(past, TickCumulative56::new(-25).unwrap(), 10).unwrap(), -3);
        assert_eq!(arithmetic_mean_tick(past, TickCumulative56::new(-20).unwrap(), 10).unwrap(), -2);
        assert!(arithmetic_mean_tick(past, past, 0).is_err());
    }
}
