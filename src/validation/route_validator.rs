// src/validation/route_validator.rs

use super::bucket::PoolBucket;
use super::route::{Route, RouteSummary, SwapSummary};
use crate::math::U256;
use crate::monitoring::metrics::{
    HOP_FAILURES, POOL_TYPE_HITS, QUOTA_EXCEEDED, ROUTE_VALIDATIONS, VALIDATION_LATENCY,
};
use crate::pools::{registry, PoolError, PoolSimulator, UpdateBalanceParams};
use crate::state::{MeterError, PoolMap, PoolStateCache, VolumeMeter, VolumeWindow};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Coût fixe d'une transaction de swap, avant les hops.
pub const BASE_GAS: u64 = 125_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Route sans aucun chemin")]
    EmptyRoute,
    #[error("Chemin {path} invalide : {reason}")]
    InvalidPath { path: usize, reason: String },
    #[error("Pool {address} introuvable dans le snapshot")]
    PoolNotFound { address: String },
    #[error("Échec du swap au hop {hop} du chemin {path} (pool {pool}) : {source}")]
    HopCalculationFailed {
        pool: String,
        path: usize,
        hop: usize,
        #[source]
        source: PoolError,
    },
    #[error("Montant de sortie nul au hop {hop} du chemin {path} (pool {pool})")]
    NonPositiveOutput { pool: String, path: usize, hop: usize },
    #[error(transparent)]
    Meter(#[from] MeterError),
}

impl ValidationError {
    /// Label court pour les métriques.
    pub fn outcome(&self) -> &'static str {
        match self {
            ValidationError::EmptyRoute => "empty_route",
            ValidationError::InvalidPath { .. } => "invalid_path",
            ValidationError::PoolNotFound { .. } => "pool_not_found",
            ValidationError::HopCalculationFailed { .. } => "hop_failed",
            ValidationError::NonPositiveOutput { .. } => "non_positive_output",
            ValidationError::Meter(MeterError::MissingBaselineRecord { .. }) => "missing_baseline",
            ValidationError::Meter(_) => "meter",
        }
    }
}

/// Fenêtre de quota d'un venue mesuré traversé par la route, relevée à son premier passage.
struct MeteredWindow {
    pool: String,
    pool_type: &'static str,
    window: VolumeWindow,
}

/// Rejoue chaque chemin d'une route hop par hop sur un snapshot figé, sans jamais le modifier.
///
/// Retourne le résumé, la fenêtre de quota de chaque venue mesuré traversé et les pools modifiés.
fn replay_route<P: PoolSimulator>(
    pools: &PoolMap<P>,
    route: &Route,
) -> Result<(RouteSummary, Vec<MeteredWindow>, HashMap<String, P>), ValidationError> {
    if route.paths.is_empty() {
        return Err(ValidationError::EmptyRoute);
    }

    let mut bucket = PoolBucket::new(pools);
    let mut gas = BASE_GAS;
    let mut amount_in_total = U256::zero();
    let mut amount_out_total = U256::zero();
    let mut metered_volume = U256::zero();
    let mut metered_windows: Vec<MeteredWindow> = Vec::new();
    let mut summarized_route = Vec::with_capacity(route.paths.len());

    for (path_idx, path) in route.paths.iter().enumerate() {
        if let Some(reason) = path.shape_error(route) {
            return Err(ValidationError::InvalidPath { path: path_idx, reason });
        }

        let mut summarized_path = Vec::with_capacity(path.pool_addresses.len());
        let mut token_amount_in = path.input.clone();
        amount_in_total = amount_in_total.saturating_add(token_amount_in.amount);

        for (hop, address) in path.pool_addresses.iter().enumerate() {
            let token_out = &path.tokens[hop + 1];

            // Étape 1 : le pool le plus frais (clone de la route, sinon snapshot)
            let pool = bucket
                .get(address)
                .ok_or_else(|| ValidationError::PoolNotFound { address: address.clone() })?;
            let pool_type = pool.pool_type();

            // Étape 2 : simulation du swap
            let result = pool.calc_amount_out(&token_amount_in, token_out).map_err(|source| {
                HOP_FAILURES.with_label_values(&[pool_type, source.reason()]).inc();
                ValidationError::HopCalculationFailed { pool: address.clone(), path: path_idx, hop, source }
            })?;
            if result.token_amount_out.amount.is_zero() {
                HOP_FAILURES.with_label_values(&[pool_type, "zero_output"]).inc();
                return Err(ValidationError::NonPositiveOutput { pool: address.clone(), path: path_idx, hop });
            }

            // Étape 3 : volume mesuré, lu AVANT la mise à jour du pool
            if let Some(metered) = pool.as_metered() {
                if let Some(volume) = metered.metered_volume(&token_amount_in, token_out).filter(|v| !v.is_zero()) {
                    metered_volume = metered_volume.saturating_add(volume);
                    if !metered_windows.iter().any(|w| w.pool == *address) {
                        metered_windows.push(MeteredWindow {
                            pool: address.clone(),
                            pool_type,
                            window: metered.volume_window(),
                        });
                    }
                }
            }

            debug!(
                path = path_idx,
                hop,
                pool = %address,
                pool_type,
                amount_in = %token_amount_in.amount,
                amount_out = %result.token_amount_out.amount,
                "Hop rejoué"
            );

            let swap = SwapSummary {
                pool: address.clone(),
                pool_type: pool_type.to_string(),
                exchange: registry::exchange_of(pool_type).to_string(),
                token_in: token_amount_in.token.clone(),
                token_out: result.token_amount_out.token.clone(),
                amount_in: token_amount_in.amount,
                amount_out: result.token_amount_out.amount,
                fee: result.fee.clone(),
            };

            // Étape 4 : on clone avant de modifier (le snapshot partagé reste intact)
            let next_amount_in = result.token_amount_out.clone();
            gas = gas.saturating_add(result.gas);
            if let Some(mutated) = bucket.clone_pool(address) {
                mutated.update_balance(UpdateBalanceParams {
                    token_amount_in,
                    token_amount_out: result.token_amount_out,
                    fee: result.fee,
                    swap_info: result.swap_info,
                });
            }

            POOL_TYPE_HITS.with_label_values(&[pool_type]).inc();
            summarized_path.push(swap);

            // Étape 5 : la sortie de ce hop est l'entrée du suivant
            token_amount_in = next_amount_in;
        }

        amount_out_total = amount_out_total.saturating_add(token_amount_in.amount);
        summarized_route.push(summarized_path);
    }

    let summary = RouteSummary {
        token_in: route.token_in.clone(),
        token_out: route.token_out.clone(),
        amount_in: amount_in_total,
        amount_out: amount_out_total,
        gas,
        metered_volume,
        quota_exceeded: false,
        route: summarized_route,
    };

    debug!(cloned = bucket.cloned_count(), metered_venues = metered_windows.len(), "Replay terminé");
    Ok((summary, metered_windows, bucket.into_updated_pools()))
}

/// Validation des routes contre le snapshot courant des pools et les quotas de volume.
pub struct RouteValidator<P> {
    cache: Arc<PoolStateCache<P>>,
    meter: Arc<VolumeMeter>,
}

impl<P: PoolSimulator> RouteValidator<P> {
    pub fn new(cache: Arc<PoolStateCache<P>>, meter: Arc<VolumeMeter>) -> Self {
        Self { cache, meter }
    }

    pub fn cache(&self) -> &Arc<PoolStateCache<P>> {
        &self.cache
    }

    pub fn validate(&self, route: &Route) -> Result<RouteSummary, ValidationError> {
        self.validate_with_state(route).map(|(summary, _)| summary)
    }

    /// Comme [`RouteValidator::validate`], en rendant aussi les pools dans leur état post-trade.
    /// Ces pools ne sont jamais réécrits dans le cache.
    #[instrument(skip_all, fields(token_in = %route.token_in, token_out = %route.token_out, paths = route.paths.len()))]
    pub fn validate_with_state(
        &self,
        route: &Route,
    ) -> Result<(RouteSummary, HashMap<String, P>), ValidationError> {
        let timer = VALIDATION_LATENCY.start_timer();
        // Un seul chargement du snapshot pour toute la route.
        let snapshot = self.cache.snapshot();
        let result = replay_route(&snapshot, route).and_then(|(mut summary, windows, updated)| {
            Self::apply_volume_check(&mut summary, &windows)?;
            Ok((summary, updated))
        });
        timer.observe_duration();

        match &result {
            Ok((summary, _)) => {
                let outcome = if summary.quota_exceeded { "quota_exceeded" } else { "valid" };
                ROUTE_VALIDATIONS.with_label_values(&[outcome]).inc();
                info!(
                    amount_out = %summary.amount_out,
                    gas = summary.gas,
                    metered_volume = %summary.metered_volume,
                    quota_exceeded = summary.quota_exceeded,
                    "Route validée"
                );
            }
            Err(e) => {
                ROUTE_VALIDATIONS.with_label_values(&[e.outcome()]).inc();
                warn!(error = %e, "Route rejetée");
            }
        }
        result
    }

    /// Le volume mesuré total de la route est confronté à la fenêtre de chaque venue mesuré.
    ///
    /// Le dépassement de quota n'invalide pas la route : il est signalé et compté.
    /// L'absence de relevé de volume sur un seul de ces venues, elle, la rejette.
    fn apply_volume_check(summary: &mut RouteSummary, windows: &[MeteredWindow]) -> Result<(), ValidationError> {
        let checks: Vec<(&MeteredWindow, Result<(), MeterError>)> = windows
            .iter()
            .map(|m| {
                let w = &m.window;
                (m, VolumeMeter::check(w.block_timestamp, summary.metered_volume, w.cap, w.baseline.as_ref()))
            })
            .collect();

        // Les rejets passent avant tout signalement.
        if let Some(hard) = checks.iter().find_map(|(_, r)| match r {
            Err(MeterError::QuotaExceeded { .. }) | Ok(()) => None,
            Err(e) => Some(e.clone()),
        }) {
            return Err(hard.into());
        }

        for (metered, check) in checks {
            if let Err(e) = check {
                warn!(pool = %metered.pool, pool_type = metered.pool_type, error = %e, "Quota de volume dépassé, route conservée");
                QUOTA_EXCEEDED.with_label_values(&[metered.pool_type]).inc();
                summary.quota_exceeded = true;
            }
        }
        Ok(())
    }

    /// Quota restant pour une période (copie).
    pub fn get_limit(&self, period: u32) -> U256 {
        self.meter.get_limit(period)
    }

    /// Consomme du quota sur une période. Retourne `(restant, consommé)`.
    pub fn update_limit(&self, period: u32, delta: U256) -> Result<(U256, U256), MeterError> {
        self.meter.update_limit(period, delta)
    }
}
