// src/bin/replay_runner.rs

use anyhow::{anyhow, Context, Result};
use route_replay::{
    config::Config,
    math::U256,
    monitoring::{logging::setup_logging, render_metrics},
    pools::{registry, Pool},
    state::{volume_meter::LimitsSnapshot, PoolStateCache, VolumeMeter},
    validation::{Route, RouteValidator},
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

fn read_json<T: DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Lecture de {} impossible ({})", what, path))?;
    serde_json::from_str(&raw).with_context(|| format!("{} invalide ({})", what, path))
}

fn main() -> Result<()> {
    let config = Config::load()?;
    setup_logging(config.log_json);

    for venue in registry::all() {
        info!(
            pool_type = venue.pool_type,
            exchange = venue.exchange,
            swap_gas = venue.swap_gas,
            metered = venue.metered,
            "Venue enregistré"
        );
    }

    // --- 1. Chargement de l'état ---
    let pools: Vec<Pool> = read_json(&config.pool_snapshot_path, "snapshot de pools")?;
    let route: Route = read_json(&config.route_path, "route")?;
    let limits: HashMap<u32, U256> = match &config.volume_limits_path {
        Some(path) => read_json::<LimitsSnapshot>(path, "quotas de volume")?.into(),
        None => HashMap::new(),
    };
    info!(pools = pools.len(), periods = limits.len(), "État chargé");

    let cache = Arc::new(PoolStateCache::new(pools));
    let meter = Arc::new(VolumeMeter::new(limits));
    let validator = RouteValidator::new(cache, meter);

    // --- 2. Replay ---
    let outcome = validator.validate(&route);
    match &outcome {
        Ok(summary) => {
            let rendered = serde_json::to_string_pretty(summary)?;
            println!("{}", rendered);
        }
        Err(e) => {
            error!(error = %e, "La route ne passe pas la validation");
        }
    }

    // --- 3. Métriques du run ---
    println!("{}", render_metrics()?);

    // Code de sortie non nul si la route est rejetée.
    outcome.map(|_| ()).map_err(|e| anyhow!(e).context("Route rejetée"))
}
