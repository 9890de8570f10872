// DANS : src/monitoring/metrics.rs

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, IntCounterVec, TextEncoder, register_histogram, register_int_counter_vec,
};

lazy_static! {
    // --- Validation des routes ---
    pub static ref ROUTE_VALIDATIONS: IntCounterVec = register_int_counter_vec!(
        "route_validations_total",
        "Résultats des validations de routes",
        &["outcome"] // Labels: "valid", "quota_exceeded", "pool_not_found", "hop_failed", ...
    ).unwrap();

    pub static ref HOP_FAILURES: IntCounterVec = register_int_counter_vec!(
        "route_hop_failures_total",
        "Échecs de simulation d'un hop, par type de pool et raison",
        &["pool_type", "reason"]
    ).unwrap();

    // --- Quotas ---
    pub static ref QUOTA_EXCEEDED: IntCounterVec = register_int_counter_vec!(
        "route_quota_exceeded_total",
        "Routes acceptées malgré un dépassement de quota de volume",
        &["pool_type"]
    ).unwrap();

    // --- Fréquentation des venues ---
    pub static ref POOL_TYPE_HITS: IntCounterVec = register_int_counter_vec!(
        "route_pool_type_hits_total",
        "Nombre de hops simulés par type de pool",
        &["pool_type"]
    ).unwrap();

    // --- Performance & Latence ---
    pub static ref VALIDATION_LATENCY: Histogram = register_histogram!(
        "route_validation_latency_seconds", "Latence d'une validation complète de route (replay + quota)"
    ).unwrap();
}

/// Encode le registre Prometheus par défaut au format texte d'exposition.
pub fn render_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .context("Échec de l'encodage des métriques")?;
    String::from_utf8(buffer).context("Métriques non UTF-8")
}
