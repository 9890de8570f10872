// src/pools/registry.rs

use super::{capped_rate, constant_product, oracle_pmm};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Description statique d'un type de venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueDescriptor {
    pub pool_type: &'static str,
    pub exchange: &'static str,
    pub swap_gas: u64,
    pub metered: bool,
}

lazy_static! {
    // Construit une seule fois, en lecture seule ensuite.
    static ref VENUES: HashMap<&'static str, VenueDescriptor> = {
        let venues = [
            VenueDescriptor {
                pool_type: constant_product::POOL_TYPE,
                exchange: "uniswap-v2",
                swap_gas: constant_product::SWAP_GAS,
                metered: false,
            },
            VenueDescriptor {
                pool_type: capped_rate::POOL_TYPE,
                exchange: "kyber-pmm",
                swap_gas: capped_rate::SWAP_GAS,
                metered: true,
            },
            VenueDescriptor {
                pool_type: oracle_pmm::POOL_TYPE,
                exchange: "bunni-v2",
                swap_gas: oracle_pmm::SWAP_GAS,
                metered: false,
            },
        ];
        venues.into_iter().map(|v| (v.pool_type, v)).collect()
    };
}

pub fn descriptor(pool_type: &str) -> Option<&'static VenueDescriptor> {
    VENUES.get(pool_type)
}

/// Nom de l'exchange pour un type de pool, `"unknown"` si le type n'est pas enregistré.
pub fn exchange_of(pool_type: &str) -> &'static str {
    descriptor(pool_type).map(|v| v.exchange).unwrap_or("unknown")
}

/// Tous les venues enregistrés, triés par type.
pub fn all() -> Vec<&'static VenueDescriptor> {
    let mut venues: Vec<_> = VENUES.values().collect();
    venues.sort_by_key(|v| v.pool_type);
    venues
}
