// src/validation/bucket.rs

use crate::pools::PoolSimulator;
use crate::state::PoolMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Surcouche copy-on-write d'un snapshot de pools, le temps d'un replay.
///
/// Le premier hop qui modifie un pool le clone ; toutes les lectures suivantes de cette adresse,
/// y compris depuis un autre chemin de la même route, voient ce clone modifié.
/// Le snapshot partagé n'est jamais touché.
pub struct PoolBucket<'a, P> {
    shared: &'a PoolMap<P>,
    cloned: HashMap<String, P>,
}

impl<'a, P: PoolSimulator> PoolBucket<'a, P> {
    pub fn new(shared: &'a PoolMap<P>) -> Self {
        Self { shared, cloned: HashMap::new() }
    }

    /// Le clone s'il existe, sinon la version partagée.
    pub fn get(&self, address: &str) -> Option<&P> {
        self.cloned
            .get(address)
            .or_else(|| self.shared.get(address).map(Arc::as_ref))
    }

    /// Clone le pool à la première demande, puis rend toujours le même clone.
    pub fn clone_pool(&mut self, address: &str) -> Option<&mut P> {
        if !self.cloned.contains_key(address) {
            let pool = P::clone(self.shared.get(address)?);
            self.cloned.insert(address.to_string(), pool);
        }
        self.cloned.get_mut(address)
    }

    pub fn cloned_count(&self) -> usize {
        self.cloned.len()
    }

    /// Les pools modifiés pendant le replay, pour enchaîner une cotation sur l'état post-trade.
    pub fn into_updated_pools(self) -> HashMap<String, P> {
        self.cloned
    }
}
