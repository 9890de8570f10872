// src/state/pool_cache.rs

use crate::pools::PoolSimulator;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub type PoolMap<P> = HashMap<String, Arc<P>>;

/// Cache partagé des pools, publié en bloc par le pipeline de tracking.
///
/// Un lecteur charge un instantané (`Arc`) et le garde pour toute sa durée :
/// un rafraîchissement concurrent ne l'affecte jamais, et personne n'écrit dans un instantané publié.
pub struct PoolStateCache<P> {
    pools: ArcSwap<PoolMap<P>>,
}

impl<P: PoolSimulator> Default for PoolStateCache<P> {
    fn default() -> Self {
        Self { pools: ArcSwap::from_pointee(HashMap::new()) }
    }
}

impl<P: PoolSimulator> PoolStateCache<P> {
    pub fn new(pools: impl IntoIterator<Item = P>) -> Self {
        let cache = Self::default();
        cache.replace(pools);
        cache
    }

    /// Retourne un instantané (`Arc`) de la table courante.
    pub fn snapshot(&self) -> Arc<PoolMap<P>> {
        self.pools.load_full()
    }

    /// Publie une nouvelle table complète.
    pub fn replace(&self, pools: impl IntoIterator<Item = P>) {
        let map: PoolMap<P> = pools
            .into_iter()
            .map(|p| (p.address().to_string(), Arc::new(p)))
            .collect();
        info!(pool_count = map.len(), "Nouveau snapshot de pools publié");
        self.pools.store(Arc::new(map));
    }

    pub fn len(&self) -> usize {
        self.pools.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
