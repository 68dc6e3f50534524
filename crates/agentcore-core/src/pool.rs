//! Level-based Executor Pools (§4.5): a fixed `depth -> pool` map so a
//! deeply recursive plan cannot starve shallower plans by hogging a shared
//! pool. Unbounded depth falls back to the deepest configured pool.
//!
//! Tools here run as async tasks on the shared Tokio runtime rather than as
//! OS threads, so "pool" means a `tokio::sync::Semaphore`-gated capacity per
//! depth rather than a dedicated thread pool — the async-native equivalent
//! of the teacher's `rayon` thread pool used for the IPC daemon's concurrent
//! request handling ("fixed capacity per logical unit").

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::PoolConfig;

/// A permit held for the lifetime of one submitted unit of work. Dropping it
/// releases the slot back to its depth's pool.
pub type PoolPermit = OwnedSemaphorePermit;

/// Fixed `depth -> Semaphore` map, built once from `PoolConfig`.
pub struct LevelPools {
    pools: HashMap<u32, Arc<Semaphore>>,
    deepest_configured: u32,
    default_capacity: usize,
}

impl LevelPools {
    pub fn new(config: &PoolConfig) -> Self {
        let mut pools = HashMap::new();
        let mut deepest_configured = 0;
        for (&depth, &capacity) in &config.capacity_by_depth {
            pools.insert(depth, Arc::new(Semaphore::new(capacity.max(1))));
            deepest_configured = deepest_configured.max(depth);
        }
        Self {
            pools,
            deepest_configured,
            default_capacity: config.default_capacity.max(1),
        }
    }

    /// The pool backing `depth`, falling back to the deepest configured pool
    /// for any depth beyond it, and lazily creating a default-capacity pool
    /// for depths with no configured override at all.
    fn pool_for_depth(&self, depth: u32) -> Arc<Semaphore> {
        if let Some(p) = self.pools.get(&depth) {
            return p.clone();
        }
        if depth > self.deepest_configured && !self.pools.is_empty() {
            return self.pools[&self.deepest_configured].clone();
        }
        Arc::new(Semaphore::new(self.default_capacity))
    }

    /// Acquire a slot in the pool for `depth`. A synchronous tool submits
    /// through this before running, so recursion at a single depth cannot
    /// starve a single pool (§5: "Pools are shared across all plans at a
    /// given depth but have independent queues").
    pub async fn acquire(&self, depth: u32) -> PoolPermit {
        self.pool_for_depth(depth)
            .acquire_owned()
            .await
            .expect("pool semaphore never closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(default_capacity: usize, overrides: &[(u32, usize)]) -> PoolConfig {
        PoolConfig {
            default_capacity,
            capacity_by_depth: overrides.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn falls_back_to_deepest_configured_pool() {
        let cfg = config_with(4, &[(0, 1), (1, 2)]);
        let pools = LevelPools::new(&cfg);
        // depth 5 has no override; falls back to depth 1's pool (the deepest configured).
        let _permit = pools.acquire(5).await;
    }

    #[tokio::test]
    async fn depth_zero_pool_gates_concurrency() {
        let cfg = config_with(1, &[(0, 1)]);
        let pools = LevelPools::new(&cfg);
        let permit = pools.acquire(0).await;
        assert_eq!(pools.pool_for_depth(0).available_permits(), 0);
        drop(permit);
        assert_eq!(pools.pool_for_depth(0).available_permits(), 1);
    }
}
