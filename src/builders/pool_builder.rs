//! Builders to construct allocation pools from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{FoundryConfig, PoolConfig};
use crate::core::{EventSink, PoolError, ResourceAllocationPool};

/// Build one allocation pool per configured name using the provided sink
/// factory.
///
/// The factory decides where each pool's events go — a shared sink, one sink
/// per pool, or a null sink for pools nobody observes.
pub fn build_pools<F>(
    cfg: &FoundryConfig,
    mut sink_factory: F,
) -> Result<HashMap<String, Arc<ResourceAllocationPool>>, PoolError>
where
    F: FnMut(&str, &PoolConfig) -> Arc<dyn EventSink>,
{
    cfg.validate().map_err(PoolError::Invalid)?;

    let mut pools = HashMap::new();
    for (name, pool_cfg) in &cfg.pools {
        let pool = ResourceAllocationPool::new(sink_factory(name, pool_cfg));
        for (key, capacity) in &pool_cfg.resources {
            pool.define_resource(key, *capacity)?;
        }
        pools.insert(name.clone(), Arc::new(pool));
    }

    Ok(pools)
}
