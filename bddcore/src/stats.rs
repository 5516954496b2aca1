/// Point-in-time counters exposed for diagnostics and tests, not used on any decision path.
///
/// The five `unique_*` fields mirror BuDDy's own unique-table counters: every call into
/// `UniqueTable::make_node` counts as an access, which then resolves to either a hit (hash-cons
/// found an existing node), a miss (a fresh node had to be allocated), or a trivial shortcut
/// (`low == high`, returned without even touching the hash chain). `unique_chain` accumulates
/// the number of collision-chain links walked across all accesses, a rough probe-cost signal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FactoryStats {
    pub node_num: usize,
    pub nodes_used: usize,
    pub nodes_free: usize,
    pub gc_count: u64,
    pub grow_count: u64,
    pub var_num: u32,
    pub reused_nodes: u64,
    pub gc_time: f64,
    pub gc_sumtime: f64,
    pub unique_access: u64,
    pub unique_hit: u64,
    pub unique_miss: u64,
    pub unique_chain: u64,
    pub unique_trivial: u64,
}

/// Per-cache hit/miss/overwrite counters, reset whenever the caches themselves are cleared by a
/// GC (`BddFactory::collect_garbage`), since stale counts against an emptied cache would be
/// misleading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub overwrites: u64,
}

impl CacheStats {
    pub fn record(&mut self, hit: bool) {
        self.lookups += 1;
        if hit {
            self.hits += 1;
        }
    }

    pub fn hit_ratio(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// Snapshot handed to a registered GC handler each time a collection runs, the same
/// `(nodes, freenodes, reusednodes, time, sumtime, num)` tuple BuDDy's `bdd_gbc_hook` callback
/// receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcReport {
    pub nodes: usize,
    pub freenodes: usize,
    pub reusednodes: u64,
    pub time: f64,
    pub sumtime: f64,
    pub num: u64,
}
