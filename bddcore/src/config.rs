use crate::error::BddError;

/// Construction-time knobs for a [`crate::factory::BddFactory`].
///
/// Mirrors `JFactory`'s constructor arguments plus the `setCacheRatio`/`setMinFreeNodes`
/// setters: everything a factory needs to size its node table and operator caches is decided
/// once, up front, rather than threaded through every call.
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryConfig {
    /// Initial size of the node array.
    pub node_num: usize,
    /// Size of each operator cache (rounded down to the nearest power of two internally).
    pub cache_size: usize,
    /// Minimum fraction (in percent) of free nodes the table keeps after a GC before it
    /// decides to grow instead of reusing the freed space.
    pub min_free_nodes: usize,
    /// Growth multiplier applied to the node array when it must expand.
    pub increase_factor: f64,
    /// Ratio of node-table size to operator-cache size, used when resizing caches alongside
    /// the node table.
    pub cache_ratio: usize,
    /// Number of variables known at construction time. More can be added later with
    /// `grow_var_num`.
    pub var_num: u32,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        FactoryConfig {
            node_num: 1_000,
            cache_size: 1_000,
            min_free_nodes: 20,
            increase_factor: 2.0,
            cache_ratio: 4,
            var_num: 0,
        }
    }
}

impl FactoryConfig {
    pub fn validate(&self) -> Result<(), BddError> {
        if self.node_num == 0 {
            return Err(BddError::Configuration(
                "node_num must be positive".to_string(),
            ));
        }
        if self.cache_size == 0 {
            return Err(BddError::Configuration(
                "cache_size must be positive".to_string(),
            ));
        }
        if self.min_free_nodes > 100 {
            return Err(BddError::Configuration(
                "min_free_nodes is a percentage and must be <= 100".to_string(),
            ));
        }
        if !(self.increase_factor > 1.0) {
            return Err(BddError::Configuration(
                "increase_factor must be greater than 1.0".to_string(),
            ));
        }
        if self.cache_ratio == 0 {
            return Err(BddError::Configuration(
                "cache_ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
