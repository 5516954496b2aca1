use std::hash::BuildHasherDefault;
use wyhash::WyHash;

/// Index of a node inside a factory's node array.
///
/// Stable for the lifetime of the node: garbage collection may recycle the slot of a *dead*
/// node, but a *live* node (reachable from some refcounted handle) never moves.
pub type NodeIndex = u32;

/// Stable identity of a variable, assigned in increasing order as `varNum` grows.
pub type VarId = u32;

/// Position of a variable in the (fixed) variable order.
///
/// This crate does not perform dynamic variable reordering, so `level(v) == v` for the whole
/// lifetime of a factory; the two types are kept distinct anyway so a reordering pass could be
/// added later without changing every call site that means "level" into one that means "var".
pub type Level = u32;

pub type BddHashMap<T, U> = std::collections::HashMap<T, U, BuildHasherDefault<WyHash>>;
pub type BddHashSet<T> = std::collections::HashSet<T, BuildHasherDefault<WyHash>>;
