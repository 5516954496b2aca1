//! The array-backed unique table: hash-consing storage for BDD nodes, with mark-and-sweep
//! garbage collection and growth.
//!
//! Nodes live in a flat array with in-place bucket chaining (`hash_next`) and a free-list
//! threaded through dead slots, the way `rsdd`'s backing store and real BuDDy-family
//! implementations do it: no separate hash map allocation, and GC can reclaim a slot without
//! touching anything but the array itself.

use common::prelude::{BddHashSet, Level, NodeIndex, VarId};

use crate::error::BddError;
use crate::stats::{FactoryStats, GcReport};

pub const ZERO: NodeIndex = 0;
pub const ONE: NodeIndex = 1;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    pub var: VarId,
    pub low: NodeIndex,
    pub high: NodeIndex,
    pub refcount: u32,
    pub hash_next: NodeIndex,
    pub mark: bool,
}

const NIL: NodeIndex = NodeIndex::MAX;

impl Node {
    fn dead() -> Self {
        Node {
            var: 0,
            low: NIL,
            high: NIL,
            refcount: 0,
            hash_next: NIL,
            mark: false,
        }
    }

    fn is_terminal(&self) -> bool {
        self.low == NIL && self.high == NIL
    }
}

/// The array of nodes plus its hash-consing index, free-list, and GC bookkeeping.
pub(crate) struct UniqueTable {
    nodes: Vec<Node>,
    /// Hash bucket heads; `buckets.len()` is always a power of two.
    buckets: Vec<NodeIndex>,
    free_head: NodeIndex,
    free_count: usize,
    var_num: u32,
    min_free_nodes: usize,
    increase_factor: f64,
    /// Nodes referenced by an in-flight recursive operation but not yet attached to any
    /// refcounted handle. Scanned as extra GC roots alongside `refcount > 0` nodes, the same
    /// technique BuDDy uses internally (a small explicit stack of "protected" results) to keep
    /// a GC triggered by `make_node` from collecting its own caller's intermediate results.
    gc_protect: Vec<NodeIndex>,
    pub gc_count: u64,
    pub grow_count: u64,
    /// Set whenever `grow` runs, cleared by `take_grew`; lets the factory notice a node-table
    /// grow happened so it can resize the operator caches proportionally.
    grew: bool,
    /// Set whenever `collect` runs, cleared by `take_gc_report`; lets the factory notify a
    /// registered GC handler even when the collection was triggered automatically from inside
    /// `allocate` rather than via an explicit `collect_garbage` call.
    gc_happened: bool,
    gc_time: f64,
    gc_sumtime: f64,
    unique_access: u64,
    unique_hit: u64,
    unique_miss: u64,
    unique_chain: u64,
    unique_trivial: u64,
}

impl UniqueTable {
    pub fn new(node_num: usize, var_num: u32, min_free_nodes: usize, increase_factor: f64) -> Self {
        let node_num = node_num.max(4);
        let mut nodes = Vec::with_capacity(node_num);
        nodes.push(Node::dead()); // ZERO
        nodes.push(Node::dead()); // ONE
        let bucket_len = node_num.next_power_of_two();
        let mut table = UniqueTable {
            nodes,
            buckets: vec![NIL; bucket_len],
            free_head: NIL,
            free_count: 0,
            var_num,
            min_free_nodes,
            increase_factor,
            gc_protect: Vec::new(),
            gc_count: 0,
            grow_count: 0,
            grew: false,
            gc_happened: false,
            gc_time: 0.0,
            gc_sumtime: 0.0,
            unique_access: 0,
            unique_hit: 0,
            unique_miss: 0,
            unique_chain: 0,
            unique_trivial: 0,
        };
        while table.nodes.len() < node_num {
            table.push_free(table.nodes.len() as NodeIndex);
        }
        table
    }

    pub fn var_num(&self) -> u32 {
        self.var_num
    }

    pub fn node_num(&self) -> usize {
        self.nodes.len()
    }

    /// Reports (and clears) whether `grow` ran since the last check.
    pub fn take_grew(&mut self) -> bool {
        std::mem::replace(&mut self.grew, false)
    }

    /// Reports (and clears) the most recent GC's stats, if one happened since the last check.
    pub fn take_gc_report(&mut self) -> Option<GcReport> {
        if std::mem::replace(&mut self.gc_happened, false) {
            Some(GcReport {
                nodes: self.nodes.len(),
                freenodes: self.free_count,
                reusednodes: self.unique_hit,
                time: self.gc_time,
                sumtime: self.gc_sumtime,
                num: self.gc_count,
            })
        } else {
            None
        }
    }

    pub fn reset_op_counters(&mut self) {
        self.unique_access = 0;
        self.unique_hit = 0;
        self.unique_miss = 0;
        self.unique_chain = 0;
        self.unique_trivial = 0;
    }

    pub fn grow_var_num(&mut self, new_var_num: u32) -> Result<(), BddError> {
        if new_var_num < self.var_num {
            return Err(BddError::Configuration(format!(
                "varNum cannot shrink from {} to {new_var_num}",
                self.var_num
            )));
        }
        self.var_num = new_var_num;
        Ok(())
    }

    pub fn is_var(&self, index: NodeIndex) -> bool {
        index != ZERO && index != ONE && (index as usize) < self.nodes.len() && !self.nodes[index as usize].is_terminal()
    }

    pub fn var_of(&self, index: NodeIndex) -> Option<VarId> {
        self.node(index).map(|n| n.var)
    }

    pub fn low(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.node(index).filter(|n| !n.is_terminal()).map(|n| n.low)
    }

    pub fn high(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.node(index).filter(|n| !n.is_terminal()).map(|n| n.high)
    }

    pub fn level(&self, index: NodeIndex) -> Level {
        match self.node(index) {
            Some(n) if !n.is_terminal() => n.var,
            _ => self.var_num,
        }
    }

    fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index as usize)
    }

    pub fn incref(&mut self, index: NodeIndex) {
        if index == ZERO || index == ONE {
            return;
        }
        if let Some(n) = self.nodes.get_mut(index as usize) {
            n.refcount = n.refcount.saturating_add(1);
        }
    }

    pub fn decref(&mut self, index: NodeIndex) {
        if index == ZERO || index == ONE {
            return;
        }
        if let Some(n) = self.nodes.get_mut(index as usize) {
            debug_assert!(n.refcount > 0, "refcount underflow on node {index}");
            n.refcount = n.refcount.saturating_sub(1);
        }
    }

    /// Pushes `index` onto the protect stack, returning the stack depth before the push so the
    /// caller can pop back to it. Used to guard a freshly built node's children from being
    /// collected by a GC triggered deeper in the same recursive call.
    pub fn protect(&mut self, index: NodeIndex) -> usize {
        let depth = self.gc_protect.len();
        if index != ZERO && index != ONE {
            self.gc_protect.push(index);
        }
        depth
    }

    pub fn unprotect_to(&mut self, depth: usize) {
        self.gc_protect.truncate(depth);
    }

    pub fn protect_depth(&self) -> usize {
        self.gc_protect.len()
    }

    fn hash(var: VarId, low: NodeIndex, high: NodeIndex, buckets_len: usize) -> usize {
        let mut h = var as u64;
        h = h.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(low as u64);
        h = h.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(high as u64);
        (h as usize) & (buckets_len - 1)
    }

    /// Finds or creates the node `(var, low, high)`, hash-consed against every other live node
    /// with the same key. Applies the reduction rule (`low == high` collapses to `low`, with no
    /// node created) before even touching the hash chain.
    pub fn make_node(&mut self, var: VarId, low: NodeIndex, high: NodeIndex) -> Result<NodeIndex, BddError> {
        self.unique_access += 1;
        if low == high {
            self.unique_trivial += 1;
            return Ok(low);
        }

        let bucket = Self::hash(var, low, high, self.buckets.len());
        let mut cursor = self.buckets[bucket];
        while cursor != NIL {
            let n = &self.nodes[cursor as usize];
            if n.var == var && n.low == low && n.high == high {
                self.unique_hit += 1;
                return Ok(cursor);
            }
            self.unique_chain += 1;
            cursor = n.hash_next;
        }
        self.unique_miss += 1;

        let index = self.allocate(var, low, high)?;
        let bucket = Self::hash(var, low, high, self.buckets.len());
        self.nodes[index as usize].hash_next = self.buckets[bucket];
        self.buckets[bucket] = index;
        Ok(index)
    }

    fn allocate(&mut self, var: VarId, low: NodeIndex, high: NodeIndex) -> Result<NodeIndex, BddError> {
        if self.free_head == NIL {
            self.try_reclaim_or_grow(low, high)?;
        }
        let index = self.free_head;
        let next_free = self.nodes[index as usize].hash_next;
        self.free_head = next_free;
        self.free_count -= 1;
        self.nodes[index as usize] = Node {
            var,
            low,
            high,
            refcount: 0,
            hash_next: NIL,
            mark: false,
        };
        Ok(index)
    }

    fn try_reclaim_or_grow(&mut self, protect_low: NodeIndex, protect_high: NodeIndex) -> Result<(), BddError> {
        let before = self.free_count;
        self.gc_protect.push(protect_low);
        self.gc_protect.push(protect_high);
        self.collect();
        self.gc_protect.pop();
        self.gc_protect.pop();

        let min_required = self.nodes.len() * self.min_free_nodes / 100;
        if self.free_count <= before || self.free_count < min_required.max(1) {
            self.grow()?;
        }
        if self.free_head == NIL {
            return Err(BddError::OutOfMemory {
                attempted_nodes: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// Mark-and-sweep collection: roots are every node with `refcount > 0` plus every node on
    /// the protect stack. Clears the hash buckets and rebuilds them as it sweeps so dead nodes
    /// never shadow a live one's chain.
    pub fn collect(&mut self) {
        let start = std::time::Instant::now();
        self.gc_count += 1;
        log::debug!(
            "garbage collecting unique table: {} nodes in use before sweep",
            self.nodes.len() - self.free_count - 2
        );

        for n in self.nodes.iter_mut() {
            n.mark = false;
        }

        let mut stack: Vec<NodeIndex> = self
            .nodes
            .iter()
            .enumerate()
            .skip(2)
            .filter(|(_, n)| n.refcount > 0)
            .map(|(i, _)| i as NodeIndex)
            .collect();
        stack.extend(self.gc_protect.iter().copied());

        while let Some(index) = stack.pop() {
            if index == ZERO || index == ONE {
                continue;
            }
            let n = &mut self.nodes[index as usize];
            if n.mark {
                continue;
            }
            n.mark = true;
            let (low, high) = (n.low, n.high);
            stack.push(low);
            stack.push(high);
        }

        for b in self.buckets.iter_mut() {
            *b = NIL;
        }
        self.free_head = NIL;
        self.free_count = 0;

        for index in (2..self.nodes.len() as NodeIndex).rev() {
            let live = self.nodes[index as usize].mark;
            if live {
                let (var, low, high) = {
                    let n = &self.nodes[index as usize];
                    (n.var, n.low, n.high)
                };
                let bucket = Self::hash(var, low, high, self.buckets.len());
                self.nodes[index as usize].hash_next = self.buckets[bucket];
                self.buckets[bucket] = index;
            } else {
                self.push_free(index);
            }
        }

        log::debug!(
            "garbage collection finished: {} nodes freed, {} still live",
            self.free_count,
            self.nodes.len() - self.free_count - 2
        );

        let elapsed = start.elapsed().as_secs_f64();
        self.gc_time = elapsed;
        self.gc_sumtime += elapsed;
        self.gc_happened = true;
    }

    fn push_free(&mut self, index: NodeIndex) {
        self.nodes[index as usize] = Node::dead();
        self.nodes[index as usize].hash_next = self.free_head;
        self.free_head = index;
        self.free_count += 1;
    }

    fn grow(&mut self) -> Result<(), BddError> {
        let old_len = self.nodes.len();
        let new_len = ((old_len as f64) * self.increase_factor).ceil() as usize;
        let new_len = new_len.max(old_len + 1);
        self.grow_count += 1;
        self.grew = true;
        log::info!("growing node table from {old_len} to {new_len} slots");

        self.nodes.reserve(new_len - old_len);
        for index in old_len..new_len {
            self.nodes.push(Node::dead());
            self.push_free(index as NodeIndex);
        }

        let new_bucket_len = new_len.next_power_of_two();
        if new_bucket_len > self.buckets.len() {
            self.buckets = vec![NIL; new_bucket_len];
            // Rebuild chains for every currently-live node (free ones were already re-threaded
            // onto the free list above and must not be reinserted into the hash chains).
            let mut live_indices = Vec::new();
            for index in 2..old_len as NodeIndex {
                if !self.is_on_free_list(index) {
                    live_indices.push(index);
                }
            }
            for index in live_indices {
                let n = self.nodes[index as usize];
                let bucket = Self::hash(n.var, n.low, n.high, self.buckets.len());
                self.nodes[index as usize].hash_next = self.buckets[bucket];
                self.buckets[bucket] = index;
            }
        }
        Ok(())
    }

    fn is_on_free_list(&self, target: NodeIndex) -> bool {
        let mut cursor = self.free_head;
        while cursor != NIL {
            if cursor == target {
                return true;
            }
            cursor = self.nodes[cursor as usize].hash_next;
        }
        false
    }

    pub fn stats(&self) -> FactoryStats {
        FactoryStats {
            node_num: self.nodes.len(),
            nodes_used: self.nodes.len() - self.free_count - 2,
            nodes_free: self.free_count,
            gc_count: self.gc_count,
            grow_count: self.grow_count,
            var_num: self.var_num,
            reused_nodes: self.unique_hit,
            gc_time: self.gc_time,
            gc_sumtime: self.gc_sumtime,
            unique_access: self.unique_access,
            unique_hit: self.unique_hit,
            unique_miss: self.unique_miss,
            unique_chain: self.unique_chain,
            unique_trivial: self.unique_trivial,
        }
    }

    /// Every live non-terminal node reachable from `roots`, used by `support`/`dot`/node-count
    /// style walks that must not mutate GC state.
    pub fn reachable(&self, roots: &[NodeIndex]) -> BddHashSet<NodeIndex> {
        let mut visited = BddHashSet::default();
        let mut stack: Vec<NodeIndex> = roots.to_vec();
        while let Some(index) = stack.pop() {
            if index == ZERO || index == ONE {
                continue;
            }
            if !visited.insert(index) {
                continue;
            }
            if let Some(n) = self.node(index) {
                stack.push(n.low);
                stack.push(n.high);
            }
        }
        visited
    }
}
