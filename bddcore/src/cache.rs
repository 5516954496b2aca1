//! Direct-mapped operator caches.
//!
//! Each cache is a flat array indexed by `hash(key) % capacity`; a collision overwrites the
//! existing slot unconditionally rather than chaining, trading a strictly correct "remember
//! everything" cache for O(1) lookups with a bounded footprint, the way BuDDy's `bddcache` and
//! rsdd's apply-table both do it. Correctness only depends on the cache being a *hint*: a miss
//! (even a false one caused by eviction) just means recomputing, never a wrong answer.

use common::prelude::NodeIndex;

/// The ten binary operators, tagged with the stable integer codes the external interface
/// documents (`and=0, xor=1, or=2, nand=3, nor=4, imp=5, biimp=6, diff=7, less=8, invimp=9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    And,
    Xor,
    Or,
    Nand,
    Nor,
    Imp,
    Biimp,
    Diff,
    Less,
    InvImp,
}

impl BinOp {
    pub fn tag(self) -> u64 {
        match self {
            BinOp::And => 0,
            BinOp::Xor => 1,
            BinOp::Or => 2,
            BinOp::Nand => 3,
            BinOp::Nor => 4,
            BinOp::Imp => 5,
            BinOp::Biimp => 6,
            BinOp::Diff => 7,
            BinOp::Less => 8,
            BinOp::InvImp => 9,
        }
    }

    /// Whether swapping the two operands changes nothing, so the `apply` cache can canonicalize
    /// `(f, g)` to a single ordering and double its effective hit rate.
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinOp::And | BinOp::Xor | BinOp::Or | BinOp::Nand | BinOp::Nor | BinOp::Biimp
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot<K, V> {
    key: K,
    value: V,
    occupied: bool,
}

/// A single direct-mapped cache from `K` to `V`. Entries are never evicted except by being
/// overwritten in their own slot or by [`DirectMappedCache::clear`].
pub(crate) struct DirectMappedCache<K, V> {
    slots: Vec<Slot<K, V>>,
    mask: usize,
    /// Times `insert` landed on a slot already occupied by a *different* key — a real collision,
    /// as opposed to refreshing the same key's existing entry.
    overwrites: u64,
}

impl<K, V> DirectMappedCache<K, V>
where
    K: Copy + PartialEq,
    V: Copy,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        DirectMappedCache {
            slots: Vec::new(),
            mask: capacity - 1,
            overwrites: 0,
        }
    }

    fn slot_index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    pub fn get(&self, hash: u64, key: K) -> Option<V> {
        let idx = self.slot_index(hash);
        self.slots
            .get(idx)
            .filter(|s| s.occupied && s.key == key)
            .map(|s| s.value)
    }

    pub fn insert(&mut self, hash: u64, key: K, value: V) {
        let idx = self.slot_index(hash);
        if self.slots.len() <= self.mask {
            self.slots.resize(
                self.mask + 1,
                Slot {
                    key,
                    value,
                    occupied: false,
                },
            );
        }
        if self.slots[idx].occupied && self.slots[idx].key != key {
            self.overwrites += 1;
        }
        self.slots[idx] = Slot {
            key,
            value,
            occupied: true,
        };
    }

    pub fn clear(&mut self) {
        for s in self.slots.iter_mut() {
            s.occupied = false;
        }
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1).next_power_of_two();
        self.mask = capacity - 1;
        self.slots.clear();
    }

    pub fn overwrites(&self) -> u64 {
        self.overwrites
    }

    pub fn reset_overwrites(&mut self) {
        self.overwrites = 0;
    }
}

fn mix(a: u64, b: u64, c: u64) -> u64 {
    let mut h = a.wrapping_mul(0x9E3779B97F4A7C15);
    h = (h ^ b).wrapping_mul(0xBF58476D1CE4E5B9);
    h = (h ^ c).wrapping_mul(0x94D049BB133111EB);
    h ^ (h >> 31)
}

/// Every operator cache a factory keeps, bundled so a GC can clear all of them in one call.
pub(crate) struct OpCaches {
    pub binop: DirectMappedCache<(u64, NodeIndex, NodeIndex), NodeIndex>,
    pub ite: DirectMappedCache<(NodeIndex, NodeIndex, NodeIndex), NodeIndex>,
    pub not: DirectMappedCache<NodeIndex, NodeIndex>,
    pub exist: DirectMappedCache<(NodeIndex, NodeIndex), NodeIndex>,
    pub forall: DirectMappedCache<(NodeIndex, NodeIndex), NodeIndex>,
    pub relprod: DirectMappedCache<(NodeIndex, NodeIndex, NodeIndex), NodeIndex>,
    pub compose: DirectMappedCache<(NodeIndex, NodeIndex, NodeIndex), NodeIndex>,
    pub replace: DirectMappedCache<(NodeIndex, u64), NodeIndex>,
    pub satcount: DirectMappedCache<NodeIndex, u64>,
    pub pathcount: DirectMappedCache<NodeIndex, u64>,
    pub support: DirectMappedCache<NodeIndex, NodeIndex>,
    pub merge: DirectMappedCache<(NodeIndex, NodeIndex), NodeIndex>,
}

impl OpCaches {
    pub fn new(capacity: usize) -> Self {
        OpCaches {
            binop: DirectMappedCache::new(capacity),
            ite: DirectMappedCache::new(capacity),
            not: DirectMappedCache::new(capacity),
            exist: DirectMappedCache::new(capacity),
            forall: DirectMappedCache::new(capacity),
            relprod: DirectMappedCache::new(capacity),
            compose: DirectMappedCache::new(capacity),
            replace: DirectMappedCache::new(capacity),
            satcount: DirectMappedCache::new(capacity),
            pathcount: DirectMappedCache::new(capacity),
            support: DirectMappedCache::new(capacity),
            merge: DirectMappedCache::new(capacity),
        }
    }

    pub fn clear_all(&mut self) {
        self.binop.clear();
        self.ite.clear();
        self.not.clear();
        self.exist.clear();
        self.forall.clear();
        self.relprod.clear();
        self.compose.clear();
        self.replace.clear();
        self.satcount.clear();
        self.pathcount.clear();
        self.support.clear();
        self.merge.clear();
    }

    pub fn total_overwrites(&self) -> u64 {
        self.binop.overwrites()
            + self.ite.overwrites()
            + self.not.overwrites()
            + self.exist.overwrites()
            + self.forall.overwrites()
            + self.relprod.overwrites()
            + self.compose.overwrites()
            + self.replace.overwrites()
            + self.satcount.overwrites()
            + self.pathcount.overwrites()
            + self.support.overwrites()
            + self.merge.overwrites()
    }

    pub fn reset_overwrites(&mut self) {
        self.binop.reset_overwrites();
        self.ite.reset_overwrites();
        self.not.reset_overwrites();
        self.exist.reset_overwrites();
        self.forall.reset_overwrites();
        self.relprod.reset_overwrites();
        self.compose.reset_overwrites();
        self.replace.reset_overwrites();
        self.satcount.reset_overwrites();
        self.pathcount.reset_overwrites();
        self.support.reset_overwrites();
        self.merge.reset_overwrites();
    }

    pub fn resize_all(&mut self, capacity: usize) {
        self.binop.resize(capacity);
        self.ite.resize(capacity);
        self.not.resize(capacity);
        self.exist.resize(capacity);
        self.forall.resize(capacity);
        self.relprod.resize(capacity);
        self.compose.resize(capacity);
        self.replace.resize(capacity);
        self.satcount.resize(capacity);
        self.pathcount.resize(capacity);
        self.support.resize(capacity);
        self.merge.resize(capacity);
    }
}

pub(crate) fn hash2(a: NodeIndex, b: NodeIndex) -> u64 {
    mix(a as u64, b as u64, 0)
}

pub(crate) fn hash3(a: NodeIndex, b: NodeIndex, c: NodeIndex) -> u64 {
    mix(a as u64, b as u64, c as u64)
}

pub(crate) fn hash_tagged(a: NodeIndex, tag: u64) -> u64 {
    mix(a as u64, tag, 0xD1B54A32D192ED03)
}
