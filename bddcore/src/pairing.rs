//! Variable pairings: the substitution maps consumed by `replace`/`compose`.
//!
//! A pairing starts life mutable (entries added one at a time via `set`), then is frozen and
//! installed into a factory, at which point it gets a stable small-integer identity used both
//! as an operator-cache key and for de-duplication: two pairings built independently with the
//! same entries collapse to the same id, the way BuDDy's `bdd_setpair`/pair cache does, so that
//! `replace` calls against "the same" substitution keep hitting the same cache slots.

use common::prelude::{BddHashMap, NodeIndex, VarId};

use crate::error::BddError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PairTarget {
    Var(VarId),
    Bdd(NodeIndex),
}

pub type PairingId = u32;

/// A pairing under construction. Not yet given an identity; see
/// [`crate::factory::BddFactory::freeze_and_install`].
#[derive(Debug, Clone, Default)]
pub struct PairingBuilder {
    entries: BddHashMap<VarId, PairTarget>,
}

impl PairingBuilder {
    pub fn new() -> Self {
        PairingBuilder::default()
    }

    pub fn set(&mut self, old: VarId, target: PairTarget) {
        self.entries.insert(old, target);
    }

    pub fn set_var(&mut self, old: VarId, new: VarId) {
        self.set(old, PairTarget::Var(new));
    }

    pub fn set_bdd(&mut self, old: VarId, new: NodeIndex) {
        self.set(old, PairTarget::Bdd(new));
    }

    pub fn set_all(&mut self, pairs: &[(VarId, PairTarget)]) -> Result<(), BddError> {
        for &(old, target) in pairs {
            self.set(old, target);
        }
        Ok(())
    }

    /// Canonical, sorted-by-`old` entry list: the form used both as the dedup key and as the
    /// stored representation once frozen.
    pub(crate) fn canonicalize(&self) -> Vec<(VarId, PairTarget)> {
        let mut entries: Vec<(VarId, PairTarget)> = self.entries.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_by_key(|(old, _)| *old);
        entries
    }
}

/// A frozen, installed pairing, stored by the factory and referenced by id.
#[derive(Debug, Clone)]
pub(crate) struct InstalledPairing {
    pub entries: Vec<(VarId, PairTarget)>,
}

impl InstalledPairing {
    fn new(entries: Vec<(VarId, PairTarget)>) -> Self {
        InstalledPairing { entries }
    }
}

/// Whether `entries`, extended with an implicit identity mapping for every declared variable
/// `entries` doesn't mention, is safe for `replace`'s fast rename path: no two variables may
/// change their relative order, the restriction BuDDy's `bdd_replace` documents.
///
/// Checking only the pairwise order of the *explicit* entries isn't enough — a variable left
/// unmapped keeps its own position, and an explicit entry can still jump past it. So this walks
/// every variable in `0..var_num`, substituting the identity for anything `entries` doesn't
/// cover, and checks the resulting sequence is strictly increasing end to end. Recomputed at
/// each `replace` call (against the factory's *current* `var_num`) rather than cached on
/// install, since growing the variable space after a pairing is installed can change the
/// answer.
pub(crate) fn monotonic_rename_table(
    entries: &[(VarId, PairTarget)],
    var_num: VarId,
) -> Option<BddHashMap<VarId, VarId>> {
    let mut explicit: BddHashMap<VarId, VarId> = BddHashMap::default();
    for &(old, target) in entries {
        match target {
            PairTarget::Var(new) => {
                explicit.insert(old, new);
            }
            PairTarget::Bdd(_) => return None,
        }
    }
    let mut prev: Option<VarId> = None;
    for old in 0..var_num {
        let new = *explicit.get(&old).unwrap_or(&old);
        if let Some(p) = prev {
            if new <= p {
                return None;
            }
        }
        prev = Some(new);
    }
    Some(explicit)
}

/// De-duplicated storage for installed pairings, owned by a factory.
#[derive(Debug, Default)]
pub(crate) struct PairingStore {
    by_entries: BddHashMap<Vec<(VarId, PairTarget)>, PairingId>,
    pairings: Vec<InstalledPairing>,
}

impl PairingStore {
    /// Installs `entries` (already canonicalized), returning its id and whether this call
    /// actually inserted a new pairing (as opposed to resolving to an existing one) — the
    /// caller uses that to decide whether operator caches need invalidating.
    pub fn install(&mut self, entries: Vec<(VarId, PairTarget)>) -> (PairingId, bool) {
        if let Some(&id) = self.by_entries.get(&entries) {
            return (id, false);
        }
        let id = self.pairings.len() as PairingId;
        self.pairings.push(InstalledPairing::new(entries.clone()));
        self.by_entries.insert(entries, id);
        (id, true)
    }

    pub fn get(&self, id: PairingId) -> Option<&InstalledPairing> {
        self.pairings.get(id as usize)
    }
}
