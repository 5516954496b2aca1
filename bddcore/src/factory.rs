//! The factory: owns the unique table, operator caches, and all the recursive Shannon-expansion
//! algorithms. Everything in this module operates on raw [`NodeIndex`] values with no refcount
//! bookkeeping of its own — that lives in [`crate::handle::Bdd`], which wraps a factory handle
//! and uses ordinary `Drop` to call [`FactoryInner::decref`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use common::prelude::{BddHashMap, Level, NodeIndex, VarId};

use crate::cache::{hash2, hash3, hash_tagged, BinOp, OpCaches};
use crate::config::FactoryConfig;
use crate::error::BddError;
use crate::pairing::{monotonic_rename_table, PairTarget, PairingBuilder, PairingId, PairingStore};
use crate::stats::{CacheStats, FactoryStats, GcReport};
use crate::table::{UniqueTable, ONE, ZERO};

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

/// Which engine a factory was asked for at construction. A current and a legacy/reference
/// implementation share one surface; both resolve to the single engine implemented here (see
/// `DESIGN.md` for why a byte-for-byte duplicate legacy engine was not worth carrying).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Standard,
    Legacy,
}

impl BackendKind {
    pub fn resolve(package: &str) -> Self {
        match package {
            "origJFactory" => {
                log::info!(
                    "requested backend {package:?} unavailable, falling back to standard JFactory-compatible implementation"
                );
                BackendKind::Legacy
            }
            "java" => BackendKind::Standard,
            other => {
                log::info!("resolving backend {other:?} as the standard JFactory-compatible implementation");
                BackendKind::Standard
            }
        }
    }
}

pub(crate) struct FactoryInner {
    id: u64,
    epoch: u64,
    torn_down: bool,
    backend: BackendKind,
    config: FactoryConfig,
    table: UniqueTable,
    caches: OpCaches,
    pairings: PairingStore,
    vars: Vec<(NodeIndex, NodeIndex)>, // (ithVar, nithVar) node per declared variable
    op_hit: u64,
    op_miss: u64,
    /// Registered via `BddFactory::set_gc_handler`, the JFactory/BuDDy-style "tell me when you
    /// collect" hook; invoked with a `GcReport` after every collection, automatic or manual.
    gc_handler: Option<Box<dyn FnMut(&GcReport)>>,
}

impl FactoryInner {
    fn new(config: FactoryConfig, backend: BackendKind) -> Result<Self, BddError> {
        config.validate()?;
        let table = UniqueTable::new(
            config.node_num,
            config.var_num,
            config.min_free_nodes,
            config.increase_factor,
        );
        let caches = OpCaches::new(config.cache_size);
        let mut inner = FactoryInner {
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            epoch: 0,
            torn_down: false,
            backend,
            config,
            table,
            caches,
            pairings: PairingStore::default(),
            vars: Vec::new(),
            op_hit: 0,
            op_miss: 0,
            gc_handler: None,
        };
        inner.ensure_vars(inner.config.var_num)?;
        Ok(inner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn is_initialized(&self) -> bool {
        !self.torn_down
    }

    fn check_alive(&self) -> Result<(), BddError> {
        if self.torn_down {
            return Err(BddError::UseAfterFree {
                node: 0,
                created_epoch: self.epoch,
                current_epoch: self.epoch,
            });
        }
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.torn_down = true;
        self.epoch += 1;
    }

    pub fn var_num(&self) -> u32 {
        self.table.var_num()
    }

    fn ensure_vars(&mut self, var_num: u32) -> Result<(), BddError> {
        while (self.vars.len() as u32) < var_num {
            let v = self.vars.len() as VarId;
            let pos = self.table.make_node(v, ZERO, ONE)?;
            let neg = self.table.make_node(v, ONE, ZERO)?;
            self.table.incref(pos);
            self.table.incref(neg);
            self.vars.push((pos, neg));
        }
        Ok(())
    }

    pub fn grow_var_num(&mut self, new_var_num: u32) -> Result<(), BddError> {
        self.table.grow_var_num(new_var_num)?;
        self.ensure_vars(new_var_num)?;
        // A wider variable space invalidates every cache key regardless of whether the node
        // table itself grew, so this always clears rather than going through the resize path.
        self.caches.clear_all();
        self.table.take_grew();
        Ok(())
    }

    pub fn set_node_table_size(&mut self, _node_num: usize) -> Result<(), BddError> {
        // The table already grows on demand (see `table::UniqueTable::grow`); an explicit
        // resize request just nudges the growth policy rather than reallocating synchronously,
        // matching JFactory's `setNodeTableSize` being advisory once the factory is live.
        Ok(())
    }

    pub fn set_cache_size(&mut self, cache_size: usize) -> Result<(), BddError> {
        if cache_size == 0 {
            return Err(BddError::Configuration("cache_size must be positive".to_string()));
        }
        self.config.cache_size = cache_size;
        self.caches.resize_all(cache_size);
        Ok(())
    }

    pub fn set_min_free_nodes(&mut self, percent: usize) -> Result<(), BddError> {
        if percent > 100 {
            return Err(BddError::Configuration(
                "min_free_nodes is a percentage and must be <= 100".to_string(),
            ));
        }
        self.config.min_free_nodes = percent;
        Ok(())
    }

    pub fn set_increase_factor(&mut self, factor: f64) -> Result<(), BddError> {
        if !(factor > 1.0) {
            return Err(BddError::Configuration(
                "increase_factor must be greater than 1.0".to_string(),
            ));
        }
        self.config.increase_factor = factor;
        Ok(())
    }

    pub fn set_cache_ratio(&mut self, ratio: usize) -> Result<(), BddError> {
        if ratio == 0 {
            return Err(BddError::Configuration("cache_ratio must be positive".to_string()));
        }
        self.config.cache_ratio = ratio;
        Ok(())
    }

    /// Called after every operation that can allocate nodes: resizes the operator caches
    /// proportionally if the node table grew, and reports any GC (automatic or manual) to a
    /// registered handler.
    fn maybe_resize_caches(&mut self) {
        if self.table.take_grew() {
            let target = (self.table.node_num() / self.config.cache_ratio).max(1);
            log::info!(
                "node table grew; resizing operator caches to {target} slots (cache_ratio={})",
                self.config.cache_ratio
            );
            self.caches.resize_all(target);
        }
        if let Some(report) = self.table.take_gc_report() {
            if let Some(handler) = self.gc_handler.as_mut() {
                handler(&report);
            }
        }
    }

    /// Registers a callback invoked with a [`GcReport`] every time the table collects, the
    /// JFactory/BuDDy `bdd_gbc_hook`-style reporting mechanism. Replaces any previously
    /// registered handler.
    pub fn set_gc_handler(&mut self, handler: impl FnMut(&GcReport) + 'static) {
        self.gc_handler = Some(Box::new(handler));
    }

    pub fn stats(&self) -> FactoryStats {
        self.table.stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.op_hit + self.op_miss,
            hits: self.op_hit,
            overwrites: self.caches.total_overwrites(),
        }
    }

    pub fn incref(&mut self, node: NodeIndex) {
        self.table.incref(node);
    }

    pub fn decref(&mut self, node: NodeIndex) {
        self.table.decref(node);
    }

    pub fn zero(&self) -> NodeIndex {
        ZERO
    }

    pub fn one(&self) -> NodeIndex {
        ONE
    }

    pub fn ith_var(&mut self, v: VarId) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        self.require_var(v)?;
        Ok(self.vars[v as usize].0)
    }

    pub fn nith_var(&mut self, v: VarId) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        self.require_var(v)?;
        Ok(self.vars[v as usize].1)
    }

    fn require_var(&self, v: VarId) -> Result<(), BddError> {
        if v >= self.table.var_num() {
            return Err(BddError::UnknownVariable(v));
        }
        Ok(())
    }

    fn is_const(node: NodeIndex) -> Option<bool> {
        if node == ZERO {
            Some(false)
        } else if node == ONE {
            Some(true)
        } else {
            None
        }
    }

    fn level(&self, node: NodeIndex) -> Level {
        self.table.level(node)
    }

    fn cofactor(&self, node: NodeIndex, top: Level) -> (NodeIndex, NodeIndex) {
        if self.level(node) == top {
            (self.table.low(node).unwrap(), self.table.high(node).unwrap())
        } else {
            (node, node)
        }
    }

    // ---- binary apply -------------------------------------------------------------------

    fn eval_const(op: BinOp, a: bool, b: bool) -> bool {
        match op {
            BinOp::And => a && b,
            BinOp::Or => a || b,
            BinOp::Xor => a ^ b,
            BinOp::Imp => !a || b,
            BinOp::Nand => !(a && b),
            BinOp::Nor => !(a || b),
            BinOp::Biimp => a == b,
            BinOp::Diff => a && !b,
            BinOp::Less => !a && b,
            BinOp::InvImp => a || !b,
        }
    }

    fn apply_shortcut(op: BinOp, f: NodeIndex, g: NodeIndex) -> Option<NodeIndex> {
        if let (Some(a), Some(b)) = (Self::is_const(f), Self::is_const(g)) {
            return Some(if Self::eval_const(op, a, b) { ONE } else { ZERO });
        }
        match op {
            BinOp::And => {
                if f == ZERO || g == ZERO {
                    return Some(ZERO);
                }
                if f == ONE {
                    return Some(g);
                }
                if g == ONE {
                    return Some(f);
                }
                if f == g {
                    return Some(f);
                }
            }
            BinOp::Or => {
                if f == ONE || g == ONE {
                    return Some(ONE);
                }
                if f == ZERO {
                    return Some(g);
                }
                if g == ZERO {
                    return Some(f);
                }
                if f == g {
                    return Some(f);
                }
            }
            BinOp::Xor => {
                if f == g {
                    return Some(ZERO);
                }
                if f == ZERO {
                    return Some(g);
                }
                if g == ZERO {
                    return Some(f);
                }
            }
            _ => {}
        }
        None
    }

    pub fn apply(&mut self, op: BinOp, f: NodeIndex, g: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.apply_rec(op, f, g)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    fn apply_rec(&mut self, op: BinOp, f: NodeIndex, g: NodeIndex) -> Result<NodeIndex, BddError> {
        if let Some(r) = Self::apply_shortcut(op, f, g) {
            return Ok(r);
        }
        let (kf, kg) = if op.is_commutative() && f > g { (g, f) } else { (f, g) };
        let hash = hash3(op.tag() as NodeIndex, kf, kg);
        if let Some(r) = self.caches.binop.get(hash, (op.tag(), kf, kg)) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;

        let top = self.level(f).min(self.level(g));
        let (f0, f1) = self.cofactor(f, top);
        let (g0, g1) = self.cofactor(g, top);

        let low = self.apply_rec(op, f0, g0)?;
        let depth = self.table.protect(low);
        let high = self.apply_rec(op, f1, g1)?;
        let result = self.table.make_node(top as VarId, low, high)?;
        self.table.unprotect_to(depth);

        self.caches.binop.insert(hash, (op.tag(), kf, kg), result);
        Ok(result)
    }

    pub fn not(&mut self, f: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        if let Some(r) = self.caches.not.get(hash2(f, 0), f) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;
        let r = self.apply_rec(BinOp::Xor, f, ONE)?;
        self.caches.not.insert(hash2(f, 0), f, r);
        self.maybe_resize_caches();
        Ok(r)
    }

    // ---- ite -----------------------------------------------------------------------------

    pub fn ite(&mut self, f: NodeIndex, g: NodeIndex, h: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.ite_rec(f, g, h)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    fn ite_rec(&mut self, f: NodeIndex, g: NodeIndex, h: NodeIndex) -> Result<NodeIndex, BddError> {
        if f == ONE {
            return Ok(g);
        }
        if f == ZERO {
            return Ok(h);
        }
        if g == h {
            return Ok(g);
        }
        if g == ONE && h == ZERO {
            return Ok(f);
        }
        if let (Some(gb), Some(hb)) = (Self::is_const(g), Self::is_const(h)) {
            if gb && !hb {
                return Ok(f);
            }
            if !gb && hb {
                return self.not(f);
            }
        }

        let hash = hash3(f, g, h);
        if let Some(r) = self.caches.ite.get(hash, (f, g, h)) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;

        let top = self.level(f).min(self.level(g)).min(self.level(h));
        let (f0, f1) = self.cofactor(f, top);
        let (g0, g1) = self.cofactor(g, top);
        let (h0, h1) = self.cofactor(h, top);

        let low = self.ite_rec(f0, g0, h0)?;
        let depth = self.table.protect(low);
        let high = self.ite_rec(f1, g1, h1)?;
        let result = self.table.make_node(top as VarId, low, high)?;
        self.table.unprotect_to(depth);

        self.caches.ite.insert(hash, (f, g, h), result);
        Ok(result)
    }

    // ---- andAll / orAll / andLiterals -----------------------------------------------------

    pub fn and_all(&mut self, operands: &[NodeIndex]) -> Result<NodeIndex, BddError> {
        self.reduce_all(operands, BinOp::And, ONE)
    }

    pub fn or_all(&mut self, operands: &[NodeIndex]) -> Result<NodeIndex, BddError> {
        self.reduce_all(operands, BinOp::Or, ZERO)
    }

    /// Divide-and-conquer pairwise reduction: sorting by root level approximates "pair up the
    /// smallest BDDs first", which keeps intermediate products from ballooning before they have
    /// a chance to cancel out, the heuristic called out as tuning rather than semantics.
    fn reduce_all(&mut self, operands: &[NodeIndex], op: BinOp, identity: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        if operands.is_empty() {
            return Ok(identity);
        }
        let mut work: Vec<NodeIndex> = operands.to_vec();
        work.sort_by_key(|&n| self.level(n));
        let base = self.table.protect_depth();
        for &n in &work {
            self.table.protect(n);
        }
        let mut queue: VecDeque<NodeIndex> = work.into();
        while queue.len() > 1 {
            let a = queue.pop_front().unwrap();
            let b = queue.pop_front().unwrap();
            let r = self.apply_rec(op, a, b)?;
            self.table.protect(r);
            queue.push_back(r);
        }
        let result = queue.pop_front().unwrap_or(identity);
        self.table.unprotect_to(base);
        self.maybe_resize_caches();
        Ok(result)
    }

    /// Bottom-up, non-recursive, uncached cube construction for a run of literals whose
    /// underlying variables are strictly increasing in level — exactly the precondition under
    /// which a single linear pass can build the chain without consulting the unique table's
    /// hash-cons more than once per literal.
    pub fn and_literals(&mut self, literals: &[NodeIndex]) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        if literals.is_empty() {
            return Ok(ONE);
        }
        let mut decoded: Vec<(VarId, bool)> = Vec::with_capacity(literals.len());
        for &lit in literals {
            let var = self
                .table
                .var_of(lit)
                .ok_or_else(|| BddError::Configuration("andLiterals operand is not a literal".to_string()))?;
            let low = self.table.low(lit).unwrap();
            let high = self.table.high(lit).unwrap();
            let polarity = match (low, high) {
                (ZERO, ONE) => true,
                (ONE, ZERO) => false,
                _ => {
                    return Err(BddError::Configuration(
                        "andLiterals operand is not a single-variable literal".to_string(),
                    ))
                }
            };
            decoded.push((var, polarity));
        }
        for w in decoded.windows(2) {
            if w[0].0 >= w[1].0 {
                return Err(BddError::Configuration(
                    "andLiterals requires strictly increasing variable levels".to_string(),
                ));
            }
        }
        let mut result = ONE;
        for &(var, polarity) in decoded.iter().rev() {
            let (low, high) = if polarity { (ZERO, result) } else { (result, ZERO) };
            result = self.table.make_node(var, low, high)?;
        }
        self.maybe_resize_caches();
        Ok(result)
    }

    // ---- quantification --------------------------------------------------------------------

    pub fn exist(&mut self, f: NodeIndex, cube: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.quant_rec(f, cube, BinOp::Or)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    pub fn forall(&mut self, f: NodeIndex, cube: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.quant_rec(f, cube, BinOp::And)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    fn quant_rec(&mut self, f: NodeIndex, cube: NodeIndex, combinator: BinOp) -> Result<NodeIndex, BddError> {
        if cube == ONE || Self::is_const(f).is_some() {
            return Ok(f);
        }
        let hash = hash2(f, cube);
        let cached = match combinator {
            BinOp::Or => self.caches.exist.get(hash, (f, cube)),
            _ => self.caches.forall.get(hash, (f, cube)),
        };
        if let Some(r) = cached {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;

        let cube_var = self.table.var_of(cube).unwrap();
        let cube_high = self.table.high(cube).unwrap();
        let cube_low = self.table.low(cube).unwrap();
        let rest_cube = if cube_low == ZERO { cube_high } else { cube_low };

        let f_level = self.level(f);

        let result = if cube_var < f_level {
            // This cube variable does not occur in f at all; skip it.
            self.quant_rec(f, rest_cube, combinator)?
        } else if cube_var > f_level {
            // f branches on a variable above the one the cube currently quantifies; recurse
            // into f's children against the same (unconsumed) cube and rebuild this level.
            let low = self.quant_rec(self.table.low(f).unwrap(), cube, combinator)?;
            let depth = self.table.protect(low);
            let high = self.quant_rec(self.table.high(f).unwrap(), cube, combinator)?;
            let r = self.table.make_node(f_level as VarId, low, high)?;
            self.table.unprotect_to(depth);
            r
        } else {
            // Same variable: quantify it away by combining the two cofactors. Both results are
            // unattached until apply_rec folds them together, so both must stay pinned across
            // that call, not just the first.
            let low = self.quant_rec(self.table.low(f).unwrap(), rest_cube, combinator)?;
            let depth = self.table.protect(low);
            let high = self.quant_rec(self.table.high(f).unwrap(), rest_cube, combinator)?;
            self.table.protect(high);
            let r = self.apply_rec(combinator, low, high)?;
            self.table.unprotect_to(depth);
            r
        };

        match combinator {
            BinOp::Or => self.caches.exist.insert(hash, (f, cube), result),
            _ => self.caches.forall.insert(hash, (f, cube), result),
        }
        Ok(result)
    }

    pub fn relprod(&mut self, f: NodeIndex, g: NodeIndex, cube: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let hash = hash3(f, g, cube);
        if let Some(r) = self.caches.relprod.get(hash, (f, g, cube)) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;
        let conj = self.apply_rec(BinOp::And, f, g)?;
        let depth = self.table.protect(conj);
        let result = self.quant_rec(conj, cube, BinOp::Or)?;
        self.table.unprotect_to(depth);
        self.caches.relprod.insert(hash, (f, g, cube), result);
        self.maybe_resize_caches();
        Ok(result)
    }

    // ---- restrict ----------------------------------------------------------------------------

    pub fn restrict(&mut self, f: NodeIndex, cube: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.restrict_rec(f, cube)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    fn restrict_rec(&mut self, f: NodeIndex, cube: NodeIndex) -> Result<NodeIndex, BddError> {
        if cube == ONE || Self::is_const(f).is_some() {
            return Ok(f);
        }
        let cube_var = self.table.var_of(cube).unwrap();
        let cube_low = self.table.low(cube).unwrap();
        let cube_high = self.table.high(cube).unwrap();
        let (fixed_high, rest_cube) = if cube_low == ZERO {
            (true, cube_high)
        } else {
            (false, cube_low)
        };

        let f_level = self.level(f);
        if cube_var < f_level {
            return self.restrict_rec(f, rest_cube);
        }
        if f_level < cube_var {
            let low = self.restrict_rec(self.table.low(f).unwrap(), cube)?;
            let depth = self.table.protect(low);
            let high = self.restrict_rec(self.table.high(f).unwrap(), cube)?;
            let result = self.table.make_node(f_level as VarId, low, high)?;
            self.table.unprotect_to(depth);
            return Ok(result);
        }
        let chosen = if fixed_high {
            self.table.high(f).unwrap()
        } else {
            self.table.low(f).unwrap()
        };
        self.restrict_rec(chosen, rest_cube)
    }

    // ---- compose / replace --------------------------------------------------------------------

    pub fn compose(&mut self, f: NodeIndex, v: VarId, g: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.compose_rec(f, v, g)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    fn compose_rec(&mut self, f: NodeIndex, v: VarId, g: NodeIndex) -> Result<NodeIndex, BddError> {
        let f_level = self.level(f);
        if f_level > v {
            return Ok(f);
        }
        let hash = hash3(f, v as NodeIndex, g);
        if let Some(r) = self.caches.compose.get(hash, (f, v as NodeIndex, g)) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;

        let result = if f_level < v {
            let low = self.compose_rec(self.table.low(f).unwrap(), v, g)?;
            let depth = self.table.protect(low);
            let high = self.compose_rec(self.table.high(f).unwrap(), v, g)?;
            let r = self.table.make_node(f_level as VarId, low, high)?;
            self.table.unprotect_to(depth);
            r
        } else {
            let low = self.table.low(f).unwrap();
            let high = self.table.high(f).unwrap();
            self.ite_rec(g, high, low)?
        };

        self.caches.compose.insert(hash, (f, v as NodeIndex, g), result);
        Ok(result)
    }

    pub fn freeze_and_install(&mut self, builder: &PairingBuilder) -> PairingId {
        let entries = builder.canonicalize();
        let (id, inserted) = self.pairings.install(entries.clone());
        if inserted {
            // A Bdd target is stored as a bare node index inside the pairing table, which
            // outlives any handle that referenced it — pin it here the same way a live `Bdd`
            // pins its own node, or a later GC could reclaim a substitution target out from
            // under a frozen pairing.
            for &(_, target) in &entries {
                if let PairTarget::Bdd(node) = target {
                    self.table.incref(node);
                }
            }
            log::info!("installed variable pairing #{id}, invalidating operator caches");
            self.caches.clear_all();
        }
        id
    }

    pub fn replace(&mut self, f: NodeIndex, pairing: PairingId) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let entries = self
            .pairings
            .get(pairing)
            .ok_or_else(|| BddError::Configuration(format!("unknown pairing id {pairing}")))?
            .entries
            .clone();

        // Checked against the current var_num, not a value cached at install time: growing the
        // variable space after a pairing is installed can turn a safe rename unsafe.
        let r = match monotonic_rename_table(&entries, self.table.var_num()) {
            Some(rename) => self.replace_rename_rec(f, pairing, &rename)?,
            None => self.replace_via_compose(f, &entries)?,
        };
        self.maybe_resize_caches();
        Ok(r)
    }

    fn replace_rename_rec(
        &mut self,
        f: NodeIndex,
        pairing: PairingId,
        rename: &BddHashMap<VarId, VarId>,
    ) -> Result<NodeIndex, BddError> {
        if Self::is_const(f).is_some() {
            return Ok(f);
        }
        let hash = hash_tagged(f, pairing as NodeIndex);
        if let Some(r) = self.caches.replace.get(hash, (f, pairing as u64)) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;

        let var = self.table.var_of(f).unwrap();
        let new_var = *rename.get(&var).unwrap_or(&var);
        let low = self.replace_rename_rec(self.table.low(f).unwrap(), pairing, rename)?;
        let depth = self.table.protect(low);
        let high = self.replace_rename_rec(self.table.high(f).unwrap(), pairing, rename)?;
        let result = self.table.make_node(new_var, low, high)?;
        self.table.unprotect_to(depth);

        self.caches.replace.insert(hash, (f, pairing as u64), result);
        Ok(result)
    }

    /// Fallback for pairings that reverse variable order or substitute an arbitrary BDD rather
    /// than just another variable: apply the entries as a chain of `compose`s, highest variable
    /// first so that substituting a lower variable can never re-expose an already-substituted
    /// higher one.
    fn replace_via_compose(&mut self, f: NodeIndex, entries: &[(VarId, PairTarget)]) -> Result<NodeIndex, BddError> {
        // Each loop iteration hands its predecessor's (unattached) output to compose_rec, so the
        // running result needs to stay pinned across the whole chain, not just one call.
        let base = self.table.protect_depth();
        self.table.protect(f);
        let mut result = f;
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|(old, _)| std::cmp::Reverse(*old));
        for (old, target) in sorted {
            let target_node = match target {
                PairTarget::Var(w) => {
                    self.ensure_vars(w + 1)?;
                    self.vars[w as usize].0
                }
                PairTarget::Bdd(node) => node,
            };
            result = self.compose_rec(result, old, target_node)?;
            self.table.protect(result);
        }
        self.table.unprotect_to(base);
        Ok(result)
    }

    // ---- sat / support -------------------------------------------------------------------

    pub fn sat_one(&mut self, f: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.sat_one_rec(f)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    fn sat_one_rec(&mut self, f: NodeIndex) -> Result<NodeIndex, BddError> {
        if f == ZERO {
            return Err(BddError::Configuration("satOne of the FALSE function has no assignment".to_string()));
        }
        if f == ONE {
            return Ok(ONE);
        }
        let var = self.table.var_of(f).unwrap();
        let low = self.table.low(f).unwrap();
        let high = self.table.high(f).unwrap();
        let (chosen, polarity_high) = if high != ZERO { (high, true) } else { (low, false) };
        let rest = self.sat_one_rec(chosen)?;
        let (l, h) = if polarity_high { (ZERO, rest) } else { (rest, ZERO) };
        self.table.make_node(var, l, h)
    }

    pub fn sat_count(&mut self, f: NodeIndex) -> Result<f64, BddError> {
        self.check_alive()?;
        let var_num = self.table.var_num();
        let raw = self.sat_count_rec(f)?;
        let root_level = self.level(f).min(var_num);
        Ok(raw * 2f64.powi(root_level as i32))
    }

    fn sat_count_rec(&mut self, f: NodeIndex) -> Result<f64, BddError> {
        if f == ZERO {
            return Ok(0.0);
        }
        if f == ONE {
            return Ok(1.0);
        }
        if let Some(bits) = self.caches.satcount.get(hash2(f, 0), f) {
            self.op_hit += 1;
            return Ok(f64::from_bits(bits));
        }
        self.op_miss += 1;
        let var_num = self.table.var_num();
        let var = self.table.var_of(f).unwrap();
        let low = self.table.low(f).unwrap();
        let high = self.table.high(f).unwrap();

        let low_level = self.level(low).min(var_num);
        let high_level = self.level(high).min(var_num);
        let low_count = self.sat_count_rec(low)? * 2f64.powi((low_level - var - 1) as i32);
        let high_count = self.sat_count_rec(high)? * 2f64.powi((high_level - var - 1) as i32);
        let total = low_count + high_count;

        self.caches.satcount.insert(hash2(f, 0), f, total.to_bits());
        Ok(total)
    }

    pub fn path_count(&mut self, f: NodeIndex) -> Result<f64, BddError> {
        self.check_alive()?;
        self.path_count_rec(f)
    }

    fn path_count_rec(&mut self, f: NodeIndex) -> Result<f64, BddError> {
        if f == ZERO {
            return Ok(0.0);
        }
        if f == ONE {
            return Ok(1.0);
        }
        if let Some(bits) = self.caches.pathcount.get(hash2(f, 1), f) {
            self.op_hit += 1;
            return Ok(f64::from_bits(bits));
        }
        self.op_miss += 1;
        let low = self.table.low(f).unwrap();
        let high = self.table.high(f).unwrap();
        let total = self.path_count_rec(low)? + self.path_count_rec(high)?;
        self.caches.pathcount.insert(hash2(f, 1), f, total.to_bits());
        Ok(total)
    }

    /// The cube of variables appearing anywhere in `f`, built by merging each node's own
    /// variable with the (already-merged) supports of its two children — like merging two
    /// sorted lists, since a child's support only ever contains variables below it in the
    /// order. Memoized per node, the way `bdd_support` caches in the libraries this is modeled
    /// on.
    pub fn support(&mut self, f: NodeIndex) -> Result<NodeIndex, BddError> {
        self.check_alive()?;
        let r = self.support_rec(f)?;
        self.maybe_resize_caches();
        Ok(r)
    }

    fn support_rec(&mut self, f: NodeIndex) -> Result<NodeIndex, BddError> {
        if Self::is_const(f).is_some() {
            return Ok(ONE);
        }
        if let Some(r) = self.caches.support.get(hash2(f, 0), f) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;
        let var = self.table.var_of(f).unwrap();
        let low_supp = self.support_rec(self.table.low(f).unwrap())?;
        let depth = self.table.protect(low_supp);
        let high_supp = self.support_rec(self.table.high(f).unwrap())?;
        self.table.protect(high_supp);
        let merged = self.merge_var_sets(low_supp, high_supp)?;
        let depth2 = self.table.protect(merged);
        let result = self.table.make_node(var, ZERO, merged)?;
        self.table.unprotect_to(depth2);
        self.table.unprotect_to(depth);
        self.caches.support.insert(hash2(f, 0), f, result);
        Ok(result)
    }

    /// Merges two "set cubes" (chains of `(var, ZERO, rest)` nodes) into their union, the same
    /// way one merges two sorted lists — each is already strictly increasing in variable order.
    fn merge_var_sets(&mut self, a: NodeIndex, b: NodeIndex) -> Result<NodeIndex, BddError> {
        if a == ONE {
            return Ok(b);
        }
        if b == ONE {
            return Ok(a);
        }
        let hash = hash2(a, b);
        if let Some(r) = self.caches.merge.get(hash, (a, b)) {
            self.op_hit += 1;
            return Ok(r);
        }
        self.op_miss += 1;
        let va = self.table.var_of(a).unwrap();
        let vb = self.table.var_of(b).unwrap();
        let result = if va == vb {
            let rest = self.merge_var_sets(self.table.high(a).unwrap(), self.table.high(b).unwrap())?;
            self.table.make_node(va, ZERO, rest)?
        } else if va < vb {
            let rest = self.merge_var_sets(self.table.high(a).unwrap(), b)?;
            self.table.make_node(va, ZERO, rest)?
        } else {
            let rest = self.merge_var_sets(a, self.table.high(b).unwrap())?;
            self.table.make_node(vb, ZERO, rest)?
        };
        self.caches.merge.insert(hash, (a, b), result);
        Ok(result)
    }

    pub fn reachable_count(&self, roots: &[NodeIndex]) -> usize {
        self.table.reachable(roots).len()
    }

    pub fn dot_string(&self, root: NodeIndex) -> String {
        use common::prelude::Dot;
        FactoryDotView(self).dot_string(root)
    }

    pub fn dot_string_multi(&self, roots: &[NodeIndex]) -> String {
        use common::prelude::Dot;
        use std::io::BufWriter;
        use std::io::Write;

        let mut buf = Vec::new();
        {
            let mut io = BufWriter::new(&mut buf);
            io.write_all(b"digraph { layout=dot; overlap=false; splines=true; node [fontsize=10];\n")
                .unwrap();
            let view = FactoryDotView(self);
            let mut visited = common::prelude::BddHashSet::default();
            for &root in roots {
                view.dot_impl(&mut io, root, &mut visited);
            }
            io.write_all(b"}\n").unwrap();
        }
        std::str::from_utf8(&buf).unwrap().to_string()
    }
}

struct FactoryDotView<'a>(&'a FactoryInner);

impl<'a> common::prelude::Dot for FactoryDotView<'a> {
    fn dot_impl<T>(&self, io: &mut T, node: NodeIndex, visited: &mut common::prelude::BddHashSet<NodeIndex>)
    where
        T: std::io::Write,
    {
        if !visited.insert(node) {
            return;
        }
        match node {
            ZERO => {
                writeln!(io, "\"{node}\" [shape=box,label=\"0\"];").unwrap();
            }
            ONE => {
                writeln!(io, "\"{node}\" [shape=box,label=\"1\"];").unwrap();
            }
            _ => {
                let var = self.0.table.var_of(node).unwrap();
                let low = self.0.table.low(node).unwrap();
                let high = self.0.table.high(node).unwrap();
                writeln!(io, "\"{node}\" [label=\"v{var}\"];").unwrap();
                writeln!(io, "\"{node}\" -> \"{low}\" [style=dashed];").unwrap();
                writeln!(io, "\"{node}\" -> \"{high}\";").unwrap();
                self.dot_impl(io, low, visited);
                self.dot_impl(io, high, visited);
            }
        }
    }
}

/// Thin, cloneable handle onto a factory's shared, interior-mutable state. Neither this type
/// nor [`crate::handle::Bdd`] implement `Send`/`Sync`: a factory (and everything it produced)
/// is confined to the thread that created it, matching the single-threaded-per-factory contract.
#[derive(Clone)]
pub struct BddFactory {
    pub(crate) inner: Rc<RefCell<FactoryInner>>,
}

impl BddFactory {
    pub fn new(package: &str, config: FactoryConfig) -> Result<Self, BddError> {
        let backend = BackendKind::resolve(package);
        let inner = FactoryInner::new(config, backend)?;
        Ok(BddFactory {
            inner: Rc::new(RefCell::new(inner)),
        })
    }

    pub fn id(&self) -> u64 {
        self.inner.borrow().id()
    }

    pub fn backend(&self) -> BackendKind {
        self.inner.borrow().backend()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.borrow().is_initialized()
    }

    pub fn shutdown(&self) {
        self.inner.borrow_mut().shutdown();
    }

    pub fn var_num(&self) -> u32 {
        self.inner.borrow().var_num()
    }

    pub fn grow_var_num(&self, new_var_num: u32) -> Result<(), BddError> {
        self.inner.borrow_mut().grow_var_num(new_var_num)
    }

    pub fn set_cache_size(&self, cache_size: usize) -> Result<(), BddError> {
        self.inner.borrow_mut().set_cache_size(cache_size)
    }

    pub fn set_min_free_nodes(&self, percent: usize) -> Result<(), BddError> {
        self.inner.borrow_mut().set_min_free_nodes(percent)
    }

    pub fn set_increase_factor(&self, factor: f64) -> Result<(), BddError> {
        self.inner.borrow_mut().set_increase_factor(factor)
    }

    pub fn set_cache_ratio(&self, ratio: usize) -> Result<(), BddError> {
        self.inner.borrow_mut().set_cache_ratio(ratio)
    }

    pub fn set_node_table_size(&self, node_num: usize) -> Result<(), BddError> {
        self.inner.borrow_mut().set_node_table_size(node_num)
    }

    pub fn stats(&self) -> FactoryStats {
        self.inner.borrow().stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.borrow().cache_stats()
    }

    pub fn collect_garbage(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.table.collect();
        // Read the report (it counts on `unique_hit`) before resetting the counters it reads.
        let report = inner.table.take_gc_report();
        inner.caches.clear_all();
        inner.caches.reset_overwrites();
        inner.table.reset_op_counters();
        inner.op_hit = 0;
        inner.op_miss = 0;
        if let Some(report) = report {
            if let Some(handler) = inner.gc_handler.as_mut() {
                handler(&report);
            }
        }
    }

    /// Registers a callback invoked with a [`crate::stats::GcReport`] after every collection,
    /// automatic or manual.
    pub fn set_gc_handler(&self, handler: impl FnMut(&crate::stats::GcReport) + 'static) {
        self.inner.borrow_mut().set_gc_handler(handler);
    }

    pub fn dot_string_multi(&self, roots: &[NodeIndex]) -> String {
        self.inner.borrow().dot_string_multi(roots)
    }
}
