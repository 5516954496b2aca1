//! The public, refcounted handle onto a BDD node.
//!
//! `Bdd` is deliberately thin: all the algorithms live in [`crate::factory::FactoryInner`].
//! What this type owns is the *lifecycle* — incrementing the node's refcount on creation,
//! decrementing it on `Drop`, and refusing to mix handles from different factories. The
//! `*With` family (`andWith`, `orWith`, ...) isn't a separate code path: taking `self`/`other`
//! by value forces the caller to give up ownership, and the ordinary `Drop` impl runs when those
//! bindings go out of scope at the end of the method, which is exactly the intended "consume and
//! release" semantics.

use std::fmt;

use common::prelude::{NodeIndex, VarId};

use crate::cache::BinOp;
use crate::error::BddError;
use crate::factory::BddFactory;
use crate::pairing::PairingId;

pub struct Bdd {
    factory: BddFactory,
    pub(crate) node: NodeIndex,
}

impl fmt::Debug for Bdd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bdd")
            .field("factory", &self.factory.id())
            .field("node", &self.node)
            .finish()
    }
}

impl Bdd {
    pub(crate) fn from_node(factory: &BddFactory, node: NodeIndex) -> Self {
        factory.inner.borrow_mut().incref(node);
        Bdd {
            factory: factory.clone(),
            node,
        }
    }

    fn same_factory(&self, other: &Bdd) -> Result<(), BddError> {
        if self.factory.id() != other.factory.id() {
            return Err(BddError::CrossFactory {
                a: self.factory.id(),
                b: other.factory.id(),
            });
        }
        Ok(())
    }

    pub fn factory(&self) -> &BddFactory {
        &self.factory
    }

    pub fn node_index(&self) -> NodeIndex {
        self.node
    }

    pub fn zero(factory: &BddFactory) -> Self {
        let node = factory.inner.borrow().zero();
        Bdd::from_node(factory, node)
    }

    pub fn one(factory: &BddFactory) -> Self {
        let node = factory.inner.borrow().one();
        Bdd::from_node(factory, node)
    }

    pub fn ith_var(factory: &BddFactory, v: VarId) -> Result<Self, BddError> {
        let node = factory.inner.borrow_mut().ith_var(v)?;
        Ok(Bdd::from_node(factory, node))
    }

    pub fn nith_var(factory: &BddFactory, v: VarId) -> Result<Self, BddError> {
        let node = factory.inner.borrow_mut().nith_var(v)?;
        Ok(Bdd::from_node(factory, node))
    }

    pub fn is_zero(&self) -> bool {
        self.node == self.factory.inner.borrow().zero()
    }

    pub fn is_one(&self) -> bool {
        self.node == self.factory.inner.borrow().one()
    }

    /// Explicit clone with a new refcount increment.
    pub fn id(&self) -> Self {
        Bdd::from_node(&self.factory, self.node)
    }

    /// Explicit release. Equivalent to dropping the handle; provided for callers that want to
    /// free eagerly without relying on scope exit.
    pub fn free(self) {
        drop(self)
    }

    fn binop(&self, op: BinOp, other: &Bdd) -> Result<Bdd, BddError> {
        self.same_factory(other)?;
        let result = self.factory.inner.borrow_mut().apply(op, self.node, other.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn and(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::And, other)
    }

    pub fn or(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Or, other)
    }

    pub fn xor(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Xor, other)
    }

    pub fn nand(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Nand, other)
    }

    pub fn nor(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Nor, other)
    }

    pub fn imp(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Imp, other)
    }

    pub fn biimp(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Biimp, other)
    }

    pub fn diff(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Diff, other)
    }

    pub fn less(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::Less, other)
    }

    pub fn invimp(&self, other: &Bdd) -> Result<Bdd, BddError> {
        self.binop(BinOp::InvImp, other)
    }

    pub fn not(&self) -> Result<Bdd, BddError> {
        let result = self.factory.inner.borrow_mut().not(self.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn ite(&self, then_branch: &Bdd, else_branch: &Bdd) -> Result<Bdd, BddError> {
        self.same_factory(then_branch)?;
        self.same_factory(else_branch)?;
        let result = self
            .factory
            .inner
            .borrow_mut()
            .ite(self.node, then_branch.node, else_branch.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    fn consuming_binop(self, op: BinOp, other: Bdd) -> Result<Bdd, BddError> {
        self.binop(op, &other)
    }

    pub fn and_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::And, other)
    }

    pub fn or_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::Or, other)
    }

    pub fn xor_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::Xor, other)
    }

    pub fn nand_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::Nand, other)
    }

    pub fn nor_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::Nor, other)
    }

    pub fn imp_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::Imp, other)
    }

    pub fn biimp_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::Biimp, other)
    }

    pub fn diff_with(self, other: Bdd) -> Result<Bdd, BddError> {
        self.consuming_binop(BinOp::Diff, other)
    }

    pub fn not_with(self) -> Result<Bdd, BddError> {
        self.not()
    }

    pub fn exist(&self, cube: &Bdd) -> Result<Bdd, BddError> {
        self.same_factory(cube)?;
        let result = self.factory.inner.borrow_mut().exist(self.node, cube.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn forall(&self, cube: &Bdd) -> Result<Bdd, BddError> {
        self.same_factory(cube)?;
        let result = self.factory.inner.borrow_mut().forall(self.node, cube.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn relprod(&self, other: &Bdd, cube: &Bdd) -> Result<Bdd, BddError> {
        self.same_factory(other)?;
        self.same_factory(cube)?;
        let result = self
            .factory
            .inner
            .borrow_mut()
            .relprod(self.node, other.node, cube.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn restrict(&self, cube: &Bdd) -> Result<Bdd, BddError> {
        self.same_factory(cube)?;
        let result = self.factory.inner.borrow_mut().restrict(self.node, cube.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn compose(&self, v: VarId, other: &Bdd) -> Result<Bdd, BddError> {
        self.same_factory(other)?;
        let result = self.factory.inner.borrow_mut().compose(self.node, v, other.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn replace(&self, pairing: PairingId) -> Result<Bdd, BddError> {
        let result = self.factory.inner.borrow_mut().replace(self.node, pairing)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn support(&self) -> Result<Bdd, BddError> {
        let result = self.factory.inner.borrow_mut().support(self.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn sat_one(&self) -> Result<Bdd, BddError> {
        let result = self.factory.inner.borrow_mut().sat_one(self.node)?;
        Ok(Bdd::from_node(&self.factory, result))
    }

    pub fn sat_count(&self) -> Result<f64, BddError> {
        self.factory.inner.borrow_mut().sat_count(self.node)
    }

    pub fn path_count(&self) -> Result<f64, BddError> {
        self.factory.inner.borrow_mut().path_count(self.node)
    }

    pub fn node_count(&self) -> usize {
        self.factory.inner.borrow().reachable_count(&[self.node])
    }

    pub fn dot_string(&self) -> String {
        self.factory.inner.borrow().dot_string(self.node)
    }
}

impl Clone for Bdd {
    fn clone(&self) -> Self {
        self.id()
    }
}

impl Drop for Bdd {
    fn drop(&mut self) {
        self.factory.inner.borrow_mut().decref(self.node);
    }
}

impl PartialEq for Bdd {
    fn eq(&self, other: &Self) -> bool {
        self.factory.id() == other.factory.id() && self.node == other.node
    }
}
impl Eq for Bdd {}

/// Variadic reducers. Defined as free functions (rather than inherent methods fanning out from
/// one handle) since they operate over a whole collection.
pub fn and_all(factory: &BddFactory, operands: &[Bdd]) -> Result<Bdd, BddError> {
    for pair in operands.windows(2) {
        pair[0].same_factory(&pair[1])?;
    }
    let nodes: Vec<NodeIndex> = operands.iter().map(|b| b.node).collect();
    let result = factory.inner.borrow_mut().and_all(&nodes)?;
    Ok(Bdd::from_node(factory, result))
}

pub fn or_all(factory: &BddFactory, operands: &[Bdd]) -> Result<Bdd, BddError> {
    for pair in operands.windows(2) {
        pair[0].same_factory(&pair[1])?;
    }
    let nodes: Vec<NodeIndex> = operands.iter().map(|b| b.node).collect();
    let result = factory.inner.borrow_mut().or_all(&nodes)?;
    Ok(Bdd::from_node(factory, result))
}

/// Ownership-consuming variants: operands are dropped (and so release their refcount) as soon
/// as each pairwise reduction is done, rather than all at once at the end.
pub fn and_all_free(factory: &BddFactory, operands: Vec<Bdd>) -> Result<Bdd, BddError> {
    reduce_free(factory, operands, BinOp::And, true)
}

pub fn or_all_free(factory: &BddFactory, operands: Vec<Bdd>) -> Result<Bdd, BddError> {
    reduce_free(factory, operands, BinOp::Or, false)
}

fn reduce_free(factory: &BddFactory, operands: Vec<Bdd>, op: BinOp, identity_one: bool) -> Result<Bdd, BddError> {
    let mut queue: std::collections::VecDeque<Bdd> = operands.into();
    if queue.is_empty() {
        return Ok(if identity_one { Bdd::one(factory) } else { Bdd::zero(factory) });
    }
    while queue.len() > 1 {
        let a = queue.pop_front().unwrap();
        let b = queue.pop_front().unwrap();
        a.same_factory(&b)?;
        let result = factory.inner.borrow_mut().apply(op, a.node, b.node)?;
        // `a` and `b` drop here, decrementing their refcounts now that the combined result
        // holds whatever of them remains reachable.
        queue.push_back(Bdd::from_node(factory, result));
    }
    Ok(queue.pop_front().unwrap())
}

pub fn and_literals(factory: &BddFactory, literals: &[Bdd]) -> Result<Bdd, BddError> {
    for pair in literals.windows(2) {
        pair[0].same_factory(&pair[1])?;
    }
    let nodes: Vec<NodeIndex> = literals.iter().map(|b| b.node).collect();
    let result = factory.inner.borrow_mut().and_literals(&nodes)?;
    Ok(Bdd::from_node(factory, result))
}
