//! The bit-vector layer: an unsigned integer encoded as an ordered run of BDD variables.
//!
//! This module knows nothing about packet wire formats — that translation is the job of the
//! out-of-scope packet-header-to-BDD translator. What it provides is the generic machinery
//! (`value`, `geq`, `leq`, `range`) that any fixed-width field binds to a base variable.

use std::ops::Deref;

use common::prelude::VarId;

use crate::error::BddError;
use crate::factory::BddFactory;
use crate::handle::{and_literals, Bdd};

/// An `n`-bit unsigned integer, MSB first, backed by `n` consecutive BDD variables.
#[derive(Clone)]
pub struct BddInteger {
    factory: BddFactory,
    vars: Vec<VarId>,
}

impl BddInteger {
    pub fn new(factory: &BddFactory, vars: Vec<VarId>) -> Self {
        BddInteger {
            factory: factory.clone(),
            vars,
        }
    }

    /// Binds `width` consecutive variables starting at `base_var`, growing the factory's
    /// `varNum` if necessary.
    pub fn at(factory: &BddFactory, base_var: VarId, width: u32) -> Result<Self, BddError> {
        if width == 0 {
            return Err(BddError::Configuration("BddInteger width must be positive".to_string()));
        }
        let needed = base_var + width;
        if needed > factory.var_num() {
            factory.grow_var_num(needed)?;
        }
        let vars = (base_var..base_var + width).collect();
        Ok(BddInteger::new(factory, vars))
    }

    pub fn width(&self) -> u32 {
        self.vars.len() as u32
    }

    pub fn max_value(&self) -> u64 {
        if self.width() >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width()) - 1
        }
    }

    /// The BDD asserting this integer equals the constant `k`.
    pub fn value(&self, k: u64) -> Result<Bdd, BddError> {
        let width = self.vars.len();
        let mut literals = Vec::with_capacity(width);
        for (i, &var) in self.vars.iter().enumerate() {
            let bit = (k >> (width - 1 - i)) & 1;
            let lit = if bit == 1 {
                Bdd::ith_var(&self.factory, var)?
            } else {
                Bdd::nith_var(&self.factory, var)?
            };
            literals.push(lit);
        }
        and_literals(&self.factory, &literals)
    }

    /// `this >= k`, built as an OR-tree over prefix bit patterns: at each bit position, either
    /// the bit is forced to `1` and the remaining threshold drops by that bit's weight, or the
    /// bit is `0` and the rest of the value alone must still clear the (unchanged) threshold.
    pub fn geq(&self, k: i64) -> Result<Bdd, BddError> {
        self.geq_rec(0, k)
    }

    fn geq_rec(&self, index: usize, k: i64) -> Result<Bdd, BddError> {
        if k <= 0 {
            return Ok(Bdd::one(&self.factory));
        }
        if index == self.vars.len() {
            return Ok(Bdd::zero(&self.factory));
        }
        let remaining_bits = self.vars.len() - index;
        let half = 1i64 << (remaining_bits - 1);
        let bit = Bdd::ith_var(&self.factory, self.vars[index])?;
        if k >= half {
            let rest = self.geq_rec(index + 1, k - half)?;
            bit.and(&rest)
        } else {
            let rest = self.geq_rec(index + 1, k)?;
            bit.or(&rest)
        }
    }

    /// `this <= k`, expressed as `not(geq(k + 1))`.
    pub fn leq(&self, k: i64) -> Result<Bdd, BddError> {
        self.geq(k + 1)?.not()
    }

    pub fn is_leq(&self, k: i64) -> Result<Bdd, BddError> {
        self.leq(k)
    }

    pub fn is_geq(&self, k: i64) -> Result<Bdd, BddError> {
        self.geq(k)
    }

    /// `geq(a) ∧ leq(b)`.
    pub fn range(&self, a: i64, b: i64) -> Result<Bdd, BddError> {
        self.geq(a)?.and(&self.leq(b)?)
    }
}

macro_rules! integer_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone)]
        pub struct $name(BddInteger);

        impl $name {
            pub fn at(factory: &BddFactory, base_var: VarId, width: u32) -> Result<Self, BddError> {
                Ok($name(BddInteger::at(factory, base_var, width)?))
            }
        }

        impl Deref for $name {
            type Target = BddInteger;
            fn deref(&self) -> &BddInteger {
                &self.0
            }
        }
    };
}

integer_newtype!(IcmpCodeInteger, "An ICMP code field, bound to its own base variable and width.");
integer_newtype!(IcmpTypeInteger, "An ICMP type field, bound to its own base variable and width.");
integer_newtype!(PacketLengthInteger, "A packet-length field, bound to its own base variable and width.");
