pub mod common;
pub mod dot;

pub mod prelude {
    pub use crate::common::{BddHashMap, BddHashSet, Level, NodeIndex, VarId};
    pub use crate::dot::Dot;
}
