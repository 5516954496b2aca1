use common::prelude::VarId;
use thiserror::Error;

/// The engine's error taxonomy. Every fallible public operation returns `Result<_, BddError>`;
/// nothing on a caller-reachable path panics or silently clamps.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BddError {
    /// Invalid variable number, `varNum` decreased, bad cache ratio, mismatched array lengths
    /// in a batch `set`, and similar construction/setter misuse.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A variable index was used before it was declared via `setVarNum`/`growVarNum`.
    #[error("variable {0} is out of range for this factory's varNum")]
    UnknownVariable(VarId),

    /// An operation was attempted on a handle whose factory has been torn down, or whose
    /// refcount bookkeeping detected it had already been freed.
    #[error("use of a freed or torn-down BDD handle (node {node}, factory epoch at creation {created_epoch}, factory epoch now {current_epoch})")]
    UseAfterFree {
        node: u32,
        created_epoch: u64,
        current_epoch: u64,
    },

    /// Two operands belong to different factory instances.
    #[error("operands belong to different factories (factory {a} vs factory {b})")]
    CrossFactory { a: u64, b: u64 },

    /// The node table could not grow enough to satisfy an allocation.
    #[error("node table exhausted: garbage collection and growth to {attempted_nodes} slots were not enough")]
    OutOfMemory { attempted_nodes: usize },

    /// `set`/`setAll` was called on a pairing that has already been frozen and installed.
    #[error("attempted to mutate a frozen (installed) variable pairing")]
    FrozenPairingMutation,
}
