// model = "claude-opus-4-5"
// created = "2026-07-29"
// modified = "2026-08-01"
// driver = "Isaac Clayton"

//! Error taxonomy for causal tree operations.
//!
//! Every fallible operation returns one of these variants to the caller;
//! nothing is recovered internally. A failed mutation leaves the tree
//! unchanged, so callers can retry or report without re-syncing state.

use thiserror::Error;

use crate::crdt::primitives::atom::AtomId;

/// Errors surfaced by causal tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A fork would exceed the 16-bit site index space.
    #[error("reached limit of sites: 2^16 (65,536)")]
    SiteLimitExceeded,

    /// The local Lamport clock exhausted the 32-bit timestamp space.
    #[error("reached limit of states: 2^32 (4,294,967,296)")]
    StateLimitExceeded,

    /// Delete was called while the cursor was null.
    #[error("can't delete with a null cursor")]
    NoAtomToDelete,

    /// An integer position fell outside the live range.
    #[error("cursor index out of range")]
    CursorOutOfRange,

    /// A weft's cardinality didn't match the number of yarns.
    #[error("weft length doesn't match the number of sites")]
    WeftInvalidLength,

    /// A weft cut some atom off from its cause.
    #[error("weft disconnects an atom from its cause")]
    WeftDisconnected,

    /// The child value is not permitted under the parent value.
    #[error("invalid child {child} under {parent}")]
    InvalidChild {
        /// Kind of the would-be parent atom.
        parent: &'static str,
        /// Kind of the rejected child value.
        child: &'static str,
    },

    /// A value handle was requested for an atom of another kind.
    #[error("atom {id} is not {expected}")]
    WrongValueKind {
        /// The atom that was looked up.
        id: AtomId,
        /// What the handle required the atom to be.
        expected: &'static str,
    },

    /// The weave violates a structural invariant. Reported, never
    /// silently repaired.
    #[error("corrupt weave: {0}")]
    Corrupt(&'static str),
}
