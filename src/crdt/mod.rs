// model = "claude-opus-4-5"
// created = "2026-07-29"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! The causal tree CRDT and its building blocks.

pub mod materialize;
pub mod primitives;
pub mod string;
pub mod tree;

/// Merging replica states. However states flow between replicas, every
/// edit each side has seen must survive into the result:
///
/// - commutative: whichever replica merges the other, the weaves
///   converge to the same bytes
/// - associative: relaying a state through an intermediate replica
///   changes nothing
/// - idempotent: receiving a state a second time adds nothing
pub trait Crdt {
    /// Fold another replica's state into this one.
    fn merge(&mut self, other: &Self);
}
