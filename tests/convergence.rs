// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Convergence tests: the merge algebra and replica divergence.
//!
//! These verify:
//! 1. Merge is commutative, associative, and idempotent with respect
//!    to the materialized value — and in fact byte-identical on the
//!    weave, which is the stronger convergence this design promises.
//! 2. Merging an empty replica is a no-op up to the clock bump.
//! 3. Splitting an edit sequence across a fork and re-merging matches
//!    applying the whole sequence on one replica.

use proptest::prelude::*;

use braid::crdt::tree::CausalTree;
use braid::crdt::Crdt;
use braid::error::TreeError;
use braid::site::SiteId;
use braid::site::SiteIdGen;
use uuid::Uuid;

// =============================================================================
// Test helpers
// =============================================================================

fn tree_with_sites(ids: &[u128]) -> CausalTree {
    let ids = ids.iter().map(|&n| SiteId::new(Uuid::from_u128(n))).collect();
    return CausalTree::with_site_gen(SiteIdGen::sequence(ids));
}

#[derive(Clone, Debug)]
enum EditOp {
    Insert { pos_pct: f64, ch: char },
    Delete { pos_pct: f64 },
}

fn arbitrary_edit_op() -> impl Strategy<Value = EditOp> {
    return prop_oneof![
        3 => (0.0..=1.0f64, prop::char::range('a', 'z'))
            .prop_map(|(pos_pct, ch)| EditOp::Insert { pos_pct, ch }),
        1 => (0.0..=1.0f64)
            .prop_map(|pos_pct| EditOp::Delete { pos_pct }),
    ];
}

/// Apply an edit using the tree's own length to resolve positions.
fn apply_edit(tree: &mut CausalTree, op: &EditOp) {
    let len = tree.len();
    match op {
        EditOp::Insert { pos_pct, ch } => {
            let i = ((pos_pct * (len + 1) as f64) as usize).min(len) as isize - 1;
            tree.insert_char_at(*ch, i).unwrap();
        }
        EditOp::Delete { pos_pct } => {
            if len == 0 {
                return;
            }
            let i = ((pos_pct * len as f64) as usize).min(len - 1);
            tree.delete_at(i as isize).unwrap();
        }
    }
}

/// Check the convergence contract between two replicas that have seen
/// the same atoms: byte-identical weaves, equal materializations, and
/// intact invariants on both.
fn assert_converged(a: &CausalTree, b: &CausalTree) -> Result<(), TestCaseError> {
    prop_assert_eq!(a.weave(), b.weave());
    prop_assert_eq!(a.to_string(), b.to_string());
    prop_assert!(a.validate().is_ok());
    prop_assert!(b.validate().is_ok());
    return Ok(());
}

// =============================================================================
// Merging an empty replica
// =============================================================================

#[test]
fn merging_an_empty_replica_changes_nothing_but_the_clock() {
    let mut a = tree_with_sites(&[1]);
    for ch in "weave".chars() {
        a.insert_char(ch).unwrap();
    }
    let empty = tree_with_sites(&[9]);

    let weave = a.weave().to_vec();
    let cursor = a.cursor();
    let before = a.timestamp();
    a.merge(&empty);

    assert_eq!(a.weave(), &weave[..]);
    assert_eq!(a.cursor(), cursor);
    assert_eq!(a.to_string(), "weave");
    assert!(a.timestamp() > before);
    assert_eq!(a.sitemap().len(), 2); // it did learn the empty site
    assert!(a.validate().is_ok());
}

#[test]
fn merging_into_an_empty_replica_adopts_the_remote() {
    let mut a = tree_with_sites(&[1]);
    for ch in "hi".chars() {
        a.insert_char(ch).unwrap();
    }
    let mut empty = tree_with_sites(&[9]);
    empty.merge(&a);

    assert_eq!(empty.to_string(), "hi");
    assert!(empty.validate().is_ok());
}

// =============================================================================
// Merge algebra
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// merge(A, B) and merge(B, A) produce byte-identical weaves.
    #[test]
    fn merge_commutes(
        shared in prop::collection::vec(arbitrary_edit_op(), 0..15),
        ops_a in prop::collection::vec(arbitrary_edit_op(), 0..20),
        ops_b in prop::collection::vec(arbitrary_edit_op(), 0..20),
    ) {
        let mut a = tree_with_sites(&[1, 2]);
        for op in &shared {
            apply_edit(&mut a, op);
        }
        let mut b = a.fork().unwrap();
        for op in &ops_a {
            apply_edit(&mut a, op);
        }
        for op in &ops_b {
            apply_edit(&mut b, op);
        }

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_converged(&ab, &ba)?;
    }

    /// Merging is associative and idempotent on the weave.
    #[test]
    fn merge_is_associative_and_idempotent(
        ops_a in prop::collection::vec(arbitrary_edit_op(), 0..12),
        ops_b in prop::collection::vec(arbitrary_edit_op(), 0..12),
        ops_c in prop::collection::vec(arbitrary_edit_op(), 0..12),
    ) {
        let mut a = tree_with_sites(&[1, 2, 3]);
        for op in &ops_a {
            apply_edit(&mut a, op);
        }
        let mut b = a.fork().unwrap();
        let mut c = b.fork().unwrap();
        for op in &ops_b {
            apply_edit(&mut b, op);
        }
        for op in &ops_c {
            apply_edit(&mut c, op);
        }

        // (A ⊔ B) ⊔ C
        let mut left = a.clone();
        left.merge(&b);
        left.merge(&c);
        // A ⊔ (B ⊔ C)
        let mut bc = b.clone();
        bc.merge(&c);
        let mut right = a.clone();
        right.merge(&bc);
        assert_converged(&left, &right)?;

        // Idempotent: merging the same remote twice adds nothing.
        let once = left.weave().to_vec();
        left.merge(&c);
        prop_assert_eq!(left.weave(), &once[..]);

        // Self-merge adds nothing either.
        let mut selfed = right.clone();
        selfed.merge(&right);
        prop_assert_eq!(selfed.weave(), right.weave());
    }

    /// The trait-level merge is the tree merge.
    #[test]
    fn crdt_trait_merge_matches_inherent_merge(
        ops in prop::collection::vec(arbitrary_edit_op(), 0..15),
    ) {
        let mut a = tree_with_sites(&[1, 2]);
        let mut b = a.fork().unwrap();
        for op in &ops {
            apply_edit(&mut b, op);
        }

        let mut via_trait = a.clone();
        Crdt::merge(&mut via_trait, &b);
        a.merge(&b);
        prop_assert_eq!(via_trait.weave(), a.weave());
    }
}

// =============================================================================
// Partitioned editing
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Splitting a sequential edit session at any point — prefix on
    /// the origin, suffix on a fork — and re-merging materializes the
    /// same value as never having forked at all.
    #[test]
    fn partitioned_session_matches_serial_application(
        ops in prop::collection::vec(arbitrary_edit_op(), 1..40),
        split_pct in 0.0..=1.0f64,
    ) {
        let mut serial = tree_with_sites(&[1, 2]);
        for op in &ops {
            apply_edit(&mut serial, op);
        }

        let split = ((split_pct * ops.len() as f64) as usize).min(ops.len());
        let mut a = tree_with_sites(&[1, 2]);
        for op in &ops[..split] {
            apply_edit(&mut a, op);
        }
        let mut b = a.fork().unwrap();
        for op in &ops[split..] {
            apply_edit(&mut b, op);
        }

        a.merge(&b);
        b.merge(&a);
        prop_assert_eq!(a.to_string(), serial.to_string());
        assert_converged(&a, &b)?;
    }

    /// Two replicas that diverge and exchange states in any
    /// interleaving still converge.
    #[test]
    fn repeated_exchange_converges(
        rounds in prop::collection::vec(
            (
                prop::collection::vec(arbitrary_edit_op(), 0..6),
                prop::collection::vec(arbitrary_edit_op(), 0..6),
            ),
            1..4,
        ),
    ) {
        let mut a = tree_with_sites(&[1, 2]);
        let mut b = a.fork().unwrap();

        for (ops_a, ops_b) in &rounds {
            for op in ops_a {
                apply_edit(&mut a, op);
            }
            for op in ops_b {
                apply_edit(&mut b, op);
            }
            a.merge(&b);
            b.merge(&a);
            assert_converged(&a, &b)?;
        }
    }
}
