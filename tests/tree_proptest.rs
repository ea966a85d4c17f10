// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Property-based tests for local editing: the tree must behave
//! exactly like a plain char vec under positional inserts and deletes.

use proptest::prelude::*;

use braid::crdt::tree::CausalTree;
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

/// A random positional edit. Positions are percentages so they stay
/// valid however long the document currently is.
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

/// Apply one edit to the tree and to a plain char vec model.
///
/// Inserting "at position i" means inserting as a child of the char at
/// i, which lands right after it: model position i + 1. Position -1
/// inserts at the front.
fn apply_edit(tree: &mut CausalTree, model: &mut Vec<char>, op: &EditOp) {
    match op {
        EditOp::Insert { pos_pct, ch } => {
            let slots = model.len() + 1;
            let i = ((pos_pct * slots as f64) as usize).min(model.len()) as isize - 1;
            tree.insert_char_at(*ch, i).unwrap();
            model.insert((i + 1) as usize, *ch);
        }
        EditOp::Delete { pos_pct } => {
            if model.is_empty() {
                return;
            }
            let i = ((pos_pct * model.len() as f64) as usize).min(model.len() - 1);
            tree.delete_at(i as isize).unwrap();
            model.remove(i);
        }
    }
}

// =============================================================================
// Model conformance
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of positional edits materializes exactly like the
    /// same sequence applied to a char vec.
    #[test]
    fn editing_matches_a_simple_char_vec(
        ops in prop::collection::vec(arbitrary_edit_op(), 1..60),
    ) {
        let mut tree = tree_with_sites(&[1]);
        let mut model: Vec<char> = Vec::new();

        for op in &ops {
            apply_edit(&mut tree, &mut model, op);
        }

        let expected: String = model.iter().collect();
        prop_assert_eq!(tree.to_string(), expected);
        prop_assert_eq!(tree.len(), model.len());
        prop_assert!(tree.validate().is_ok());
    }

    /// The weave keeps its invariants after every single edit, not
    /// just at the end.
    #[test]
    fn invariants_hold_after_every_edit(
        ops in prop::collection::vec(arbitrary_edit_op(), 1..30),
    ) {
        let mut tree = tree_with_sites(&[1]);
        let mut model: Vec<char> = Vec::new();

        for op in &ops {
            apply_edit(&mut tree, &mut model, op);
            prop_assert!(tree.validate().is_ok());
        }
    }
}

// =============================================================================
// Time travel
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Viewing the tree at its own current cut reproduces the present.
    #[test]
    fn view_at_now_matches_the_present(
        ops in prop::collection::vec(arbitrary_edit_op(), 0..40),
    ) {
        let mut tree = tree_with_sites(&[1]);
        let mut model: Vec<char> = Vec::new();

        for op in &ops {
            apply_edit(&mut tree, &mut model, op);
        }

        let view = tree.view_at(&tree.now()).unwrap();
        prop_assert_eq!(view.to_string(), tree.to_string());
        prop_assert_eq!(view.weave(), tree.weave());
    }

    /// A cut captured mid-edit reproduces the state at that moment,
    /// and stays valid however the tree grows afterwards.
    #[test]
    fn view_at_reproduces_any_captured_moment(
        before in prop::collection::vec(arbitrary_edit_op(), 0..20),
        after in prop::collection::vec(arbitrary_edit_op(), 0..20),
    ) {
        let mut tree = tree_with_sites(&[1]);
        let mut model: Vec<char> = Vec::new();

        for op in &before {
            apply_edit(&mut tree, &mut model, op);
        }
        let captured = tree.now();
        let snapshot: String = model.iter().collect();

        for op in &after {
            apply_edit(&mut tree, &mut model, op);
        }

        let view = tree.view_at(&captured).unwrap();
        prop_assert_eq!(view.to_string(), snapshot);
        prop_assert!(view.validate().is_ok());
    }
}
