// model = "claude-opus-4-5"
// created = 2026-07-29
// modified = 2026-08-01
// driver = "Isaac Clayton"

//! Walks over the weave, and the weave merge itself.
//!
//! The weave is a flat, deterministically ordered serialization of the
//! operation tree: every atom appears exactly once, each atom is
//! preceded by its cause, and an atom's entire causal subtree sits
//! contiguously behind it (its *causal block*). These three facts make
//! tree traversal a matter of scanning a slice.
//!
//! # Causal blocks
//!
//! Given a slice whose first atom is the block head H, the causal block
//! of H is the maximal prefix in which every atom's cause has a
//! timestamp at or above H's. Equivalently: scan forward from H until
//! the first atom whose cause is older than H — that atom belongs to
//! the next sibling of H's parent, and ends the block.
//!
//! All walks take a visitor closure returning a bool: `true` to keep
//! going, `false` to cut the traversal short, as in a `break`.
//!
//! Complexity: every function here is linear in the block it scans.

use std::cmp::Ordering;

use crate::crdt::primitives::atom::Atom;

/// Visit each atom of the causal block headed at `block[0]`, excluding
/// the head itself. Returns the number of atoms in the scanned block
/// prefix, head included — so with a visitor that never breaks, this is
/// the size of the whole block.
pub fn walk_causal_block<F>(block: &[Atom], mut visit: F) -> usize
where
    F: FnMut(&Atom) -> bool,
{
    if block.is_empty() {
        return 0;
    }
    let head = &block[0];
    let mut i = 1;
    while i < block.len() {
        let atom = &block[i];
        if atom.cause.timestamp < head.id.timestamp {
            // First atom whose cause is older than the head starts the
            // next sibling; the block ends here.
            return i;
        }
        if !visit(atom) {
            break;
        }
        i += 1;
    }
    return i;
}

/// Visit only the direct children of the block head, in weave order
/// (which for children means descending priority, then descending id).
pub fn walk_children<F>(block: &[Atom], mut visit: F)
where
    F: FnMut(&Atom) -> bool,
{
    if block.is_empty() {
        return;
    }
    let head_id = block[0].id;
    walk_causal_block(block, |atom| {
        if atom.cause == head_id {
            return visit(atom);
        }
        return true;
    });
}

/// The size of the causal block headed at `block[0]`, head included.
pub fn causal_block_size(block: &[Atom]) -> usize {
    return walk_causal_block(block, |_| true);
}

/// Merge two weaves over the same sitemap into one.
///
/// Two-pointer interleave. At each step the heads either agree (atom
/// present on both sides), come from the same site (one side has simply
/// seen more of that site; the younger atom is emitted), or head
/// concurrent subtrees — in which case the whole causal block of the
/// greater head is copied over, keeping blocks contiguous.
///
/// Complexity: O(atoms)
pub fn merge_weaves(w1: &[Atom], w2: &[Atom]) -> Vec<Atom> {
    let mut weave = Vec::with_capacity(w1.len().max(w2.len()));
    let mut i = 0;
    let mut j = 0;
    while i < w1.len() && j < w2.len() {
        let a1 = w1[i];
        let a2 = w2[j];
        if a1 == a2 {
            weave.push(a1);
            i += 1;
            j += 1;
        } else if a1.id.site == a2.id.site {
            // Same site: the sides agree on this yarn's order, so the
            // younger atom is the one the other side hasn't caught up
            // to yet. Its cause is carried in the other side's suffix.
            if a1.id.timestamp < a2.id.timestamp {
                weave.push(a2);
                j += 1;
            } else {
                weave.push(a1);
                i += 1;
            }
        } else if a1.compare(&a2) != Ordering::Less {
            let n1 = i + causal_block_size(&w1[i..]);
            weave.extend_from_slice(&w1[i..n1]);
            i = n1;
        } else {
            let n2 = j + causal_block_size(&w2[j..]);
            weave.extend_from_slice(&w2[j..n2]);
            j = n2;
        }
    }
    weave.extend_from_slice(&w1[i..]);
    weave.extend_from_slice(&w2[j..]);
    return weave;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::primitives::atom::AtomId;
    use crate::crdt::primitives::atom::AtomValue;

    fn atom(site: u16, index: u32, timestamp: u32, cause: AtomId, ch: char) -> Atom {
        return Atom::new(
            AtomId::new(site, index, timestamp),
            cause,
            AtomValue::InsertChar(ch),
        );
    }

    /// A hand-built weave with two root blocks:
    ///
    /// ```text
    /// e(T6)
    /// a(T2) -> b(T3) -> c(T4)
    ///       \-> d(T5)
    /// ```
    ///
    /// Weave order: e, a, d, b, c — root children descend by id, and d
    /// precedes b among a's children because younger siblings come
    /// first.
    fn sample_weave() -> Vec<Atom> {
        let a = atom(0, 0, 2, AtomId::NULL, 'a');
        let b = atom(0, 1, 3, a.id, 'b');
        let c = atom(0, 2, 4, b.id, 'c');
        let d = atom(0, 3, 5, a.id, 'd');
        let e = atom(0, 4, 6, AtomId::NULL, 'e');
        return vec![e, a, d, b, c];
    }

    #[test]
    fn block_size_spans_descendants() {
        let weave = sample_weave();
        assert_eq!(causal_block_size(&weave), 1); // e alone
        assert_eq!(causal_block_size(&weave[1..]), 4); // a, d, b, c
        assert_eq!(causal_block_size(&weave[2..]), 1); // d alone
        assert_eq!(causal_block_size(&weave[3..]), 2); // b, c
        assert_eq!(causal_block_size(&[]), 0);
    }

    #[test]
    fn walk_stops_at_block_end() {
        let weave = sample_weave();
        // e's block ends right away: a's cause (the root) is older.
        let mut visited = Vec::new();
        let scanned = walk_causal_block(&weave, |a| {
            visited.push(a.id.timestamp);
            return true;
        });
        assert!(visited.is_empty());
        assert_eq!(scanned, 1);
        // a's block runs to the end of the slice.
        let mut visited = Vec::new();
        walk_causal_block(&weave[1..], |a| {
            visited.push(a.id.timestamp);
            return true;
        });
        assert_eq!(visited, vec![5, 3, 4]); // d, b, c
    }

    #[test]
    fn walk_breaks_early_when_visitor_says_so() {
        let weave = sample_weave();
        let mut visited = 0;
        let scanned = walk_causal_block(&weave[1..], |_| {
            visited += 1;
            return visited < 2;
        });
        assert_eq!(visited, 2);
        assert_eq!(scanned, 2);
    }

    #[test]
    fn walk_children_visits_direct_children_only() {
        let weave = sample_weave();
        let mut children = Vec::new();
        walk_children(&weave[1..], |a| {
            children.push(a.id.timestamp);
            return true;
        });
        assert_eq!(children, vec![5, 3]); // d and b, not grandchild c
    }

    #[test]
    fn merge_identical_weaves() {
        let weave = sample_weave();
        assert_eq!(merge_weaves(&weave, &weave), weave);
    }

    #[test]
    fn merge_same_site_prefix() {
        // One side has seen more of site 0 than the other.
        let weave = sample_weave();
        let shorter = vec![weave[0]];
        assert_eq!(merge_weaves(&weave, &shorter), weave);
        assert_eq!(merge_weaves(&shorter, &weave), weave);
    }

    #[test]
    fn merge_concurrent_root_blocks() {
        // Site 0 and site 1 each insert a root atom at T2; on equal
        // timestamps the lower site compares greater and lands first.
        let a = atom(0, 0, 2, AtomId::NULL, 'a');
        let b = atom(1, 0, 2, AtomId::NULL, 'b');
        let merged = merge_weaves(&[a], &[b]);
        assert_eq!(merged, vec![a, b]);
        assert_eq!(merge_weaves(&[b], &[a]), vec![a, b]);
    }

    #[test]
    fn merge_keeps_blocks_contiguous() {
        // Concurrent children of a shared root atom.
        let root = atom(0, 0, 2, AtomId::NULL, 'r');
        let x = atom(0, 1, 3, root.id, 'x');
        let y = atom(1, 0, 3, root.id, 'y');
        let x2 = atom(0, 2, 4, x.id, 'z');

        let w1 = vec![root, x, x2];
        let w2 = vec![root, y];
        let merged = merge_weaves(&w1, &w2);
        // x (site 0) outranks y at equal timestamp, and x's subtree
        // stays glued to x.
        assert_eq!(merged, vec![root, x, x2, y]);
        assert_eq!(merge_weaves(&w2, &w1), merged);
    }
}
