// model = "claude-opus-4-5"
// created = "2026-07-29"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Braid - a causal tree CRDT for collaboratively edited values.
//!
//! Every edit is an immutable atom linked to the atom it happened on;
//! replicas exchange whole states and merge them deterministically, so
//! any two replicas that have seen the same edits hold byte-identical
//! weaves — no matter who edited what, concurrently, in which order.
//!
//! # Quick Start
//!
//! ```
//! use braid::crdt::tree::CausalTree;
//!
//! // One replica builds a string.
//! let mut tree = CausalTree::new();
//! tree.insert_str()?;
//! for ch in "crdt".chars() {
//!     tree.insert_char(ch)?;
//! }
//! assert_eq!(tree.to_string(), "crdt");
//!
//! // Fork a second replica, edit both concurrently, and merge.
//! let mut remote = tree.fork()?;
//! remote.insert_char('!')?;
//! tree.delete_at(2)?; // deletes 'r'
//! tree.merge(&remote);
//! remote.merge(&tree);
//! assert_eq!(tree.to_string(), "cdt!");
//! assert_eq!(tree.weave(), remote.weave());
//! # Ok::<(), braid::error::TreeError>(())
//! ```

pub mod crdt;
pub mod error;
pub mod site;
