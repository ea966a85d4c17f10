// model = "claude-opus-4-5"
// created = 2026-07-29
// modified = 2026-08-01
// driver = "Isaac Clayton"

//! Building blocks the causal tree is assembled from.
//!
//! Each primitive is designed to be:
//!
//! - Self-contained: usable without the tree wrapped around it
//! - Tested: unit tests live next to the code
//! - Documented: clear complexity guarantees
//!
//! # Primitives
//!
//! ## Atoms
//! - `AtomId`: identifier triple (site, yarn index, Lamport timestamp)
//! - `AtomValue`: the closed set of operations, with priorities and
//!   child rules
//! - `Atom`: one immutable edit record (id, cause, value)
//!
//! ## Clocks
//! - `LamportClock`: per-replica monotonic 32-bit counter
//! - `Weft`: per-site timestamp cut, partially ordered
//!
//! ## Sites
//! - `SiteMap`: sorted site UUIDs giving each site its 16-bit index
//! - `SiteRemap`: identity-by-default index rewrite applied on
//!   fork/merge
//!
//! ## Weave
//! - causal-block walks and the two-pointer weave merge

pub mod atom;
pub mod clock;
pub mod sitemap;
pub mod weave;

// Re-exports for convenience
pub use atom::Atom;
pub use atom::AtomId;
pub use atom::AtomValue;
pub use clock::LamportClock;
pub use clock::Weft;
pub use sitemap::SiteMap;
pub use sitemap::SiteRemap;
pub use weave::causal_block_size;
pub use weave::merge_weaves;
pub use weave::walk_causal_block;
pub use weave::walk_children;
