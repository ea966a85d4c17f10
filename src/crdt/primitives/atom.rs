// model = "claude-opus-4-5"
// created = 2026-07-29
// modified = 2026-08-01
// driver = "Isaac Clayton"

//! Atoms: the immutable records the whole tree is made of.
//!
//! # Identifier Design
//!
//! An [`AtomId`] is a (site, index, timestamp) triple:
//! - `site`: 16-bit index into the sitemap of the site that created it
//! - `index`: position of the atom in that site's yarn
//! - `timestamp`: the site's Lamport time at creation
//!
//! Ids are designed to be:
//! - Globally unique: a site never reuses a timestamp
//! - Totally ordered: comparable deterministically on every replica
//! - Compact: 10 bytes, `Copy`
//!
//! # Ordering
//!
//! Ids compare ascending by timestamp (older first), then *descending*
//! by site. The inversion on site keeps newly joined sites, which
//! receive higher indices, from preempting existing sites' ordering on
//! the prefix of history that predates them. Atoms compare ascending by
//! value priority first, then by id; siblings are laid out in the weave
//! in descending atom order.

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::crdt::primitives::sitemap::SiteRemap;
use crate::error::TreeError;

/// The unique identifier of an atom.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomId {
    /// Index in the sitemap of the site that created this atom.
    pub site: u16,
    /// Order of creation of this atom within its site's yarn.
    pub index: u32,
    /// The site's Lamport timestamp when the atom was created.
    pub timestamp: u32,
}

impl AtomId {
    /// The null id: cause of root-level atoms, and the "unset" cursor.
    pub const NULL: AtomId = AtomId { site: 0, index: 0, timestamp: 0 };

    /// Create a new atom id.
    pub fn new(site: u16, index: u32, timestamp: u32) -> AtomId {
        return AtomId { site, index, timestamp };
    }

    /// Whether this is the null id. Timestamp 0 is reserved for it.
    #[inline]
    pub fn is_null(&self) -> bool {
        return self.timestamp == 0;
    }

    /// Rewrite the site index through a remap. Index and timestamp are
    /// untouched: remapping is a representation change, not an edit.
    pub fn remap_site(&self, remap: &SiteRemap) -> AtomId {
        return AtomId {
            site: remap.get(self.site),
            index: self.index,
            timestamp: self.timestamp,
        };
    }
}

impl fmt::Debug for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "S{}@T{:02}", self.site, self.timestamp);
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "S{}@T{:02}", self.site, self.timestamp);
    }
}

impl PartialOrd for AtomId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for AtomId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ascending by timestamp (older first), descending by site
        // (younger first). A site creates at most one atom per
        // timestamp, so the index tail only keeps the order total.
        return self
            .timestamp
            .cmp(&other.timestamp)
            .then_with(|| other.site.cmp(&self.site))
            .then_with(|| self.index.cmp(&other.index));
    }
}

/// A tree operation carried by an atom.
///
/// This is a closed set: new kinds of values require a central addition
/// here, along with their priority and child rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomValue {
    /// A single codepoint, inserted to the right of its cause.
    InsertChar(char),
    /// A string container. Its causal block holds the string's chars.
    InsertStr,
    /// A counter container. Its causal block holds increments.
    InsertCounter,
    /// A signed increment within a counter.
    InsertAdd(i32),
    /// Tombstone marking its cause as deleted.
    Delete,
}

impl AtomValue {
    /// Placement priority among siblings: higher sorts first in the
    /// weave, so deletions always precede content under one cause.
    pub fn priority(&self) -> i32 {
        return match self {
            AtomValue::InsertChar(_) => 0,
            AtomValue::InsertStr => 30,
            AtomValue::InsertCounter => 30,
            AtomValue::InsertAdd(_) => 30,
            AtomValue::Delete => 100,
        };
    }

    /// Short kind name, used in error reports.
    pub fn kind(&self) -> &'static str {
        return match self {
            AtomValue::InsertChar(_) => "char",
            AtomValue::InsertStr => "string container",
            AtomValue::InsertCounter => "counter container",
            AtomValue::InsertAdd(_) => "counter increment",
            AtomValue::Delete => "delete",
        };
    }

    /// Whether this value heads a container block.
    #[inline]
    pub fn is_container(&self) -> bool {
        return matches!(self, AtomValue::InsertStr | AtomValue::InsertCounter);
    }

    /// Check that `child` may be appended under this value.
    pub fn validate_child(&self, child: &AtomValue) -> Result<(), TreeError> {
        let ok = match self {
            AtomValue::InsertChar(_) => {
                matches!(child, AtomValue::InsertChar(_) | AtomValue::Delete)
            }
            AtomValue::InsertStr => {
                matches!(child, AtomValue::InsertChar(_) | AtomValue::Delete)
            }
            AtomValue::InsertCounter => {
                matches!(child, AtomValue::InsertAdd(_) | AtomValue::Delete)
            }
            AtomValue::InsertAdd(_) => matches!(child, AtomValue::InsertAdd(_)),
            AtomValue::Delete => false,
        };
        if ok {
            return Ok(());
        }
        return Err(TreeError::InvalidChild {
            parent: self.kind(),
            child: child.kind(),
        });
    }
}

impl fmt::Display for AtomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            AtomValue::InsertChar(ch) => write!(f, "{}", ch),
            AtomValue::InsertStr => write!(f, "STR:"),
            AtomValue::InsertCounter => write!(f, "CTR:"),
            AtomValue::InsertAdd(delta) => write!(f, "{:+}", delta),
            AtomValue::Delete => write!(f, "⌫"),
        };
    }
}

/// An atomic operation within the replicated tree.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    /// Identifier of this atom.
    pub id: AtomId,
    /// Identifier of the parent atom; null for root-level atoms.
    /// `cause.timestamp < id.timestamp` for every atom.
    pub cause: AtomId,
    /// The operation this atom performs.
    pub value: AtomValue,
}

impl Atom {
    /// Create a new atom.
    pub fn new(id: AtomId, cause: AtomId, value: AtomValue) -> Atom {
        return Atom { id, cause, value };
    }

    /// Relative order between atoms: priority ascending, then id.
    /// Siblings appear in the weave in descending `compare` order.
    pub fn compare(&self, other: &Atom) -> Ordering {
        return self
            .value
            .priority()
            .cmp(&other.value.priority())
            .then_with(|| self.id.cmp(&other.id));
    }

    /// Rewrite both site references through a remap.
    pub fn remap_site(&self, remap: &SiteRemap) -> Atom {
        return Atom {
            id: self.id.remap_site(remap),
            cause: self.cause.remap_site(remap),
            value: self.value,
        };
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "Atom({:?}<-{:?} {})", self.id, self.cause, self.value);
    }
}
