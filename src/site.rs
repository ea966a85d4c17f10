// model = "claude-opus-4-5"
// created = "2026-07-29"
// modified = "2026-08-01"
// driver = "Isaac Clayton"

//! Replica identity.
//!
//! Every replica (site) is named by a 128-bit UUID. Sites are ordered by
//! the byte-wise order of their UUIDs, which is what the sitemap sorts
//! by, so id generation has a direct effect on convergence order: a
//! time-ordered UUID (v1-style) makes freshly forked sites tend to sort
//! after every existing site, keeping remaps rare.
//!
//! Generation is injectable. The tree treats ids as opaque inputs, so
//! tests can substitute a deterministic sequence and replay exact
//! scenarios.

use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// A site identifier: a 128-bit UUID compared byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteId(Uuid);

impl SiteId {
    /// Wrap an existing UUID.
    pub fn new(uuid: Uuid) -> SiteId {
        return SiteId(uuid);
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        return &self.0;
    }

    /// The raw 16 bytes, in comparison order.
    pub fn as_bytes(&self) -> &[u8; 16] {
        return self.0.as_bytes();
    }
}

impl fmt::Debug for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "SiteId({})", self.0);
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}

/// The injectable source of fresh site ids.
///
/// A tree holds one of these and draws from it on fork. The source is a
/// replaceable closure slot: the default produces time-ordered UUIDv1
/// values with a random node id, and tests swap in [`SiteIdGen::sequence`]
/// for deterministic runs.
#[derive(Clone)]
pub struct SiteIdGen {
    source: Arc<dyn Fn() -> SiteId + Send + Sync>,
}

impl SiteIdGen {
    /// Time-ordered UUIDv1 source with a random node id.
    pub fn random_v1() -> SiteIdGen {
        let mut node = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut node);
        return SiteIdGen {
            source: Arc::new(move || SiteId(Uuid::now_v1(&node))),
        };
    }

    /// Source backed by an arbitrary closure.
    pub fn from_fn(f: impl Fn() -> SiteId + Send + Sync + 'static) -> SiteIdGen {
        return SiteIdGen { source: Arc::new(f) };
    }

    /// Deterministic source yielding the given ids in order.
    ///
    /// The counter is shared across clones, so a replica and its forks
    /// never draw the same id twice. Panics when exhausted: a test that
    /// forks more than it planned for should fail loudly.
    pub fn sequence(ids: Vec<SiteId>) -> SiteIdGen {
        let next = AtomicUsize::new(0);
        return SiteIdGen {
            source: Arc::new(move || {
                let i = next.fetch_add(1, Ordering::Relaxed);
                return ids[i];
            }),
        };
    }

    /// Draw the next site id.
    pub fn next_id(&self) -> SiteId {
        return (self.source)();
    }
}

impl Default for SiteIdGen {
    fn default() -> Self {
        return SiteIdGen::random_v1();
    }
}

impl fmt::Debug for SiteIdGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "SiteIdGen");
    }
}
