// model = "claude-opus-4-5"
// created = 2026-07-29
// modified = 2026-08-01
// driver = "Isaac Clayton"

//! Sitemap: mapping site UUIDs to compact indices.
//!
//! Storing a full 16-byte UUID in every atom would be expensive, so
//! atoms carry a 16-bit index into the sitemap instead. Unlike an
//! insertion-ordered table, the sitemap is *sorted* by byte-wise UUID
//! order, which is what makes it convergent: two replicas that know the
//! same set of sites agree on every index without coordination.
//!
//! The price is that inserting a site can shift the indices of the
//! sites above it. [`SiteMap::insert`] reports that shift as a
//! [`SiteRemap`], which callers apply to every stored atom.
//!
//! Complexity:
//! - index_of: O(log(sites))
//! - insert: O(sites)
//! - union: O(sites)

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;

use crate::site::SiteId;

/// A sparse mapping between old and new site indices.
///
/// Identity by default: lookups of unmapped indices return the index
/// unchanged, and an empty remap means nothing moved.
#[derive(Clone, Debug, Default)]
pub struct SiteRemap {
    map: FxHashMap<u16, u16>,
}

impl SiteRemap {
    /// Create an identity remap.
    pub fn new() -> SiteRemap {
        return SiteRemap { map: FxHashMap::default() };
    }

    /// Record that `from` now lives at `to`. Self-mappings are not stored.
    pub fn set(&mut self, from: u16, to: u16) {
        if from != to {
            self.map.insert(from, to);
        }
    }

    /// Where `index` lives now.
    #[inline]
    pub fn get(&self, index: u16) -> u16 {
        return self.map.get(&index).copied().unwrap_or(index);
    }

    /// Whether this remap moves nothing.
    #[inline]
    pub fn is_identity(&self) -> bool {
        return self.map.is_empty();
    }
}

/// The ordered list of sites known to a replica.
///
/// A site's position here is its 16-bit index used in every atom and
/// yarn. Strictly sorted by byte-wise UUID order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMap {
    sites: Vec<SiteId>,
}

impl SiteMap {
    /// Create an empty sitemap.
    pub fn new() -> SiteMap {
        return SiteMap { sites: Vec::new() };
    }

    /// Create a sitemap holding a single site.
    pub fn with_site(site: SiteId) -> SiteMap {
        return SiteMap { sites: vec![site] };
    }

    /// Number of known sites.
    #[inline]
    pub fn len(&self) -> usize {
        return self.sites.len();
    }

    /// Whether no sites are known.
    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.sites.is_empty();
    }

    /// The site at `index`, if any.
    pub fn get(&self, index: u16) -> Option<SiteId> {
        return self.sites.get(index as usize).copied();
    }

    /// Iterate over sites in index order.
    pub fn iter(&self) -> impl Iterator<Item = &SiteId> {
        return self.sites.iter();
    }

    /// The index where `site` is, or would be inserted.
    pub fn index_of(&self, site: &SiteId) -> usize {
        return self.sites.partition_point(|s| s < site);
    }

    /// Whether `site` is present.
    pub fn contains(&self, site: &SiteId) -> bool {
        let i = self.index_of(site);
        return i < self.sites.len() && self.sites[i] == *site;
    }

    /// Insert a fresh site, keeping the map sorted.
    ///
    /// Returns the new site's index and the remap describing how the
    /// existing indices shifted: identity except on indices at or above
    /// the insertion point, which move up by one.
    pub fn insert(&mut self, site: SiteId) -> (u16, SiteRemap) {
        let i = self.index_of(&site);
        debug_assert!(
            self.sites.get(i) != Some(&site),
            "site inserted twice: {site}",
        );
        let mut remap = SiteRemap::new();
        for j in i..self.sites.len() {
            remap.set(j as u16, j as u16 + 1);
        }
        self.sites.insert(i, site);
        return (i as u16, remap);
    }

    /// Ordered union of two sitemaps, duplicates kept once.
    pub fn union(&self, other: &SiteMap) -> SiteMap {
        let mut sites = Vec::with_capacity(self.sites.len() + other.sites.len());
        let mut i = 0;
        let mut j = 0;
        while i < self.sites.len() && j < other.sites.len() {
            let a = self.sites[i];
            let b = other.sites[j];
            if a < b {
                sites.push(a);
                i += 1;
            } else if a > b {
                sites.push(b);
                j += 1;
            } else {
                sites.push(a);
                i += 1;
                j += 1;
            }
        }
        sites.extend_from_slice(&self.sites[i..]);
        sites.extend_from_slice(&other.sites[j..]);
        return SiteMap { sites };
    }

    /// The remap from this sitemap's indices into `merged`, found by
    /// binary search of each site. O(sites * log(sites))
    pub fn remap_into(&self, merged: &SiteMap) -> SiteRemap {
        let mut remap = SiteRemap::new();
        for (i, site) in self.sites.iter().enumerate() {
            remap.set(i as u16, merged.index_of(site) as u16);
        }
        return remap;
    }
}
