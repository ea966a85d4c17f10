// model = "claude-opus-4-5"
// created = "2026-07-29"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! The causal tree: a replicated tree of edit operations.
//!
//! A `CausalTree` is one replica's view of a collaboratively edited
//! value. Key design decisions:
//!
//! 1. **Append-only atoms**: every edit — including deletion — is a new
//!    atom linked to the atom it happened on. Atoms are never destroyed,
//!    so any two replicas can always reconcile.
//!
//! 2. **The weave**: atoms live in a single flat vec, ordered by a
//!    deterministic rule (causes before effects, siblings by descending
//!    priority and id). Two replicas that have seen the same atoms hold
//!    byte-identical weaves, which is what convergence means here.
//!
//! 3. **Yarns**: every site also keeps each site's atoms in creation
//!    order. Yarns make merge cheap (union of prefixes) and give each
//!    atom a stable (site, index) address.
//!
//! 4. **Compact site indices**: atoms store a 16-bit sitemap index, not
//!    a 16-byte UUID. The sitemap is sorted, so indices shift when a
//!    smaller site joins; fork and merge rewrite atoms through a
//!    `SiteRemap` when that happens.
//!
//! This data structure allows for 64K sites and 4G atoms in total.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;

use crate::crdt::primitives::atom::Atom;
use crate::crdt::primitives::atom::AtomId;
use crate::crdt::primitives::atom::AtomValue;
use crate::crdt::primitives::clock::LamportClock;
use crate::crdt::primitives::clock::Weft;
use crate::crdt::primitives::sitemap::SiteMap;
use crate::crdt::primitives::weave::merge_weaves;
use crate::crdt::primitives::weave::walk_causal_block;
use crate::crdt::primitives::weave::walk_children;
use crate::crdt::Crdt;
use crate::error::TreeError;
use crate::site::SiteId;
use crate::site::SiteIdGen;

/// One replica of a causal tree.
///
/// Cloning produces an independent deep copy with the *same* site
/// identity, useful for scratch replicas; use [`CausalTree::fork`] to
/// mint a copy that can edit concurrently.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CausalTree {
    /// The flat representation of the operation tree.
    pub(crate) weave: Vec<Atom>,
    /// Cause of the next local insertion; null points at the root.
    pub(crate) cursor: AtomId,
    /// Per-site append-only atom logs, indexed by sitemap position.
    pub(crate) yarns: Vec<Vec<Atom>>,
    /// The ordered list of site UUIDs.
    pub(crate) sitemap: SiteMap,
    /// This replica's site UUID.
    pub(crate) site_id: SiteId,
    /// This replica's Lamport clock.
    pub(crate) clock: LamportClock,
    /// Source of site ids for forks. Not part of the replicated state.
    #[serde(skip, default)]
    pub(crate) site_gen: SiteIdGen,
}

impl CausalTree {
    /// Create an empty tree with a freshly generated site id.
    pub fn new() -> CausalTree {
        return CausalTree::with_site_gen(SiteIdGen::random_v1());
    }

    /// Create an empty tree drawing site ids from the given source.
    pub fn with_site_gen(site_gen: SiteIdGen) -> CausalTree {
        let site_id = site_gen.next_id();
        return CausalTree {
            weave: Vec::new(),
            cursor: AtomId::NULL,
            yarns: vec![Vec::new()],
            sitemap: SiteMap::with_site(site_id),
            site_id,
            clock: LamportClock::new(),
            site_gen,
        };
    }

    // ---- Accessors

    /// The weave: every atom, in canonical order.
    pub fn weave(&self) -> &[Atom] {
        return &self.weave;
    }

    /// The id the next local insertion will use as its cause.
    pub fn cursor(&self) -> AtomId {
        return self.cursor;
    }

    /// This replica's site UUID.
    pub fn site_id(&self) -> SiteId {
        return self.site_id;
    }

    /// This replica's current Lamport time.
    pub fn timestamp(&self) -> u32 {
        return self.clock.time();
    }

    /// The ordered list of known sites.
    pub fn sitemap(&self) -> &SiteMap {
        return &self.sitemap;
    }

    /// The atoms created by the site at `site` index, in creation order.
    pub fn yarn(&self, site: u16) -> Option<&[Atom]> {
        return self.yarns.get(site as usize).map(Vec::as_slice);
    }

    /// Look up an atom by id. O(1)
    pub fn atom(&self, id: AtomId) -> Option<Atom> {
        if id.is_null() {
            return None;
        }
        return self
            .yarns
            .get(id.site as usize)?
            .get(id.index as usize)
            .copied();
    }

    /// Number of live tree positions (container heads and their
    /// contents both count). O(atoms)
    pub fn len(&self) -> usize {
        return self.filter_deleted().len();
    }

    /// Whether no live positions remain.
    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// This replica's index in the sitemap. O(log sites)
    pub(crate) fn self_index(&self) -> u16 {
        return self.sitemap.index_of(&self.site_id) as u16;
    }

    /// Position of an atom within the weave; `None` for the null id.
    /// O(atoms)
    pub(crate) fn weave_index(&self, id: AtomId) -> Option<usize> {
        if id.is_null() {
            return None;
        }
        return self.weave.iter().position(|a| a.id == id);
    }

    // ---- Fork

    /// Fork this replica into an independent one with a fresh site id.
    ///
    /// Both replicas advance their clock; the new site is inserted into
    /// the shared sitemap, remapping existing atoms if its UUID sorts
    /// before an existing site's. O(atoms)
    pub fn fork(&mut self) -> Result<CausalTree, TreeError> {
        if self.sitemap.len() > u16::MAX as usize {
            return Err(TreeError::SiteLimitExceeded);
        }
        self.clock.tick().ok_or(TreeError::StateLimitExceeded)?;
        let site_id = self.site_gen.next_id();
        let (index, remap) = self.sitemap.insert(site_id);
        if !remap.is_identity() {
            for yarn in self.yarns.iter_mut() {
                for atom in yarn.iter_mut() {
                    *atom = atom.remap_site(&remap);
                }
            }
            for atom in self.weave.iter_mut() {
                *atom = atom.remap_site(&remap);
            }
            self.cursor = self.cursor.remap_site(&remap);
        }
        self.yarns.insert(index as usize, Vec::new());
        tracing::debug!(site = %site_id, sites = self.sitemap.len(), "forked replica");

        let mut remote = self.clone();
        remote.site_id = site_id;
        return Ok(remote);
    }

    // ---- Merge

    /// Merge a remote replica's state into this one.
    ///
    /// Merge never moves the cursor to remote edits; it only remaps it
    /// and repairs it if the atom it points at was deleted remotely.
    /// O(atoms + sites*log(sites))
    pub fn merge(&mut self, remote: &CausalTree) {
        // 1. Merge sitemaps and compute both index remaps.
        let sitemap = self.sitemap.union(&remote.sitemap);
        let local_remap = self.sitemap.remap_into(&sitemap);
        let remote_remap = remote.sitemap.remap_into(&sitemap);

        // 2. Remap local atoms into the merged index space.
        let mut yarns: Vec<Vec<Atom>> = vec![Vec::new(); sitemap.len()];
        if !local_remap.is_identity() {
            for (i, yarn) in self.yarns.iter().enumerate() {
                let to = local_remap.get(i as u16) as usize;
                yarns[to] = yarn.iter().map(|a| a.remap_site(&local_remap)).collect();
            }
            for atom in self.weave.iter_mut() {
                *atom = atom.remap_site(&local_remap);
            }
        } else {
            for (i, yarn) in self.yarns.iter().enumerate() {
                yarns[i] = yarn.clone();
            }
        }

        // 3. Union yarns: the longer prefix wins. The common prefix
        //    already agrees, since an atom's (site, index) address is
        //    fixed at creation.
        for (i, yarn) in remote.yarns.iter().enumerate() {
            let to = remote_remap.get(i as u16) as usize;
            let known = yarns[to].len();
            for atom in yarn.iter().skip(known) {
                yarns[to].push(atom.remap_site(&remote_remap));
            }
        }

        // 4. Interleave the weaves.
        let remote_weave: Vec<Atom> = remote
            .weave
            .iter()
            .map(|a| a.remap_site(&remote_remap))
            .collect();
        self.weave = merge_weaves(&self.weave, &remote_weave);
        self.yarns = yarns;
        self.sitemap = sitemap;
        self.clock.update(remote.clock.time());

        // 5. Repair the cursor if it was deleted on the remote.
        self.cursor = self.cursor.remap_site(&local_remap);
        self.repair_cursor();
        tracing::debug!(
            atoms = self.weave.len(),
            sites = self.sitemap.len(),
            "merged remote replica"
        );
    }

    // ---- Deletion predicate and cursor repair

    /// Whether the atom has a Delete child. Children arrive in
    /// descending priority, so only the leading run needs checking.
    /// O(block size)
    pub(crate) fn is_deleted(&self, id: AtomId) -> bool {
        let index = match self.weave_index(id) {
            Some(index) => index,
            None => return false,
        };
        let mut deleted = false;
        walk_children(&self.weave[index..], |child| {
            if let AtomValue::Delete = child.value {
                deleted = true;
                return false;
            }
            if child.value.priority() < AtomValue::Delete.priority() {
                return false;
            }
            return true;
        });
        return deleted;
    }

    /// Walk the cursor up to the first non-deleted ancestor (or the
    /// root). O(height * block size)
    pub(crate) fn repair_cursor(&mut self) {
        while self.is_deleted(self.cursor) {
            match self.atom(self.cursor) {
                Some(atom) => self.cursor = atom.cause,
                None => break,
            }
        }
    }

    // ---- Time travel

    /// The current cut: the timestamp of each site's last known atom.
    pub fn now(&self) -> Weft {
        let mut weft = Weft::new(self.yarns.len());
        for (i, yarn) in self.yarns.iter().enumerate() {
            if let Some(last) = yarn.last() {
                weft.set(i as u16, last.id.timestamp);
            }
        }
        return weft;
    }

    /// Translate a weft into per-yarn cut indices, verifying that the
    /// cut doesn't orphan any atom from its cause. O(atoms)
    fn check_weft(&self, weft: &Weft) -> Result<Vec<usize>, TreeError> {
        if weft.len() != self.yarns.len() {
            return Err(TreeError::WeftInvalidLength);
        }
        let mut limits: Vec<usize> = self.yarns.iter().map(Vec::len).collect();
        for (i, yarn) in self.yarns.iter().enumerate() {
            let tmax = weft.get(i as u16);
            for (j, atom) in yarn.iter().enumerate() {
                if atom.id.timestamp > tmax {
                    limits[i] = j;
                    break;
                }
            }
        }
        for (i, yarn) in self.yarns.iter().enumerate() {
            for atom in &yarn[..limits[i]] {
                if !in_view(&limits, atom.cause) {
                    return Err(TreeError::WeftDisconnected);
                }
            }
        }
        return Ok(limits);
    }

    /// Reconstruct this replica as it was at the given cut.
    ///
    /// Yarns are truncated, the weave is filtered in place-order, and
    /// the clock rewinds to the cut's entry for this site. The cursor
    /// survives if it is still in view. O(atoms + sites)
    pub fn view_at(&self, weft: &Weft) -> Result<CausalTree, TreeError> {
        let limits = self.check_weft(weft)?;
        let yarns: Vec<Vec<Atom>> = self
            .yarns
            .iter()
            .zip(&limits)
            .map(|(yarn, &limit)| yarn[..limit].to_vec())
            .collect();
        let weave: Vec<Atom> = self
            .weave
            .iter()
            .filter(|a| in_view(&limits, a.id))
            .copied()
            .collect();
        let cursor = match in_view(&limits, self.cursor) {
            true => self.cursor,
            false => AtomId::NULL,
        };
        tracing::debug!(atoms = weave.len(), "reconstructed historical view");
        return Ok(CausalTree {
            weave,
            cursor,
            yarns,
            sitemap: self.sitemap.clone(),
            site_id: self.site_id,
            clock: LamportClock::with_time(weft.get(self.self_index())),
            site_gen: self.site_gen.clone(),
        });
    }

    // ---- Insertion machinery

    /// Splice an atom into the weave as a child of the atom at
    /// `cause_pos` (`None` = root, position 0). Children sort in
    /// descending atom order, so the new atom lands right before the
    /// first smaller sibling, or after the whole causal block.
    /// Returns the insertion position. O(atoms)
    fn splice_at_cause(&mut self, atom: Atom, cause_pos: Option<usize>) -> usize {
        let c0 = match cause_pos {
            Some(c0) => c0,
            None => {
                self.weave.insert(0, atom);
                return 0;
            }
        };
        let cause_id = self.weave[c0].id;
        let mut pos = c0 + 1;
        walk_causal_block(&self.weave[c0..], |other| {
            if other.cause == cause_id && other.compare(&atom) == Ordering::Less {
                // First sibling smaller than the new atom: insert here.
                return false;
            }
            pos += 1;
            return true;
        });
        self.weave.insert(pos, atom);
        return pos;
    }

    /// Append a new atom caused by the atom at `cause_pos`, validating
    /// the child rule first so a failed insert leaves the tree
    /// untouched. Returns the new atom's id and weave position.
    pub(crate) fn add_atom_at(
        &mut self,
        cause_pos: Option<usize>,
        value: AtomValue,
    ) -> Result<(AtomId, usize), TreeError> {
        let cause = match cause_pos {
            Some(pos) => {
                let cause = self.weave[pos];
                cause.value.validate_child(&value)?;
                cause.id
            }
            None => AtomId::NULL,
        };
        let timestamp = self.clock.tick().ok_or(TreeError::StateLimitExceeded)?;
        let site = self.self_index();
        let index = self.yarns[site as usize].len() as u32;
        let atom = Atom::new(AtomId::new(site, index, timestamp), cause, value);
        let pos = self.splice_at_cause(atom, cause_pos);
        self.yarns[site as usize].push(atom);
        return Ok((atom.id, pos));
    }

    /// Append a new atom as a child of the cursor.
    fn add_atom(&mut self, value: AtomValue) -> Result<AtomId, TreeError> {
        let cause_pos = match self.cursor.is_null() {
            true => None,
            false => match self.weave_index(self.cursor) {
                Some(pos) => Some(pos),
                None => return Err(TreeError::Corrupt("cursor atom missing from weave")),
            },
        };
        let (id, _) = self.add_atom_at(cause_pos, value)?;
        return Ok(id);
    }

    // ---- Cursor

    /// Point the cursor at the live tree position `index`; the next
    /// insertion becomes a child of that atom. `-1` points at the root.
    pub fn set_cursor(&mut self, index: isize) -> Result<(), TreeError> {
        if index < 0 {
            if index == -1 {
                self.cursor = AtomId::NULL;
                return Ok(());
            }
            return Err(TreeError::CursorOutOfRange);
        }
        let atoms = self.filter_deleted();
        let index = index as usize;
        if index >= atoms.len() {
            return Err(TreeError::CursorOutOfRange);
        }
        self.cursor = atoms[index].id;
        return Ok(());
    }

    // ---- Operations

    /// Insert a char after the cursor and advance the cursor onto it.
    pub fn insert_char(&mut self, ch: char) -> Result<(), TreeError> {
        let id = self.add_atom(AtomValue::InsertChar(ch))?;
        self.cursor = id;
        return Ok(());
    }

    /// Insert a char after the live tree position `index`.
    pub fn insert_char_at(&mut self, ch: char, index: isize) -> Result<(), TreeError> {
        self.set_cursor(index)?;
        return self.insert_char(ch);
    }

    /// Insert a string container under the root and put the cursor on
    /// it, so following char inserts land inside.
    pub fn insert_str(&mut self) -> Result<(), TreeError> {
        let (id, _) = self.add_atom_at(None, AtomValue::InsertStr)?;
        self.cursor = id;
        return Ok(());
    }

    /// Insert a counter container under the root and put the cursor on
    /// it, so following increments land inside.
    pub fn insert_counter(&mut self) -> Result<(), TreeError> {
        let (id, _) = self.add_atom_at(None, AtomValue::InsertCounter)?;
        self.cursor = id;
        return Ok(());
    }

    /// Add an increment after the cursor and advance the cursor onto it.
    pub fn insert_add(&mut self, delta: i32) -> Result<(), TreeError> {
        let id = self.add_atom(AtomValue::InsertAdd(delta))?;
        self.cursor = id;
        return Ok(());
    }

    /// Add an increment after the live tree position `index`.
    pub fn insert_add_at(&mut self, delta: i32, index: isize) -> Result<(), TreeError> {
        self.set_cursor(index)?;
        return self.insert_add(delta);
    }

    /// Delete the atom at the cursor, then walk the cursor up to its
    /// first non-deleted ancestor.
    pub fn delete(&mut self) -> Result<(), TreeError> {
        if self.cursor.is_null() {
            return Err(TreeError::NoAtomToDelete);
        }
        self.add_atom(AtomValue::Delete)?;
        self.repair_cursor();
        return Ok(());
    }

    /// Delete the atom at the live tree position `index`.
    pub fn delete_at(&mut self, index: isize) -> Result<(), TreeError> {
        self.set_cursor(index)?;
        return self.delete();
    }

    // ---- Invariant checks

    /// Verify the structural invariants of the replica at rest:
    /// sitemap order, yarn addressing, weave/yarn agreement, causal
    /// ordering, block contiguity, and sibling layout. Violations are
    /// reported, never repaired; an `Ok` tree is safe to merge from.
    pub fn validate(&self) -> Result<(), TreeError> {
        let sites: Vec<&SiteId> = self.sitemap.iter().collect();
        for pair in sites.windows(2) {
            if pair[0] >= pair[1] {
                return Err(TreeError::Corrupt("sitemap out of order"));
            }
        }
        if self.yarns.len() != self.sitemap.len() {
            return Err(TreeError::Corrupt("yarn count doesn't match sitemap"));
        }
        if !self.sitemap.contains(&self.site_id) {
            return Err(TreeError::Corrupt("own site missing from sitemap"));
        }

        let mut total = 0;
        for (site, yarn) in self.yarns.iter().enumerate() {
            total += yarn.len();
            for (index, atom) in yarn.iter().enumerate() {
                if atom.id.site as usize != site || atom.id.index as usize != index {
                    return Err(TreeError::Corrupt("yarn atom stored under the wrong key"));
                }
            }
        }
        if total != self.weave.len() {
            return Err(TreeError::Corrupt("weave and yarns disagree on atom count"));
        }

        // One forward pass checks the rest: each atom's cause must be
        // the nearest open ancestor (causes precede effects, blocks
        // stay contiguous), timestamps must grow down the tree, and
        // same-cause siblings must descend.
        let mut stack: Vec<Atom> = Vec::new();
        let mut last_child: FxHashMap<AtomId, Atom> = FxHashMap::default();
        for atom in &self.weave {
            if self.atom(atom.id) != Some(*atom) {
                return Err(TreeError::Corrupt("weave atom missing from its yarn"));
            }
            if !atom.cause.is_null() && atom.cause.timestamp >= atom.id.timestamp {
                return Err(TreeError::Corrupt("atom does not come after its cause"));
            }
            while let Some(top) = stack.last() {
                if top.id == atom.cause {
                    break;
                }
                stack.pop();
            }
            if stack.is_empty() && !atom.cause.is_null() {
                return Err(TreeError::Corrupt("causal block is not contiguous"));
            }
            if let Some(prev) = last_child.get(&atom.cause) {
                if prev.compare(atom) != Ordering::Greater {
                    return Err(TreeError::Corrupt("siblings out of order"));
                }
            }
            last_child.insert(atom.cause, *atom);
            stack.push(*atom);
        }
        return Ok(());
    }
}

/// Whether an atom id is within a per-yarn cut. The null id always is.
fn in_view(limits: &[usize], id: AtomId) -> bool {
    return id.is_null() || (id.index as usize) < limits[id.site as usize];
}

impl Default for CausalTree {
    fn default() -> Self {
        return CausalTree::new();
    }
}

impl PartialEq for CausalTree {
    /// State equality: same atoms, same order, same identity. The site
    /// id source is configuration, not state, and is not compared.
    fn eq(&self, other: &Self) -> bool {
        return self.weave == other.weave
            && self.cursor == other.cursor
            && self.yarns == other.yarns
            && self.sitemap == other.sitemap
            && self.site_id == other.site_id
            && self.clock == other.clock;
    }
}

impl Eq for CausalTree {}

impl Crdt for CausalTree {
    fn merge(&mut self, other: &Self) {
        return CausalTree::merge(self, other);
    }
}
