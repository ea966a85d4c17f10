// model = "claude-opus-4-5"
// created = "2026-07-31"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Value handles: live views into containers inside a tree.
//!
//! A handle names an atom by id and remembers the atom's last known
//! weave position as a search hint. The weave is insert-only, so an
//! atom only ever moves to the right of its hint.
//!
//! Handles don't own anything: [`Str`] and [`CharRef`] borrow the tree
//! shared, and [`StrCursor`] borrows it mutably. That makes handle
//! invalidation a compile-time matter — you can't merge, fork, or edit
//! a tree out from under a handle, because the borrow checker won't
//! let you hold both.

use crate::crdt::primitives::atom::Atom;
use crate::crdt::primitives::atom::AtomId;
use crate::crdt::primitives::atom::AtomValue;
use crate::crdt::tree::CausalTree;
use crate::error::TreeError;

/// Visit each atom of the causal block headed at `head_pos`, head
/// included, flagging atoms that are followed by Delete children.
/// The Delete atoms themselves are consumed by the flag and never
/// visited. The visitor returns false to stop. Returns the number of
/// atoms visited.
pub(crate) fn walk_block_live<F>(weave: &[Atom], head_pos: usize, mut visit: F) -> usize
where
    F: FnMut(usize, &Atom, bool) -> bool,
{
    let block = &weave[head_pos..];
    if block.is_empty() {
        return 0;
    }
    let head_timestamp = block[0].id.timestamp;
    let mut i = 0;
    let mut count = 0;
    while i < block.len() {
        let atom = &block[i];
        if i > 0 && atom.cause.timestamp < head_timestamp {
            // End of the causal block.
            break;
        }
        let pos = head_pos + i;
        // Deletions sort first among an atom's children, so they sit
        // directly behind it in the weave.
        let mut is_deleted = false;
        i += 1;
        while i < block.len() && matches!(block[i].value, AtomValue::Delete) {
            is_deleted = true;
            i += 1;
        }
        count += 1;
        if !visit(pos, atom, is_deleted) {
            break;
        }
    }
    return count;
}

/// Visit the chars of the string block headed at `head_pos`, skipping
/// the head itself. Deleted chars are visited with their flag set.
fn walk_chars<F>(weave: &[Atom], head_pos: usize, mut visit: F)
where
    F: FnMut(usize, &Atom, bool) -> bool,
{
    walk_block_live(weave, head_pos, |pos, atom, is_deleted| {
        return match atom.value {
            AtomValue::InsertStr => true,
            AtomValue::InsertChar(_) => visit(pos, atom, is_deleted),
            ref value => panic!("unexpected atom in string block: {}", value),
        };
    });
}

/// A read-only view of a string container.
///
/// Snapshot and length ignore whether the container itself has been
/// deleted; [`Str::is_deleted`] reports that separately. For editing,
/// open a [`StrCursor`] with [`CausalTree::string_cursor`].
#[derive(Debug)]
pub struct Str<'t> {
    tree: &'t CausalTree,
    id: AtomId,
    pos: usize,
}

impl<'t> Str<'t> {
    /// The container's atom id.
    pub fn id(&self) -> AtomId {
        return self.id;
    }

    /// The live contents of the string.
    pub fn snapshot(&self) -> String {
        let mut chars = String::new();
        walk_chars(&self.tree.weave, self.pos, |_, atom, is_deleted| {
            if !is_deleted {
                if let AtomValue::InsertChar(ch) = atom.value {
                    chars.push(ch);
                }
            }
            return true;
        });
        return chars;
    }

    /// Number of live chars (in codepoints).
    pub fn len(&self) -> usize {
        let mut len = 0;
        walk_chars(&self.tree.weave, self.pos, |_, _, is_deleted| {
            if !is_deleted {
                len += 1;
            }
            return true;
        });
        return len;
    }

    /// Whether the string holds no live chars.
    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// Whether the container itself has been deleted. Live chars are
    /// still reported by snapshot and len.
    pub fn is_deleted(&self) -> bool {
        return self.tree.is_deleted(self.id);
    }
}

/// A read-only view of a single char.
#[derive(Debug)]
pub struct CharRef<'t> {
    tree: &'t CausalTree,
    id: AtomId,
    pos: usize,
}

impl<'t> CharRef<'t> {
    /// The char's atom id.
    pub fn id(&self) -> AtomId {
        return self.id;
    }

    /// The codepoint this atom inserted.
    pub fn snapshot(&self) -> char {
        return match self.tree.weave[self.pos].value {
            AtomValue::InsertChar(ch) => ch,
            ref value => panic!("char handle over non-char atom: {}", value),
        };
    }

    /// Whether this char has been deleted.
    pub fn is_deleted(&self) -> bool {
        return self.tree.is_deleted(self.id);
    }
}

/// A mutable cursor into one string container.
///
/// The cursor points either at the container head (before the first
/// char) or at one of its chars. It edits through the tree without
/// touching the tree-level cursor, so container editing and tree
/// editing don't fight over position.
#[derive(Debug)]
pub struct StrCursor<'t> {
    tree: &'t mut CausalTree,
    /// The atom the cursor points at: the head or one of its chars.
    id: AtomId,
    /// Last known weave position of `id`.
    pos: usize,
    /// Last known weave position of the container head.
    head_pos: usize,
}

impl<'t> StrCursor<'t> {
    /// The atom the cursor currently points at.
    pub fn id(&self) -> AtomId {
        return self.id;
    }

    /// Current weave position of the pointed-at atom. The weave is
    /// insert-only, so the atom is at or to the right of the hint.
    fn locate(&mut self) -> usize {
        for i in self.pos..self.tree.weave.len() {
            if self.tree.weave[i].id == self.id {
                self.pos = i;
                return i;
            }
        }
        panic!("cursor atom {} not found after position {}", self.id, self.pos);
    }

    /// Current weave position of the container head.
    ///
    /// If the pointed-at atom moved from c0 to c1, at most (c1 - c0)
    /// atoms were inserted before it, so the head lies between its own
    /// last known position and that bound; scan backwards for it.
    fn locate_head(&mut self) -> usize {
        let c0 = self.pos;
        let c1 = self.locate();
        let s0 = self.head_pos;
        let mut j = s0 + (c1 - c0);
        loop {
            if matches!(self.tree.weave[j].value, AtomValue::InsertStr) {
                self.head_pos = j;
                return j;
            }
            if j == s0 {
                break;
            }
            j -= 1;
        }
        panic!("string head not found at or after position {}", s0);
    }

    /// The id of the owning container.
    pub fn head_id(&mut self) -> AtomId {
        let head = self.locate_head();
        return self.tree.weave[head].id;
    }

    /// Move the cursor to char `index`; `-1` moves to the head, before
    /// the first char. Deleted chars don't count.
    pub fn index(&mut self, index: isize) -> Result<(), TreeError> {
        if index < -1 {
            return Err(TreeError::CursorOutOfRange);
        }
        let head = self.locate_head();
        if index == -1 {
            self.id = self.tree.weave[head].id;
            self.pos = head;
            return Ok(());
        }
        let mut found = None;
        let mut count = 0;
        walk_chars(&self.tree.weave, head, |pos, _, is_deleted| {
            if is_deleted {
                return true;
            }
            if count == index {
                found = Some(pos);
                return false;
            }
            count += 1;
            return true;
        });
        let pos = match found {
            Some(pos) => pos,
            None => return Err(TreeError::CursorOutOfRange),
        };
        self.id = self.tree.weave[pos].id;
        self.pos = pos;
        return Ok(());
    }

    /// The char under the cursor. Fails on the head position.
    pub fn value(&mut self) -> Result<char, TreeError> {
        let pos = self.locate();
        return match self.tree.weave[pos].value {
            AtomValue::InsertChar(ch) => Ok(ch),
            AtomValue::InsertStr => Err(TreeError::CursorOutOfRange),
            ref value => panic!("unexpected atom under string cursor: {}", value),
        };
    }

    /// Insert a char after the cursor and move the cursor onto it.
    /// Returns the new char's id.
    pub fn insert(&mut self, ch: char) -> Result<AtomId, TreeError> {
        let pos = self.locate();
        let (id, new_pos) = self.tree.add_atom_at(Some(pos), AtomValue::InsertChar(ch))?;
        self.id = id;
        self.pos = new_pos;
        return Ok(id);
    }

    /// Delete the char under the cursor and move the cursor one to the
    /// left, onto the previous live char or the head — like backspace:
    ///
    /// ```text
    ///    v            v          v
    /// abcdef  ->  abcef  ->  abef
    /// ```
    ///
    /// Fails on the head position.
    pub fn delete(&mut self) -> Result<(), TreeError> {
        let pos = self.locate();
        if matches!(self.tree.weave[pos].value, AtomValue::InsertStr) {
            return Err(TreeError::CursorOutOfRange);
        }
        self.tree.add_atom_at(Some(pos), AtomValue::Delete)?;

        let head = self.locate_head();
        let target = self.id;
        let weave = &self.tree.weave;
        let mut prev = head;
        let mut landed = None;
        walk_chars(weave, head, |pos, atom, is_deleted| {
            if atom.id == target {
                landed = Some(prev);
                return false;
            }
            if !is_deleted {
                prev = pos;
            }
            return true;
        });
        if let Some(prev_pos) = landed {
            self.id = weave[prev_pos].id;
            self.pos = prev_pos;
        }
        return Ok(());
    }
}

impl CausalTree {
    /// Insert a fresh string container and return its id, ready to be
    /// opened as a handle or cursor. The tree cursor stays on the new
    /// container.
    pub fn set_string(&mut self) -> Result<AtomId, TreeError> {
        self.insert_str()?;
        return Ok(self.cursor);
    }

    /// Open a read-only handle over the string container at `id`.
    pub fn string_value(&self, id: AtomId) -> Result<Str<'_>, TreeError> {
        let pos = match self.weave_index(id) {
            Some(pos) if matches!(self.weave[pos].value, AtomValue::InsertStr) => pos,
            _ => {
                return Err(TreeError::WrongValueKind { id, expected: "a string container" });
            }
        };
        return Ok(Str { tree: self, id, pos });
    }

    /// Open a mutable cursor into the string container at `id`,
    /// positioned on the head.
    pub fn string_cursor(&mut self, id: AtomId) -> Result<StrCursor<'_>, TreeError> {
        let pos = match self.weave_index(id) {
            Some(pos) if matches!(self.weave[pos].value, AtomValue::InsertStr) => pos,
            _ => {
                return Err(TreeError::WrongValueKind { id, expected: "a string container" });
            }
        };
        return Ok(StrCursor { tree: self, id, pos, head_pos: pos });
    }

    /// Open a read-only handle over the char at `id`.
    pub fn char_value(&self, id: AtomId) -> Result<CharRef<'_>, TreeError> {
        let pos = match self.weave_index(id) {
            Some(pos) if matches!(self.weave[pos].value, AtomValue::InsertChar(_)) => pos,
            _ => return Err(TreeError::WrongValueKind { id, expected: "a char" }),
        };
        return Ok(CharRef { tree: self, id, pos });
    }
}
