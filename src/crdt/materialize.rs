// model = "claude-opus-4-5"
// created = "2026-07-30"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Materialization: from weave to user-visible values.
//!
//! The weave stores everything that ever happened; the materialized
//! view is what's left after deletions are applied. Deleting a plain
//! atom hides that atom; deleting a container hides its entire causal
//! block. What remains decodes into a flat list of [`Element`]s.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::crdt::primitives::atom::Atom;
use crate::crdt::primitives::atom::AtomValue;
use crate::crdt::primitives::weave::causal_block_size;
use crate::crdt::tree::CausalTree;
use crate::error::TreeError;

/// A user-visible top-level value decoded from the weave.
///
/// Serializes untagged, so a materialized tree encodes as a JSON array
/// of strings and numbers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Element {
    /// A single codepoint inserted directly at the root.
    Char(char),
    /// The live contents of a string container.
    Str(String),
    /// The summed value of a counter container.
    Counter(i32),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Element::Char(ch) => write!(f, "{}", ch),
            Element::Str(s) => write!(f, "{}", s),
            Element::Counter(n) => write!(f, "{}", n),
        };
    }
}

impl CausalTree {
    /// Copy of the weave with deletions applied, order preserved.
    ///
    /// Every surviving atom is a live tree position: container heads
    /// count, Delete atoms and their targets don't, and a deleted
    /// container takes its whole causal block with it. O(atoms)
    pub(crate) fn filter_deleted(&self) -> Vec<Atom> {
        let mut keep = vec![true; self.weave.len()];
        let mut position: FxHashMap<_, _> = FxHashMap::default();
        for (i, atom) in self.weave.iter().enumerate() {
            position.insert(atom.id, i);
        }
        for (i, atom) in self.weave.iter().enumerate() {
            if !matches!(atom.value, AtomValue::Delete) {
                continue;
            }
            keep[i] = false;
            // Deletions come after their target, so the position map
            // has the cause's location.
            let target = position[&atom.cause];
            if self.weave[target].value.is_container() {
                let size = causal_block_size(&self.weave[target..]);
                for slot in &mut keep[target..target + size] {
                    *slot = false;
                }
            } else {
                keep[target] = false;
            }
        }
        return self
            .weave
            .iter()
            .zip(keep)
            .filter(|(_, kept)| *kept)
            .map(|(atom, _)| *atom)
            .collect();
    }

    /// Decode the live weave into top-level elements.
    pub fn elements(&self) -> Result<Vec<Element>, TreeError> {
        let atoms = self.filter_deleted();
        let mut elements = Vec::new();
        let mut i = 0;
        while i < atoms.len() {
            match atoms[i].value {
                AtomValue::InsertChar(ch) => {
                    elements.push(Element::Char(ch));
                    i += 1;
                }
                AtomValue::InsertStr => {
                    let size = causal_block_size(&atoms[i..]);
                    let mut chars = String::new();
                    for atom in &atoms[i + 1..i + size] {
                        match atom.value {
                            AtomValue::InsertChar(ch) => chars.push(ch),
                            _ => {
                                return Err(TreeError::Corrupt(
                                    "non-char atom inside a string block",
                                ))
                            }
                        }
                    }
                    elements.push(Element::Str(chars));
                    i += size;
                }
                AtomValue::InsertCounter => {
                    let size = causal_block_size(&atoms[i..]);
                    let mut total: i32 = 0;
                    for atom in &atoms[i + 1..i + size] {
                        match atom.value {
                            AtomValue::InsertAdd(delta) => total = total.wrapping_add(delta),
                            _ => {
                                return Err(TreeError::Corrupt(
                                    "non-increment atom inside a counter block",
                                ))
                            }
                        }
                    }
                    elements.push(Element::Counter(total));
                    i += size;
                }
                _ => return Err(TreeError::Corrupt("unexpected atom at top level")),
            }
        }
        return Ok(elements);
    }

    /// The materialized value as JSON bytes: an array of codepoint
    /// strings, container strings, and counter values.
    pub fn to_json(&self) -> Result<Vec<u8>, TreeError> {
        let elements = self.elements()?;
        let json = serde_json::to_vec(&elements).expect("elements always encode as JSON");
        return Ok(json);
    }

    /// The materialized value flattened to a string: chars and string
    /// containers concatenate, counters print in decimal. Panics on a
    /// weave that doesn't materialize — tampering is reported loudly,
    /// never papered over with a default.
    pub fn to_string(&self) -> String {
        let elements = match self.elements() {
            Ok(elements) => elements,
            Err(err) => panic!("to_string: {}", err),
        };
        let mut out = String::new();
        for element in &elements {
            out.push_str(&element.to_string());
        }
        return out;
    }
}
