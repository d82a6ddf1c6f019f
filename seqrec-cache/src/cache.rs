//! Process-wide interning of display text.
//!
//! Prompts repeat across contrasts ("press either a or b", feedback words,
//! level banners), so the rasterizer keys rendered glyph runs by atom.

use lazy_static::lazy_static;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref TEXT_INTERNER: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Intern a string and return its stable id
pub fn intern_text(s: &str) -> usize {
    let atom = Atom::from(s);
    let mut v = TEXT_INTERNER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    match v.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            v.push(atom);
            v.len() - 1
        }
    }
}

/// Current count of unique texts
pub fn text_count() -> usize {
    TEXT_INTERNER
        .read()
        .map(|v| v.len())
        .unwrap_or_else(|poisoned| poisoned.into_inner().len())
}

/// Atom for an id returned by `intern_text`, if any
pub fn get_text(id: usize) -> Option<Atom> {
    let v = TEXT_INTERNER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    v.get(id).cloned()
}
