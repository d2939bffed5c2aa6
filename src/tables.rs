//! In-memory `morx` subtable value objects.
//!
//! > Extended glyph metamorphosis subtables have five types: rearrangement,
//! > contextual substitution, ligature, noncontextual substitution, and
//! > insertion.
//!
//! — <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6morx.html>
//!
//! Conversion produces the four substitution-bearing kinds. These are value
//! objects built around class tables and named state rows; binary layout
//! (entry indices, lookup formats, action offsets) is a downstream concern.

pub mod contextual;
pub mod insertion;
pub mod ligature;
pub mod noncontextual;

use std::collections::BTreeMap;

use crate::classtable::{ClassName, ClassTable, StateName};

pub use contextual::{Contextual, ContextualEntry, GlyphMap};
pub use insertion::{GlyphSeq, Insertion, InsertionEntry};
pub use ligature::{Ligature, LigatureActions, LigatureEntry};
pub use noncontextual::Noncontextual;

/// One state's transitions, keyed by class name.
pub type StateRow<E> = BTreeMap<ClassName, E>;

/// A finite-state subtable: a class table plus named state rows.
///
/// Every table carries the fixed states `"Start of text"` and
/// `"Start of line"` (the latter a structural copy of the former at
/// construction time) and every row carries the fixed classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTable<E> {
    pub class_table: ClassTable,
    pub states: BTreeMap<StateName, StateRow<E>>,
}

impl<E> StateTable<E> {
    pub fn new(class_table: ClassTable) -> StateTable<E> {
        StateTable {
            class_table,
            states: BTreeMap::new(),
        }
    }

    pub fn state(&self, name: &StateName) -> Option<&StateRow<E>> {
        self.states.get(name)
    }

    pub fn entry(&self, state: &StateName, class: &ClassName) -> Option<&E> {
        self.states.get(state).and_then(|row| row.get(class))
    }
}

/// One link of a conversion result chain.
///
/// Chains are applied to the glyph stream strictly in list order; the
/// layered effect of the ordered source rules depends on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subtable {
    Noncontextual(Noncontextual),
    Contextual(Contextual),
    Ligature(Ligature),
    Insertion(Insertion),
}

impl Subtable {
    pub fn as_noncontextual(&self) -> Option<&Noncontextual> {
        match self {
            Subtable::Noncontextual(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_contextual(&self) -> Option<&Contextual> {
        match self {
            Subtable::Contextual(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_ligature(&self) -> Option<&Ligature> {
        match self {
            Subtable::Ligature(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_insertion(&self) -> Option<&Insertion> {
        match self {
            Subtable::Insertion(table) => Some(table),
            _ => None,
        }
    }
}
