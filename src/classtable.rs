//! State and class names, and the glyph class table.
//!
//! State tables are worked on by name until they are serialized: states and
//! classes are identified by human-readable strings chosen from glyph names.
//! `StateName` and `ClassName` are deliberately distinct types so the two
//! name spaces cannot be mixed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lazy_static::lazy_static;
use rustc_hash::FxHashSet;

use crate::glyph::GlyphId;

const START_OF_TEXT: &str = "Start of text";
const START_OF_LINE: &str = "Start of line";

lazy_static! {
    /// Class names present in every state row regardless of the rules.
    static ref FIXED_CLASS_NAMES: FxHashSet<&'static str> = {
        let mut set = FxHashSet::default();
        set.insert("End of text");
        set.insert("Out of bounds");
        set.insert("Deleted glyph");
        set.insert("End of line");
        set.insert("(ignore)");
        set
    };
}

/// Name of a state in a state table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateName(String);

impl StateName {
    pub fn new(name: impl Into<String>) -> StateName {
        StateName(name.into())
    }

    pub fn start_of_text() -> StateName {
        StateName(START_OF_TEXT.to_string())
    }

    pub fn start_of_line() -> StateName {
        StateName(START_OF_LINE.to_string())
    }

    /// The state entered after matching `class` from a start state.
    pub fn saw(class: &ClassName) -> StateName {
        StateName(format!("Saw_{}", class))
    }

    /// The state entered after matching `class` from this state.
    pub fn then(&self, class: &ClassName) -> StateName {
        StateName(format!("{}_{}", self.0, class))
    }

    /// Name used for a group of consolidated states.
    pub fn combo(index: usize) -> StateName {
        StateName(format!("Saw combo group {}", index))
    }

    pub fn is_start(&self) -> bool {
        self.0 == START_OF_TEXT || self.0 == START_OF_LINE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a glyph class in a state table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassName(String);

impl ClassName {
    pub fn new(name: impl Into<String>) -> ClassName {
        ClassName(name.into())
    }

    pub fn end_of_text() -> ClassName {
        ClassName("End of text".to_string())
    }

    pub fn out_of_bounds() -> ClassName {
        ClassName("Out of bounds".to_string())
    }

    pub fn deleted_glyph() -> ClassName {
        ClassName("Deleted glyph".to_string())
    }

    pub fn end_of_line() -> ClassName {
        ClassName("End of line".to_string())
    }

    pub fn ignore() -> ClassName {
        ClassName("(ignore)".to_string())
    }

    /// True for the classes injected into every state row.
    pub fn is_fixed(&self) -> bool {
        FIXED_CLASS_NAMES.contains(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping from glyph index to class name.
///
/// Many glyphs may share a class. Iteration order is by glyph index so the
/// produced tables are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassTable {
    map: BTreeMap<GlyphId, ClassName>,
}

impl ClassTable {
    pub fn new() -> ClassTable {
        ClassTable::default()
    }

    pub fn insert(&mut self, glyph: GlyphId, class: ClassName) {
        self.map.insert(glyph, class);
    }

    pub fn get(&self, glyph: GlyphId) -> Option<&ClassName> {
        self.map.get(&glyph)
    }

    pub fn contains(&self, glyph: GlyphId) -> bool {
        self.map.contains_key(&glyph)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlyphId, &ClassName)> {
        self.map.iter().map(|(&glyph, class)| (glyph, class))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Redirect every glyph currently in one of `group`'s classes to
    /// `new_class`. Used when consolidation unions several classes.
    pub fn merge_classes(&mut self, group: &BTreeSet<ClassName>, new_class: &ClassName) {
        for class in self.map.values_mut() {
            if group.contains(class) {
                *class = new_class.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_rewrites_members_only() {
        let mut ct = ClassTable::new();
        ct.insert(5, ClassName::new("5"));
        ct.insert(6, ClassName::new("6"));
        ct.insert(10, ClassName::new("10"));

        let group: BTreeSet<ClassName> = [ClassName::new("6"), ClassName::new("10")]
            .into_iter()
            .collect();
        ct.merge_classes(&group, &ClassName::new("10 and 6"));

        assert_eq!(ct.get(5), Some(&ClassName::new("5")));
        assert_eq!(ct.get(6), Some(&ClassName::new("10 and 6")));
        assert_eq!(ct.get(10), Some(&ClassName::new("10 and 6")));
    }

    #[test]
    fn fixed_class_names() {
        assert!(ClassName::deleted_glyph().is_fixed());
        assert!(ClassName::ignore().is_fixed());
        assert!(!ClassName::new("5").is_fixed());
    }

    #[test]
    fn state_name_chaining() {
        let saw = StateName::saw(&ClassName::new("3"));
        assert_eq!(saw.as_str(), "Saw_3");
        assert_eq!(saw.then(&ClassName::new("4")).as_str(), "Saw_3_4");
        assert!(StateName::start_of_line().is_start());
        assert!(!saw.is_start());
    }
}
