//! Contextual glyph substitution subtables.

use std::collections::BTreeMap;

use crate::classtable::StateName;
use crate::glyph::GlyphId;
use crate::tables::StateTable;

/// Per-entry substitution lookup: glyph in, glyph out.
pub type GlyphMap = BTreeMap<GlyphId, GlyphId>;

/// Transition of a contextual subtable.
///
/// `mark_subst` rewrites the previously marked glyph, `current_subst` the
/// glyph being processed; either fires when the transition is taken. A
/// single entry can therefore change at most two positions, which is what
/// bounds the shapes a single contextual subtable can express.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextualEntry {
    pub mark: bool,
    pub no_advance: bool,
    pub mark_subst: Option<GlyphMap>,
    pub current_subst: Option<GlyphMap>,
    pub next_state: StateName,
}

impl ContextualEntry {
    /// A transition with no effect beyond the state change.
    pub fn nop(next_state: StateName) -> ContextualEntry {
        ContextualEntry {
            mark: false,
            no_advance: false,
            mark_subst: None,
            current_subst: None,
            next_state,
        }
    }

    pub fn is_significant(&self) -> bool {
        self.mark
            || self.no_advance
            || self.mark_subst.is_some()
            || self.current_subst.is_some()
    }
}

pub type Contextual = StateTable<ContextualEntry>;
