//! Ligature subtables.

use std::collections::BTreeMap;

use crate::classtable::StateName;
use crate::glyph::GlyphId;
use crate::tables::StateTable;

/// Ligature actions: the full pushed glyph sequence keys the output tuple
/// (typically a single ligature glyph) that replaces it.
pub type LigatureActions = BTreeMap<Vec<GlyphId>, Vec<GlyphId>>;

/// Transition of a ligature subtable.
///
/// `push` stacks the current glyph as a ligature component; `actions` fire
/// on the last glyph of a matched sequence. A consolidated class carries the
/// actions of every glyph merged into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LigatureEntry {
    pub push: bool,
    pub actions: Option<LigatureActions>,
    pub next_state: StateName,
}

impl LigatureEntry {
    pub fn nop(next_state: StateName) -> LigatureEntry {
        LigatureEntry {
            push: false,
            actions: None,
            next_state,
        }
    }
}

pub type Ligature = StateTable<LigatureEntry>;
