//! Insertion subtables.

use tinyvec::TinyVec;

use crate::classtable::StateName;
use crate::glyph::GlyphId;
use crate::tables::StateTable;

/// A short run of glyphs to insert. Insertion payloads are bounded (31
/// glyphs on the wire), and nearly always much shorter.
pub type GlyphSeq = TinyVec<[GlyphId; 4]>;

/// Transition of an insertion subtable.
///
/// Payloads can be attached to the previously marked glyph or to the
/// current one, inserted before or after their anchor. Kashida-like
/// insertions take on the attachment behavior of the anchor glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertionEntry {
    pub mark: bool,
    pub no_advance: bool,
    pub marked_insert_before: bool,
    pub marked_insert_glyphs: Option<GlyphSeq>,
    pub marked_is_kashida_like: bool,
    pub current_insert_before: bool,
    pub current_insert_glyphs: Option<GlyphSeq>,
    pub current_is_kashida_like: bool,
    pub next_state: StateName,
}

impl Default for InsertionEntry {
    fn default() -> InsertionEntry {
        InsertionEntry {
            mark: false,
            no_advance: false,
            marked_insert_before: false,
            marked_insert_glyphs: None,
            marked_is_kashida_like: false,
            current_insert_before: false,
            current_insert_glyphs: None,
            current_is_kashida_like: false,
            next_state: StateName::start_of_text(),
        }
    }
}

impl InsertionEntry {
    /// A transition that self-loops on `state` without inserting.
    pub fn self_loop(state: StateName) -> InsertionEntry {
        InsertionEntry {
            next_state: state,
            ..InsertionEntry::default()
        }
    }
}

pub type Insertion = StateTable<InsertionEntry>;
