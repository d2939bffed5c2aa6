//! Noncontextual ("swash") subtables.

use std::collections::BTreeMap;

use crate::glyph::GlyphId;

/// A single-pass direct substitution: not a state machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Noncontextual {
    map: BTreeMap<GlyphId, GlyphId>,
}

impl Noncontextual {
    pub fn new() -> Noncontextual {
        Noncontextual::default()
    }

    pub fn insert(&mut self, glyph: GlyphId, replacement: GlyphId) {
        self.map.insert(glyph, replacement);
    }

    pub fn get(&self, glyph: GlyphId) -> Option<GlyphId> {
        self.map.get(&glyph).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlyphId, GlyphId)> + '_ {
        self.map.iter().map(|(&glyph, &replacement)| (glyph, replacement))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl From<BTreeMap<GlyphId, GlyphId>> for Noncontextual {
    fn from(map: BTreeMap<GlyphId, GlyphId>) -> Noncontextual {
        Noncontextual { map }
    }
}

impl FromIterator<(GlyphId, GlyphId)> for Noncontextual {
    fn from_iter<I: IntoIterator<Item = (GlyphId, GlyphId)>>(iter: I) -> Noncontextual {
        Noncontextual {
            map: iter.into_iter().collect(),
        }
    }
}
