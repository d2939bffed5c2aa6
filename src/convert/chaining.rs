//! Chaining contextual analysis.
//!
//! Backtrack context costs nothing in this automaton model: the machine has
//! already consumed the context glyphs, so they convert to plain matched
//! positions. Lookahead is narrower. A single trailing lookahead glyph can
//! ride the final transition with its advance suppressed, so the glyph is
//! processed again in its own right; longer lookahead runs have no
//! representation here and are rejected.

use crate::convert::{append_delete_sentinel, find_kind, Converter, InTuple, Kind, OutTuple};
use crate::error::ConvertError;
use crate::tables::Subtable;

impl<'a> Converter<'a> {
    /// Backtrack-only chaining: negate the context back to plain glyphs and
    /// re-analyze.
    pub fn analyze_chaining_backtrackonly(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let positivized: Vec<InTuple> = in_tuples
            .iter()
            .map(|t| t.iter().map(|&g| g.abs()).collect())
            .collect();
        self.analyze(&positivized, out_tuples)
    }

    /// Chaining with context at both ends: positivize the leading backtrack
    /// run and continue as lookahead-only.
    pub fn analyze_chaining_both(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let changed: Vec<InTuple> = in_tuples
            .iter()
            .map(|t| {
                let mut glyphs = t.clone();
                for g in glyphs.iter_mut() {
                    if *g >= 0 {
                        break;
                    }
                    *g = g.abs();
                }
                glyphs
            })
            .collect();
        self.analyze_chaining_lookaheadonly(&changed, out_tuples)
    }

    /// Lookahead-only chaining.
    ///
    /// All but each rule's final glyph are positivized; the final lookahead
    /// glyph stays negative as a do-not-advance marker threaded through the
    /// ordinary analyzers, so the trailing transition is built with
    /// `no_advance` set and the glyph is reprocessed after the rule fires.
    pub fn analyze_chaining_lookaheadonly(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        // Two or more trailing lookahead glyphs cannot share one
        // no-advance transition. Rejected rather than guessed at.
        if in_tuples
            .iter()
            .any(|t| t.len() > 2 && t[t.len() - 1] < 0 && t[t.len() - 2] < 0)
        {
            self.sink().error(
                "unsupported-lookahead",
                "a rule ends in two or more lookahead glyphs, which has no \
                 single-subtable representation"
                    .to_string(),
            );
            return Err(ConvertError::UnsupportedLookahead);
        }

        let positivized: Vec<InTuple> = in_tuples
            .iter()
            .map(|t| t.iter().map(|&g| g.abs()).collect())
            .collect();
        let mut kind = find_kind(&positivized, out_tuples);

        let with_sentinel;
        let out_tuples: &[OutTuple] = if kind == Kind::ContextualLigature {
            with_sentinel = append_delete_sentinel(out_tuples);
            kind = Kind::Contextual;
            &with_sentinel
        } else {
            out_tuples
        };

        // Strip the sign everywhere except the final position.
        let marked: Vec<InTuple> = in_tuples
            .iter()
            .map(|t| match t.split_last() {
                Some((&last, rest)) => {
                    let mut glyphs: InTuple = rest.iter().map(|&g| g.abs()).collect();
                    glyphs.push(last);
                    glyphs
                }
                None => Vec::new(),
            })
            .collect();

        self.dispatch(kind, &marked, out_tuples)
    }
}
