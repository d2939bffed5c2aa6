//! Shrinking rules inside an otherwise contextual-shaped problem.
//!
//! A contextual subtable cannot change sequence length, but it can rewrite
//! a position to the deleted-glyph sentinel. Shrinking rules therefore run
//! in two passes, like the complex contextual case: pass 1 replaces each
//! rule's first glyph with a synthetic trigger, pass 2 substitutes every
//! position off the trigger, with outputs padded to input length using the
//! sentinel so the removed tail is deleted explicitly.

use crate::convert::{Converter, InTuple, OutTuple};
use crate::error::ConvertError;
use crate::glyph::{glyph_of, InGlyph, DELETED_GLYPH};
use crate::tables::Subtable;

impl<'a> Converter<'a> {
    /// Convert rules whose outputs are shorter than their inputs.
    pub fn analyze_special(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let mut temp_in: Vec<InTuple> = Vec::with_capacity(in_tuples.len());
        for t_in in in_tuples {
            let mut t = Vec::with_capacity(t_in.len());
            t.push(InGlyph::from(self.alloc_fake()));
            t.extend_from_slice(&t_in[1..]);
            temp_in.push(t);
        }

        // Pass 1: swap each first glyph for its trigger.
        let pass1_out: Vec<OutTuple> = temp_in
            .iter()
            .map(|t| t.iter().map(|&g| glyph_of(g)).collect())
            .collect();
        let mut chain = self.analyze_contextual(in_tuples, &pass1_out)?;

        // Pass 2: per-position substitution with the removed tail padded to
        // the deleted-glyph sentinel.
        let padded: Vec<OutTuple> = temp_in
            .iter()
            .zip(out_tuples)
            .map(|(t_in, t_out)| {
                let mut out = t_out.clone();
                out.resize(t_in.len(), DELETED_GLYPH);
                out
            })
            .collect();

        chain.extend(self.analyze_contextual_faked(&temp_in, &padded)?);
        Ok(chain)
    }
}
