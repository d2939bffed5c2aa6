//! Single, alternate, and multiple substitution analysis.

use std::collections::BTreeMap;

use crate::convert::{Converter, InTuple, OutTuple};
use crate::error::ConvertError;
use crate::glyph::{glyph_of, GlyphId, DELETED_GLYPH};
use crate::tables::{GlyphSeq, Noncontextual, Subtable};

impl<'a> Converter<'a> {
    /// One-to-one substitutions: a single noncontextual subtable.
    pub fn analyze_single(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let mut already_warned = false;

        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            if t_in.len() != 1 {
                self.sink().error(
                    "bad-tuple-length",
                    format!(
                        "input tuple {:?} is not length 1, which is incorrect for \
                         single substitution",
                        t_in
                    ),
                );
                return Err(ConvertError::BadTupleLength);
            }

            if t_out.len() != 1 {
                self.sink().error(
                    "bad-tuple-length",
                    format!(
                        "output tuple {:?} is not length 1, which is incorrect for \
                         single substitution",
                        t_out
                    ),
                );
                return Err(ConvertError::BadTupleLength);
            }

            if t_in[0] < 0 {
                self.sink().error(
                    "negative-glyph",
                    format!(
                        "input tuple {:?} has a negative value, which should only \
                         occur for chaining",
                        t_in
                    ),
                );
                return Err(ConvertError::NegativeGlyph);
            }

            if glyph_of(t_in[0]) == t_out[0] {
                self.sink().warning(
                    "noop-rule",
                    format!(
                        "input glyph {} maps to the same output glyph; this rule may \
                         be omitted with no effect on the output",
                        t_out[0]
                    ),
                );
                already_warned = true;
            }
        }

        let mut map: BTreeMap<GlyphId, GlyphId> = BTreeMap::new();
        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            let glyph = glyph_of(t_in[0]);
            if glyph != t_out[0] {
                map.insert(glyph, t_out[0]);
            }
        }

        if map.is_empty() {
            if !already_warned {
                self.sink().warning(
                    "empty-rules",
                    "no input or output in single substitution".to_string(),
                );
            }
            return Ok(Vec::new());
        }

        Ok(vec![Subtable::Noncontextual(Noncontextual::from(map))])
    }

    /// Alternate substitutions: `k` noncontextual subtables, where table
    /// `i` carries the `i`-th smallest alternate of each input glyph. A
    /// selector index downstream picks the intended branch.
    pub fn analyze_alternate(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let mut alternates: BTreeMap<GlyphId, Vec<GlyphId>> = BTreeMap::new();

        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            if t_in.len() != 1 {
                self.sink().error(
                    "bad-tuple-length",
                    format!(
                        "input tuple {:?} is not length 1, which is incorrect for \
                         alternate substitution",
                        t_in
                    ),
                );
                return Err(ConvertError::BadTupleLength);
            }

            if t_out.len() != 1 {
                self.sink().error(
                    "bad-tuple-length",
                    format!(
                        "output tuple {:?} is not length 1, which is incorrect for \
                         alternate substitution",
                        t_out
                    ),
                );
                return Err(ConvertError::BadTupleLength);
            }

            if t_in[0] < 0 {
                self.sink().error(
                    "negative-glyph",
                    format!(
                        "input tuple {:?} has a negative value, which should only \
                         occur for chaining",
                        t_in
                    ),
                );
                return Err(ConvertError::NegativeGlyph);
            }

            if glyph_of(t_in[0]) == t_out[0] {
                self.sink().warning(
                    "noop-rule",
                    format!(
                        "input glyph {} maps to the same output glyph; this rule may \
                         be omitted with no effect on the output",
                        t_out[0]
                    ),
                );
                continue;
            }

            alternates.entry(glyph_of(t_in[0])).or_default().push(t_out[0]);
        }

        let count = alternates.values().map(Vec::len).max().unwrap_or(0);
        if count == 0 {
            self.sink().warning(
                "empty-rules",
                "no input or output in alternate substitution".to_string(),
            );
            return Ok(Vec::new());
        }

        let mut tables = vec![Noncontextual::new(); count];
        for (glyph, mut outputs) in alternates {
            outputs.sort_unstable();
            for (i, &output) in outputs.iter().enumerate() {
                tables[i].insert(glyph, output);
            }
        }

        Ok(tables.into_iter().map(Subtable::Noncontextual).collect())
    }

    /// One-to-many substitutions.
    ///
    /// Rules whose output keeps the input glyph first need only an
    /// insertion subtable triggered by that glyph. Rules that also change
    /// the first glyph are bridged with synthetic triggers: a pre-swash
    /// maps the input to a fresh synthetic glyph, the insertion is keyed on
    /// the synthetic codes, and a post-swash resolves them to the intended
    /// first output glyph.
    ///
    /// One-glyph outputs are legal and run in a noncontextual subtable that
    /// precedes the insertion. Empty outputs are prohibited by OpenType but
    /// occur in real fonts; they retarget to the deleted-glyph sentinel.
    pub fn analyze_multiple(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let mut growers: Vec<(GlyphId, OutTuple)> = Vec::new();
        let mut singles_in: Vec<InTuple> = Vec::new();
        let mut singles_out: Vec<OutTuple> = Vec::new();

        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            if t_in.len() != 1 {
                self.sink().error(
                    "bad-tuple-length",
                    format!(
                        "input tuple {:?} is not length 1, which is incorrect for \
                         multiple substitution",
                        t_in
                    ),
                );
                return Err(ConvertError::BadTupleLength);
            }

            if t_in[0] < 0 {
                self.sink().error(
                    "negative-glyph",
                    format!(
                        "input tuple {:?} has a negative value, which should only \
                         occur for chaining",
                        t_in
                    ),
                );
                return Err(ConvertError::NegativeGlyph);
            }

            let glyph = glyph_of(t_in[0]);

            if t_out.len() > 1 {
                growers.push((glyph, t_out.clone()));
            } else if let Some(&only) = t_out.first() {
                if glyph == only {
                    self.sink().warning(
                        "noop-rule",
                        format!(
                            "input glyph {} maps to the same output glyph; this rule \
                             may be omitted with no effect on the output",
                            glyph
                        ),
                    );
                } else {
                    singles_in.push(t_in.clone());
                    singles_out.push(t_out.clone());
                }
            } else {
                self.sink().warning(
                    "empty-output",
                    format!(
                        "input tuple {:?} maps to empty output; this is explicitly \
                         prohibited by the OpenType spec",
                        t_in
                    ),
                );
                singles_in.push(t_in.clone());
                singles_out.push(vec![DELETED_GLYPH]);
            }
        }

        let mut chain = Vec::new();
        if !singles_in.is_empty() {
            chain.extend(self.analyze_single(&singles_in, &singles_out)?);
        }

        if growers.is_empty() {
            return Ok(chain);
        }

        if growers.iter().all(|(glyph, t_out)| *glyph == t_out[0]) {
            let payloads: BTreeMap<GlyphId, GlyphSeq> = growers
                .iter()
                .map(|(glyph, t_out)| (*glyph, t_out[1..].iter().copied().collect()))
                .collect();
            chain.push(Subtable::Insertion(self.make_ins(&payloads)));
            return Ok(chain);
        }

        let mut payloads: BTreeMap<GlyphId, GlyphSeq> = BTreeMap::new();
        let mut pre_swash = Noncontextual::new();
        let mut post_swash = Noncontextual::new();

        for (glyph, t_out) in &growers {
            let tail: GlyphSeq = t_out[1..].iter().copied().collect();
            if *glyph == t_out[0] {
                payloads.insert(*glyph, tail);
            } else {
                let fake = self.alloc_fake();
                pre_swash.insert(*glyph, fake);
                payloads.insert(fake, tail);
                post_swash.insert(fake, t_out[0]);
            }
        }

        chain.push(Subtable::Noncontextual(pre_swash));
        chain.push(Subtable::Insertion(self.make_ins(&payloads)));
        chain.push(Subtable::Noncontextual(post_swash));

        Ok(chain)
    }
}
