//! Conversion of GSUB lookup rules into `morx` subtable chains.
//!
//! The input is the semantics of one GSUB lookup: two equal-length ordered
//! sequences of glyph tuples, where rule `i` rewrites `in_tuples[i]` to
//! `out_tuples[i]`. Rules apply in order and earlier effects are visible to
//! later rules, which the produced chain must reproduce. For example, with
//! the rules
//!
//! ```text
//! a b -> c d
//! d e -> f
//! ```
//!
//! OpenType turns `a b e` into `c f`: the first rule produces `c d e`, the
//! second then ligates `d e`. No single subtable has that shape — a
//! contextual table rewrites in place, a ligature table only shrinks — so
//! the effect runs as an ordered chain, here a contextual subtable followed
//! by a ligature subtable. Where one rule set needs several passes over the
//! same span, a synthetic glyph from a reserved range carries the
//! intermediate step from one subtable to the next.
//!
//! `Converter::analyze` classifies the rule set, dispatches to the matching
//! analyzer, and returns the ordered chain. Composite and chaining kinds
//! re-enter the analyzers with rewritten tuples; the synthetic-glyph cursor
//! and the diagnostic sink travel with the converter.

mod chaining;
mod composite;
mod contextual;
mod insertion;
mod ligature;
mod single;
mod special;

use rustc_hash::FxHashSet;

use crate::classtable::ClassName;
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::error::ConvertError;
use crate::glyph::{FakeGlyphs, GlyphId, GlyphNamer, InGlyph, DELETED_GLYPH};
use crate::tables::Subtable;

/// One rule's input sequence. Negative values are chaining context.
pub type InTuple = Vec<InGlyph>;
/// One rule's replacement sequence.
pub type OutTuple = Vec<GlyphId>;

/// The single semantic kind describing a whole rule set, or `Composite`
/// when the set needs per-rule subdivision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Single,
    Multiple,
    Alternate,
    Ligature,
    ContextualLigature,
    Contextual,
    ChainingBacktrackOnly,
    ChainingLookaheadOnly,
    ChainingBoth,
    Composite,
}

/// Classify a rule set. First match wins; side-effect free.
pub fn find_kind(in_tuples: &[InTuple], out_tuples: &[OutTuple]) -> Kind {
    // Any negative input glyph makes this chaining contextual.
    if in_tuples.iter().flatten().any(|&g| g < 0) {
        if in_tuples.iter().all(|t| t.last().map_or(true, |&g| g >= 0)) {
            return Kind::ChainingBacktrackOnly;
        }
        if in_tuples.iter().all(|t| t.first().map_or(true, |&g| g >= 0)) {
            return Kind::ChainingLookaheadOnly;
        }
        return Kind::ChainingBoth;
    }

    // All outputs length 1: single, alternate, or ligature.
    if out_tuples.iter().all(|t| t.len() == 1) {
        if in_tuples.iter().any(|t| t.len() > 1) {
            // Length-2 inputs throughout can run as a contextual subtable,
            // which is smaller and faster than a ligature machine.
            if in_tuples.iter().all(|t| t.len() == 2) {
                return Kind::ContextualLigature;
            }
            return Kind::Ligature;
        }

        // Repeated input glyphs mean alternates for a selector to pick.
        let firsts: FxHashSet<InGlyph> = in_tuples
            .iter()
            .filter_map(|t| t.first().copied())
            .collect();
        if firsts.len() != in_tuples.len() {
            return Kind::Alternate;
        }

        return Kind::Single;
    }

    // At least one output is longer than 1 from here on.
    if in_tuples.iter().all(|t| t.len() == 1) {
        return Kind::Multiple;
    }

    if in_tuples
        .iter()
        .zip(out_tuples)
        .all(|(t_in, t_out)| t_in.len() == t_out.len())
    {
        return Kind::Contextual;
    }

    Kind::Composite
}

/// One conversion invocation's context: glyph naming, the ignored-glyph
/// set, the synthetic glyph cursor, and the diagnostic sink. Nothing here
/// is shared across converters, so independent lookups convert in parallel
/// provided their synthetic ranges are disjoint.
pub struct Converter<'a> {
    namer: Option<&'a dyn GlyphNamer>,
    ignores: FxHashSet<GlyphId>,
    fakes: FakeGlyphs,
    sink: DiagnosticSink,
}

impl<'a> Default for Converter<'a> {
    fn default() -> Converter<'a> {
        Converter::new()
    }
}

impl<'a> Converter<'a> {
    pub fn new() -> Converter<'a> {
        Converter {
            namer: None,
            ignores: FxHashSet::default(),
            fakes: FakeGlyphs::default(),
            sink: DiagnosticSink::new(),
        }
    }

    /// Use `namer` for class display names.
    pub fn with_namer(mut self, namer: &'a dyn GlyphNamer) -> Converter<'a> {
        self.namer = Some(namer);
        self
    }

    /// Treat `glyphs` as universally ignorable: every produced table maps
    /// them to the `"(ignore)"` class.
    pub fn with_ignores(mut self, glyphs: impl IntoIterator<Item = GlyphId>) -> Converter<'a> {
        self.ignores = glyphs.into_iter().collect();
        self
    }

    /// Start synthetic glyph allocation at `base` instead of the default.
    pub fn with_fake_base(mut self, base: GlyphId) -> Converter<'a> {
        self.fakes = FakeGlyphs::new(base);
        self
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.sink.events()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.sink.take()
    }

    /// Convert one rule set into an ordered subtable chain.
    pub fn analyze(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let kind = find_kind(in_tuples, out_tuples);

        if kind == Kind::ContextualLigature {
            let out_tuples = append_delete_sentinel(out_tuples);
            return self.dispatch(Kind::Contextual, in_tuples, &out_tuples);
        }

        self.dispatch(kind, in_tuples, out_tuples)
    }

    pub(crate) fn dispatch(
        &mut self,
        kind: Kind,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        match kind {
            Kind::Single => self.analyze_single(in_tuples, out_tuples),
            Kind::Alternate => self.analyze_alternate(in_tuples, out_tuples),
            Kind::Multiple => self.analyze_multiple(in_tuples, out_tuples),
            Kind::Ligature => self.analyze_ligature(in_tuples, out_tuples),
            Kind::ContextualLigature | Kind::Contextual => {
                self.analyze_contextual(in_tuples, out_tuples)
            }
            Kind::ChainingBacktrackOnly => {
                self.analyze_chaining_backtrackonly(in_tuples, out_tuples)
            }
            Kind::ChainingLookaheadOnly => {
                self.analyze_chaining_lookaheadonly(in_tuples, out_tuples)
            }
            Kind::ChainingBoth => self.analyze_chaining_both(in_tuples, out_tuples),
            Kind::Composite => self.analyze_composite(in_tuples, out_tuples),
        }
    }

    /// Class display name for a glyph.
    pub(crate) fn class_name(&self, glyph: GlyphId) -> ClassName {
        match self.namer {
            Some(namer) => ClassName::new(namer.name(glyph)),
            None => ClassName::new(glyph.to_string()),
        }
    }

    pub(crate) fn has_ignores(&self) -> bool {
        !self.ignores.is_empty()
    }

    pub(crate) fn ignores(&self) -> impl Iterator<Item = GlyphId> + '_ {
        self.ignores.iter().copied()
    }

    pub(crate) fn alloc_fake(&mut self) -> GlyphId {
        self.fakes.alloc()
    }

    pub(crate) fn sink(&mut self) -> &mut DiagnosticSink {
        &mut self.sink
    }
}

/// True when a rule rewrites its matched glyphs to themselves.
pub(crate) fn tuples_equal(t_in: &[InGlyph], t_out: &[GlyphId]) -> bool {
    t_in.len() == t_out.len()
        && t_in
            .iter()
            .zip(t_out)
            .all(|(&g_in, &g_out)| g_in == InGlyph::from(g_out))
}

/// Rewrite length-2 ligature outputs with a trailing deleted-glyph
/// sentinel so the pair can run as a plain contextual substitution.
pub(crate) fn append_delete_sentinel(out_tuples: &[OutTuple]) -> Vec<OutTuple> {
    out_tuples
        .iter()
        .map(|t| {
            let mut padded = t.clone();
            padded.push(DELETED_GLYPH);
            padded
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(tuples: &[&[InGlyph]]) -> Vec<InTuple> {
        tuples.iter().map(|t| t.to_vec()).collect()
    }

    fn outs(tuples: &[&[GlyphId]]) -> Vec<OutTuple> {
        tuples.iter().map(|t| t.to_vec()).collect()
    }

    #[test]
    fn classifier_is_total_over_the_kinds() {
        assert_eq!(find_kind(&ins(&[&[35]]), &outs(&[&[4]])), Kind::Single);
        assert_eq!(
            find_kind(&ins(&[&[3], &[3]]), &outs(&[&[25], &[19]])),
            Kind::Alternate
        );
        assert_eq!(
            find_kind(&ins(&[&[20]]), &outs(&[&[20, 91, 92]])),
            Kind::Multiple
        );
        assert_eq!(
            find_kind(&ins(&[&[3, 1], &[3, 2]]), &outs(&[&[41], &[42]])),
            Kind::ContextualLigature
        );
        assert_eq!(
            find_kind(&ins(&[&[3, 1, 7]]), &outs(&[&[41]])),
            Kind::Ligature
        );
        assert_eq!(
            find_kind(&ins(&[&[5, 6]]), &outs(&[&[30, 31]])),
            Kind::Contextual
        );
        assert_eq!(
            find_kind(&ins(&[&[3, 4], &[8]]), &outs(&[&[3, 5, 9], &[41]])),
            Kind::Composite
        );
    }

    #[test]
    fn classifier_chaining_edges() {
        // Negatives only at the leading edge: backtrack context only.
        assert_eq!(
            find_kind(&ins(&[&[-2, 3]]), &outs(&[&[2, 9]])),
            Kind::ChainingBacktrackOnly
        );
        // Negatives only at the trailing edge: lookahead context only.
        assert_eq!(
            find_kind(&ins(&[&[3, -5]]), &outs(&[&[9, 5]])),
            Kind::ChainingLookaheadOnly
        );
        assert_eq!(
            find_kind(&ins(&[&[-2, 3, -5]]), &outs(&[&[2, 9, 5]])),
            Kind::ChainingBoth
        );
    }

    #[test]
    fn noop_rules_are_compared_abs_valued() {
        assert!(tuples_equal(&[9], &[9]));
        assert!(!tuples_equal(&[-9], &[9]));
        assert!(!tuples_equal(&[9, 10], &[9]));
    }
}
