//! Composite analysis: rule sets mixing shrinking, same-length, and
//! growing rules.
//!
//! State tables are unordered while the source rules are not, so the rules
//! are only regrouped where that cannot change the observable result. The
//! collision check refuses rule sets where a later trigger overlaps an
//! earlier replacement; the reorderer then flushes a run whenever a rule's
//! leading glyph is already tracked as changed by an earlier, different
//! rule.

use itertools::Itertools;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::convert::{Converter, InTuple, OutTuple};
use crate::error::ConvertError;
use crate::glyph::InGlyph;
use crate::tables::Subtable;

/// Per-rule kind inside a composite run. The ordering is significant: it
/// is the dispatch order of a flushed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SimpleKind {
    Context,
    Insert,
    Ligature,
    Special,
}

fn simple_kind(t_in: &InTuple, t_out: &OutTuple) -> SimpleKind {
    if t_out.len() == 1 {
        SimpleKind::Ligature
    } else if t_in.len() == t_out.len() {
        SimpleKind::Context
    } else if t_in.len() < t_out.len() {
        SimpleKind::Insert
    } else {
        SimpleKind::Special
    }
}

/// Proper prefixes of `t`, excluding `t` itself.
fn tuple_front_partials(t: &[InGlyph]) -> FxHashSet<Vec<InGlyph>> {
    if t.len() < 2 {
        return FxHashSet::default();
    }
    (1..t.len()).map(|i| t[..i].to_vec()).collect()
}

/// Proper suffixes of `t`, excluding `t` itself.
fn tuple_back_partials(t: &[InGlyph]) -> FxHashSet<Vec<InGlyph>> {
    if t.len() < 2 {
        return FxHashSet::default();
    }
    (1..t.len()).map(|i| t[i..].to_vec()).collect()
}

/// True when some rule's output ending overlaps an earlier rule's input
/// beginning. Regrouping such a set could change the result.
fn collision_check(in_tuples: &[InTuple], out_tuples: &[OutTuple]) -> bool {
    let mut ins: FxHashSet<Vec<InGlyph>> = FxHashSet::default();

    for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
        let widened: Vec<InGlyph> = t_out.iter().map(|&g| InGlyph::from(g)).collect();
        let outs = tuple_back_partials(&widened);

        if outs.iter().any(|partial| ins.contains(partial)) {
            return true;
        }

        ins.extend(tuple_front_partials(t_in));
    }

    false
}

/// Sort one flushed run by per-rule kind and group it for dispatch.
fn kind_sort(
    in_group: &[&InTuple],
    out_group: &[&OutTuple],
) -> Vec<(SimpleKind, Vec<InTuple>, Vec<OutTuple>)> {
    let mut keyed: Vec<(SimpleKind, &InTuple, &OutTuple)> = in_group
        .iter()
        .zip(out_group)
        .map(|(&t_in, &t_out)| (simple_kind(t_in, t_out), t_in, t_out))
        .collect();
    keyed.sort();

    let mut result = Vec::new();
    for (kind, group) in &keyed.into_iter().group_by(|&(kind, _, _)| kind) {
        let (ins, outs) = group
            .map(|(_, t_in, t_out)| (t_in.clone(), t_out.clone()))
            .unzip();
        result.push((kind, ins, outs));
    }
    result
}

/// Split the ordered rules into regroupable spans.
///
/// A glyph is a "changer" once some rule maps it away; the set tracks which
/// first-glyphs did the changing. A rule triggered by a glyph changed by an
/// earlier, different rule ends the current span, because reordering across
/// that boundary would change effect visibility.
fn reorder_tuples(
    in_tuples: &[InTuple],
    out_tuples: &[OutTuple],
) -> Vec<(SimpleKind, Vec<InTuple>, Vec<OutTuple>)> {
    let mut changers: FxHashMap<InGlyph, FxHashSet<InGlyph>> = FxHashMap::default();
    let mut in_group: Vec<&InTuple> = Vec::new();
    let mut out_group: Vec<&OutTuple> = Vec::new();
    let mut result = Vec::new();

    for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
        let Some(&first) = t_in.first() else {
            continue;
        };

        if let Some(changed_by) = changers.get(&first) {
            let only_self = changed_by.len() == 1 && changed_by.contains(&first);
            if !only_self {
                result.extend(kind_sort(&in_group, &out_group));
                changers.clear();
                in_group.clear();
                out_group.clear();
            }
        }

        let out_set: FxHashSet<InGlyph> =
            t_out.iter().map(|&g| InGlyph::from(g)).collect();
        for &g in t_in {
            if !out_set.contains(&g) {
                changers.entry(g).or_default().insert(first);
            }
        }

        in_group.push(t_in);
        out_group.push(t_out);
    }

    result.extend(kind_sort(&in_group, &out_group));
    result
}

impl<'a> Converter<'a> {
    /// Convert a mixed rule set by splitting it into order-safe,
    /// same-kind runs and concatenating the resulting chains.
    pub fn analyze_composite(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        if collision_check(in_tuples, out_tuples) {
            self.sink().error(
                "composite-collision",
                "a later rule's trigger overlaps an earlier rule's replacement; \
                 this rule set cannot be regrouped"
                    .to_string(),
            );
            return Err(ConvertError::UnsupportedComposite);
        }

        let mut chain = Vec::new();

        for (kind, in_piece, out_piece) in reorder_tuples(in_tuples, out_tuples) {
            let subtables = match kind {
                SimpleKind::Ligature => self.analyze_ligature(&in_piece, &out_piece)?,
                SimpleKind::Context => self.analyze_contextual(&in_piece, &out_piece)?,
                SimpleKind::Insert => self.analyze_insertion(&in_piece, &out_piece)?,
                SimpleKind::Special => self.analyze_special(&in_piece, &out_piece)?,
            };
            chain.extend(subtables);
        }

        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_partials_exclude_whole() {
        let parts = tuple_front_partials(&[1, 2, 3, 4]);
        assert_eq!(parts.len(), 3);
        assert!(parts.contains(&vec![1]));
        assert!(parts.contains(&vec![1, 2]));
        assert!(parts.contains(&vec![1, 2, 3]));
        assert!(!parts.contains(&vec![1, 2, 3, 4]));
        assert!(tuple_front_partials(&[1]).is_empty());
    }

    #[test]
    fn back_partials_exclude_whole() {
        let parts = tuple_back_partials(&[1, 2, 3, 4]);
        assert_eq!(parts.len(), 3);
        assert!(parts.contains(&vec![4]));
        assert!(parts.contains(&vec![3, 4]));
        assert!(parts.contains(&vec![2, 3, 4]));
    }

    #[test]
    fn collision_detected_in_rule_order() {
        // Rule 2's output ends with rule 1's input beginning.
        let ins = vec![vec![3, 4], vec![8, 9]];
        let outs = vec![vec![3, 5], vec![7, 3]];
        assert!(collision_check(&ins, &outs));

        // Same rules in the opposite order: the overlap now points
        // backwards, which regrouping cannot disturb.
        let ins = vec![vec![8, 9], vec![3, 4]];
        let outs = vec![vec![7, 3], vec![3, 5]];
        assert!(!collision_check(&ins, &outs));

        let ins = vec![vec![3, 4], vec![10, 11]];
        let outs = vec![vec![3, 5], vec![10, 19]];
        assert!(!collision_check(&ins, &outs));
    }

    #[test]
    fn kind_sort_groups_like_rules() {
        // The composite example from the original analysis: three
        // same-length rules and two ligature rules interleaved.
        let ins: Vec<InTuple> = vec![
            vec![3, 4],
            vec![10, 11],
            vec![8, 1],
            vec![8, 2],
            vec![15, 16],
        ];
        let outs: Vec<OutTuple> = vec![
            vec![3, 5],
            vec![10, 19],
            vec![41],
            vec![42],
            vec![91, 16],
        ];

        let groups = reorder_tuples(&ins, &outs);
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].0, SimpleKind::Context);
        assert_eq!(groups[0].1, vec![vec![3, 4], vec![10, 11], vec![15, 16]]);
        assert_eq!(groups[0].2, vec![vec![3, 5], vec![10, 19], vec![91, 16]]);

        assert_eq!(groups[1].0, SimpleKind::Ligature);
        assert_eq!(groups[1].1, vec![vec![8, 1], vec![8, 2]]);
        assert_eq!(groups[1].2, vec![vec![41], vec![42]]);
    }
}
