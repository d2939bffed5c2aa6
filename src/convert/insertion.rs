//! Insertion analysis: rules whose outputs are longer than their inputs.
//!
//! When every rule's insertion is purely internal (both ends of the input
//! survive unchanged), a single insertion subtable carries the whole set.
//! Otherwise each rule is characterized as front- or back-anchored and the
//! effect is spread over three chained subtables: a contextual pass that
//! substitutes the first real glyph of the match with a synthetic trigger,
//! one shared insertion subtable keyed on the triggers, and a final
//! noncontextual or ligature pass resolving the triggers to the first
//! output glyph.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::classtable::{ClassName, ClassTable, StateName};
use crate::convert::contextual::{
    contextual_fix_up_classes, contextual_into_subtable, CtxCell, CtxTable,
};
use crate::convert::{Converter, InTuple, OutTuple};
use crate::error::ConvertError;
use crate::glyph::{glyph_of, GlyphId};
use crate::tables::{GlyphSeq, Insertion, InsertionEntry, Noncontextual, StateRow, Subtable};

/// Working cell of the general path's first pass. Fence cells (the final
/// matched position) carry the synthetic trigger bookkeeping.
#[derive(Clone, Debug)]
struct InsCell {
    mark: bool,
    no_advance: bool,
    /// The real glyph the trigger replaces; `None` off the fence.
    glyph: Option<GlyphId>,
    /// Trigger plus the leftover unmatched glyphs that follow it.
    in_match: Vec<GlyphId>,
    /// The output span the matched region becomes.
    out_match: Vec<GlyphId>,
    next: StateName,
}

type InsTable = BTreeMap<StateName, BTreeMap<ClassName, InsCell>>;

/// Locate the anchored end of an insertion rule.
///
/// Returns `Some((true, k))` when the first `k` positions match (a
/// front-anchored rule), `Some((false, k))` when the tail matches back to
/// position `k + 1` (back-anchored), and `None` when neither end matches.
fn characterize_insertion(t_in: &[GlyphId], t_out: &[GlyphId]) -> Option<(bool, usize)> {
    debug_assert!(t_out.len() > t_in.len());

    let mut front = 0;
    while front < t_in.len() && t_in[front] == t_out[front] {
        front += 1;
    }
    if front > 0 {
        return Some((true, front));
    }

    let (n_in, n_out) = (t_in.len(), t_out.len());
    let mut back = 0;
    while back < n_in && t_in[n_in - 1 - back] == t_out[n_out - 1 - back] {
        back += 1;
    }
    if back > 0 {
        return Some((false, n_in.saturating_sub(1 + back)));
    }

    None
}

impl<'a> Converter<'a> {
    /// Convert growing rules into a subtable chain.
    pub fn analyze_insertion(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        if let Some(chain) = self.analyze_insertion_trysimple(in_tuples, out_tuples) {
            return Ok(chain);
        }

        // Not a pure internal insertion; run the general three-subtable
        // decomposition.

        let mut ct = ClassTable::new();
        for glyph in self.ignores().collect::<Vec<_>>() {
            ct.insert(glyph, ClassName::ignore());
        }

        let d = self.insertion_add_array_pass1(in_tuples, out_tuples, &mut ct)?;
        let mut chain = Vec::new();

        // First, the contextual subtable that swaps in the triggers. Fence
        // cells substitute through the marked slot unless the fence itself
        // is the glyph being replaced.
        let mut d_cont: CtxTable = CtxTable::new();
        for (state_name, row) in &d {
            let cont_row = d_cont.entry(state_name.clone()).or_default();
            for (class_name, cell) in row {
                let new_cell = match cell.glyph {
                    Some(glyph) if cell.mark => CtxCell {
                        mark: false,
                        no_advance: cell.no_advance,
                        d_mark: None,
                        d_curr: Some(vec![(glyph, cell.in_match[0])]),
                        next: cell.next.clone(),
                    },
                    Some(glyph) => CtxCell {
                        mark: false,
                        no_advance: cell.no_advance,
                        d_mark: Some(vec![(glyph, cell.in_match[0])]),
                        d_curr: None,
                        next: cell.next.clone(),
                    },
                    None => CtxCell {
                        mark: cell.mark,
                        no_advance: false,
                        d_mark: None,
                        d_curr: None,
                        next: cell.next.clone(),
                    },
                };
                cont_row.insert(class_name.clone(), new_cell);
            }
        }

        let rules: Vec<(&InTuple, &OutTuple)> = in_tuples.iter().zip(out_tuples).collect();
        let firsts: FxHashSet<GlyphId> = rules
            .iter()
            .filter_map(|(t_in, _)| t_in.first().map(|&g| glyph_of(g)))
            .collect();

        let sorted_states = self.contextual_do_transitions(&mut d_cont, &rules, &firsts);
        self.contextual_find_shared(&mut d_cont, &sorted_states, &mut ct)?;
        contextual_fix_up_classes(&mut d_cont, self.has_ignores());
        chain.push(Subtable::Contextual(contextual_into_subtable(d_cont, ct)));

        // Second, one shared insertion subtable keyed on the triggers.
        let mut payloads: BTreeMap<GlyphId, GlyphSeq> = BTreeMap::new();
        for row in d.values() {
            for cell in row.values() {
                if cell.glyph.is_some() && !cell.in_match.is_empty() && !cell.out_match.is_empty()
                {
                    payloads.insert(
                        cell.in_match[0],
                        cell.out_match[1..].iter().copied().collect(),
                    );
                }
            }
        }
        chain.push(Subtable::Insertion(self.make_ins(&payloads)));

        // Finally, resolve the triggers to the first output glyph: directly
        // when the trigger stands alone, through a ligature when leftover
        // matched glyphs follow it.
        let mut swash = Noncontextual::new();
        let mut lig_in: Vec<InTuple> = Vec::new();
        let mut lig_out: Vec<OutTuple> = Vec::new();

        for row in d.values() {
            for cell in row.values() {
                if cell.glyph.is_none() || cell.in_match.is_empty() || cell.out_match.is_empty() {
                    continue;
                }
                if cell.in_match.len() == 1 {
                    swash.insert(cell.in_match[0], cell.out_match[0]);
                } else {
                    lig_in.push(cell.in_match.iter().map(|&g| i32::from(g)).collect());
                    lig_out.push(vec![cell.out_match[0]]);
                }
            }
        }

        if !swash.is_empty() {
            chain.push(Subtable::Noncontextual(swash));
        }
        if !lig_in.is_empty() {
            chain.extend(self.analyze_ligature(&lig_in, &lig_out)?);
        }

        Ok(chain)
    }

    /// If every rule's insertion is purely internal, build the single
    /// insertion subtable; otherwise return `None`.
    pub fn analyze_insertion_trysimple(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Option<Vec<Subtable>> {
        let mut fences: Vec<(usize, usize)> = Vec::with_capacity(in_tuples.len());

        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            let abs: Vec<GlyphId> = t_in.iter().map(|&g| glyph_of(g)).collect();
            if t_out.len() <= abs.len() || abs.is_empty() {
                return None;
            }

            let mut left = 0;
            while left < abs.len() && abs[left] == t_out[left] {
                left += 1;
            }

            let (n_in, n_out) = (abs.len(), t_out.len());
            let mut back = 0;
            while back < n_in && abs[n_in - 1 - back] == t_out[n_out - 1 - back] {
                back += 1;
            }

            if left == 0 || back == 0 {
                return None;
            }

            fences.push((left, back));
        }

        let mut d: BTreeMap<StateName, StateRow<InsertionEntry>> = BTreeMap::new();
        let sot = StateName::start_of_text();
        d.insert(sot.clone(), BTreeMap::new());

        let mut ct = ClassTable::new();

        for ((left_fence, back), (t_in, t_out)) in
            fences.iter().zip(in_tuples.iter().zip(out_tuples))
        {
            let end = t_out.len() - back;
            let to_insert: GlyphSeq = if *left_fence < end {
                t_out[*left_fence..end].iter().copied().collect()
            } else {
                GlyphSeq::new()
            };

            let mut curr_state = sot.clone();
            let last = t_in.len() - 1;

            for (i, &g_in) in t_in.iter().enumerate() {
                let glyph = glyph_of(g_in);
                let class_name = self.class_name(glyph);
                ct.insert(glyph, class_name.clone());

                let next_state = if i == 0 {
                    StateName::saw(&class_name)
                } else if i < last {
                    curr_state.then(&class_name)
                } else {
                    sot.clone()
                };

                let row = d.entry(curr_state.clone()).or_default();

                if i < last {
                    // Mark the glyph the payload is inserted after.
                    row.insert(
                        class_name,
                        InsertionEntry {
                            mark: i + 1 == *left_fence,
                            next_state: next_state.clone(),
                            ..InsertionEntry::default()
                        },
                    );
                    curr_state = next_state;
                } else {
                    row.insert(
                        class_name,
                        InsertionEntry {
                            marked_insert_before: false,
                            marked_insert_glyphs: Some(to_insert.clone()),
                            marked_is_kashida_like: true,
                            next_state: sot.clone(),
                            ..InsertionEntry::default()
                        },
                    );
                }
            }
        }

        for glyph in self.ignores().collect::<Vec<_>>() {
            ct.insert(glyph, ClassName::ignore());
        }

        insertion_simple_fix_up_classes(&mut d, self.has_ignores());

        let mut table = Insertion::new(ct);
        table.states = d;
        Some(vec![Subtable::Insertion(table)])
    }

    /// First pass of the general path: walk each rule to its fence and
    /// record the trigger substitution to perform there.
    fn insertion_add_array_pass1(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
        ct: &mut ClassTable,
    ) -> Result<InsTable, ConvertError> {
        let sot = StateName::start_of_text();
        let mut d = InsTable::new();
        d.insert(sot.clone(), BTreeMap::new());

        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            let abs: Vec<GlyphId> = t_in.iter().map(|&g| glyph_of(g)).collect();
            if abs.is_empty() || t_out.len() <= abs.len() {
                self.sink().error(
                    "bad-tuple-length",
                    format!(
                        "rule {:?} -> {:?} does not grow its input, which is \
                         incorrect for insertion",
                        t_in, t_out
                    ),
                );
                return Err(ConvertError::BadTupleLength);
            }

            let Some((front_anchored, raw_k)) = characterize_insertion(&abs, t_out) else {
                self.sink().error(
                    "no-anchored-match",
                    format!(
                        "rule {:?} -> {:?} matches at neither end; no anchored \
                         automaton exists for it",
                        t_in, t_out
                    ),
                );
                return Err(ConvertError::NoAnchoredMatch);
            };

            let mut curr_state = sot.clone();
            let fence = t_in.len() - 1;
            let trailing_context = t_in.last().map_or(false, |&g| g < 0);
            // A rule whose whole input matches one end of the output would
            // push the trigger past the sequence; pin it to the fence (front)
            // or the leading glyph (back).
            let k = raw_k.min(fence);

            for (i, &glyph) in abs.iter().enumerate() {
                if !ct.contains(glyph) {
                    let name = self.class_name(glyph);
                    ct.insert(glyph, name);
                }
                let class_name = match ct.get(glyph) {
                    Some(name) => name.clone(),
                    None => self.class_name(glyph),
                };

                let next_state = if i == 0 {
                    StateName::saw(&class_name)
                } else {
                    curr_state.then(&class_name)
                };

                let row = d.entry(curr_state.clone()).or_default();

                if i < fence {
                    let mark = if front_anchored { i == k } else { i == 0 };
                    row.insert(
                        class_name,
                        InsCell {
                            mark,
                            no_advance: false,
                            glyph: None,
                            in_match: Vec::new(),
                            out_match: Vec::new(),
                            next: next_state.clone(),
                        },
                    );
                    curr_state = next_state;
                } else if front_anchored {
                    // The unmatched region is k..end; the trigger lands at
                    // position k. Note that mark may be true even on the
                    // last glyph, in which case the trigger substitutes the
                    // current glyph rather than the marked one.
                    let fake = self.alloc_fake();
                    let mut in_match = vec![fake];
                    in_match.extend_from_slice(&abs[k + 1..]);

                    row.insert(
                        class_name,
                        InsCell {
                            mark: i == k,
                            no_advance: trailing_context,
                            glyph: Some(abs[k]),
                            in_match,
                            out_match: t_out[k..].to_vec(),
                            next: sot.clone(),
                        },
                    );
                } else {
                    // Back-anchored: the unmatched region is 0..=k and the
                    // trigger lands at position 0.
                    let fake = self.alloc_fake();
                    let mut in_match = vec![fake];
                    in_match.extend_from_slice(&abs[1..k + 1]);

                    let out_match_len = t_out.len() - t_in.len() + k + 1;

                    row.insert(
                        class_name,
                        InsCell {
                            // With nothing ahead of the fence the trigger
                            // replaces the current glyph, not a marked one.
                            mark: fence == 0,
                            no_advance: trailing_context,
                            glyph: Some(abs[0]),
                            in_match,
                            out_match: t_out[..out_match_len].to_vec(),
                            next: sot.clone(),
                        },
                    );
                }
            }
        }

        Ok(d)
    }

    /// Build a two-state insertion subtable mapping trigger glyphs to
    /// payloads inserted after them.
    pub(crate) fn make_ins(&self, payloads: &BTreeMap<GlyphId, GlyphSeq>) -> Insertion {
        let mut ct = ClassTable::new();
        for &glyph in payloads.keys() {
            ct.insert(glyph, ClassName::new(format!("glyph {}", glyph)));
        }
        for glyph in self.ignores() {
            ct.insert(glyph, ClassName::ignore());
        }

        let nop = InsertionEntry::default();
        let mut sot_row: StateRow<InsertionEntry> = BTreeMap::new();
        sot_row.insert(ClassName::end_of_text(), nop.clone());
        sot_row.insert(ClassName::out_of_bounds(), nop.clone());
        sot_row.insert(ClassName::deleted_glyph(), nop.clone());
        sot_row.insert(ClassName::end_of_line(), nop.clone());
        if self.has_ignores() {
            sot_row.insert(ClassName::ignore(), nop);
        }

        for (&glyph, payload) in payloads {
            sot_row.insert(
                ClassName::new(format!("glyph {}", glyph)),
                InsertionEntry {
                    current_insert_before: false,
                    current_insert_glyphs: Some(payload.clone()),
                    current_is_kashida_like: true,
                    ..InsertionEntry::default()
                },
            );
        }

        let mut table = Insertion::new(ct);
        table
            .states
            .insert(StateName::start_of_text(), sot_row.clone());
        table.states.insert(StateName::start_of_line(), sot_row);
        table
    }
}

/// Fill the missing classes of a simple insertion table: the start rows
/// no-op, deleted and ignored glyphs hold their state, anything else abandons
/// the match and reprocesses from the start state.
fn insertion_simple_fix_up_classes(
    d: &mut BTreeMap<StateName, StateRow<InsertionEntry>>,
    has_ignores: bool,
) {
    let sot = StateName::start_of_text();

    let mut std_classes = vec![
        ClassName::end_of_text(),
        ClassName::end_of_line(),
        ClassName::deleted_glyph(),
        ClassName::out_of_bounds(),
    ];
    if has_ignores {
        std_classes.push(ClassName::ignore());
    }

    let mut all_classes: Vec<ClassName> = std_classes.clone();
    for row in d.values() {
        for class_name in row.keys() {
            if !all_classes.contains(class_name) {
                all_classes.push(class_name.clone());
            }
        }
    }

    if let Some(sot_row) = d.get_mut(&sot) {
        for class_name in &all_classes {
            sot_row
                .entry(class_name.clone())
                .or_insert_with(InsertionEntry::default);
        }
    }

    let sot_row = d[&sot].clone();
    d.insert(StateName::start_of_line(), sot_row);

    let hold_classes = [ClassName::deleted_glyph(), ClassName::ignore()];
    for (state_name, row) in d.iter_mut() {
        for class_name in &all_classes {
            if row.contains_key(class_name) {
                continue;
            }
            let entry = if hold_classes.contains(class_name) {
                InsertionEntry::self_loop(state_name.clone())
            } else {
                InsertionEntry {
                    no_advance: true,
                    ..InsertionEntry::default()
                }
            };
            row.insert(class_name.clone(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characterize_front_match() {
        assert_eq!(characterize_insertion(&[1, 2, 3], &[1, 2, 7, 8]), Some((true, 2)));
    }

    #[test]
    fn characterize_back_match() {
        assert_eq!(characterize_insertion(&[133, 94], &[27, 61, 94]), Some((false, 0)));
    }

    #[test]
    fn characterize_no_match() {
        assert_eq!(characterize_insertion(&[1, 2], &[4, 5, 6]), None);
    }
}
