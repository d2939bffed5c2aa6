//! Contextual analysis: equal-length rules as mark/current substitutions.
//!
//! A single contextual subtable can rewrite at most two positions per rule
//! (the marked glyph and the current glyph), and one of them has to be the
//! last matched position. Rule sets inside that envelope build directly;
//! anything else decomposes into two passes chained through a synthetic
//! trigger glyph.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;

use crate::classtable::{ClassName, ClassTable, StateName};
use crate::convert::{tuples_equal, Converter, InTuple, OutTuple};
use crate::error::ConvertError;
use crate::glyph::{glyph_of, GlyphId, InGlyph};
use crate::tables::{Contextual, ContextualEntry, GlyphMap, StateRow, Subtable};

/// Working transition cell; pairs become `GlyphMap`s once the table shape
/// is final. Kept as sorted pair lists so cells can key consolidation maps.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct CtxCell {
    pub mark: bool,
    pub no_advance: bool,
    pub d_mark: Option<Vec<(GlyphId, GlyphId)>>,
    pub d_curr: Option<Vec<(GlyphId, GlyphId)>>,
    pub next: StateName,
}

impl CtxCell {
    pub fn nop(next: StateName) -> CtxCell {
        CtxCell {
            mark: false,
            no_advance: false,
            d_mark: None,
            d_curr: None,
            next,
        }
    }
}

/// The in-progress state table: state name -> class name -> cell.
pub(crate) type CtxTable = BTreeMap<StateName, BTreeMap<ClassName, CtxCell>>;

/// Column signature used when consolidating classes. The current-glyph map
/// participates only by presence, so classes carrying different payloads
/// can merge (their maps concatenate).
type ColumnSig = (
    bool,
    bool,
    Option<Vec<(GlyphId, GlyphId)>>,
    bool,
    StateName,
);

/// Row signature used when consolidating states; dual of `ColumnSig`.
type RowSig = (bool, bool, bool, Option<Vec<(GlyphId, GlyphId)>>, StateName);

impl<'a> Converter<'a> {
    /// Convert equal-length rules into one or more contextual subtables.
    pub fn analyze_contextual(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        self.analyze_contextual_inner(in_tuples, out_tuples, false)
    }

    /// Entry point for callers that already replaced the leading glyph with
    /// a synthetic trigger; the complex path skips its first pass.
    pub(crate) fn analyze_contextual_faked(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        self.analyze_contextual_inner(in_tuples, out_tuples, true)
    }

    fn analyze_contextual_inner(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
        already_faked: bool,
    ) -> Result<Vec<Subtable>, ConvertError> {
        // A rule changing more than two positions, or two positions with
        // the last matched glyph unchanged, cannot ride a single subtable.
        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            let changes: Vec<bool> = t_in
                .iter()
                .zip(t_out)
                .map(|(&g_in, &g_out)| g_in != InGlyph::from(g_out))
                .collect();
            let count = changes.iter().filter(|&&c| c).count();

            if count > 2 || (count == 2 && !changes.last().copied().unwrap_or(false)) {
                return self.analyze_contextual_complex(in_tuples, out_tuples, already_faked);
            }
        }

        let rules: Vec<(&InTuple, &OutTuple)> = in_tuples.iter().zip(out_tuples).collect();

        let mut ct = ClassTable::new();
        let mut d = self.contextual_add_array(&rules, &mut ct);

        for glyph in self.ignores().collect::<Vec<_>>() {
            ct.insert(glyph, ClassName::ignore());
        }

        let firsts: FxHashSet<GlyphId> = rules
            .iter()
            .filter_map(|(t_in, _)| t_in.first().map(|&g| glyph_of(g)))
            .collect();
        let sorted_states = self.contextual_do_transitions(&mut d, &rules, &firsts);

        self.contextual_find_shared(&mut d, &sorted_states, &mut ct)?;

        contextual_fix_up_classes(&mut d, self.has_ignores());

        Ok(vec![Subtable::Contextual(contextual_into_subtable(d, ct))])
    }

    /// Two-pass decomposition for rule sets a single subtable cannot carry:
    /// pass 1 substitutes each rule's first glyph with a synthetic trigger,
    /// pass 2 rewrites every position one class at a time off that trigger.
    pub(crate) fn analyze_contextual_complex(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
        already_faked: bool,
    ) -> Result<Vec<Subtable>, ConvertError> {
        let mut rv = Vec::new();

        let temp_in: Vec<InTuple> = if already_faked {
            in_tuples.to_vec()
        } else {
            let mut faked = Vec::with_capacity(in_tuples.len());
            for t_in in in_tuples {
                let mut t = Vec::with_capacity(t_in.len());
                t.push(InGlyph::from(self.alloc_fake()));
                t.extend_from_slice(&t_in[1..]);
                faked.push(t);
            }

            // Pass 1: an ordinary contextual run that only swaps the first
            // glyph for its trigger.
            let pass1_out: Vec<OutTuple> = faked
                .iter()
                .map(|t| t.iter().map(|&g| glyph_of(g)).collect())
                .collect();
            rv.extend(self.analyze_contextual(in_tuples, &pass1_out)?);

            faked
        };

        // Pass 2: per-position replacement keyed off the trigger. Every
        // class here is a single raw glyph, so the shared-column optimizer
        // does not run.
        let rules: Vec<(&InTuple, &OutTuple)> = temp_in.iter().zip(out_tuples).collect();

        let mut ct = ClassTable::new();
        for glyph in self.ignores().collect::<Vec<_>>() {
            ct.insert(glyph, ClassName::ignore());
        }

        let mut d = self.contextual_complex_add_array(&rules, &mut ct);

        let firsts: FxHashSet<GlyphId> = rules
            .iter()
            .filter_map(|(t_in, _)| t_in.first().map(|&g| glyph_of(g)))
            .collect();
        let _ = self.contextual_do_transitions(&mut d, &rules, &firsts);

        contextual_fix_up_classes(&mut d, self.has_ignores());

        rv.push(Subtable::Contextual(contextual_into_subtable(d, ct)));
        Ok(rv)
    }

    /// Build the raw state array for the simple path, recording marks while
    /// scanning multi-glyph contexts and the substitution payloads on each
    /// rule's final transition.
    pub(crate) fn contextual_add_array(
        &mut self,
        rules: &[(&InTuple, &OutTuple)],
        ct: &mut ClassTable,
    ) -> CtxTable {
        let sot = StateName::start_of_text();
        let mut d = CtxTable::new();
        d.insert(sot.clone(), BTreeMap::new());

        for &(t_in, t_out) in rules {
            if tuples_equal(t_in, t_out) {
                self.sink().warning(
                    "noop-rule",
                    format!(
                        "input tuple {:?} maps to itself; the rule has no effect and is omitted",
                        t_in
                    ),
                );
                continue;
            }

            let mut curr_state = sot.clone();
            let mut marked: Option<usize> = None;
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

                if let Some(cell) = row.get(&class_name).cloned() {
                    // This transition exists from an earlier rule; reuse it,
                    // upgrading to a mark when this rule changes the glyph.
                    debug_assert!(cell.d_mark.is_none());
                    curr_state = next_state;

                    if cell.mark {
                        debug_assert!(marked.is_none());
                        marked = Some(i);
                    } else if i < last && glyph != t_out[i] {
                        row.insert(
                            class_name.clone(),
                            CtxCell {
                                mark: true,
                                no_advance: false,
                                d_mark: None,
                                d_curr: None,
                                next: cell.next.clone(),
                            },
                        );
                        marked = Some(i);
                        curr_state = cell.next;
                    }

                    continue;
                }

                if i < last {
                    let mark = glyph != t_out[i];
                    if mark {
                        marked = Some(i);
                    }

                    row.insert(
                        class_name,
                        CtxCell {
                            mark,
                            no_advance: false,
                            d_mark: None,
                            d_curr: None,
                            next: next_state.clone(),
                        },
                    );
                    curr_state = next_state;
                } else {
                    // Final glyph: attach the accumulated substitutions.
                    let mark_change =
                        marked.map(|m| vec![(glyph_of(t_in[m]), t_out[m])]);
                    let curr_change =
                        (glyph != t_out[i]).then(|| vec![(glyph, t_out[i])]);

                    row.insert(
                        class_name,
                        CtxCell {
                            mark: false,
                            no_advance: g_in < 0,
                            d_mark: mark_change,
                            d_curr: curr_change,
                            next: sot.clone(),
                        },
                    );
                }
            }
        }

        d
    }

    /// Build the raw state array for the complex second pass: one
    /// current-glyph replacement per position, cascading along the context.
    fn contextual_complex_add_array(
        &mut self,
        rules: &[(&InTuple, &OutTuple)],
        ct: &mut ClassTable,
    ) -> CtxTable {
        let sot = StateName::start_of_text();
        let mut d = CtxTable::new();
        d.insert(sot.clone(), BTreeMap::new());

        for &(t_in, t_out) in rules {
            if tuples_equal(t_in, t_out) {
                continue;
            }

            let mut curr_state = sot.clone();
            let last = t_in.len() - 1;

            for (i, &g_in) in t_in.iter().enumerate() {
                let glyph = glyph_of(g_in);
                // The leading position is the synthetic trigger; name it by
                // its raw code rather than through the namer.
                let class_name = if i == 0 {
                    ClassName::new(glyph.to_string())
                } else {
                    self.class_name(glyph)
                };
                ct.insert(glyph, class_name.clone());

                let next_state = if i == 0 {
                    StateName::saw(&class_name)
                } else if i < last {
                    curr_state.then(&class_name)
                } else {
                    sot.clone()
                };

                d.entry(curr_state.clone()).or_default().insert(
                    class_name,
                    CtxCell {
                        mark: false,
                        no_advance: false,
                        d_mark: None,
                        d_curr: Some(vec![(glyph, t_out[i])]),
                        next: next_state.clone(),
                    },
                );

                curr_state = next_state;
            }
        }

        d
    }

    /// Fill in the missing (state, class) transitions: unknown glyphs fall
    /// back to the start state, rule-leading glyphs restart a match.
    pub(crate) fn contextual_do_transitions(
        &self,
        d: &mut CtxTable,
        rules: &[(&InTuple, &OutTuple)],
        first_glyphs: &FxHashSet<GlyphId>,
    ) -> Vec<StateName> {
        let sot = StateName::start_of_text();
        let sorted_states: Vec<StateName> =
            d.keys().filter(|name| **name != sot).cloned().collect();

        let mut all_glyphs: BTreeSet<GlyphId> = BTreeSet::new();
        for (t_in, _) in rules {
            all_glyphs.extend(t_in.iter().map(|&g| glyph_of(g)));
        }

        let row = d.entry(sot.clone()).or_default();
        for &glyph in &all_glyphs {
            let class_name = self.class_name(glyph);
            row.entry(class_name)
                .or_insert_with(|| CtxCell::nop(sot.clone()));
        }

        for state_name in &sorted_states {
            let Some(row) = d.get_mut(state_name) else {
                continue;
            };

            for &glyph in &all_glyphs {
                let class_name = self.class_name(glyph);
                if row.contains_key(&class_name) {
                    continue;
                }

                // Rule-leading glyphs are marked on the restart transition.
                // Computing whether the mark is used would be expensive
                // here, and an unused mark is harmless.
                let cell = if first_glyphs.contains(&glyph) {
                    CtxCell {
                        mark: true,
                        no_advance: false,
                        d_mark: None,
                        d_curr: None,
                        next: StateName::saw(&class_name),
                    }
                } else {
                    CtxCell::nop(sot.clone())
                };
                row.insert(class_name, cell);
            }
        }

        sorted_states
    }

    /// Consolidate classes whose behavior vector is identical, then states
    /// whose rows are identical. Class merging concatenates the
    /// current-substitution maps; a key needed by two merged classes is a
    /// caller bug and aborts the conversion.
    pub(crate) fn contextual_find_shared(
        &mut self,
        d: &mut CtxTable,
        sorted_states: &[StateName],
        ct: &mut ClassTable,
    ) -> Result<(), ConvertError> {
        let sot = StateName::start_of_text();

        let mut states: Vec<StateName> = sorted_states.to_vec();
        if !states.contains(&sot) {
            states.insert(0, sot.clone());
        }

        // Columns. Two columns are equal when every cell agrees on the mark
        // substitution and on whether a current substitution is present.
        let mut consol: BTreeMap<Vec<ColumnSig>, BTreeSet<ClassName>> = BTreeMap::new();
        let sot_classes: Vec<ClassName> = d[&sot].keys().cloned().collect();

        for class_name in &sot_classes {
            let mut signature = Vec::with_capacity(states.len());
            for state in &states {
                let cell = &d[state][class_name];
                signature.push((
                    cell.mark,
                    cell.no_advance,
                    cell.d_mark.clone(),
                    cell.d_curr.is_some(),
                    cell.next.clone(),
                ));
            }
            consol
                .entry(signature)
                .or_default()
                .insert(class_name.clone());
        }

        for (common, group) in &consol {
            if group.len() == 1 {
                continue;
            }

            let names: Vec<&ClassName> = group.iter().collect();
            let new_class_name = if names.len() == 2 {
                ClassName::new(format!("{} and {}", names[0], names[1]))
            } else {
                ClassName::new(format!("group with {}", names[0]))
            };

            ct.merge_classes(group, &new_class_name);

            for (state, common_cell) in states.iter().zip(common) {
                let mut keys: Vec<GlyphId> = Vec::new();
                let mut pairs: Vec<(GlyphId, GlyphId)> = Vec::new();

                for class_name in group {
                    if let Some(d_curr) = &d[state][class_name].d_curr {
                        keys.extend(d_curr.iter().map(|&(g, _)| g));
                        pairs.extend(d_curr.iter().cloned());
                    }
                }

                let unique: FxHashSet<GlyphId> = keys.iter().copied().collect();
                if unique.len() != keys.len() {
                    self.sink().error(
                        "subst-conflict",
                        format!(
                            "classes {:?} cannot consolidate: their current-substitution \
                             maps share keys",
                            names
                        ),
                    );
                    return Err(ConvertError::SubstitutionConflict);
                }

                let new_cell = CtxCell {
                    mark: common_cell.0,
                    no_advance: common_cell.1,
                    d_mark: common_cell.2.clone(),
                    d_curr: if pairs.is_empty() { None } else { Some(pairs) },
                    next: common_cell.4.clone(),
                };

                let Some(row) = d.get_mut(state) else {
                    continue;
                };
                row.insert(new_class_name.clone(), new_cell);
                for class_name in group {
                    row.remove(class_name);
                }
            }
        }

        // Rows. Dual of the column pass: mark substitutions participate by
        // presence and are concatenated on merge. The start state never
        // merges away.
        let mut consol: BTreeMap<Vec<RowSig>, BTreeSet<StateName>> = BTreeMap::new();
        let sorted_classes: Vec<ClassName> = d[&sot].keys().cloned().collect();

        for state in &states {
            let mut signature = Vec::with_capacity(sorted_classes.len());
            for class_name in &sorted_classes {
                let cell = &d[state][class_name];
                signature.push((
                    cell.mark,
                    cell.no_advance,
                    cell.d_mark.is_some(),
                    cell.d_curr.clone(),
                    cell.next.clone(),
                ));
            }
            consol.entry(signature).or_default().insert(state.clone());
        }

        let mut next_combo_index = 1;

        for group in consol.values() {
            if group.len() == 1 || group.contains(&sot) {
                continue;
            }

            let Some(avatar) = group.iter().next() else {
                continue;
            };

            let new_state_name = StateName::combo(next_combo_index);
            next_combo_index += 1;

            let mut new_row = d[avatar].clone();
            for (class_name, cell) in new_row.iter_mut() {
                let mut merged: Vec<(GlyphId, GlyphId)> = Vec::new();
                for state in group {
                    if let Some(d_mark) = &d[state][class_name].d_mark {
                        merged.extend(d_mark.iter().cloned());
                    }
                }
                cell.d_mark = if merged.is_empty() { None } else { Some(merged) };
            }

            d.insert(new_state_name.clone(), new_row);
            for state in group {
                d.remove(state);
            }

            for row in d.values_mut() {
                for cell in row.values_mut() {
                    if group.contains(&cell.next) {
                        cell.next = new_state_name.clone();
                    }
                }
            }
        }

        Ok(())
    }
}

/// Inject the fixed classes into every row and copy the start-of-text
/// state to start-of-line.
pub(crate) fn contextual_fix_up_classes(d: &mut CtxTable, add_ignores: bool) {
    let sot = StateName::start_of_text();
    let state_names: Vec<StateName> = d.keys().cloned().collect();

    for state_name in state_names {
        let nop = CtxCell::nop(sot.clone());
        let hold = CtxCell::nop(state_name.clone());

        let Some(row) = d.get_mut(&state_name) else {
            continue;
        };
        row.insert(ClassName::end_of_text(), nop.clone());
        row.insert(ClassName::out_of_bounds(), nop.clone());
        if add_ignores {
            row.insert(ClassName::ignore(), hold.clone());
        }
        row.insert(ClassName::deleted_glyph(), hold);
        row.insert(ClassName::end_of_line(), nop);
    }

    let sot_row = d[&sot].clone();
    d.insert(StateName::start_of_line(), sot_row);
}

/// Freeze the working table into its immutable subtable form.
pub(crate) fn contextual_into_subtable(d: CtxTable, ct: ClassTable) -> Contextual {
    let mut table = Contextual::new(ct);

    for (state_name, row) in d {
        let entry_row: StateRow<ContextualEntry> = row
            .into_iter()
            .map(|(class_name, cell)| {
                let entry = ContextualEntry {
                    mark: cell.mark,
                    no_advance: cell.no_advance,
                    mark_subst: cell
                        .d_mark
                        .map(|pairs| pairs.into_iter().collect::<GlyphMap>()),
                    current_subst: cell
                        .d_curr
                        .map(|pairs| pairs.into_iter().collect::<GlyphMap>()),
                    next_state: cell.next,
                };
                (class_name, entry)
            })
            .collect();
        table.states.insert(state_name, entry_row);
    }

    table
}
