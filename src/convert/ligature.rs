//! Ligature analysis: many glyphs in, one glyph out.
//!
//! The table grows one state per additional matched position under each
//! distinct first glyph. Partial ligatures that feed larger ones (an
//! `f + f -> ff` rule contributing to `f + f + i -> ffi`) are pre-worked by
//! rewriting the longer rule's matching prefix to the shorter rule's
//! output, so the machine chains through the intermediate ligature.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::classtable::{ClassName, ClassTable, StateName};
use crate::convert::{Converter, InTuple, OutTuple};
use crate::error::ConvertError;
use crate::glyph::{glyph_of, GlyphId};
use crate::tables::{Ligature, LigatureActions, LigatureEntry, StateRow, Subtable};

type GlyphTuple = Vec<GlyphId>;

/// Working rule: abs-valued input, output, and the state a partial match
/// continues in when this rule's output feeds a longer ligature.
struct LigRule {
    t_in: GlyphTuple,
    t_out: GlyphTuple,
    continue_match: Option<StateName>,
}

/// Row key of the working table. Rows are keyed by raw glyph until
/// consolidation replaces merged glyphs with their group, and the fix-up
/// pass adds the fixed classes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum LigKey {
    Glyph(GlyphId),
    Group(BTreeSet<GlyphId>),
    Fixed(ClassName),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LigCell {
    push: bool,
    actions: Option<(Vec<GlyphTuple>, Vec<GlyphTuple>)>,
    next: StateName,
}

impl LigCell {
    fn nop(next: StateName) -> LigCell {
        LigCell {
            push: false,
            actions: None,
            next,
        }
    }
}

type LigTable = BTreeMap<StateName, BTreeMap<LigKey, LigCell>>;

impl<'a> Converter<'a> {
    /// Convert many-to-one rules into a ligature subtable.
    pub fn analyze_ligature(
        &mut self,
        in_tuples: &[InTuple],
        out_tuples: &[OutTuple],
    ) -> Result<Vec<Subtable>, ConvertError> {
        let mut rules = Vec::with_capacity(in_tuples.len());

        for (t_in, t_out) in in_tuples.iter().zip(out_tuples) {
            if t_in.is_empty() || t_out.is_empty() {
                self.sink().error(
                    "bad-tuple-length",
                    format!(
                        "rule {:?} -> {:?} is empty on one side, which is incorrect \
                         for ligature substitution",
                        t_in, t_out
                    ),
                );
                return Err(ConvertError::BadTupleLength);
            }

            if t_in.iter().any(|&g| g < 0) {
                self.sink().error(
                    "negative-glyph",
                    format!(
                        "input tuple {:?} has a negative value, which ligature \
                         substitution cannot express",
                        t_in
                    ),
                );
                return Err(ConvertError::NegativeGlyph);
            }

            rules.push(LigRule {
                t_in: t_in.iter().map(|&g| glyph_of(g)).collect(),
                t_out: t_out.clone(),
                continue_match: None,
            });
        }

        self.ligature_process_partials(&mut rules);

        let first_glyphs: BTreeSet<GlyphId> =
            rules.iter().map(|rule| rule.t_in[0]).collect();

        let mut d = self.ligature_add_array(&rules, &first_glyphs)?;
        let sorted_states = ligature_do_transitions(&mut d, &rules, &first_glyphs, |g| {
            StateName::saw(&self.class_name(g))
        });

        ligature_find_shared(&mut d, &sorted_states);

        let ct = self.ligature_make_ct(&d);
        ligature_fix_up_classes(&mut d, self.has_ignores());

        Ok(vec![Subtable::Ligature(ligature_into_subtable(d, ct))])
    }

    /// Rewrite rules so that shorter ligatures feeding longer ones chain
    /// through their output glyph instead of re-matching raw components.
    fn ligature_process_partials(&self, rules: &mut Vec<LigRule>) {
        let lens: BTreeSet<usize> = rules.iter().map(|rule| rule.t_in.len()).collect();
        let (Some(&min_len), Some(&max_len)) = (lens.iter().next(), lens.iter().next_back())
        else {
            return;
        };
        if min_len == max_len {
            return;
        }

        for try_len in min_len..max_len {
            let to_try: FxHashMap<GlyphTuple, GlyphId> = rules
                .iter()
                .filter(|rule| rule.t_in.len() == try_len)
                .map(|rule| (rule.t_in.clone(), rule.t_out[0]))
                .collect();

            let present_partials: FxHashSet<GlyphTuple> = rules
                .iter()
                .filter(|rule| rule.t_in.len() > try_len)
                .map(|rule| rule.t_in[..try_len].to_vec())
                .collect();

            for rule in rules.iter_mut() {
                if rule.t_in.len() > try_len {
                    if let Some(&lig) = to_try.get(&rule.t_in[..try_len]) {
                        let mut rewritten = vec![lig];
                        rewritten.extend_from_slice(&rule.t_in[try_len..]);
                        rule.t_in = rewritten;
                    }
                } else if rule.t_in.len() == try_len && present_partials.contains(&rule.t_in) {
                    rule.continue_match =
                        Some(StateName::saw(&self.class_name(rule.t_out[0])));
                }
            }
        }
    }

    fn ligature_add_array(
        &mut self,
        rules: &[LigRule],
        first_glyphs: &BTreeSet<GlyphId>,
    ) -> Result<LigTable, ConvertError> {
        let sot = StateName::start_of_text();
        let mut d = LigTable::new();
        d.insert(sot.clone(), BTreeMap::new());

        for &first in first_glyphs {
            let glyph_state = StateName::saw(&self.class_name(first));

            if let Some(row) = d.get_mut(&sot) {
                row.insert(
                    LigKey::Glyph(first),
                    LigCell {
                        push: true,
                        actions: None,
                        next: glyph_state.clone(),
                    },
                );
            }

            for rule in rules.iter().filter(|rule| rule.t_in[0] == first) {
                if rule.t_in.len() == 1 {
                    // A one-glyph rule acts entirely at the start state. The
                    // partials pre-pass guarantees no longer rule still
                    // begins with this glyph.
                    let next = rule
                        .continue_match
                        .clone()
                        .unwrap_or_else(StateName::start_of_text);
                    if let Some(row) = d.get_mut(&sot) {
                        row.insert(
                            LigKey::Glyph(first),
                            LigCell {
                                push: true,
                                actions: Some((
                                    vec![rule.t_in.clone()],
                                    vec![vec![rule.t_out[0]]],
                                )),
                                next,
                            },
                        );
                    }
                    continue;
                }

                let mut curr_state = glyph_state.clone();
                let last = rule.t_in.len() - 1;

                for (i, &g) in rule.t_in.iter().enumerate().skip(1) {
                    let is_last = i == last;
                    d.entry(curr_state.clone()).or_default();

                    let mut next_state = curr_state.then(&self.class_name(g));
                    let existing = d
                        .get(&curr_state)
                        .and_then(|row| row.get(&LigKey::Glyph(g)))
                        .cloned();

                    match existing {
                        None => {
                            let cell = if !is_last {
                                LigCell {
                                    push: true,
                                    actions: None,
                                    next: next_state.clone(),
                                }
                            } else {
                                next_state = rule
                                    .continue_match
                                    .clone()
                                    .unwrap_or_else(StateName::start_of_text);
                                LigCell {
                                    push: true,
                                    actions: Some((
                                        vec![rule.t_in.clone()],
                                        vec![vec![rule.t_out[0]]],
                                    )),
                                    next: next_state.clone(),
                                }
                            };

                            if let Some(row) = d.get_mut(&curr_state) {
                                row.insert(LigKey::Glyph(g), cell);
                            }
                        }
                        Some(cell) if !is_last && cell.actions.is_none() => {
                            // Shared interior transition; nothing to add.
                        }
                        Some(_) => {
                            self.sink().error(
                                "ligature-conflict",
                                format!(
                                    "ligature rule {:?} -> {:?} conflicts with an \
                                     earlier rule over the same sequence",
                                    rule.t_in, rule.t_out
                                ),
                            );
                            return Err(ConvertError::LigatureConflict);
                        }
                    }

                    curr_state = next_state;
                }
            }
        }

        Ok(d)
    }

    fn ligature_make_ct(&self, d: &LigTable) -> ClassTable {
        let sot = StateName::start_of_text();
        let mut ct = ClassTable::new();

        if let Some(row) = d.get(&sot) {
            for key in row.keys() {
                match key {
                    LigKey::Glyph(g) => ct.insert(*g, self.class_name(*g)),
                    LigKey::Group(set) => {
                        let Some(&min) = set.iter().next() else {
                            continue;
                        };
                        let name = ClassName::new(format!("group {}", self.class_name(min)));
                        for &g in set {
                            ct.insert(g, name.clone());
                        }
                    }
                    LigKey::Fixed(_) => {}
                }
            }
        }

        for glyph in self.ignores() {
            ct.insert(glyph, ClassName::ignore());
        }

        ct
    }
}

fn ligature_do_transitions(
    d: &mut LigTable,
    rules: &[LigRule],
    first_glyphs: &BTreeSet<GlyphId>,
    saw_state: impl Fn(GlyphId) -> StateName,
) -> Vec<StateName> {
    let sot = StateName::start_of_text();
    let sorted_states: Vec<StateName> = d.keys().filter(|name| **name != sot).cloned().collect();

    let mut all_glyphs: BTreeSet<GlyphId> = BTreeSet::new();
    for rule in rules {
        all_glyphs.extend(rule.t_in.iter().copied());
        if rule.continue_match.is_some() {
            all_glyphs.extend(rule.t_out.iter().copied());
        }
    }

    if let Some(row) = d.get_mut(&sot) {
        for &glyph in &all_glyphs {
            row.entry(LigKey::Glyph(glyph))
                .or_insert_with(|| LigCell::nop(sot.clone()));
        }
    }

    for state_name in &sorted_states {
        let Some(row) = d.get_mut(state_name) else {
            continue;
        };
        for &glyph in &all_glyphs {
            if row.contains_key(&LigKey::Glyph(glyph)) {
                continue;
            }
            let cell = if first_glyphs.contains(&glyph) {
                LigCell {
                    push: true,
                    actions: None,
                    next: saw_state(glyph),
                }
            } else {
                LigCell::nop(sot.clone())
            };
            row.insert(LigKey::Glyph(glyph), cell);
        }
    }

    sorted_states
}

/// Consolidate glyphs whose columns behave identically into a single
/// composite class. Columns match when every cell agrees modulo the actual
/// ligature actions, which are unioned into the group's action set.
fn ligature_find_shared(d: &mut LigTable, sorted_states: &[StateName]) {
    if sorted_states.is_empty() {
        return;
    }

    let sot = StateName::start_of_text();
    let mut states: Vec<StateName> = Vec::with_capacity(sorted_states.len() + 1);
    states.push(sot.clone());
    states.extend_from_slice(sorted_states);

    let sot_glyphs: Vec<GlyphId> = d[&sot]
        .keys()
        .filter_map(|key| match key {
            LigKey::Glyph(g) => Some(*g),
            _ => None,
        })
        .collect();

    let mut share: BTreeMap<Vec<(bool, bool, StateName)>, BTreeSet<GlyphId>> = BTreeMap::new();
    let mut substs: FxHashMap<(StateName, GlyphId), (Vec<GlyphTuple>, Vec<GlyphTuple>)> =
        FxHashMap::default();

    for &glyph in &sot_glyphs {
        let mut signature = Vec::with_capacity(states.len());
        for state in &states {
            let cell = &d[state][&LigKey::Glyph(glyph)];
            if let Some(actions) = &cell.actions {
                substs.insert((state.clone(), glyph), actions.clone());
                signature.push((cell.push, true, cell.next.clone()));
            } else {
                signature.push((cell.push, false, cell.next.clone()));
            }
        }
        share.entry(signature).or_default().insert(glyph);
    }

    for glyph_set in share.values() {
        if glyph_set.len() == 1 {
            continue;
        }

        let Some(&avatar) = glyph_set.iter().next() else {
            continue;
        };

        let state_names: Vec<StateName> = d.keys().cloned().collect();
        for state in state_names {
            let cell = d[&state][&LigKey::Glyph(avatar)].clone();

            let new_cell = if cell.actions.is_some() {
                let mut v_in: Vec<GlyphTuple> = Vec::new();
                let mut v_out: Vec<GlyphTuple> = Vec::new();
                for &glyph in glyph_set {
                    if let Some((ins_part, outs_part)) = substs.get(&(state.clone(), glyph)) {
                        v_in.extend(ins_part.iter().cloned());
                        v_out.extend(outs_part.iter().cloned());
                    }
                }
                LigCell {
                    push: cell.push,
                    actions: Some((v_in, v_out)),
                    next: cell.next,
                }
            } else {
                cell
            };

            let Some(row) = d.get_mut(&state) else {
                continue;
            };
            row.insert(LigKey::Group(glyph_set.clone()), new_cell);
            for &glyph in glyph_set {
                row.remove(&LigKey::Glyph(glyph));
            }
        }
    }
}

fn ligature_fix_up_classes(d: &mut LigTable, add_ignores: bool) {
    let sot = StateName::start_of_text();
    let state_names: Vec<StateName> = d.keys().cloned().collect();

    for state_name in state_names {
        let nop = LigCell::nop(sot.clone());
        let hold = LigCell::nop(state_name.clone());

        let Some(row) = d.get_mut(&state_name) else {
            continue;
        };
        row.insert(LigKey::Fixed(ClassName::end_of_text()), nop.clone());
        row.insert(LigKey::Fixed(ClassName::out_of_bounds()), nop.clone());
        if add_ignores {
            row.insert(LigKey::Fixed(ClassName::ignore()), hold.clone());
        }
        row.insert(LigKey::Fixed(ClassName::deleted_glyph()), hold);
        row.insert(LigKey::Fixed(ClassName::end_of_line()), nop);
    }

    let sot_row = d[&sot].clone();
    d.insert(StateName::start_of_line(), sot_row);
}

fn ligature_into_subtable(d: LigTable, ct: ClassTable) -> Ligature {
    let mut table = Ligature::new(ct);

    for (state_name, row) in d {
        let mut entry_row: StateRow<LigatureEntry> = BTreeMap::new();

        for (key, cell) in row {
            let class_name = match &key {
                LigKey::Fixed(name) => name.clone(),
                LigKey::Glyph(g) => table
                    .class_table
                    .get(*g)
                    .cloned()
                    .unwrap_or_else(|| ClassName::new(g.to_string())),
                LigKey::Group(set) => set
                    .iter()
                    .next()
                    .and_then(|&g| table.class_table.get(g).cloned())
                    .unwrap_or_else(|| ClassName::new("group".to_string())),
            };

            let actions = cell.actions.map(|(v_in, v_out)| {
                v_in.into_iter()
                    .zip(v_out)
                    .collect::<LigatureActions>()
            });

            entry_row.insert(
                class_name,
                LigatureEntry {
                    push: cell.push,
                    actions,
                    next_state: cell.next,
                },
            );
        }

        table.states.insert(state_name, entry_row);
    }

    table
}
