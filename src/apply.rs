//! Evaluation of subtable chains over glyph streams.
//!
//! Each subtable kind has the processing model of its `morx` counterpart:
//! contextual machines substitute the marked and current glyphs, ligature
//! machines stack components and fire actions on the final one, insertion
//! machines splice payloads around their anchors, and noncontextual tables
//! map the stream in a single pass. Glyphs substituted to the deleted
//! sentinel are stripped once the whole chain has run.
//!
//! Conversion results are driven through this module to observe their
//! effect; it is also what the round-trip tests use to check that a chain
//! reproduces its source rules.

use crate::classtable::{ClassName, ClassTable, StateName};
use crate::error::ApplyError;
use crate::glyph::{GlyphId, DELETED_GLYPH};
use crate::tables::{
    Contextual, Insertion, Ligature, Noncontextual, StateTable, Subtable,
};

/// Run `subtables` over `glyphs` in order, then strip deleted glyphs.
pub fn apply(subtables: &[Subtable], glyphs: &mut Vec<GlyphId>) -> Result<(), ApplyError> {
    for subtable in subtables {
        match subtable {
            Subtable::Noncontextual(table) => noncontextual_substitution(table, glyphs),
            Subtable::Contextual(table) => {
                ContextualSubstitution::new(glyphs).process_glyphs(table)?
            }
            Subtable::Ligature(table) => {
                LigatureSubstitution::new(glyphs).process_glyphs(table)?
            }
            Subtable::Insertion(table) => {
                InsertionSubstitution::new(glyphs).process_glyphs(table)?
            }
        }
    }
    remove_deleted_glyphs(glyphs);
    Ok(())
}

/// Resolve a glyph to its class for `table`. The deleted glyph has its own
/// fixed class; glyphs outside the class table are out of bounds.
fn glyph_class<E>(table: &StateTable<E>, glyph: GlyphId) -> ClassName {
    if glyph == DELETED_GLYPH {
        return ClassName::deleted_glyph();
    }
    class_or_oob(&table.class_table, glyph)
}

fn class_or_oob(class_table: &ClassTable, glyph: GlyphId) -> ClassName {
    class_table
        .get(glyph)
        .cloned()
        .unwrap_or_else(ClassName::out_of_bounds)
}

/// Bound on entry lookups for one subtable run. Generated tables always
/// advance, so the bound exists only to keep malformed tables finite.
fn fuel_for(len: usize) -> usize {
    len * 8 + 64
}

struct ContextualSubstitution<'a> {
    glyphs: &'a mut Vec<GlyphId>,
    next_state: StateName,
    // Marked glyph and its position at mark time: (position, glyph).
    mark: Option<(usize, GlyphId)>,
}

impl<'a> ContextualSubstitution<'a> {
    fn new(glyphs: &'a mut Vec<GlyphId>) -> ContextualSubstitution<'a> {
        ContextualSubstitution {
            glyphs,
            next_state: StateName::start_of_text(),
            mark: None,
        }
    }

    fn process_glyphs(&mut self, table: &Contextual) -> Result<(), ApplyError> {
        let mut fuel = fuel_for(self.glyphs.len());
        let mut i = 0;

        while i < self.glyphs.len() {
            let current_glyph = self.glyphs[i];
            let mut old_glyph = current_glyph;
            let mut class = glyph_class(table, current_glyph);

            'glyph: loop {
                if fuel == 0 {
                    return Err(ApplyError::NoProgress);
                }
                fuel -= 1;

                let row = table
                    .states
                    .get(&self.next_state)
                    .ok_or(ApplyError::BadState)?;
                let entry = row.get(&class).ok_or(ApplyError::BadClass)?;

                self.next_state = entry.next_state.clone();

                // Substitute the marked glyph first, then the current one,
                // each through its entry lookup.
                if let Some(mark_subst) = &entry.mark_subst {
                    if let Some((mark_pos, mark_glyph)) = self.mark {
                        if let Some(&subst) = mark_subst.get(&mark_glyph) {
                            self.glyphs[mark_pos] = subst;
                        }
                    }
                }

                if let Some(current_subst) = &entry.current_subst {
                    if let Some(&subst) = current_subst.get(&self.glyphs[i]) {
                        self.glyphs[i] = subst;
                    }
                }

                if entry.mark {
                    self.mark = Some((i, self.glyphs[i]));
                }

                if !entry.no_advance {
                    break 'glyph;
                }

                // Not advancing: the class may need recomputing if the
                // current glyph was just substituted.
                let new_glyph = self.glyphs[i];
                if new_glyph != old_glyph {
                    class = glyph_class(table, new_glyph);
                    old_glyph = new_glyph;
                }
            }

            i += 1;
        }

        Ok(())
    }
}

struct LigatureSubstitution<'a> {
    glyphs: &'a mut Vec<GlyphId>,
    next_state: StateName,
    component_stack: Vec<usize>,
}

impl<'a> LigatureSubstitution<'a> {
    fn new(glyphs: &'a mut Vec<GlyphId>) -> LigatureSubstitution<'a> {
        LigatureSubstitution {
            glyphs,
            next_state: StateName::start_of_text(),
            component_stack: Vec::new(),
        }
    }

    fn process_glyphs(&mut self, table: &Ligature) -> Result<(), ApplyError> {
        let mut i = 0;

        while i < self.glyphs.len() {
            let glyph = self.glyphs[i];
            let class = glyph_class(table, glyph);

            let row = table
                .states
                .get(&self.next_state)
                .ok_or(ApplyError::BadState)?;
            let entry = row.get(&class).ok_or(ApplyError::BadClass)?;

            self.next_state = entry.next_state.clone();

            if entry.push {
                self.component_stack.push(i);
            }

            if let Some(actions) = &entry.actions {
                // The pushed sequence selects the action. Stale components
                // can precede a genuine match after a mid-match restart, so
                // the longest matching suffix wins.
                let sequence: Vec<GlyphId> = self
                    .component_stack
                    .iter()
                    .map(|&pos| self.glyphs[pos])
                    .collect();

                let mut matched: Option<(usize, &Vec<GlyphId>)> = None;
                for take in (1..=sequence.len()).rev() {
                    if let Some(output) = actions.get(&sequence[sequence.len() - take..]) {
                        matched = Some((take, output));
                        break;
                    }
                }

                if let Some((take, output)) = matched {
                    let start = self.component_stack[self.component_stack.len() - take];
                    let end = i;

                    // The matched span collapses to the output tuple.
                    self.glyphs.splice(start..=end, output.iter().copied());
                    i = (start + output.len()).saturating_sub(1);

                    self.component_stack.clear();
                    // A non-start next state means this output feeds a
                    // larger ligature; it re-enters as a component.
                    if !self.next_state.is_start() {
                        self.component_stack.push(i);
                    }
                } else {
                    self.component_stack.clear();
                }
            } else if !entry.push && self.next_state.is_start() {
                // The match was abandoned; drop any stacked components.
                self.component_stack.clear();
            }

            i += 1;
        }

        Ok(())
    }
}

struct InsertionSubstitution<'a> {
    glyphs: &'a mut Vec<GlyphId>,
    next_state: StateName,
    mark: Option<usize>,
}

impl<'a> InsertionSubstitution<'a> {
    fn new(glyphs: &'a mut Vec<GlyphId>) -> InsertionSubstitution<'a> {
        InsertionSubstitution {
            glyphs,
            next_state: StateName::start_of_text(),
            mark: None,
        }
    }

    fn process_glyphs(&mut self, table: &Insertion) -> Result<(), ApplyError> {
        let mut fuel = fuel_for(self.glyphs.len());
        let mut i = 0;

        while i < self.glyphs.len() {
            if fuel == 0 {
                return Err(ApplyError::NoProgress);
            }
            fuel -= 1;

            let glyph = self.glyphs[i];
            let class = glyph_class(table, glyph);

            let row = table
                .states
                .get(&self.next_state)
                .ok_or(ApplyError::BadState)?;
            let entry = row.get(&class).ok_or(ApplyError::BadClass)?;

            self.next_state = entry.next_state.clone();

            if let Some(payload) = &entry.marked_insert_glyphs {
                if let Some(mark_pos) = self.mark {
                    let at = if entry.marked_insert_before {
                        mark_pos
                    } else {
                        mark_pos + 1
                    };
                    self.glyphs.splice(at..at, payload.iter().copied());
                    if at <= i {
                        i += payload.len();
                    }
                }
            }

            if let Some(payload) = &entry.current_insert_glyphs {
                let at = if entry.current_insert_before { i } else { i + 1 };
                self.glyphs.splice(at..at, payload.iter().copied());
                if at <= i {
                    i += payload.len();
                }
            }

            if entry.mark {
                self.mark = Some(i);
            }

            if !entry.no_advance {
                i += 1;
            }
        }

        Ok(())
    }
}

fn noncontextual_substitution(table: &Noncontextual, glyphs: &mut Vec<GlyphId>) {
    for glyph in glyphs.iter_mut() {
        match table.get(*glyph) {
            Some(subst) if subst != *glyph => *glyph = subst,
            Some(_) | None => {}
        }
    }
}

fn remove_deleted_glyphs(glyphs: &mut Vec<GlyphId>) {
    glyphs.retain(|&glyph| glyph != DELETED_GLYPH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn noncontextual_maps_in_place() {
        let mut map = BTreeMap::new();
        map.insert(35, 4);
        map.insert(19, 5);
        let table = Noncontextual::from(map);

        let mut glyphs = vec![35, 7, 19];
        noncontextual_substitution(&table, &mut glyphs);
        assert_eq!(glyphs, vec![4, 7, 5]);
    }

    #[test]
    fn deleted_glyphs_are_stripped() {
        let mut glyphs = vec![5, DELETED_GLYPH, 6];
        remove_deleted_glyphs(&mut glyphs);
        assert_eq!(glyphs, vec![5, 6]);
    }
}
