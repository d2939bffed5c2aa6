//! Structural tests for the conversion analyzers: the shapes of the
//! produced chains and tables.

use gsub2morx::{
    apply, ClassName, Converter, ConvertError, InTuple, OutTuple, Severity, StateName, Subtable,
};

fn ins(tuples: &[&[i32]]) -> Vec<InTuple> {
    tuples.iter().map(|t| t.to_vec()).collect()
}

fn outs(tuples: &[&[u16]]) -> Vec<OutTuple> {
    tuples.iter().map(|t| t.to_vec()).collect()
}

fn run(chain: &[Subtable], stream: &[u16]) -> Vec<u16> {
    let mut glyphs = stream.to_vec();
    apply(chain, &mut glyphs).expect("chain applies cleanly");
    glyphs
}

#[test]
fn single_builds_one_noncontextual() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[35], &[19]]), &outs(&[&[4], &[5]]))
        .unwrap();

    assert_eq!(chain.len(), 1);
    let table = chain[0].as_noncontextual().expect("noncontextual");
    assert_eq!(table.get(35), Some(4));
    assert_eq!(table.get(19), Some(5));
    assert_eq!(table.len(), 2);
}

#[test]
fn noop_rule_warns_and_produces_nothing() {
    let mut converter = Converter::new();
    let chain = converter.analyze(&ins(&[&[9]]), &outs(&[&[9]])).unwrap();

    assert!(chain.is_empty());
    let diagnostics = converter.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].code, "noop-rule");
}

#[test]
fn ligature_groups_shared_columns() {
    // Invoked directly: analyze() itself fast-paths length-2 inputs
    // through the contextual form.
    let mut converter = Converter::new();
    let chain = converter
        .analyze_ligature(&ins(&[&[3, 1], &[3, 2]]), &outs(&[&[41], &[42]]))
        .unwrap();

    assert_eq!(chain.len(), 1);
    let table = chain[0].as_ligature().expect("ligature");

    // Glyphs 1 and 2 behave identically and share a consolidated class;
    // its entry under "Saw_3" carries both actions.
    assert_eq!(table.class_table.get(3), Some(&ClassName::new("3")));
    assert_eq!(table.class_table.get(1), Some(&ClassName::new("group 1")));
    assert_eq!(table.class_table.get(2), Some(&ClassName::new("group 1")));

    let entry = table
        .entry(&StateName::new("Saw_3"), &ClassName::new("group 1"))
        .expect("grouped entry");
    assert!(entry.push);
    let actions = entry.actions.as_ref().expect("actions");
    assert_eq!(actions.get(&vec![3, 1][..]), Some(&vec![41]));
    assert_eq!(actions.get(&vec![3, 2][..]), Some(&vec![42]));

    assert_eq!(run(&chain, &[3, 1]), vec![41]);
    assert_eq!(run(&chain, &[3, 2]), vec![42]);
    assert_eq!(run(&chain, &[3, 3, 2]), vec![3, 42]);
}

#[test]
fn contextual_consolidates_columns_and_rows() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(
            &ins(&[&[5, 6], &[5, 10], &[9, 6], &[9, 10]]),
            &outs(&[&[30, 31], &[30, 31], &[32, 31], &[32, 31]]),
        )
        .unwrap();

    assert_eq!(chain.len(), 1);
    let table = chain[0].as_contextual().expect("contextual");

    // 6 and 10 behave identically and merge; 5 and 9 carry different mark
    // payloads but identical rows, so their states merge instead.
    assert_eq!(table.class_table.get(5), Some(&ClassName::new("5")));
    assert_eq!(table.class_table.get(9), Some(&ClassName::new("9")));
    assert_eq!(table.class_table.get(6), Some(&ClassName::new("10 and 6")));
    assert_eq!(table.class_table.get(10), Some(&ClassName::new("10 and 6")));

    let combo = StateName::new("Saw combo group 1");
    assert!(table.state(&combo).is_some());
    assert!(table.state(&StateName::new("Saw_5")).is_none());
    assert!(table.state(&StateName::new("Saw_9")).is_none());

    let start = table
        .entry(&StateName::start_of_text(), &ClassName::new("5"))
        .expect("start entry");
    assert!(start.mark);
    assert_eq!(start.next_state, combo);

    let exit = table
        .entry(&combo, &ClassName::new("10 and 6"))
        .expect("combo exit entry");
    let mark_subst = exit.mark_subst.as_ref().expect("mark substitution");
    assert_eq!(mark_subst.get(&5), Some(&30));
    assert_eq!(mark_subst.get(&9), Some(&32));
    let current_subst = exit.current_subst.as_ref().expect("current substitution");
    assert_eq!(current_subst.get(&6), Some(&31));
    assert_eq!(current_subst.get(&10), Some(&31));

    for stream in [[5, 6], [5, 10], [9, 6], [9, 10]] {
        let expected = match stream[0] {
            5 => vec![30, 31],
            _ => vec![32, 31],
        };
        assert_eq!(run(&chain, &stream), expected);
    }
}

#[test]
fn purely_internal_insertion_takes_the_simple_path() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(
            &ins(&[&[5, 6, 7], &[15, 16, 7]]),
            &outs(&[&[5, 6, 21, 22, 7], &[15, 16, 21, 22, 7]]),
        )
        .unwrap();

    // One insertion subtable, not the general three-subtable chain.
    assert_eq!(chain.len(), 1);
    assert!(chain[0].as_insertion().is_some());

    assert_eq!(run(&chain, &[5, 6, 7]), vec![5, 6, 21, 22, 7]);
    assert_eq!(run(&chain, &[15, 16, 7]), vec![15, 16, 21, 22, 7]);
    assert_eq!(
        run(&chain, &[5, 6, 7, 15, 16, 7]),
        vec![5, 6, 21, 22, 7, 15, 16, 21, 22, 7]
    );
}

#[test]
fn length_two_ligatures_run_as_contextual() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[3, 1], &[3, 2]]), &outs(&[&[41], &[42]]))
        .unwrap();

    assert_eq!(chain.len(), 1);
    assert!(chain[0].as_contextual().is_some());

    assert_eq!(run(&chain, &[3, 1]), vec![41]);
    assert_eq!(run(&chain, &[3, 2]), vec![42]);
    assert_eq!(run(&chain, &[3, 7]), vec![3, 7]);
}

#[test]
fn alternate_fans_out_by_rank() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[3], &[3], &[5]]), &outs(&[&[25], &[19], &[22]]))
        .unwrap();

    assert_eq!(chain.len(), 2);
    let first = chain[0].as_noncontextual().expect("first alternate table");
    assert_eq!(first.get(3), Some(19));
    assert_eq!(first.get(5), Some(22));
    let second = chain[1].as_noncontextual().expect("second alternate table");
    assert_eq!(second.get(3), Some(25));
    assert_eq!(second.get(5), None);
}

#[test]
fn multiple_splits_swash_insertion_swash() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(
            &ins(&[&[20], &[30], &[31]]),
            &outs(&[&[20, 91, 92], &[40, 41], &[42, 43]]),
        )
        .unwrap();

    assert_eq!(chain.len(), 3);
    let pre = chain[0].as_noncontextual().expect("pre-swash");
    assert_eq!(pre.get(30), Some(0xFFFD));
    assert_eq!(pre.get(31), Some(0xFFFC));
    assert!(chain[1].as_insertion().is_some());
    let post = chain[2].as_noncontextual().expect("post-swash");
    assert_eq!(post.get(0xFFFD), Some(40));
    assert_eq!(post.get(0xFFFC), Some(42));

    assert_eq!(run(&chain, &[20]), vec![20, 91, 92]);
    assert_eq!(run(&chain, &[30]), vec![40, 41]);
    assert_eq!(run(&chain, &[31]), vec![42, 43]);
}

#[test]
fn multiple_keeps_single_outputs_ahead_of_the_insertion() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[7], &[20]]), &outs(&[&[8], &[20, 91]]))
        .unwrap();

    assert_eq!(chain.len(), 2);
    assert!(chain[0].as_noncontextual().is_some());
    assert!(chain[1].as_insertion().is_some());

    assert_eq!(run(&chain, &[7]), vec![8]);
    assert_eq!(run(&chain, &[20]), vec![20, 91]);
}

#[test]
fn empty_multiple_output_deletes_with_warning() {
    let mut converter = Converter::new();
    let chain = converter.analyze(&ins(&[&[19]]), &outs(&[&[]])).unwrap();

    assert_eq!(chain.len(), 1);
    assert_eq!(run(&chain, &[19]), Vec::<u16>::new());

    let diagnostics = converter.take_diagnostics();
    assert!(diagnostics
        .iter()
        .any(|d| d.code == "empty-output" && d.severity == Severity::Warning));
}

#[test]
fn namer_feeds_class_names() {
    let namer = |glyph: u16| format!("g{:03}", glyph);
    let mut converter = Converter::new().with_namer(&namer);
    let chain = converter
        .analyze(&ins(&[&[5, 6]]), &outs(&[&[30, 31]]))
        .unwrap();

    let table = chain[0].as_contextual().expect("contextual");
    assert_eq!(table.class_table.get(5), Some(&ClassName::new("g005")));
    assert!(table.state(&StateName::new("Saw_g005")).is_some());

    // Names never affect semantics.
    assert_eq!(run(&chain, &[5, 6]), vec![30, 31]);
}

#[test]
fn ignored_glyphs_get_their_own_class() {
    let mut converter = Converter::new().with_ignores([77]);
    let chain = converter
        .analyze(&ins(&[&[5, 6]]), &outs(&[&[30, 31]]))
        .unwrap();

    let table = chain[0].as_contextual().expect("contextual");
    assert_eq!(table.class_table.get(77), Some(&ClassName::ignore()));
    let entry = table
        .entry(&StateName::start_of_text(), &ClassName::ignore())
        .expect("ignore entry");
    assert_eq!(entry.next_state, StateName::start_of_text());

    // An ignored glyph inside the context neither matches nor resets it.
    assert_eq!(run(&chain, &[5, 77, 6]), vec![30, 77, 31]);
}

#[test]
fn fixed_states_and_classes_are_always_present() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[5, 6]]), &outs(&[&[30, 31]]))
        .unwrap();

    let table = chain[0].as_contextual().expect("contextual");
    let sot = table.state(&StateName::start_of_text()).expect("start of text");
    let sol = table.state(&StateName::start_of_line()).expect("start of line");
    assert_eq!(sot, sol);

    for row in table.states.values() {
        assert!(row.contains_key(&ClassName::end_of_text()));
        assert!(row.contains_key(&ClassName::out_of_bounds()));
        assert!(row.contains_key(&ClassName::deleted_glyph()));
    }

    // The deleted-glyph class self-loops.
    let combo = StateName::new("Saw_5");
    let hold = table
        .entry(&combo, &ClassName::deleted_glyph())
        .expect("deleted entry");
    assert_eq!(hold.next_state, combo);
}

#[test]
fn bad_arity_is_a_contract_error() {
    let mut converter = Converter::new();
    let result = converter.analyze_single(&ins(&[&[9, 10]]), &outs(&[&[9]]));
    assert_eq!(result, Err(ConvertError::BadTupleLength));
    assert!(converter.diagnostics().iter().any(|d| d.severity == Severity::Error));
}

#[test]
fn negative_glyph_outside_chaining_is_a_contract_error() {
    let mut converter = Converter::new();
    let result = converter.analyze_single(&ins(&[&[-9]]), &outs(&[&[9]]));
    assert_eq!(result, Err(ConvertError::NegativeGlyph));
}

#[test]
fn double_trailing_lookahead_is_unsupported() {
    let mut converter = Converter::new();
    let result = converter.analyze(&ins(&[&[3, -4, -5]]), &outs(&[&[9, 4, 5]]));
    assert_eq!(result, Err(ConvertError::UnsupportedLookahead));
}

#[test]
fn colliding_composite_is_unsupported() {
    // The second rule's output ends with the first rule's input beginning,
    // so regrouping could change the observable result.
    let mut converter = Converter::new();
    let result = converter.analyze(
        &ins(&[&[3, 4], &[8, 9]]),
        &outs(&[&[3, 5], &[7, 9, 3]]),
    );
    assert_eq!(result, Err(ConvertError::UnsupportedComposite));
}

#[test]
fn unanchored_insertion_is_an_error() {
    let mut converter = Converter::new();
    let result = converter.analyze_insertion(&ins(&[&[1, 2]]), &outs(&[&[4, 5, 6]]));
    assert_eq!(result, Err(ConvertError::NoAnchoredMatch));
}

#[test]
fn synthetic_glyphs_are_distinct_and_disjoint_from_rule_glyphs() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[3, 4, 5], &[3, 4, 7]]), &outs(&[&[19, 21], &[19, 22]]))
        .unwrap();

    // The two rules each got their own trigger, counting down from the
    // base, and neither collides with any rule glyph.
    let pass2 = chain
        .last()
        .and_then(Subtable::as_contextual)
        .expect("second pass contextual");
    assert!(pass2.class_table.contains(0xFFFD));
    assert!(pass2.class_table.contains(0xFFFC));
    for glyph in [3u16, 4, 5, 7, 19, 21, 22] {
        assert!(glyph < 0xFF00);
        assert_ne!(pass2.class_table.get(glyph), pass2.class_table.get(0xFFFD));
    }
}
