//! Semantic round trips: every produced chain, driven in order over a
//! rule's trigger stream, must reproduce the rule's output — including the
//! layered effects of ordered rule sets.

use gsub2morx::{apply, Converter, InTuple, OutTuple, Subtable};

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

/// Convert and drive each rule's own trigger stream through the chain.
fn assert_roundtrip(in_tuples: &[&[i32]], out_tuples: &[&[u16]]) {
    let in_tuples = ins(in_tuples);
    let out_tuples = outs(out_tuples);

    let mut converter = Converter::new();
    let chain = converter.analyze(&in_tuples, &out_tuples).unwrap();

    for (t_in, t_out) in in_tuples.iter().zip(&out_tuples) {
        let stream: Vec<u16> = t_in.iter().map(|&g| g.unsigned_abs() as u16).collect();
        assert_eq!(
            run(&chain, &stream),
            *t_out,
            "rule {:?} -> {:?} did not round-trip",
            t_in,
            t_out
        );
    }
}

#[test]
fn single_roundtrip() {
    assert_roundtrip(&[&[35], &[19]], &[&[4], &[5]]);
}

#[test]
fn contextual_roundtrip() {
    assert_roundtrip(
        &[&[5, 6], &[5, 10], &[9, 6], &[9, 10]],
        &[&[30, 31], &[30, 31], &[32, 31], &[32, 31]],
    );
}

#[test]
fn contextual_complex_roundtrip() {
    // Every position changes: needs the two-pass synthetic-trigger form.
    assert_roundtrip(&[&[1, 2, 3]], &[&[4, 5, 6]]);
}

#[test]
fn contextual_complex_leaves_partial_matches_alone() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[1, 2, 3]]), &outs(&[&[4, 5, 6]]))
        .unwrap();
    assert_eq!(chain.len(), 2);

    // The context never completes, so neither pass may fire.
    assert_eq!(run(&chain, &[1, 2, 9]), vec![1, 2, 9]);
    assert_eq!(run(&chain, &[1, 2]), vec![1, 2]);
}

#[test]
fn three_glyph_ligature_roundtrip() {
    assert_roundtrip(&[&[3, 1, 7], &[3, 2, 7]], &[&[41], &[42]]);
}

#[test]
fn partial_ligature_feeds_larger_one() {
    // f + f -> ff, then ff + i -> ffi, spelled with glyph numbers:
    // 6 + 6 -> 70, 6 + 6 + 9 -> 71.
    let mut converter = Converter::new();
    let chain = converter
        .analyze_ligature(&ins(&[&[6, 6], &[6, 6, 9]]), &outs(&[&[70], &[71]]))
        .unwrap();

    assert_eq!(run(&chain, &[6, 6]), vec![70]);
    assert_eq!(run(&chain, &[6, 6, 9]), vec![71]);
    assert_eq!(run(&chain, &[6, 6, 4]), vec![70, 4]);
}

#[test]
fn multiple_roundtrip() {
    assert_roundtrip(
        &[&[20], &[30], &[31]],
        &[&[20, 91, 92], &[40, 41], &[42, 43]],
    );
}

#[test]
fn internal_insertion_roundtrip() {
    assert_roundtrip(
        &[&[5, 6, 7], &[15, 16, 7]],
        &[&[5, 6, 21, 22, 7], &[15, 16, 21, 22, 7]],
    );
}

#[test]
fn back_anchored_insertion_roundtrip() {
    // Only the tail matches: the general three-subtable path.
    assert_roundtrip(&[&[133, 94]], &[&[27, 61, 94]]);
}

#[test]
fn front_anchored_insertion_roundtrip() {
    // Only the head matches; the changed tail rides the trigger.
    assert_roundtrip(&[&[1, 2]], &[&[1, 9, 9]]);
}

#[test]
fn full_prefix_insertion_roundtrip() {
    // The whole input survives as the output's head: a pure append.
    assert_roundtrip(&[&[5, 6]], &[&[5, 6, 7]]);
}

#[test]
fn full_suffix_insertion_roundtrip() {
    // The whole input survives as the output's tail: a pure prepend.
    assert_roundtrip(&[&[5, 6]], &[&[7, 5, 6]]);
}

#[test]
fn special_shrinks_with_deletions() {
    assert_roundtrip(&[&[3, 4, 5], &[3, 4, 7]], &[&[19, 21], &[19, 22]]);
}

#[test]
fn chaining_backtrack_roundtrip() {
    // Backtrack context reduces to plain matching here.
    assert_roundtrip(&[&[-2, 3]], &[&[2, 9]]);
}

#[test]
fn chaining_lookahead_roundtrip() {
    assert_roundtrip(&[&[3, 4, -5]], &[&[3, 10, 5]]);
}

#[test]
fn chaining_lookahead_requires_the_context() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[3, 4, -5]]), &outs(&[&[3, 10, 5]]))
        .unwrap();

    // Without the lookahead glyph nothing may change.
    assert_eq!(run(&chain, &[3, 4]), vec![3, 4]);
    assert_eq!(run(&chain, &[3, 4, 9]), vec![3, 4, 9]);
    // The lookahead glyph itself is left in place.
    assert_eq!(run(&chain, &[3, 4, 5]), vec![3, 10, 5]);
}

#[test]
fn chaining_both_roundtrip() {
    assert_roundtrip(&[&[-2, 3, -5]], &[&[2, 9, 5]]);
}

#[test]
fn ordered_rules_layer_their_effects() {
    // Rule 1 rewrites (1, 2) to (3, 4); rule 2 then consumes the 4 it
    // produced. Run against a stream holding rule 1's trigger followed by
    // rule 2's remainder, the chain must replay OpenType's sequential
    // application: [1, 2, 5] -> [3, 4, 5] -> [3, 9].
    let mut converter = Converter::new();
    let chain = converter
        .analyze(&ins(&[&[1, 2], &[4, 5]]), &outs(&[&[3, 4], &[9]]))
        .unwrap();

    assert_eq!(run(&chain, &[1, 2, 5]), vec![3, 9]);

    // Each rule alone still round-trips.
    assert_eq!(run(&chain, &[1, 2]), vec![3, 4]);
    assert_eq!(run(&chain, &[4, 5]), vec![9]);
}

#[test]
fn composite_runs_flush_in_rule_order() {
    // A mixed set: two same-length rules, two ligature rules. The chain
    // realizes each rule regardless of how the runs were regrouped.
    assert_roundtrip(
        &[&[3, 4], &[10, 11], &[8, 1], &[8, 2], &[15, 16]],
        &[&[3, 5], &[10, 19], &[41], &[42], &[91, 16]],
    );
}

#[test]
fn streams_without_triggers_pass_through() {
    let mut converter = Converter::new();
    let chain = converter
        .analyze(
            &ins(&[&[5, 6], &[5, 10], &[9, 6], &[9, 10]]),
            &outs(&[&[30, 31], &[30, 31], &[32, 31], &[32, 31]]),
        )
        .unwrap();

    assert_eq!(run(&chain, &[1, 2, 3]), vec![1, 2, 3]);
    // A trigger prefix without its completion is untouched.
    assert_eq!(run(&chain, &[5, 5, 7]), vec![5, 5, 7]);
}
