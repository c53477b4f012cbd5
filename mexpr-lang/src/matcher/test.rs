use super::*;
use crate::parser;

fn pattern(src: &str) -> ExprNodeId {
    let (ast, errs) = parser::parse(src, None);
    assert!(errs.is_empty(), "pattern {src:?} failed to parse: {errs:?}");
    ast
}

fn stream(kinds: Vec<InsnKind>) -> Vec<Instruction> {
    // markers deliberately differ from indices
    kinds
        .into_iter()
        .enumerate()
        .map(|(i, k)| Instruction::new(k, i * 2))
        .collect()
}

fn table() -> ClassTable {
    ClassTable::snapshot(["com.example.Foo", "com.example.Bar"])
}

fn getfield(owner: &str, name: &str) -> InsnKind {
    InsnKind::FieldLoad {
        owner: owner.to_symbol(),
        name: name.to_symbol(),
        receiver: true,
    }
}

fn call(owner: &str, name: &str, argc: usize) -> InsnKind {
    InsnKind::Call {
        owner: owner.to_symbol(),
        name: name.to_symbol(),
        argc,
        receiver: true,
        returns: true,
    }
}

fn call_static(owner: &str, name: &str, argc: usize) -> InsnKind {
    InsnKind::Call {
        owner: owner.to_symbol(),
        name: name.to_symbol(),
        argc,
        receiver: false,
        returns: true,
    }
}

#[test]
fn simulate_reconstructs_operands() {
    let insns = stream(vec![
        InsnKind::LoadThis,
        getfield("com.example.Foo", "x"),
        InsnKind::LocalLoad("y".to_symbol()),
        InsnKind::BinOp(Op::Sum),
    ]);
    let frames = simulate(&insns).unwrap();
    assert_eq!(frames[1].operands, vec![0]);
    assert_eq!(frames[3].operands, vec![1, 2]);
    assert_eq!(frames[3].start, 0);
}

#[test]
fn underflow_is_a_target_error() {
    let insns = stream(vec![InsnKind::BinOp(Op::Sum)]);
    assert_eq!(simulate(&insns), Err(TargetError::StackUnderflow { at: 0 }));
}

#[test]
fn this_field_matches_once() {
    let insns = stream(vec![
        InsnKind::LoadThis,
        getfield("com.example.Foo", "x"),
        InsnKind::LocalStore("tmp".to_symbol()),
    ]);
    let outcome = find_matches(pattern("this.x"), &insns, &table()).unwrap();
    assert!(!outcome.is_ambiguous());
    let matches = outcome.matches();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].range, 0..2);
    assert_eq!(matches[0].marker_range, (0, 2));
}

#[test]
fn wildcard_absorbs_differing_arguments() {
    // two call sites differing only in the literal the wildcard absorbs
    let insns = stream(vec![
        InsnKind::LoadThis,
        InsnKind::ConstInt(1),
        call("com.example.Foo", "foo", 1),
        InsnKind::LoadThis,
        InsnKind::ConstInt(2),
        call("com.example.Foo", "foo", 1),
    ]);
    let outcome = find_matches(pattern("foo($)"), &insns, &table()).unwrap();
    assert!(!outcome.is_ambiguous(), "same symbol, wildcard arg: {outcome:?}");
    let ranges: Vec<_> = outcome.matches().iter().map(|m| m.range.clone()).collect();
    assert_eq!(ranges, vec![0..3, 3..6]);
}

#[test]
fn owner_divergence_is_ambiguous() {
    let insns = stream(vec![
        call_static("com.example.Foo", "go", 0),
        call_static("com.example.Bar", "go", 0),
    ]);
    let outcome = find_matches(pattern("go()"), &insns, &table()).unwrap();
    match outcome {
        MatchOutcome::Ambiguous { matches, report } => {
            assert_eq!(matches.len(), 2);
            assert!(matches.iter().all(|m| m.ambiguous));
            assert_eq!(report.distinct, 2);
            assert_eq!(report.positions, vec![0, 2]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn zero_occurrences_is_no_match() {
    let insns = stream(vec![InsnKind::LocalLoad("y".to_symbol())]);
    let outcome = find_matches(pattern("this.q"), &insns, &table()).unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

#[test]
fn rerun_is_idempotent() {
    let insns = stream(vec![
        InsnKind::LoadThis,
        InsnKind::ConstInt(1),
        call("com.example.Foo", "foo", 1),
    ]);
    let pat = pattern("foo($)");
    let t = table();
    let first = find_matches(pat, &insns, &t).unwrap();
    let second = find_matches(pat, &insns, &t).unwrap();
    assert_eq!(first, second);
}

#[test]
fn numeric_literals_compare_by_value() {
    let insns = stream(vec![InsnKind::ConstFloat(1.0)]);
    let outcome = find_matches(pattern("1"), &insns, &table()).unwrap();
    assert_eq!(outcome.matches().len(), 1);
    let insns = stream(vec![InsnKind::ConstFloat(1.5)]);
    let outcome = find_matches(pattern("1.5"), &insns, &table()).unwrap();
    assert_eq!(outcome.matches().len(), 1);
}

#[test]
fn negated_literal_matches_folded_constant() {
    let insns = stream(vec![InsnKind::ConstInt(-1)]);
    let outcome = find_matches(pattern("-1"), &insns, &table()).unwrap();
    assert_eq!(outcome.matches().len(), 1);
}

#[test]
fn field_store_matches_assignment() {
    let insns = stream(vec![
        InsnKind::LoadThis,
        InsnKind::ConstInt(5),
        InsnKind::FieldStore {
            owner: "com.example.Foo".to_symbol(),
            name: "x".to_symbol(),
            receiver: true,
        },
    ]);
    let t = table();
    let outcome = find_matches(pattern("this.x = $"), &insns, &t).unwrap();
    assert_eq!(outcome.matches().len(), 1);
    assert_eq!(outcome.matches()[0].range, 0..3);
    // unqualified names reach implicit-this fields too
    let outcome = find_matches(pattern("x = 5"), &insns, &t).unwrap();
    assert_eq!(outcome.matches().len(), 1);
}

#[test]
fn array_store_matches_indexed_assignment() {
    let insns = stream(vec![
        InsnKind::LocalLoad("xs".to_symbol()),
        InsnKind::ConstInt(0),
        InsnKind::ConstInt(5),
        InsnKind::ArrayStore,
    ]);
    let t = table();
    let outcome = find_matches(pattern("xs[0] = 5"), &insns, &t).unwrap();
    assert_eq!(outcome.matches().len(), 1);
    assert_eq!(outcome.matches()[0].range, 0..4);
    // the wildcard absorbs the whole target slot
    let outcome = find_matches(pattern("$ = 5"), &insns, &t).unwrap();
    assert_eq!(outcome.matches().len(), 1);
}

#[test]
fn array_creation_shapes() {
    let t = table();
    let sized = stream(vec![
        InsnKind::ConstInt(2),
        InsnKind::NewArray {
            elem: "I".to_symbol(),
            dims: 1,
        },
    ]);
    assert_eq!(
        find_matches(pattern("new int[2]"), &sized, &t)
            .unwrap()
            .matches()
            .len(),
        1
    );

    let filled = stream(vec![
        InsnKind::ConstInt(1),
        InsnKind::ConstInt(2),
        InsnKind::ArrayFill {
            elem: "I".to_symbol(),
            len: 2,
        },
    ]);
    assert_eq!(
        find_matches(pattern("new int[]{1, 2}"), &filled, &t)
            .unwrap()
            .matches()
            .len(),
        1
    );

    // a bare [] dimension absorbs any size operand
    let two_dim = stream(vec![
        InsnKind::ConstInt(2),
        InsnKind::ConstInt(7),
        InsnKind::NewArray {
            elem: "I".to_symbol(),
            dims: 2,
        },
    ]);
    assert_eq!(
        find_matches(pattern("new int[2][]"), &two_dim, &t)
            .unwrap()
            .matches()
            .len(),
        1
    );
    // sizes that are written must match
    assert_eq!(
        find_matches(pattern("new int[3][]"), &two_dim, &t).unwrap(),
        MatchOutcome::NoMatch
    );
}

#[test]
fn unresolved_type_fails_the_node_not_the_call() {
    let insns = stream(vec![
        InsnKind::LocalLoad("x".to_symbol()),
        InsnKind::Cast("LQuux;".to_symbol()),
    ]);
    let outcome = find_matches(pattern("(Quux) x"), &insns, &table()).unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

#[test]
fn static_owner_resolves_through_the_table() {
    let insns = stream(vec![InsnKind::FieldLoad {
        owner: "Lcom/example/Foo;".to_symbol(),
        name: "MAX".to_symbol(),
        receiver: false,
    }]);
    let t = table();
    assert_eq!(
        find_matches(pattern("Foo.MAX"), &insns, &t)
            .unwrap()
            .matches()
            .len(),
        1
    );
    assert_eq!(
        find_matches(pattern("com.example.Foo.MAX"), &insns, &t)
            .unwrap()
            .matches()
            .len(),
        1
    );
    assert_eq!(
        find_matches(pattern("Bar.MAX"), &insns, &t).unwrap(),
        MatchOutcome::NoMatch
    );
}

#[test]
fn sub_expression_ranges_are_reported() {
    let insns = stream(vec![
        InsnKind::LoadThis,
        InsnKind::ConstInt(1),
        call("com.example.Foo", "foo", 1),
    ]);
    let pat = pattern("foo($)");
    let outcome = find_matches(pat, &insns, &table()).unwrap();
    let m = &outcome.matches()[0];
    let Expr::MethodCall(_, _, args) = pat.to_expr() else {
        panic!("expected a call pattern");
    };
    assert_eq!(m.range_of(args[0]), Some(1..2));
    assert_eq!(m.range_of(pat), Some(0..3));
}

#[test]
fn merging_is_partition_independent() {
    let t = table();
    let insns_a = stream(vec![
        InsnKind::LoadThis,
        getfield("com.example.Foo", "x"),
        InsnKind::LocalStore("tmp".to_symbol()),
        InsnKind::LoadThis,
        getfield("com.example.Foo", "x"),
        InsnKind::LocalStore("tmp".to_symbol()),
    ]);
    let insns_b = stream(vec![InsnKind::LoadThis, getfield("com.example.Foo", "x")]);
    let pat = pattern("this.x");
    let tag = |method: &str, outcome: &MatchOutcome| -> Vec<BatchMatch> {
        outcome
            .matches()
            .iter()
            .map(|m| BatchMatch {
                method: method.to_string(),
                result: m.clone(),
            })
            .collect()
    };
    let a = find_matches(pat, &insns_a, &t).unwrap();
    let b = find_matches(pat, &insns_b, &t).unwrap();
    let merged_one = merge_batches(vec![tag("m.a", &a), tag("m.b", &b)]);
    // a different partitioning of the same work
    let mut split = tag("m.a", &a);
    let tail = split.split_off(1);
    let merged_other = merge_batches(vec![tag("m.b", &b), tail, split]);
    assert_eq!(merged_one, merged_other);
}
