//! Whole-run properties: idempotence, vararg round trip, default completeness

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sigprop_core::prelude::*;
use sigprop_core::{ApplySummary, Preparation};
use sigprop_test_utils::{init_test_logging, ProgramBuilder};

fn run(p: &mut ProgramBuilder, target: NodeId, delta: &SignatureDelta) -> RunOutcome {
    let model = p.model();
    Engine::new(EngineConfig::default(), &model, &model)
        .run(p.tree_mut(), target, delta)
        .unwrap()
}

fn swap_program() -> (ProgramBuilder, NodeId, NodeId) {
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let foo = p.member(class, "void foo(int a, int b) { }");
    p.member(class, "void run() { foo(1, 2); foo(3, 4); }");
    (p, class, foo)
}

#[test]
fn test_second_run_with_fresh_delta_is_noop() {
    init_test_logging();
    let (mut p, class, foo) = swap_program();
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .parameters(vec![
            ParameterDelta::existing(1, "b", "int"),
            ParameterDelta::existing(0, "a", "int"),
        ])
        .build()
        .unwrap();
    run(&mut p, foo, &delta);
    let after_first = p.render(class);

    let again = DeltaBuilder::for_declaration(p.tree(), foo).unwrap().build().unwrap();
    let outcome = run(&mut p, foo, &again);

    assert!(outcome.applied().is_some_and(ApplySummary::is_noop));
    assert_eq!(p.render(class), after_first);
}

#[test]
fn test_replaying_applied_delta_is_noop() {
    init_test_logging();
    let (mut p, class, foo) = swap_program();
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .name("bar")
        .parameters(vec![
            ParameterDelta::existing(1, "b", "int"),
            ParameterDelta::existing(0, "a", "int"),
        ])
        .build()
        .unwrap();
    let first = run(&mut p, foo, &delta);
    let after_first = p.render(class);

    let second = run(&mut p, foo, &delta);

    assert_eq!(first.applied().map(|s| s.applied_usages), Some(2));
    assert!(second.applied().is_some_and(ApplySummary::is_noop));
    assert_eq!(
        after_first,
        "class Calc { void bar(int b, int a) { } void run() { bar(2, 1); bar(4, 3); } }"
    );
    assert_eq!(p.render(class), after_first);
}

#[test]
fn test_vararg_round_trip_restores_call_shape() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Sum");
    let qux = p.member(class, "int qux(String label, int... xs) { return 0; }");
    let caller = p.member(class, "void run() { qux(\"a\", 1, 2, 3); qux(\"b\"); }");
    let original = p.render(caller);

    let to_array = DeltaBuilder::for_declaration(p.tree(), qux)
        .unwrap()
        .parameters(vec![
            ParameterDelta::existing(0, "label", "String"),
            ParameterDelta::existing(1, "xs", "int[]"),
        ])
        .build()
        .unwrap();
    run(&mut p, qux, &to_array);
    assert_eq!(
        p.render(caller),
        "void run() { qux(\"a\", new int[]{1, 2, 3}); qux(\"b\", new int[]{}); }"
    );

    let back = DeltaBuilder::for_declaration(p.tree(), qux)
        .unwrap()
        .parameters(vec![
            ParameterDelta::existing(0, "label", "String"),
            ParameterDelta::existing(1, "xs", "int..."),
        ])
        .build()
        .unwrap();
    run(&mut p, qux, &back);

    assert_eq!(p.render(qux), "int qux(String label, int... xs) { return 0; }");
    assert_eq!(p.render(caller), original);
}

#[test]
fn test_removed_parameter_used_twice_yields_one_conflict() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let m = p.member(class, "int m(int a, int b) { use(b); return b; }");
    let delta = DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .remove_parameter(1)
        .build()
        .unwrap();

    let outcome = run(&mut p, m, &delta);

    let report = outcome.conflicts().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.of_kind(ConflictKind::ParameterStillUsed).len(), 1);
}

#[test]
fn test_parameter_forwarded_to_super_is_not_a_conflict() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let base = p.class("public class Base");
    p.member(base, "int m(int a, int b) { return a; }");
    let child = p.class("public class Child extends Base");
    let m = p.member(child, "int m(int a, int b) { return super.m(a, b); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .remove_parameter(1)
        .build()
        .unwrap();
    let model = p.model();

    let prepared = Engine::new(EngineConfig::default(), &model, &model)
        .prepare(p.tree(), m, &delta)
        .unwrap();

    match prepared {
        Preparation::Ready(plan) => assert!(plan.report.is_empty()),
        Preparation::Stop(outcome) => panic!("unexpected stop: {outcome:?}"),
    }
}

#[test]
fn test_parameter_forwarded_after_other_statements_is_a_conflict() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let base = p.class("public class Base");
    p.member(base, "int m(int a, int b) { return a; }");
    let child = p.class("public class Child extends Base");
    let m = p.member(child, "int m(int a, int b) { log(); return super.m(a, b); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .remove_parameter(1)
        .build()
        .unwrap();
    let model = p.model();

    let prepared = Engine::new(EngineConfig::default(), &model, &model)
        .prepare(p.tree(), m, &delta)
        .unwrap();

    match prepared {
        Preparation::Ready(plan) => {
            assert_eq!(plan.report.of_kind(ConflictKind::ParameterStillUsed).len(), 1);
        }
        Preparation::Stop(outcome) => {
            let report = outcome.conflicts().unwrap();
            assert_eq!(report.of_kind(ConflictKind::ParameterStillUsed).len(), 1);
        }
    }
}

fn primitive() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("int"), Just("boolean"), Just("String"), Just("double"), Just("char")]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_every_rewritten_call_gets_every_new_argument(
        types in proptest::collection::vec(primitive(), 1..4),
        callers in 1usize..4,
    ) {
        let mut p = ProgramBuilder::new("app");
        let class = p.class("class C");
        let m = p.member(class, "void m(int a) { }");
        for i in 0..callers {
            p.member(class, &format!("void caller{i}() {{ m({i}); }}"));
        }
        let mut builder = DeltaBuilder::for_declaration(p.tree(), m).unwrap();
        for (i, t) in types.iter().enumerate() {
            builder = builder.add_parameter(ParameterDelta::added(format!("p{i}"), *t));
        }
        let delta = builder.build().unwrap();

        let outcome = run(&mut p, m, &delta);

        let summary = outcome.applied().unwrap();
        prop_assert!(summary.flagged.is_empty());
        let sites = p.calls_named("m");
        prop_assert_eq!(sites.len(), callers);
        let tree = p.tree();
        for site in sites {
            let list = tree.child_of_kind(site, NodeKind::ArgumentList).unwrap();
            let args = tree.children(list);
            prop_assert_eq!(args.len(), 1 + types.len());
            prop_assert!(args.iter().all(|a| tree.kind(*a) != NodeKind::Separator));
        }
    }

    #[test]
    fn prop_missing_defaults_without_synthesis_are_flagged(count in 1usize..4) {
        let mut p = ProgramBuilder::new("app");
        let class = p.class("class C");
        let m = p.member(class, "void m() { }");
        p.member(class, "void run() { m(); }");
        let mut builder = DeltaBuilder::for_declaration(p.tree(), m).unwrap();
        for i in 0..count {
            builder = builder.add_parameter(ParameterDelta::added(format!("p{i}"), "int"));
        }
        let delta = builder.build().unwrap();
        let model = p.model();
        let config = EngineConfig::default().with_synthesized_defaults(false);

        let outcome = Engine::new(config, &model, &model)
            .run(p.tree_mut(), m, &delta)
            .unwrap();

        let summary = outcome.applied().unwrap();
        prop_assert_eq!(summary.flagged.len(), count);
        prop_assert_eq!(summary.report.of_kind(ConflictKind::MissingDefault).len(), count);
    }
}
