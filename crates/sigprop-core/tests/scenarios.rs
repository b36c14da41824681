//! End-to-end signature changes on small programs

use pretty_assertions::assert_eq;
use sigprop_core::prelude::*;
use sigprop_test_utils::{init_test_logging, ProgramBuilder};

fn run(p: &mut ProgramBuilder, target: NodeId, delta: &SignatureDelta, config: EngineConfig) -> RunOutcome {
    let model = p.model();
    Engine::new(config, &model, &model)
        .run(p.tree_mut(), target, delta)
        .unwrap()
}

#[test]
fn test_reorder_swaps_call_arguments() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("public class Calc");
    let foo = p.member(class, "void foo(int a, int b) { }");
    p.member(class, "void run() { foo(1, 2); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .parameters(vec![
            ParameterDelta::existing(1, "b", "int"),
            ParameterDelta::existing(0, "a", "int"),
        ])
        .build()
        .unwrap();

    let outcome = run(&mut p, foo, &delta, EngineConfig::default());

    assert_eq!(outcome.applied().map(|s| s.applied_usages), Some(1));
    assert_eq!(p.render(foo), "void foo(int b, int a) { }");
    assert_eq!(p.render(p.call("foo")), "foo(2, 1)");
}

#[test]
fn test_added_parameter_gets_default_at_call() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Box");
    let bar = p.member(class, "void bar(int a) { }");
    p.member(class, "void run() { bar(5); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), bar)
        .unwrap()
        .add_parameter(ParameterDelta::added("c", "String").with_default("\"x\""))
        .build()
        .unwrap();

    let outcome = run(&mut p, bar, &delta, EngineConfig::default());

    assert!(outcome.is_applied());
    assert_eq!(p.render(bar), "void bar(int a, String c) { }");
    assert_eq!(p.render(p.call("bar")), "bar(5, \"x\")");
}

#[test]
fn test_new_checked_exception_wraps_call_in_try() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Loader");
    let baz = p.member(class, "void baz() { }");
    let caller = p.member(class, "void run() { int x = 1; baz(); log(x); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), baz)
        .unwrap()
        .add_exception("IOException")
        .build()
        .unwrap();

    let outcome = run(&mut p, baz, &delta, EngineConfig::default());

    assert!(outcome.is_applied());
    assert_eq!(p.render(baz), "void baz() throws IOException { }");
    assert_eq!(
        p.render(caller),
        "void run() { int x = 1; try { baz(); } catch (IOException e) { } log(x); }"
    );
}

#[test]
fn test_unchecked_exception_leaves_call_alone() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Loader");
    let baz = p.member(class, "void baz() { }");
    let caller = p.member(class, "void run() { baz(); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), baz)
        .unwrap()
        .add_exception("IllegalStateException")
        .build()
        .unwrap();

    run(&mut p, baz, &delta, EngineConfig::default());

    assert_eq!(p.render(baz), "void baz() throws IllegalStateException { }");
    assert_eq!(p.render(caller), "void run() { baz(); }");
}

#[test]
fn test_vararg_to_array_packs_arguments() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Sum");
    let qux = p.member(class, "int qux(int... xs) { return 0; }");
    p.member(class, "void run() { qux(1, 2, 3); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), qux)
        .unwrap()
        .parameters(vec![ParameterDelta::existing(0, "xs", "int[]")])
        .build()
        .unwrap();

    let outcome = run(&mut p, qux, &delta, EngineConfig::default());

    assert!(outcome.is_applied());
    assert_eq!(p.render(qux), "int qux(int[] xs) { return 0; }");
    assert_eq!(p.render(p.call("qux")), "qux(new int[]{1, 2, 3})");
}

#[test]
fn test_removing_used_parameter_is_reported_and_nothing_changes() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let m = p.member(class, "int m(int a, int b) { return b; }");
    let caller = p.member(class, "void run() { m(1, 2); }");
    let before = p.render(class);
    let delta = DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .remove_parameter(1)
        .build()
        .unwrap();

    let outcome = run(&mut p, m, &delta, EngineConfig::default());

    let RunOutcome::Conflicts(report) = outcome else {
        panic!("expected conflicts, got {outcome:?}");
    };
    assert_eq!(
        report.reasons_for(m),
        vec!["parameter 'b' is used in the body of 'm' and will be removed"]
    );
    assert_eq!(report.of_kind(ConflictKind::ParameterStillUsed).len(), 1);
    assert_eq!(p.render(class), before);
    assert_eq!(p.render(caller), "void run() { m(1, 2); }");
}

#[test]
fn test_confirm_all_removes_used_parameter_anyway() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let m = p.member(class, "int m(int a, int b) { return b; }");
    p.member(class, "void run() { m(1, 2); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .remove_parameter(1)
        .build()
        .unwrap();
    let config = EngineConfig::default().with_policy(ExecutionPolicy::UnattendedConfirmAll);

    let outcome = run(&mut p, m, &delta, config);

    let summary = outcome.applied().unwrap();
    assert_eq!(summary.report.len(), 1);
    assert_eq!(p.render(m), "int m(int a) { return b; }");
    assert_eq!(p.render(p.call("m")), "m(1)");
}

#[test]
fn test_rename_updates_method_reference() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Util");
    let parse = p.member(class, "static int parse(String s) { return 0; }");
    let caller = p.member(class, "void run() { map(Util::parse); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), parse)
        .unwrap()
        .name("decode")
        .build()
        .unwrap();

    run(&mut p, parse, &delta, EngineConfig::default());

    assert_eq!(p.render(parse), "static int decode(String s) { return 0; }");
    assert_eq!(p.render(caller), "void run() { map(Util::decode); }");
}

#[test]
fn test_method_reference_becomes_lambda_when_parameters_change() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Util");
    let parse = p.member(class, "static int parse(String s) { return 0; }");
    let caller = p.member(class, "void run() { map(Util::parse); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), parse)
        .unwrap()
        .add_parameter(ParameterDelta::added("radix", "int").with_default("10"))
        .build()
        .unwrap();
    let config = EngineConfig::default().with_policy(ExecutionPolicy::UnattendedConfirmAll);

    let outcome = run(&mut p, parse, &delta, config);

    let summary = outcome.applied().unwrap();
    assert_eq!(summary.report.of_kind(ConflictKind::MethodReferenceExpansion).len(), 1);
    assert_eq!(p.render(caller), "void run() { map((s) -> Util.parse(s, 10)); }");
}

#[test]
fn test_unbound_instance_method_reference_gets_receiver_parameter() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Counter");
    let size = p.member(class, "int size(int limit) { return limit; }");
    let user = p.class("class Report");
    let caller = p.member(user, "void run() { map(Counter::size); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), size)
        .unwrap()
        .add_parameter(ParameterDelta::added("strict", "boolean").with_default("false"))
        .build()
        .unwrap();
    let config = EngineConfig::default().with_policy(ExecutionPolicy::UnattendedConfirmAll);

    run(&mut p, size, &delta, config);

    assert_eq!(
        p.render(caller),
        "void run() { map((counter, limit) -> counter.size(limit, false)); }"
    );
}
