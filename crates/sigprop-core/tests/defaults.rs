//! Values for new parameters taken from variables visible at the call

use pretty_assertions::assert_eq;
use sigprop_core::prelude::*;
use sigprop_test_utils::{init_test_logging, ProgramBuilder};

fn add_clock(p: &ProgramBuilder, tick: NodeId) -> SignatureDelta {
    DeltaBuilder::for_declaration(p.tree(), tick)
        .unwrap()
        .add_parameter(ParameterDelta::added("clock", "Clock").with_any_single_variable(true))
        .build()
        .unwrap()
}

fn run(p: &mut ProgramBuilder, target: NodeId, delta: &SignatureDelta) -> RunOutcome {
    let model = p.model();
    Engine::new(EngineConfig::default(), &model, &model)
        .run(p.tree_mut(), target, delta)
        .unwrap()
}

#[test]
fn test_single_matching_local_is_passed() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class App");
    let tick = p.member(class, "void tick(int n) { }");
    p.member(class, "void run() { Clock c = now(); tick(1); }");
    let delta = add_clock(&p, tick);

    let outcome = run(&mut p, tick, &delta);

    let summary = outcome.applied().unwrap();
    assert!(summary.flagged.is_empty());
    assert_eq!(p.render(tick), "void tick(int n, Clock clock) { }");
    assert_eq!(p.render(p.call("tick")), "tick(1, c)");
}

#[test]
fn test_several_candidates_leave_a_flagged_hole() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class App");
    let tick = p.member(class, "void tick(int n) { }");
    p.member(class, "void run(Clock a, Clock b) { tick(1); }");
    let site = p.call("tick");
    let delta = add_clock(&p, tick);

    let outcome = run(&mut p, tick, &delta);

    let summary = outcome.applied().unwrap();
    assert_eq!(summary.flagged.len(), 1);
    assert_eq!(summary.flagged[0].site, site);
    assert_eq!(summary.report.of_kind(ConflictKind::AmbiguousDefault).len(), 1);
    assert_eq!(p.render(site), "tick(1, )");
}

#[test]
fn test_enclosing_instance_used_when_no_variable_fits() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Clock");
    let tick = p.member(class, "void tick(int n) { }");
    p.member(class, "void run() { tick(1); }");
    let delta = add_clock(&p, tick);

    run(&mut p, tick, &delta);

    assert_eq!(p.render(p.call("tick")), "tick(1, this)");
}

#[test]
fn test_outer_instance_is_qualified() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let outer = p.class("class Clock");
    let inner = p.inner_class(outer, "class Ticker");
    let tick = p.member(inner, "void tick(int n) { }");
    p.member(inner, "void run() { tick(1); }");
    let delta = add_clock(&p, tick);

    run(&mut p, tick, &delta);

    assert_eq!(p.render(p.call("tick")), "tick(1, Clock.this)");
}

#[test]
fn test_local_declared_after_the_call_is_not_used() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class App");
    let tick = p.member(class, "void tick(int n) { }");
    p.member(class, "void run() { tick(1); Clock late = now(); }");
    let site = p.call("tick");
    let delta = add_clock(&p, tick);

    let outcome = run(&mut p, tick, &delta);

    let summary = outcome.applied().unwrap();
    assert_eq!(summary.report.of_kind(ConflictKind::MissingDefault).len(), 1);
    assert_eq!(p.render(site), "tick(1, )");
}
