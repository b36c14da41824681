//! Execution policies, hooks, configuration files and rollback

use parking_lot::RwLock;
use pretty_assertions::assert_eq;
use sigprop_core::prelude::*;
use sigprop_test_utils::{init_test_logging, ProgramBuilder, ScriptedHook};
use sigprop_tree::MemoryTree;

fn used_parameter_program() -> (ProgramBuilder, NodeId, NodeId) {
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let m = p.member(class, "int m(int a, int b) { return b; }");
    p.member(class, "void run() { m(1, 2); }");
    (p, class, m)
}

fn remove_second(p: &ProgramBuilder, m: NodeId) -> SignatureDelta {
    DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .remove_parameter(1)
        .build()
        .unwrap()
}

#[test]
fn test_config_file_drives_policy_and_catch_name() -> anyhow::Result<()> {
    init_test_logging();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sigprop.toml");
    std::fs::write(
        &path,
        "policy = \"unattended-confirm-all\"\ncatch-parameter-name = \"err\"\n",
    )?;
    let config = EngineConfig::from_file(&path)?;
    assert_eq!(config.policy, ExecutionPolicy::UnattendedConfirmAll);

    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Loader");
    let baz = p.member(class, "void baz() { }");
    let caller = p.member(class, "void run() { baz(); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), baz)?
        .add_exception("IOException")
        .build()?;
    let model = p.model();

    Engine::new(config, &model, &model).run(p.tree_mut(), baz, &delta)?;

    assert_eq!(
        p.render(caller),
        "void run() { try { baz(); } catch (IOException err) { } }"
    );
    Ok(())
}

#[test]
fn test_interactive_confirmation_proceeds() {
    init_test_logging();
    let (mut p, _, m) = used_parameter_program();
    let delta = remove_second(&p, m);
    let model = p.model();
    let hook = ScriptedHook::new(Decision::Proceed);
    let config = EngineConfig::default().with_policy(ExecutionPolicy::Interactive);

    let outcome = Engine::new(config, &model, &model)
        .with_hook(&hook)
        .run(p.tree_mut(), m, &delta)
        .unwrap();

    assert!(outcome.is_applied());
    let asked = hook.confirmations();
    assert_eq!(asked.len(), 1);
    assert!(asked[0].contains("parameter 'b' is used in the body of 'm'"));
    assert_eq!(p.render(m), "int m(int a) { return b; }");
}

#[test]
fn test_interactive_abort_leaves_tree_untouched() {
    init_test_logging();
    let (mut p, class, m) = used_parameter_program();
    let before = p.render(class);
    let delta = remove_second(&p, m);
    let model = p.model();
    let hook = ScriptedHook::new(Decision::Abort);
    let config = EngineConfig::default().with_policy(ExecutionPolicy::Interactive);

    let outcome = Engine::new(config, &model, &model)
        .with_hook(&hook)
        .run(p.tree_mut(), m, &delta)
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Aborted(_)));
    assert_eq!(p.render(class), before);
}

#[test]
fn test_interactive_without_hook_reports_conflicts() {
    init_test_logging();
    let (mut p, class, m) = used_parameter_program();
    let before = p.render(class);
    let delta = remove_second(&p, m);
    let model = p.model();
    let config = EngineConfig::default().with_policy(ExecutionPolicy::Interactive);

    let outcome = Engine::new(config, &model, &model)
        .run(p.tree_mut(), m, &delta)
        .unwrap();

    assert_eq!(outcome.conflicts().map(ConflictReport::len), Some(1));
    assert_eq!(p.render(class), before);
}

#[test]
fn test_abort_on_conflict_policy() {
    init_test_logging();
    let (mut p, class, m) = used_parameter_program();
    let before = p.render(class);
    let delta = remove_second(&p, m);
    let model = p.model();
    let config = EngineConfig::default().with_policy(ExecutionPolicy::UnattendedAbortOnConflict);

    let outcome = Engine::new(config, &model, &model)
        .run(p.tree_mut(), m, &delta)
        .unwrap();

    assert!(outcome.conflicts().is_some());
    assert_eq!(p.render(class), before);
}

#[test]
fn test_hook_supplies_missing_default() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class C");
    let m = p.member(class, "void m(int a) { }");
    p.member(class, "void run() { m(1); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .add_parameter(ParameterDelta::added("b", "int"))
        .build()
        .unwrap();
    let model = p.model();
    let hook = ScriptedHook::new(Decision::Proceed).with_default(Some("42"));
    let config = EngineConfig::default().with_policy(ExecutionPolicy::Interactive);

    let outcome = Engine::new(config, &model, &model)
        .with_hook(&hook)
        .run(p.tree_mut(), m, &delta)
        .unwrap();

    assert!(outcome.is_applied());
    assert_eq!(p.render(p.call("m")), "m(1, 42)");
    assert_eq!(hook.questions(), vec![("b".to_string(), "int".to_string())]);
    assert!(hook.confirmations().is_empty());
}

#[test]
fn test_cancelled_default_aborts() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class C");
    let m = p.member(class, "void m(int a) { }");
    p.member(class, "void run() { m(1); }");
    let before = p.render(class);
    let delta = DeltaBuilder::for_declaration(p.tree(), m)
        .unwrap()
        .add_parameter(ParameterDelta::added("b", "int"))
        .build()
        .unwrap();
    let model = p.model();
    let hook = ScriptedHook::new(Decision::Proceed).with_default(None);
    let config = EngineConfig::default().with_policy(ExecutionPolicy::Interactive);

    let outcome = Engine::new(config, &model, &model)
        .with_hook(&hook)
        .run(p.tree_mut(), m, &delta)
        .unwrap();

    let RunOutcome::Aborted(reason) = outcome else {
        panic!("expected abort, got {outcome:?}");
    };
    assert!(reason.contains("'b'"));
    assert_eq!(p.render(class), before);
}

#[test]
fn test_skip_offending_keeps_call_with_side_effects() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class C");
    let m = p.member(class, "int m(int a, int b) { return a; }");
    p.member(class, "void run() { m(1, next()); m(2, 3); }");
    let sites = p.calls_named("m");
    let delta = remove_second(&p, m);

    let model = p.model();
    let outcome = Engine::new(EngineConfig::default(), &model, &model)
        .run(p.tree_mut(), m, &delta)
        .unwrap();

    let summary = outcome.applied().unwrap();
    assert_eq!(summary.skipped, vec![sites[0]]);
    assert_eq!(summary.applied_usages, 1);
    assert_eq!(p.render(m), "int m(int a) { return a; }");
    assert_eq!(p.render(sites[0]), "m(1, next())");
    assert_eq!(p.render(sites[1]), "m(2)");
}

#[test]
fn test_usage_limit_aborts_before_editing() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let foo = p.member(class, "void foo(int a, int b) { }");
    p.member(class, "void run() { foo(1, 2); foo(3, 4); }");
    let before = p.render(class);
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .name("bar")
        .build()
        .unwrap();
    let model = p.model();

    let outcome = Engine::new(EngineConfig::default().with_max_usages(1), &model, &model)
        .run(p.tree_mut(), foo, &delta)
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Aborted(_)));
    assert_eq!(p.render(class), before);
}

#[test]
fn test_run_shared_applies_under_lock() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let foo = p.member(class, "void foo(int a, int b) { }");
    let caller = p.member(class, "void run() { foo(1, 2); }");
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .parameters(vec![
            ParameterDelta::existing(1, "b", "int"),
            ParameterDelta::existing(0, "a", "int"),
        ])
        .build()
        .unwrap();
    let model = p.model();
    let shared: RwLock<MemoryTree> = RwLock::new(std::mem::take(p.tree_mut()));

    let outcome = Engine::new(EngineConfig::default(), &model, &model)
        .run_shared(&shared, foo, &delta)
        .unwrap();

    assert!(outcome.is_applied());
    let tree = shared.read();
    assert_eq!(tree.render(foo), "void foo(int b, int a) { }");
    assert_eq!(tree.render(caller), "void run() { foo(2, 1); }");
}

#[test]
fn test_refused_edit_rolls_back_everything() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let foo = p.member(class, "void foo(int a, int b) { }");
    p.member(class, "void run() { foo(1, 2); }");
    let before = p.render(class);
    let call = p.call("foo");
    let arguments = p.tree().child_of_kind(call, NodeKind::ArgumentList).unwrap();
    p.tree_mut().set_writable(arguments, false).unwrap();
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .parameters(vec![
            ParameterDelta::existing(1, "b", "int"),
            ParameterDelta::existing(0, "a", "int"),
        ])
        .build()
        .unwrap();
    let model = p.model();

    let err = Engine::new(EngineConfig::default(), &model, &model)
        .run(p.tree_mut(), foo, &delta)
        .unwrap_err();

    assert!(err.is_structural());
    assert!(!err.is_retryable());
    assert_eq!(p.render(class), before);
}

#[test]
fn test_stale_delta_is_retryable() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let foo = p.member(class, "void foo(int a) { }");
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .name("bar")
        .build()
        .unwrap();
    let other = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .add_parameter(ParameterDelta::added("b", "int").with_default("0"))
        .build()
        .unwrap();
    let model = p.model();
    let engine = Engine::new(EngineConfig::default(), &model, &model);
    engine.run(p.tree_mut(), foo, &other).unwrap();

    let err = engine.run(p.tree_mut(), foo, &delta).unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(p.render(class), "class Calc { void foo(int a, int b) { } }");
}

#[test]
fn test_tampered_stored_delta_is_rejected_before_analysis() {
    init_test_logging();
    let mut p = ProgramBuilder::new("app");
    let class = p.class("class Calc");
    let foo = p.member(class, "void foo(int a, int b) { }");
    p.member(class, "void run() { foo(1, 2); }");
    let before = p.render(class);
    let delta = DeltaBuilder::for_declaration(p.tree(), foo)
        .unwrap()
        .parameters(vec![
            ParameterDelta::existing(1, "b", "int"),
            ParameterDelta::existing(0, "a", "int"),
        ])
        .build()
        .unwrap();
    let mut stored = serde_json::to_value(&delta).unwrap();
    stored["parameters"][0]["old_index"] = serde_json::json!(7);
    let loaded: SignatureDelta = serde_json::from_value(stored).unwrap();
    let model = p.model();

    let err = Engine::new(EngineConfig::default(), &model, &model)
        .run(p.tree_mut(), foo, &loaded)
        .unwrap_err();

    assert!(matches!(err, EngineError::Delta(_)));
    assert_eq!(p.render(class), before);
}
