use std::cell::RefCell;
use std::rc::Rc;

use rts_ai_bt::{keys, ActionNode, BtNode, Status, Tree};
use rts_ai_core::{AgentRef, BbValue, Blackboard, BlackboardEvent, NullWorld, TickContext, Vec3};
use rts_ai_runtime::{AgentWrapper, WrapperConfig, WrapperError, WRAPPER_STREAM};

/// Reads `seen`, writes `target_id` and a scratch key, decides `"scan"`.
fn scanner() -> Box<dyn BtNode> {
    Box::new(ActionNode::from_fn("scan", |ctx| {
        let seen = ctx.vars.get_as::<i64>("seen").unwrap_or(0);
        ctx.vars.set("seen", seen + 1);
        ctx.vars.set(keys::TARGET_ID, 77_u64);
        ctx.vars.set("scratch", true);
        ctx.set_decision("scan");
        Status::Success
    }))
}

fn wrapper(config: WrapperConfig) -> AgentWrapper {
    AgentWrapper::new(
        AgentRef::new(4, 1),
        "scout",
        Tree::with_seed("scan", scanner(), 21),
    )
    .with_config(config)
}

#[test]
fn rng_seed_is_derived_from_tree_seed_and_unit() {
    let w = wrapper(WrapperConfig::default());
    assert_eq!(
        w.rng_seed(),
        rts_ai_core::derive_seed(21, 4, WRAPPER_STREAM)
    );
    assert_ne!(w.rng_seed(), 21);
}

#[test]
fn evaluate_copies_whitelist_back_only() {
    let mut w = wrapper(WrapperConfig::default());
    w.blackboard_mut().set_var("seen", 5_i64);

    let eval = w.evaluate(TickContext::default(), &mut NullWorld);
    assert_eq!(eval.unit, 4);
    assert_eq!(eval.status, Status::Success);
    assert_eq!(eval.decision, Some(BbValue::from("scan")));
    assert_eq!(w.last_decision(), Some(&BbValue::from("scan")));
    assert_eq!(w.evaluations(), 1);

    let bb = w.blackboard();
    assert_eq!(bb.get::<u64>(keys::TARGET_ID), Some(77));
    // Not whitelisted: the context saw 6, the blackboard keeps 5.
    assert_eq!(bb.get::<i64>("seen"), Some(5));
    assert!(!bb.has_var("scratch"));
    assert!(!bb.has_var(keys::ACTION));
}

#[test]
fn whitelisted_key_missing_from_context_is_removed() {
    let config = WrapperConfig {
        decision_key: keys::ACTION.into(),
        write_back: vec!["gone".into(), "seen".into()],
    };
    let mut w = wrapper(config);
    w.blackboard_mut().set_var("seen", 1_i64);
    w.blackboard_mut().set_var("gone", 1_i64);

    // Clear "gone" from inside the tree.
    let root = ActionNode::from_fn("forget", |ctx| {
        ctx.vars.remove("gone");
        ctx.vars.set("seen", 2_i64);
        Status::Success
    });
    *w.tree_mut() = Tree::new("forget", Box::new(root));

    w.evaluate(TickContext::default(), &mut NullWorld);
    assert!(!w.blackboard().has_var("gone"));
    assert_eq!(w.blackboard().get::<i64>("seen"), Some(2));
}

#[test]
fn unchanged_nan_is_not_written_back_again() {
    let config = WrapperConfig {
        decision_key: keys::ACTION.into(),
        write_back: vec!["drift".into()],
    };
    let mut w = wrapper(config);
    let root = ActionNode::from_fn("drift", |ctx| {
        ctx.vars.set("drift", f64::NAN);
        Status::Success
    });
    *w.tree_mut() = Tree::new("drift", Box::new(root));

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    w.blackboard_mut()
        .subscribe(move |e: &BlackboardEvent| sink.borrow_mut().push(e.key().to_string()));

    w.evaluate(TickContext::default(), &mut NullWorld);
    w.evaluate(TickContext::default().next(), &mut NullWorld);
    assert_eq!(*events.borrow(), vec!["drift".to_string()]);
}

#[test]
fn stale_decision_is_not_reported() {
    let mut w = wrapper(WrapperConfig::default());
    w.blackboard_mut().set_var(keys::ACTION, "old");
    let root = ActionNode::from_fn("silent", |_ctx| Status::Failure);
    *w.tree_mut() = Tree::new("silent", Box::new(root));

    let eval = w.evaluate(TickContext::default(), &mut NullWorld);
    assert_eq!(eval.status, Status::Failure);
    assert_eq!(eval.decision, None);
}

#[test]
fn inherited_values_are_read_but_not_materialised() {
    let faction = Blackboard::new().into_shared();
    faction
        .borrow_mut()
        .set_var(keys::MOVE_POS, Vec3::new(4.0, 0.0, 0.0));

    let mut w = AgentWrapper::new(
        AgentRef::new(8, 1),
        "scout",
        Tree::new(
            "read",
            Box::new(ActionNode::from_fn("read", |ctx| {
                Status::from_bool(ctx.vars.get_as::<Vec3>(keys::MOVE_POS).is_some())
            })),
        ),
    );
    w.set_parent_blackboard(Some(&faction));

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    w.blackboard_mut()
        .subscribe(move |e: &BlackboardEvent| sink.borrow_mut().push(e.key().to_string()));

    assert_eq!(
        w.evaluate(TickContext::default(), &mut NullWorld).status,
        Status::Success
    );
    assert!(!w.blackboard().has_local(keys::MOVE_POS));
    assert!(events.borrow().is_empty());
}

#[test]
fn snapshot_restores_counters_rng_and_blackboard() {
    let mut w = wrapper(WrapperConfig::default());
    for t in 0..3 {
        w.evaluate(TickContext::new(t, 0.1), &mut NullWorld);
    }
    let snap = w.snapshot();
    assert_eq!(snap.evaluations, 3);

    let mut fresh = wrapper(WrapperConfig::default());
    fresh.restore(snap.clone()).unwrap();
    assert_eq!(fresh.snapshot(), snap);

    let mut other = AgentWrapper::new(
        AgentRef::new(5, 1),
        "scout",
        Tree::with_seed("scan", scanner(), 21),
    );
    assert_eq!(
        other.restore(snap),
        Err(WrapperError::UnitMismatch {
            expected: 5,
            found: 4
        })
    );
}
