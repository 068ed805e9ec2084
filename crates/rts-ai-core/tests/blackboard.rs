use std::cell::RefCell;
use std::rc::Rc;

use rts_ai_core::{BbValue, Blackboard, BlackboardEvent, ValueKind, Vec3};

#[test]
fn blackboard_set_get_remove_roundtrip() {
    let mut bb = Blackboard::new();
    assert!(!bb.has_var("hp"));

    bb.set_var("hp", 123);
    bb.set_var("name", "scout");
    bb.set_var("home", Vec3::new(1.0, 0.0, 2.0));

    assert_eq!(bb.get::<i64>("hp"), Some(123));
    assert_eq!(bb.get::<String>("name").as_deref(), Some("scout"));
    assert_eq!(bb.get::<Vec3>("home"), Some(Vec3::new(1.0, 0.0, 2.0)));

    assert_eq!(bb.remove_var("hp"), Some(BbValue::Int(123)));
    assert_eq!(bb.get::<i64>("hp"), None);
}

#[test]
fn typed_get_rejects_mismatched_kinds_and_widens_ints() {
    let mut bb = Blackboard::new();
    bb.set_var("n", 7);
    bb.set_var("flag", true);

    assert_eq!(bb.get::<bool>("n"), None);
    assert_eq!(bb.get::<f64>("n"), Some(7.0));
    assert_eq!(bb.get_or::<i64>("flag", -1), -1);
    assert_eq!(bb.get_var_or("missing", BbValue::Int(5)), BbValue::Int(5));
}

#[test]
fn child_falls_back_to_parent_until_set_locally() {
    let parent = Blackboard::new().into_shared();
    parent.borrow_mut().set_var("x", 1);

    let mut child = Blackboard::with_parent(&parent);
    assert_eq!(child.get::<i64>("x"), Some(1));
    assert!(!child.has_local("x"));

    child.set_var("x", 2);
    parent.borrow_mut().set_var("x", 3);

    assert_eq!(child.get::<i64>("x"), Some(2));
    assert_eq!(parent.borrow().get::<i64>("x"), Some(3));
}

#[test]
fn set_var_never_writes_through_to_parent() {
    let parent = Blackboard::new().into_shared();
    let mut child = Blackboard::with_parent(&parent);

    child.set_var("only_child", 1);
    assert!(!parent.borrow().has_var("only_child"));
}

#[test]
fn fallback_walks_multiple_levels() {
    let faction = Blackboard::new().into_shared();
    faction.borrow_mut().set_var("rally", Vec3::new(5.0, 0.0, 5.0));

    let squad = Blackboard::with_parent(&faction).into_shared();
    squad.borrow_mut().set_var("formation", "wedge");

    let unit = Blackboard::with_parent(&squad);
    assert_eq!(unit.get::<Vec3>("rally"), Some(Vec3::new(5.0, 0.0, 5.0)));
    assert_eq!(unit.get::<String>("formation").as_deref(), Some("wedge"));

    let flat = unit.flatten();
    assert_eq!(flat.len(), 2);
}

#[test]
fn dropped_parent_stops_fallback() {
    let parent = Blackboard::new().into_shared();
    parent.borrow_mut().set_var("x", 1);
    let child = Blackboard::with_parent(&parent);

    drop(parent);
    assert_eq!(child.get::<i64>("x"), None);
    assert!(child.parent().is_none());
}

#[test]
fn flatten_prefers_local_values() {
    let parent = Blackboard::new().into_shared();
    parent.borrow_mut().set_var("a", 1);
    parent.borrow_mut().set_var("b", 1);

    let mut child = Blackboard::with_parent(&parent);
    child.set_var("b", 2);

    let flat = child.flatten();
    assert_eq!(flat.get("a"), Some(&BbValue::Int(1)));
    assert_eq!(flat.get("b"), Some(&BbValue::Int(2)));
}

#[test]
fn observers_see_added_changed_removed_but_not_noop_writes() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();

    let mut bb = Blackboard::new();
    let id = bb.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    bb.set_var("k", 1);
    bb.set_var("k", 1);
    bb.set_var("k", 2);
    bb.remove_var("k");
    bb.remove_var("k");

    assert_eq!(
        *events.borrow(),
        vec![
            BlackboardEvent::Added {
                key: "k".into(),
                value: BbValue::Int(1)
            },
            BlackboardEvent::Changed {
                key: "k".into(),
                old: BbValue::Int(1),
                new: BbValue::Int(2)
            },
            BlackboardEvent::Removed {
                key: "k".into(),
                old: BbValue::Int(2)
            },
        ]
    );

    assert!(bb.unsubscribe(id));
    bb.set_var("k", 3);
    assert_eq!(events.borrow().len(), 3);
}

#[test]
fn rewriting_nan_is_a_noop() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();

    let mut bb = Blackboard::new();
    bb.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    bb.set_var("f", f64::NAN);
    bb.set_var("f", f64::NAN);
    bb.set_var("f", 0.5);

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], BlackboardEvent::Added { key, .. } if key == "f"));
    assert!(matches!(
        &events[1],
        BlackboardEvent::Changed { new: BbValue::Float(v), .. } if *v == 0.5
    ));
}

#[test]
fn metadata_and_snapshot_restore() {
    let mut bb = Blackboard::new();
    bb.set_var("ammo", 30);
    bb.describe("ammo", Some(ValueKind::Int), "rounds left in magazine");

    let snapshot = bb.snapshot();

    let mut restored = Blackboard::new();
    restored.restore(snapshot.clone());
    assert_eq!(restored.get::<i64>("ammo"), Some(30));
    assert_eq!(
        restored.metadata("ammo").map(|m| m.description.as_str()),
        Some("rounds left in magazine")
    );
    assert_eq!(restored.snapshot(), snapshot);
}
