use std::cell::Cell;
use std::rc::Rc;

use rts_ai_bt::{
    ActionNode, BtNode, Inverter, NodeId, Selector, Sequence, SnapshotError, Status, Tree,
};
use rts_ai_core::{AgentRef, NullWorld, SplitMix64, TickContext};
use rts_ai_tools::{SharedTraceLog, TraceLog};

fn leaf(name: &'static str, status: Status) -> Box<dyn BtNode> {
    Box::new(ActionNode::from_fn(name, move |_ctx| status))
}

fn counting(name: &'static str, calls: &Rc<Cell<u32>>, status: Status) -> Box<dyn BtNode> {
    let calls = Rc::clone(calls);
    Box::new(ActionNode::from_fn(name, move |_ctx| {
        calls.set(calls.get() + 1);
        status
    }))
}

fn step(tree: &mut Tree, tick: u64) -> Status {
    let mut rng = SplitMix64::new(11);
    tree.execute(
        TickContext::new(tick, 0.1),
        AgentRef::new(5, 1),
        &mut rng,
        &mut NullWorld,
    )
}

/// root(sel) -> [seq -> [a, b], not -> [c]]
fn sample() -> Tree {
    let seq = Sequence::new(
        "seq",
        vec![leaf("a", Status::Success), leaf("b", Status::Running)],
    );
    let not = Inverter::new("not", leaf("c", Status::Failure));
    let root = Selector::new("root", vec![Box::new(seq), Box::new(not)]);
    Tree::new("sample", Box::new(root))
}

#[test]
fn node_ids_are_depth_first_with_parent_links() {
    let tree = sample();
    assert_eq!(tree.node_count(), 6);

    let names: Vec<_> = (0..6)
        .map(|i| tree.node(NodeId(i)).map(|n| n.name().to_owned()))
        .collect::<Option<_>>()
        .unwrap();
    assert_eq!(names, ["root", "seq", "a", "b", "not", "c"]);

    let parent = |i| tree.node(NodeId(i)).and_then(|n| n.core().parent());
    assert_eq!(parent(0), None);
    assert_eq!(parent(1), Some(NodeId(0)));
    assert_eq!(parent(3), Some(NodeId(1)));
    assert_eq!(parent(5), Some(NodeId(4)));
    assert!(tree.node(NodeId(6)).is_none());
}

#[test]
fn execute_counts_outcomes() {
    let mut tree = Tree::new("ok", leaf("ok", Status::Success));
    step(&mut tree, 1);
    step(&mut tree, 2);

    let mut tree_running = sample();
    step(&mut tree_running, 1);

    assert_eq!(tree.stats().total, 2);
    assert_eq!(tree.stats().successes, 2);
    assert_eq!(tree_running.stats().running, 1);
    assert_eq!(tree_running.last_status(), Status::Running);
}

#[test]
fn paused_tree_returns_last_status_without_touching_nodes() {
    let calls = Rc::new(Cell::new(0));
    let mut tree = Tree::new("fail", counting("f", &calls, Status::Failure));

    // Never executed: the initial status is reported.
    tree.pause();
    assert_eq!(step(&mut tree, 1), Status::Running);
    assert_eq!(calls.get(), 0);

    tree.resume();
    assert_eq!(step(&mut tree, 2), Status::Failure);
    tree.pause();
    assert!(tree.is_paused());
    assert_eq!(step(&mut tree, 3), Status::Failure);
    assert_eq!(step(&mut tree, 4), Status::Failure);
    assert_eq!(calls.get(), 1);
    assert_eq!(tree.stats().total, 1);
    assert_eq!(tree.root().core().executions(), 1);
}

#[test]
fn execute_emits_trace_event() {
    let log = SharedTraceLog::default();
    let mut tree = Tree::new("ok", leaf("ok", Status::Success));
    tree.set_trace_sink(Some(Box::new(Rc::clone(&log))));

    step(&mut tree, 7);
    step(&mut tree, 8);

    let log: TraceLog = log.borrow().clone();
    let events: Vec<_> = log.with_tag("bt.tree.execute").collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tick, 7);
    assert_eq!(events[0].agent, 5);
    assert_eq!(events[0].a, Status::Success.code());
    assert_eq!(events[1].b, 2);
}

#[test]
fn initialize_gives_every_node_a_distinct_seed() {
    let mut tree = sample();
    tree.initialize(42);
    let snap = tree.snapshot();
    let mut seeds: Vec<u64> = snap.nodes.iter().map(|n| n.seed).collect();
    assert_eq!(seeds[0], 42);
    seeds.sort_unstable();
    seeds.dedup();
    assert_eq!(seeds.len(), 6);

    let again = Tree::with_seed("sample", sample_root(), 42).snapshot();
    assert_eq!(snap.nodes, again.nodes);
}

fn sample_root() -> Box<dyn BtNode> {
    let seq = Sequence::new(
        "seq",
        vec![leaf("a", Status::Success), leaf("b", Status::Running)],
    );
    let not = Inverter::new("not", leaf("c", Status::Failure));
    Box::new(Selector::new("root", vec![Box::new(seq), Box::new(not)]))
}

#[test]
fn restore_resumes_running_branch() {
    let calls = Rc::new(Cell::new(0));
    let build = |calls: &Rc<Cell<u32>>| {
        let seq = Sequence::new(
            "seq",
            vec![
                counting("a", calls, Status::Success),
                leaf("b", Status::Running),
            ],
        );
        Tree::with_seed("resume", Box::new(seq), 9)
    };

    let mut original = build(&calls);
    step(&mut original, 1);
    original.context_mut().set("marker", 3_i64);
    let snap = original.snapshot();
    assert_eq!(snap.nodes[0].progress, Some(1));

    let fresh_calls = Rc::new(Cell::new(0));
    let mut restored = build(&fresh_calls);
    restored.restore(snap.clone()).unwrap();
    assert_eq!(restored.snapshot(), snap);
    assert_eq!(restored.context().get_as::<i64>("marker"), Some(3));

    // The restored sequence resumes at `b`; `a` is not re-run.
    assert_eq!(step(&mut restored, 2), Status::Running);
    assert_eq!(fresh_calls.get(), 0);
}

#[test]
fn restore_rejects_foreign_snapshots() {
    let snap = sample().snapshot();

    let mut other_type = Tree::new("other", sample_root());
    assert!(matches!(
        other_type.restore(snap.clone()),
        Err(SnapshotError::TreeTypeMismatch { .. })
    ));

    let mut smaller = Tree::new("sample", leaf("a", Status::Success));
    assert_eq!(
        smaller.restore(snap.clone()),
        Err(SnapshotError::ShapeMismatch {
            expected: 1,
            found: 6
        })
    );

    let renamed = Sequence::new(
        "seq",
        vec![leaf("a", Status::Success), leaf("z", Status::Running)],
    );
    let not = Inverter::new("not", leaf("c", Status::Failure));
    let root = Selector::new("root", vec![Box::new(renamed), Box::new(not)]);
    let mut mismatched = Tree::new("sample", Box::new(root));
    assert!(matches!(
        mismatched.restore(snap),
        Err(SnapshotError::NodeMismatch { index: 3, .. })
    ));
}

#[test]
fn interrupt_and_reset_leave_context_alone() {
    let mut tree = sample();
    step(&mut tree, 1);
    tree.context_mut().set("keep", true);
    assert!(tree.root().is_running());

    tree.interrupt();
    assert!(!tree.root().is_running());
    tree.reset();
    assert_eq!(tree.context().get_as::<bool>("keep"), Some(true));
    assert_eq!(tree.stats().total, 1);
}
