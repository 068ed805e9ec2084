use rts_ai_bt::leaves::SetDecision;
use rts_ai_bt::{ActionNode, BtNode};
use rts_ai_core::{BbValue, NullWorld, TickContext};
use rts_ai_runtime::{
    Diagnostic, Registry, RegistryError, TemplateSpec, TreeTemplate, DEFAULT_TEMPLATE_ID,
};

fn decide(decision: &'static str) -> Box<dyn BtNode> {
    Box::new(ActionNode::new(
        decision,
        SetDecision {
            decision: BbValue::from(decision),
        },
    ))
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_tree_type("raider", |_| decide("raid"));
    registry.register_tree_type("builder", |_| decide("build"));
    registry
}

#[test]
fn specificity_is_tier_plus_priority() {
    assert_eq!(TreeTemplate::new("g", "t").specificity(), 0);
    assert_eq!(TreeTemplate::new("u", "t").for_unit_type("builder").specificity(), 5);
    assert_eq!(TreeTemplate::new("f", "t").for_faction(2).specificity(), 10);
    assert_eq!(
        TreeTemplate::new("fu", "t")
            .for_faction(2)
            .for_unit_type("builder")
            .with_priority(3)
            .specificity(),
        18
    );
    let typed = TreeTemplate::new("u", "t")
        .for_unit_type("builder")
        .with_priority(99);
    assert_eq!(typed.tier(), 5);
    assert_eq!(typed.specificity(), 104);
    assert_eq!(typed.rank(), (5, 99));
}

#[test]
fn priority_never_lifts_a_template_out_of_its_tier() {
    let mut registry = registry();
    registry.register(TreeTemplate::new("faction2", "raider").for_faction(2));
    registry.register(
        TreeTemplate::new("builders", "builder")
            .for_unit_type("builder")
            .with_priority(50),
    );
    assert_eq!(registry.find_best_template(2, "builder").unwrap().id(), "faction2");
}

#[test]
fn higher_priority_wins_within_a_tier_beyond_small_values() {
    let mut registry = registry();
    registry.register(TreeTemplate::new("alpha", "raider").for_faction(2).with_priority(5));
    registry.register(TreeTemplate::new("zulu", "builder").for_faction(2).with_priority(10));
    assert_eq!(registry.find_best_template(2, "").unwrap().id(), "zulu");

    registry.register(TreeTemplate::new("low", "raider").with_priority(-3));
    registry.register(TreeTemplate::new("lower", "raider").with_priority(-7));
    assert_eq!(registry.find_best_template(1, "").unwrap().id(), "low");
}

#[test]
fn matches_treats_zero_and_empty_as_wildcards() {
    let generic = TreeTemplate::new("g", "t");
    let typed = TreeTemplate::new("u", "t").for_unit_type("builder");
    let owned = TreeTemplate::new("f", "t").for_faction(2);

    assert!(generic.matches(7, "anything"));
    assert!(typed.matches(1, "builder"));
    assert!(!typed.matches(1, "tank"));
    assert!(owned.matches(2, "tank"));
    assert!(!owned.matches(3, "tank"));
}

#[test]
fn faction_match_beats_unit_type_match() {
    let mut registry = registry();
    registry.register(TreeTemplate::new("faction2", "raider").for_faction(2));
    registry.register(TreeTemplate::new("builders", "builder").for_unit_type("builder"));

    let best = registry.find_best_template(2, "builder").unwrap();
    assert_eq!(best.id(), "faction2");

    let best = registry.find_best_template(1, "builder").unwrap();
    assert_eq!(best.id(), "builders");
}

#[test]
fn falls_back_to_default_when_nothing_applies() {
    let mut registry = registry();
    registry.register(TreeTemplate::new("faction3", "raider").for_faction(3));
    registry.register(TreeTemplate::new("tanks", "raider").for_unit_type("tank"));

    let best = registry.find_best_template(2, "builder").unwrap();
    assert_eq!(best.id(), DEFAULT_TEMPLATE_ID);
}

#[test]
fn equal_specificity_prefers_smallest_id() {
    let mut registry = registry();
    registry.register(TreeTemplate::new("zulu", "raider").for_faction(2));
    registry.register(TreeTemplate::new("alpha", "builder").for_faction(2));
    assert_eq!(registry.find_best_template(2, "").unwrap().id(), "alpha");

    registry.register(TreeTemplate::new("zulu", "raider").for_faction(2).with_priority(1));
    assert_eq!(registry.find_best_template(2, "").unwrap().id(), "zulu");
}

#[test]
fn hot_reregistration_keeps_indices_consistent() {
    let mut registry = registry();
    registry.register(TreeTemplate::new("elite", "raider").for_faction(2));
    assert_eq!(registry.templates_for_faction(2).collect::<Vec<_>>(), ["elite"]);

    // Re-registering under the same id moves it to a different faction.
    let old = registry.register(TreeTemplate::new("elite", "raider").for_faction(4));
    assert_eq!(old.map(|t| t.faction()), Some(2));
    assert_eq!(registry.templates_for_faction(2).count(), 0);
    assert_eq!(registry.find_best_template(2, "").unwrap().id(), DEFAULT_TEMPLATE_ID);
    assert_eq!(registry.find_best_template(4, "").unwrap().id(), "elite");

    let removed = registry.unregister("elite").unwrap();
    assert!(removed.is_some());
    assert_eq!(registry.templates_for_faction(4).count(), 0);
    assert!(matches!(registry.unregister("elite"), Ok(None)));
    assert_eq!(
        registry.unregister(DEFAULT_TEMPLATE_ID).unwrap_err(),
        RegistryError::DefaultTemplateRequired
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn create_wrapper_applies_template_defaults_and_decides() {
    let mut registry = registry();
    registry.register(
        TreeTemplate::new("raiders", "raider")
            .for_faction(2)
            .with_default("aggression", 0.8)
            .with_default("squad", "red"),
    );

    let spawned = registry.create_wrapper(10, 2, "tank", Some(42)).unwrap();
    assert!(spawned.diagnostic.is_none());
    let mut wrapper = spawned.wrapper;
    assert_eq!(wrapper.template_id(), "raiders");
    assert_eq!(wrapper.tree().seed(), 42);
    assert_eq!(wrapper.blackboard().get::<f64>("aggression"), Some(0.8));
    assert_eq!(wrapper.blackboard().get::<String>("squad").as_deref(), Some("red"));

    let eval = wrapper.evaluate(TickContext::default(), &mut NullWorld);
    assert_eq!(eval.decision, Some(BbValue::from("raid")));
}

#[test]
fn unseeded_wrappers_derive_distinct_per_unit_seeds() {
    let mut registry = registry();
    registry.set_global_seed(1234);
    let a = registry.create_wrapper(1, 1, "", None).unwrap().wrapper;
    let b = registry.create_wrapper(2, 1, "", None).unwrap().wrapper;
    let a_again = registry.create_wrapper(1, 1, "", None).unwrap().wrapper;
    assert_ne!(a.tree().seed(), b.tree().seed());
    assert_eq!(a.tree().seed(), a_again.tree().seed());
    assert_ne!(a.rng_seed(), a.tree().seed());
}

#[test]
fn unknown_template_falls_back_with_diagnostic() {
    let registry = registry();
    let spawned = registry
        .create_wrapper_for_template("ghost", 5, 1, "scout", Some(1))
        .unwrap();
    assert_eq!(spawned.wrapper.template_id(), DEFAULT_TEMPLATE_ID);
    assert_eq!(
        spawned.diagnostic,
        Some(Diagnostic::UnknownTemplate {
            requested: "ghost".into()
        })
    );
}

#[test]
fn unknown_tree_type_falls_back_with_diagnostic() {
    let mut registry = registry();
    registry.register_spec(TemplateSpec {
        id: "broken".into(),
        tree_type: "does-not-exist".into(),
        faction: 2,
        unit_type: String::new(),
        priority: 0,
        defaults: Default::default(),
    });

    let spawned = registry.create_wrapper(5, 2, "scout", Some(1)).unwrap();
    let mut wrapper = spawned.wrapper;
    assert_eq!(wrapper.template_id(), DEFAULT_TEMPLATE_ID);
    assert!(matches!(
        spawned.diagnostic,
        Some(Diagnostic::UnknownTreeType { ref template, .. }) if template == "broken"
    ));

    let eval = wrapper.evaluate(TickContext::default(), &mut NullWorld);
    assert_eq!(eval.decision, Some(BbValue::from("idle")));
}

#[test]
fn template_factory_overrides_catalog() {
    let mut registry = registry();
    registry.register(
        TreeTemplate::new("custom", "raider")
            .for_unit_type("medic")
            .with_factory(|_| decide("heal")),
    );
    let template = registry.get("custom").unwrap();
    assert!(template.build_tree(3, 9).is_some());
    assert!(TreeTemplate::new("bare", "raider").build_tree(3, 9).is_none());

    let mut wrapper = registry.create_wrapper(3, 1, "medic", Some(9)).unwrap().wrapper;
    let eval = wrapper.evaluate(TickContext::default(), &mut NullWorld);
    assert_eq!(eval.decision, Some(BbValue::from("heal")));
}

#[test]
fn replacing_default_with_unbuildable_tree_type_is_an_error() {
    let mut registry = registry();
    registry.register(TreeTemplate::new(DEFAULT_TEMPLATE_ID, "missing"));
    let err = registry.create_wrapper(1, 1, "", Some(0)).unwrap_err();
    assert_eq!(
        err,
        RegistryError::UnbuildableDefault {
            tree_type: "missing".into()
        }
    );
}
