use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rts_ai_bt::{BtNode, Tree};
use rts_ai_core::{BbValue, FactionId, UnitId, ANY_FACTION};
use serde::{Deserialize, Serialize};

/// Builds a fresh node graph for one agent.
pub type TreeFactory = Rc<dyn Fn(UnitId) -> Box<dyn BtNode>>;

/// Reserved id of the fallback template.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

const FACTION_WEIGHT: i32 = 10;
const UNIT_TYPE_WEIGHT: i32 = 5;

/// Serializable template declaration; the factory is resolved through the registry's tree types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub id: String,
    pub tree_type: String,
    /// `0` matches any faction.
    #[serde(default)]
    pub faction: FactionId,
    /// Empty matches any unit type.
    #[serde(default)]
    pub unit_type: String,
    #[serde(default)]
    pub priority: i32,
    /// Seeded into each spawned agent's blackboard.
    #[serde(default)]
    pub defaults: BTreeMap<String, BbValue>,
}

/// A faction/unit-type tagged tree blueprint.
#[derive(Clone)]
pub struct TreeTemplate {
    id: String,
    tree_type: String,
    faction: FactionId,
    unit_type: String,
    priority: i32,
    defaults: BTreeMap<String, BbValue>,
    factory: Option<TreeFactory>,
}

impl TreeTemplate {
    pub fn new(id: impl Into<String>, tree_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tree_type: tree_type.into(),
            faction: ANY_FACTION,
            unit_type: String::new(),
            priority: 0,
            defaults: BTreeMap::new(),
            factory: None,
        }
    }

    pub fn from_spec(spec: TemplateSpec) -> Self {
        Self {
            id: spec.id,
            tree_type: spec.tree_type,
            faction: spec.faction,
            unit_type: spec.unit_type,
            priority: spec.priority,
            defaults: spec.defaults,
            factory: None,
        }
    }

    pub fn to_spec(&self) -> TemplateSpec {
        TemplateSpec {
            id: self.id.clone(),
            tree_type: self.tree_type.clone(),
            faction: self.faction,
            unit_type: self.unit_type.clone(),
            priority: self.priority,
            defaults: self.defaults.clone(),
        }
    }

    pub fn for_faction(mut self, faction: FactionId) -> Self {
        self.faction = faction;
        self
    }

    pub fn for_unit_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = unit_type.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<BbValue>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Template-specific factory; takes precedence over the registry's tree type catalog.
    pub fn with_factory(mut self, factory: impl Fn(UnitId) -> Box<dyn BtNode> + 'static) -> Self {
        self.factory = Some(Rc::new(factory));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tree_type(&self) -> &str {
        &self.tree_type
    }

    pub fn faction(&self) -> FactionId {
        self.faction
    }

    pub fn unit_type(&self) -> &str {
        &self.unit_type
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn defaults(&self) -> &BTreeMap<String, BbValue> {
        &self.defaults
    }

    pub fn factory(&self) -> Option<&TreeFactory> {
        self.factory.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_TEMPLATE_ID
    }

    pub fn matches(&self, faction: FactionId, unit_type: &str) -> bool {
        (self.faction == ANY_FACTION || self.faction == faction)
            && (self.unit_type.is_empty() || self.unit_type == unit_type)
    }

    /// Filter weight alone: 10 for a faction filter plus 5 for a unit-type filter.
    pub fn tier(&self) -> i32 {
        let mut tier = 0;
        if self.faction != ANY_FACTION {
            tier += FACTION_WEIGHT;
        }
        if !self.unit_type.is_empty() {
            tier += UNIT_TYPE_WEIGHT;
        }
        tier
    }

    /// `tier + priority`. Informational; resolution compares [`TreeTemplate::rank`].
    pub fn specificity(&self) -> i32 {
        self.tier().saturating_add(self.priority)
    }

    /// Resolution key: the filter tier first, priority only among templates of the same tier.
    pub fn rank(&self) -> (i32, i32) {
        (self.tier(), self.priority)
    }

    /// Build a seeded tree from the template's own factory, if it has one.
    pub fn build_tree(&self, unit: UnitId, seed: u64) -> Option<Tree> {
        self.factory
            .as_ref()
            .map(|factory| self.instantiate(factory, unit, seed))
    }

    pub(crate) fn instantiate(&self, factory: &TreeFactory, unit: UnitId, seed: u64) -> Tree {
        Tree::with_seed(self.tree_type.clone(), factory(unit), seed)
    }
}

impl fmt::Debug for TreeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeTemplate")
            .field("id", &self.id)
            .field("tree_type", &self.tree_type)
            .field("faction", &self.faction)
            .field("unit_type", &self.unit_type)
            .field("priority", &self.priority)
            .field("defaults", &self.defaults)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}
