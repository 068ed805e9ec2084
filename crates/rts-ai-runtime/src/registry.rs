use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use rts_ai_bt::leaves::idle_tree;
use rts_ai_bt::BtNode;
use rts_ai_core::{derive_seed, AgentRef, FactionId, UnitId};

use crate::config::{RuntimeConfig, WrapperConfig};
use crate::error::RegistryError;
use crate::template::{TemplateSpec, TreeFactory, TreeTemplate, DEFAULT_TEMPLATE_ID};
use crate::wrapper::AgentWrapper;

/// Tree type of the built-in fallback template.
pub const IDLE_TREE_TYPE: &str = "idle";

/// Stream id for tree seeds derived when the caller does not pass one.
const TREE_STREAM: u64 = 0x5452_4545;

/// Why a wrapper was built from the `default` template instead of the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnknownTemplate { requested: String },
    UnknownTreeType { template: String, tree_type: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownTemplate { requested } => {
                write!(f, "unknown template `{requested}`; using `{DEFAULT_TEMPLATE_ID}`")
            }
            Diagnostic::UnknownTreeType {
                template,
                tree_type,
            } => write!(
                f,
                "template `{template}` names unknown tree type `{tree_type}`; using `{DEFAULT_TEMPLATE_ID}`"
            ),
        }
    }
}

/// A freshly built wrapper, plus the reason it fell back to the default template, if it did.
#[derive(Debug)]
pub struct Spawned {
    pub wrapper: AgentWrapper,
    pub diagnostic: Option<Diagnostic>,
}

/// Indexes templates by id, faction and unit type, and turns the best match into wrappers.
///
/// All mutation goes through `&mut self`; factories are `Rc`, so a registry stays on the
/// simulation thread.
pub struct Registry {
    templates: BTreeMap<String, TreeTemplate>,
    by_faction: BTreeMap<FactionId, BTreeSet<String>>,
    by_unit_type: BTreeMap<String, BTreeSet<String>>,
    tree_types: BTreeMap<String, TreeFactory>,
    wrapper_config: WrapperConfig,
    global_seed: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding only the `idle` tree type and the `default` template.
    pub fn new() -> Self {
        let mut registry = Self {
            templates: BTreeMap::new(),
            by_faction: BTreeMap::new(),
            by_unit_type: BTreeMap::new(),
            tree_types: BTreeMap::new(),
            wrapper_config: WrapperConfig::default(),
            global_seed: 0,
        };
        registry.register_tree_type(IDLE_TREE_TYPE, |_unit| idle_tree());
        registry.register(TreeTemplate::new(DEFAULT_TEMPLATE_ID, IDLE_TREE_TYPE));
        registry
    }

    /// Registers `config.templates` and adopts its wrapper settings. Tree types referenced by the
    /// templates are resolved lazily, so they may be registered afterwards.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let mut registry = Self::new();
        registry.wrapper_config = config.wrapper.clone();
        for spec in &config.templates {
            registry.register_spec(spec.clone());
        }
        registry
    }

    pub fn set_global_seed(&mut self, seed: u64) {
        self.global_seed = seed;
    }

    pub fn global_seed(&self) -> u64 {
        self.global_seed
    }

    pub fn wrapper_config(&self) -> &WrapperConfig {
        &self.wrapper_config
    }

    pub fn set_wrapper_config(&mut self, config: WrapperConfig) {
        self.wrapper_config = config;
    }

    pub fn register_tree_type(
        &mut self,
        tree_type: impl Into<String>,
        factory: impl Fn(UnitId) -> Box<dyn BtNode> + 'static,
    ) -> Option<TreeFactory> {
        let tree_type = tree_type.into();
        tracing::info!(tree_type = %tree_type, "tree type registered");
        self.tree_types.insert(tree_type, Rc::new(factory))
    }

    pub fn has_tree_type(&self, tree_type: &str) -> bool {
        self.tree_types.contains_key(tree_type)
    }

    /// Add or replace a template. Returns the template previously registered under the same id.
    pub fn register(&mut self, template: TreeTemplate) -> Option<TreeTemplate> {
        let previous = self.templates.remove(template.id());
        if let Some(old) = &previous {
            self.unindex(old);
        }
        self.index(&template);
        tracing::info!(
            template = %template.id(),
            tree_type = %template.tree_type(),
            faction = template.faction(),
            unit_type = %template.unit_type(),
            specificity = template.specificity(),
            replaced = previous.is_some(),
            "template registered"
        );
        self.templates.insert(template.id().to_string(), template);
        previous
    }

    pub fn register_spec(&mut self, spec: TemplateSpec) -> Option<TreeTemplate> {
        self.register(TreeTemplate::from_spec(spec))
    }

    /// Remove a template. The `default` template cannot be removed, only replaced.
    pub fn unregister(&mut self, id: &str) -> Result<Option<TreeTemplate>, RegistryError> {
        if id == DEFAULT_TEMPLATE_ID {
            return Err(RegistryError::DefaultTemplateRequired);
        }
        let removed = self.templates.remove(id);
        if let Some(template) = &removed {
            self.unindex(template);
            tracing::info!(template = %id, "template unregistered");
        }
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<&TreeTemplate> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> impl Iterator<Item = &TreeTemplate> {
        self.templates.values()
    }

    /// Ids of templates registered for `faction` (`0` lists the faction-generic ones).
    pub fn templates_for_faction(&self, faction: FactionId) -> impl Iterator<Item = &str> {
        self.by_faction
            .get(&faction)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Ids of templates registered for `unit_type` (`""` lists the type-generic ones).
    pub fn templates_for_unit_type(&self, unit_type: &str) -> impl Iterator<Item = &str> {
        self.by_unit_type
            .get(unit_type)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// The applicable template with the best [`TreeTemplate::rank`]; among equals the smallest id.
    /// Falls back to `default` when nothing else applies.
    pub fn find_best_template(
        &self,
        faction: FactionId,
        unit_type: &str,
    ) -> Result<&TreeTemplate, RegistryError> {
        let mut candidates: BTreeSet<&str> = self.templates_for_faction(faction).collect();
        if faction != 0 {
            candidates.extend(self.templates_for_faction(0));
        }

        let mut best: Option<&TreeTemplate> = None;
        for template in candidates
            .into_iter()
            .filter(|id| *id != DEFAULT_TEMPLATE_ID)
            .filter_map(|id| self.templates.get(id))
            .filter(|t| t.matches(faction, unit_type))
        {
            if best.map_or(true, |b| template.rank() > b.rank()) {
                best = Some(template);
            }
        }

        match best {
            Some(template) => Ok(template),
            None => {
                tracing::debug!(faction, unit_type, "no specific template; using default");
                self.default_template()
            }
        }
    }

    pub fn default_template(&self) -> Result<&TreeTemplate, RegistryError> {
        self.templates
            .get(DEFAULT_TEMPLATE_ID)
            .ok_or(RegistryError::MissingDefault)
    }

    /// Build a wrapper from the best template for `(faction, unit_type)`.
    ///
    /// Without an explicit `seed` the tree seed is derived from the registry's global seed and
    /// the unit id.
    pub fn create_wrapper(
        &self,
        unit: UnitId,
        faction: FactionId,
        unit_type: &str,
        seed: Option<u64>,
    ) -> Result<Spawned, RegistryError> {
        let template = self.find_best_template(faction, unit_type)?;
        self.spawn(template, AgentRef::new(unit, faction), unit_type, seed)
    }

    /// Build a wrapper from a named template, falling back to `default` if it is unknown.
    pub fn create_wrapper_for_template(
        &self,
        template_id: &str,
        unit: UnitId,
        faction: FactionId,
        unit_type: &str,
        seed: Option<u64>,
    ) -> Result<Spawned, RegistryError> {
        let agent = AgentRef::new(unit, faction);
        match self.templates.get(template_id) {
            Some(template) => self.spawn(template, agent, unit_type, seed),
            None => {
                let diagnostic = Diagnostic::UnknownTemplate {
                    requested: template_id.to_string(),
                };
                tracing::warn!(unit, %diagnostic, "template fallback");
                let mut spawned = self.spawn(self.default_template()?, agent, unit_type, seed)?;
                spawned.diagnostic = Some(diagnostic);
                Ok(spawned)
            }
        }
    }

    fn spawn(
        &self,
        template: &TreeTemplate,
        agent: AgentRef,
        unit_type: &str,
        seed: Option<u64>,
    ) -> Result<Spawned, RegistryError> {
        let seed = seed.unwrap_or_else(|| derive_seed(self.global_seed, agent.unit, TREE_STREAM));

        let (template, factory, diagnostic) = match self.factory_for(template) {
            Some(factory) => (template, factory, None),
            None => {
                let diagnostic = Diagnostic::UnknownTreeType {
                    template: template.id().to_string(),
                    tree_type: template.tree_type().to_string(),
                };
                tracing::warn!(unit = agent.unit, %diagnostic, "template fallback");
                let default = self.default_template()?;
                let factory = self.factory_for(default).ok_or_else(|| {
                    RegistryError::UnbuildableDefault {
                        tree_type: default.tree_type().to_string(),
                    }
                })?;
                (default, factory, Some(diagnostic))
            }
        };

        let tree = template.instantiate(&factory, agent.unit, seed);
        let wrapper = AgentWrapper::new(agent, unit_type, tree)
            .with_template_id(template.id())
            .with_config(self.wrapper_config.clone())
            .with_defaults(template.defaults());
        tracing::debug!(
            unit = agent.unit,
            faction = agent.faction,
            template = %template.id(),
            seed,
            "wrapper created"
        );
        Ok(Spawned {
            wrapper,
            diagnostic,
        })
    }

    fn factory_for(&self, template: &TreeTemplate) -> Option<TreeFactory> {
        template
            .factory()
            .or_else(|| self.tree_types.get(template.tree_type()))
            .cloned()
    }

    fn index(&mut self, template: &TreeTemplate) {
        self.by_faction
            .entry(template.faction())
            .or_default()
            .insert(template.id().to_string());
        self.by_unit_type
            .entry(template.unit_type().to_string())
            .or_default()
            .insert(template.id().to_string());
    }

    fn unindex(&mut self, template: &TreeTemplate) {
        if let Some(ids) = self.by_faction.get_mut(&template.faction()) {
            ids.remove(template.id());
            if ids.is_empty() {
                self.by_faction.remove(&template.faction());
            }
        }
        if let Some(ids) = self.by_unit_type.get_mut(template.unit_type()) {
            ids.remove(template.id());
            if ids.is_empty() {
                self.by_unit_type.remove(template.unit_type());
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("templates", &self.templates)
            .field("tree_types", &self.tree_types.keys().collect::<Vec<_>>())
            .field("wrapper_config", &self.wrapper_config)
            .field("global_seed", &self.global_seed)
            .finish()
    }
}
