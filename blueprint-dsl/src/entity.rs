//! Host entity-tree contract and a minimal in-memory tree
//!
//! The DSL engine only needs three things from the host's entities: an
//! external id, a parent link and the children. [`EntityNode`] is a small tree
//! implementing that contract, used by the tracing CLI, fixtures and tests.

use crate::error::{DslError, DslResult};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

// ============================================================================
// ENTITY CONTRACT
// ============================================================================

/// An entity of the host blueprint tree.
pub trait Entity: fmt::Debug {
    /// External id, as written in the blueprint.
    fn id(&self) -> &str;

    fn parent(&self) -> Option<EntityRef>;

    fn children(&self) -> Vec<EntityRef>;
}

/// Shared handle to a host entity. Entities are compared by identity.
pub type EntityRef = Rc<dyn Entity>;

/// Identity comparison for entity handles.
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Walk parent links up to the top of the tree.
pub fn root_of(entity: &EntityRef) -> EntityRef {
    let mut current = entity.clone();
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}

/// Append `entity` to `entities` unless it is already there.
pub(crate) fn push_unique(entities: &mut Vec<EntityRef>, entity: EntityRef) {
    if !entities.iter().any(|e| same_entity(e, &entity)) {
        entities.push(entity);
    }
}

/// Looks an entity up by its external id.
pub trait EntityResolver {
    fn resolve(&self, id: &str) -> Option<EntityRef>;
}

impl<F> EntityResolver for F
where
    F: Fn(&str) -> Option<EntityRef>,
{
    fn resolve(&self, id: &str) -> Option<EntityRef> {
        self(id)
    }
}

/// Depth-first search by id through `root` and its descendants.
#[derive(Debug, Clone)]
pub struct DescendantLookup {
    root: EntityRef,
}

impl DescendantLookup {
    pub fn new(root: EntityRef) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &EntityRef {
        &self.root
    }
}

impl EntityResolver for DescendantLookup {
    fn resolve(&self, id: &str) -> Option<EntityRef> {
        find_in_descendants(&self.root, id)
    }
}

fn find_in_descendants(entity: &EntityRef, id: &str) -> Option<EntityRef> {
    if entity.id() == id {
        return Some(entity.clone());
    }
    entity
        .children()
        .iter()
        .find_map(|child| find_in_descendants(child, id))
}

// ============================================================================
// IN-MEMORY ENTITY TREE
// ============================================================================

/// A blueprint entity with an id, an optional type, config and children.
#[derive(Debug)]
pub struct EntityNode {
    id: String,
    entity_type: Option<String>,
    parent: RefCell<Weak<EntityNode>>,
    children: RefCell<Vec<Rc<EntityNode>>>,
    config: RefCell<BTreeMap<String, serde_json::Value>>,
}

impl EntityNode {
    pub fn new(id: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: id.into(),
            entity_type: None,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            config: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn with_type(id: impl Into<String>, entity_type: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: id.into(),
            entity_type: Some(entity_type.into()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            config: RefCell::new(BTreeMap::new()),
        })
    }

    /// Attach `child` under `self`, detaching it from any previous parent.
    pub fn add_child(self: &Rc<Self>, child: Rc<EntityNode>) -> Rc<EntityNode> {
        if let Some(previous) = child.parent.borrow().upgrade() {
            previous
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(c, &child));
        }
        *child.parent.borrow_mut() = Rc::downgrade(self);
        self.children.borrow_mut().push(child.clone());
        child
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn parent_node(&self) -> Option<Rc<EntityNode>> {
        self.parent.borrow().upgrade()
    }

    pub fn child_nodes(&self) -> Vec<Rc<EntityNode>> {
        self.children.borrow().clone()
    }

    pub fn set_config(&self, key: impl Into<String>, value: serde_json::Value) {
        self.config.borrow_mut().insert(key.into(), value);
    }

    pub fn config(&self) -> BTreeMap<String, serde_json::Value> {
        self.config.borrow().clone()
    }

    /// Find `id` in this node or its descendants.
    pub fn find(self: &Rc<Self>, id: &str) -> Option<Rc<EntityNode>> {
        if self.id == id {
            return Some(self.clone());
        }
        self.children
            .borrow()
            .iter()
            .find_map(|child| child.find(id))
    }

    /// This node and all its descendants, depth first.
    pub fn descendants(self: &Rc<Self>) -> Vec<Rc<EntityNode>> {
        let mut out = vec![self.clone()];
        for child in self.children.borrow().iter() {
            out.extend(child.descendants());
        }
        out
    }

    /// Upcast to the entity handle the DSL engine works with.
    pub fn as_entity(self: &Rc<Self>) -> EntityRef {
        self.clone()
    }

    /// Build a tree from a blueprint in YAML.
    ///
    /// The top-level document becomes the root; `services` and
    /// `brooklyn.children` become children. Entities without an `id` get a
    /// generated one.
    pub fn from_yaml_str(source: &str) -> DslResult<Rc<Self>> {
        let spec: BlueprintSpec = serde_yaml::from_str(source)
            .map_err(|e| DslError::UnsupportedInput(format!("blueprint YAML: {}", e)))?;
        Ok(spec.build())
    }
}

impl Entity for EntityNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<EntityRef> {
        self.parent_node().map(|p| p as EntityRef)
    }

    fn children(&self) -> Vec<EntityRef> {
        self.children
            .borrow()
            .iter()
            .map(|c| c.clone() as EntityRef)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct BlueprintSpec {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    entity_type: Option<String>,
    #[serde(default, rename = "brooklyn.config")]
    config: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    services: Vec<BlueprintSpec>,
    #[serde(default, rename = "brooklyn.children")]
    children: Vec<BlueprintSpec>,
}

impl BlueprintSpec {
    fn build(self) -> Rc<EntityNode> {
        let id = self.id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let node = match self.entity_type {
            Some(entity_type) => EntityNode::with_type(id, entity_type),
            None => EntityNode::new(id),
        };
        for (key, value) in self.config {
            node.set_config(key, value);
        }
        for child in self.services.into_iter().chain(self.children) {
            node.add_child(child.build());
        }
        node
    }
}
