//! The DSL expression node
//!
//! A [`Dsl`] is a shared handle to one node of an expression graph. Cloning
//! the handle does not copy the node; use [`Dsl::clone_deep`] for that.
//!
//! Links:
//! - `params` are owned by their function node, and point back through a weak
//!   `parent` link;
//! - `next` owns the following call of a `.`-chain, which points back through
//!   a weak `prev` link.
//!
//! Every mutation that adds a link refuses to create a cycle, so walking
//! `parent`/`prev` upwards or `next` downwards always terminates.

use super::issue::Issue;
use super::kind::{Family, Kind};
use crate::entity::EntityRef;
use crate::error::{DslError, DslResult};
use crate::lexer::{quote_json, FUNCTION_PREFIX};
use serde::{Serialize, Serializer};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Handle to a node of a DSL expression graph.
#[derive(Clone)]
pub struct Dsl {
    inner: Rc<DslInner>,
}

struct DslInner {
    id: Uuid,
    kind: Cell<Kind>,
    name: RefCell<String>,
    params: RefCell<Vec<Dsl>>,
    parent: RefCell<Weak<DslInner>>,
    prev: RefCell<Weak<DslInner>>,
    next: RefCell<Option<Dsl>>,
    entity: RefCell<Option<EntityRef>>,
    relationships: RefCell<Vec<EntityRef>>,
    issues: RefCell<Vec<Issue>>,
    visiting: Cell<bool>,
}

// Long chains would overflow the stack if dropped link by link.
impl Drop for DslInner {
    fn drop(&mut self) {
        let mut next = self.next.get_mut().take();
        while let Some(node) = next {
            next = match Rc::try_unwrap(node.inner) {
                Ok(mut inner) => inner.next.get_mut().take(),
                Err(_) => None,
            };
        }
    }
}

/// Marks a node as visited until dropped.
struct VisitGuard(Rc<DslInner>);

impl Drop for VisitGuard {
    fn drop(&mut self) {
        self.0.visiting.set(false);
    }
}

impl Default for Dsl {
    fn default() -> Self {
        Self::unnamed(Kind::default())
    }
}

impl Dsl {
    // ========================================================================
    // Construction
    // ========================================================================

    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self::build(kind, Some(name.into()))
    }

    /// A node whose name defaults to its generated id.
    pub fn unnamed(kind: Kind) -> Self {
        Self::build(kind, None)
    }

    /// An `Entity` node referring to `entity`.
    pub fn entity(entity: EntityRef) -> Self {
        let dsl = Self::new(Kind::Entity, entity.id());
        *dsl.inner.entity.borrow_mut() = Some(entity);
        dsl
    }

    fn build(kind: Kind, name: Option<String>) -> Self {
        let id = Uuid::now_v7();
        let name = name.unwrap_or_else(|| id.to_string());
        Self {
            inner: Rc::new(DslInner {
                id,
                kind: Cell::new(kind),
                name: RefCell::new(name),
                params: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                prev: RefCell::new(Weak::new()),
                next: RefCell::new(None),
                entity: RefCell::new(None),
                relationships: RefCell::new(Vec::new()),
                issues: RefCell::new(Vec::new()),
                visiting: Cell::new(false),
            }),
        }
    }

    fn upgrade(link: &RefCell<Weak<DslInner>>) -> Option<Dsl> {
        link.borrow().upgrade().map(|inner| Dsl { inner })
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Generated unique id of this node.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// True if both handles point to the same node.
    pub fn ptr_eq(&self, other: &Dsl) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn kind(&self) -> Kind {
        self.inner.kind.get()
    }

    pub fn set_kind(&self, kind: Kind) {
        self.inner.kind.set(kind);
    }

    pub fn name(&self) -> String {
        self.inner.name.borrow().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.borrow_mut() = name.into();
    }

    /// The referenced entity, for `Entity` nodes.
    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.inner.entity.borrow().clone()
    }

    /// Refer to `entity`; the node becomes an `Entity` node.
    pub fn set_ref(&self, entity: EntityRef) {
        *self.inner.entity.borrow_mut() = Some(entity);
        self.set_kind(Kind::Entity);
    }

    pub fn has_ref(&self) -> bool {
        self.inner.entity.borrow().is_some()
    }

    pub fn relationships(&self) -> Vec<EntityRef> {
        self.inner.relationships.borrow().clone()
    }

    pub fn set_relationships(&self, relationships: Vec<EntityRef>) {
        *self.inner.relationships.borrow_mut() = relationships;
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.inner.issues.borrow().clone()
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        *self.inner.issues.borrow_mut() = issues;
    }

    pub fn push_issue(&self, issue: Issue) {
        self.inner.issues.borrow_mut().push(issue);
    }

    pub fn has_issues(&self) -> bool {
        !self.inner.issues.borrow().is_empty()
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub fn params(&self) -> Vec<Dsl> {
        self.inner.params.borrow().clone()
    }

    pub fn param_at(&self, index: usize) -> Option<Dsl> {
        self.inner.params.borrow().get(index).cloned()
    }

    pub fn last_param(&self) -> Option<Dsl> {
        self.inner.params.borrow().last().cloned()
    }

    pub fn param_count(&self) -> usize {
        self.inner.params.borrow().len()
    }

    pub fn has_params(&self) -> bool {
        self.param_count() > 0
    }

    /// Append `param` and make `self` its parent. Returns `self` for chaining.
    ///
    /// A parameter belongs to one function only: if `param` is already a
    /// parameter elsewhere it is removed from there first.
    pub fn param(&self, param: Dsl) -> DslResult<Dsl> {
        if !self.kind().is_function() {
            return Err(DslError::Structure(format!(
                "Cannot push param to non-function... Dsl kind is: {}",
                self.kind()
            )));
        }
        if param.is_linked_above(self) {
            return Err(DslError::Structure(
                "Cannot push param ... param would contain itself".to_string(),
            ));
        }
        param.detach_from_parent();
        self.attach_param(param);
        Ok(self.clone())
    }

    /// Remove and return the last parameter, clearing its parent link.
    pub fn pop_param(&self) -> Option<Dsl> {
        let popped = self.inner.params.borrow_mut().pop()?;
        *popped.inner.parent.borrow_mut() = Weak::new();
        Some(popped)
    }

    /// Replace the parameter at `index`, returning the one it replaces.
    pub fn replace_param(&self, index: usize, param: Dsl) -> DslResult<Dsl> {
        if index >= self.param_count() {
            return Err(DslError::Structure(format!(
                "Cannot replace param {} ... function has {} params",
                index,
                self.param_count()
            )));
        }
        if param.parent().is_some_and(|p| p.ptr_eq(self)) {
            return Err(DslError::Structure(
                "Cannot replace param ... node is already a param of this function".to_string(),
            ));
        }
        self.param(param)?;
        let replaced = self.inner.params.borrow_mut().swap_remove(index);
        *replaced.inner.parent.borrow_mut() = Weak::new();
        Ok(replaced)
    }

    fn attach_param(&self, param: Dsl) {
        *param.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.params.borrow_mut().push(param);
    }

    /// Drop `self` from the params of its current parent, if any.
    fn detach_from_parent(&self) {
        if let Some(parent) = self.parent() {
            parent.inner.params.borrow_mut().retain(|p| !p.ptr_eq(self));
        }
    }

    /// Unlink `self` from the `next` slot of its current prev, if any.
    fn detach_from_prev(&self) {
        if let Some(prev) = self.prev() {
            let mut next = prev.inner.next.borrow_mut();
            if next.as_ref().is_some_and(|n| n.ptr_eq(self)) {
                *next = None;
            }
        }
    }

    // ========================================================================
    // Links
    // ========================================================================

    pub fn parent(&self) -> Option<Dsl> {
        Self::upgrade(&self.inner.parent)
    }

    /// Point the parent link at `parent` without adding `self` to its params.
    ///
    /// `self` leaves the params of its previous parent.
    pub fn set_parent(&self, parent: &Dsl) -> DslResult<()> {
        if self.parent().is_some_and(|p| p.ptr_eq(parent)) {
            return Ok(());
        }
        if self.is_linked_above(parent) {
            return Err(DslError::Structure(
                "Cannot add parent ... parent would be its own ancestor".to_string(),
            ));
        }
        self.detach_from_parent();
        *self.inner.parent.borrow_mut() = Rc::downgrade(&parent.inner);
        Ok(())
    }

    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    pub fn prev(&self) -> Option<Dsl> {
        Self::upgrade(&self.inner.prev)
    }

    /// Point the prev link at `prev` without changing `prev.next`.
    pub fn set_prev(&self, prev: &Dsl) -> DslResult<()> {
        if self.prev().is_some_and(|p| p.ptr_eq(prev)) {
            return Ok(());
        }
        if self.is_linked_above(prev) {
            return Err(DslError::Structure(
                "Cannot set prev ... prev would follow itself".to_string(),
            ));
        }
        self.detach_from_prev();
        *self.inner.prev.borrow_mut() = Rc::downgrade(&prev.inner);
        Ok(())
    }

    pub fn has_prev(&self) -> bool {
        self.prev().is_some()
    }

    pub fn next(&self) -> Option<Dsl> {
        self.inner.next.borrow().clone()
    }

    /// Make `next` the call following `self`, linking both directions.
    pub fn set_next(&self, next: Dsl) -> DslResult<()> {
        if self.next().is_some_and(|n| n.ptr_eq(&next)) {
            return Ok(());
        }
        if next.is_linked_above(self) {
            return Err(DslError::Structure(
                "Cannot set next ... next would precede itself".to_string(),
            ));
        }
        self.link_next(next);
        Ok(())
    }

    pub fn has_next(&self) -> bool {
        self.inner.next.borrow().is_some()
    }

    /// Append a freshly parsed `call` after `self`, the current end of a
    /// chain under construction.
    ///
    /// Only `call`'s own subtree is searched for `self`, so building a chain
    /// call by call stays linear.
    pub(crate) fn append_call(&self, call: Dsl) -> DslResult<()> {
        if call.holds(self) {
            return Err(DslError::Structure(
                "Cannot set next ... next would precede itself".to_string(),
            ));
        }
        self.link_next(call);
        Ok(())
    }

    fn link_next(&self, next: Dsl) {
        next.detach_from_prev();
        *next.inner.prev.borrow_mut() = Rc::downgrade(&self.inner);
        let replaced = self.inner.next.borrow_mut().replace(next);
        if let Some(old) = replaced {
            *old.inner.prev.borrow_mut() = Weak::new();
        }
    }

    /// True if `self` can be reached from `other` by following `parent` and
    /// `prev` links, or is `other` itself.
    fn is_linked_above(&self, other: &Dsl) -> bool {
        let mut pending = vec![other.clone()];
        while let Some(node) = pending.pop() {
            if node.ptr_eq(self) {
                return true;
            }
            pending.extend(node.parent());
            pending.extend(node.prev());
        }
        false
    }

    /// True if `other` is `self` or can be reached from it by following
    /// `params` and `next` links.
    fn holds(&self, other: &Dsl) -> bool {
        let mut pending = vec![self.clone()];
        while let Some(node) = pending.pop() {
            if node.ptr_eq(other) {
                return true;
            }
            pending.extend(node.next());
            pending.extend(node.params());
        }
        false
    }

    // ========================================================================
    // Method chain
    // ========================================================================

    /// The last call of the chain starting at `self`.
    pub fn last_method(&self) -> Dsl {
        let mut current = self.clone();
        while let Some(next) = current.next() {
            current = next;
        }
        current
    }

    /// Append `method` at the end of the chain and return it.
    pub fn chain(&self, method: Dsl) -> DslResult<Dsl> {
        if !method.kind().is_function() {
            return Err(DslError::Structure(
                "Cannot push method ... method must be a function".to_string(),
            ));
        }
        let last = self.last_method();
        last.set_next(method.clone())?;
        Ok(method)
    }

    /// Remove the last call of the chain, if it has a predecessor.
    pub fn pop_chained_method(&self) -> Option<Dsl> {
        let last = self.last_method();
        let prev = last.prev()?;
        prev.inner.next.borrow_mut().take();
        *last.inner.prev.borrow_mut() = Weak::new();
        Some(last)
    }

    /// The node owning the whole expression: follow `parent`, else `prev`.
    pub fn root(&self) -> Dsl {
        let mut current = self.clone();
        loop {
            let up = current.parent().or_else(|| current.prev());
            match up {
                Some(node) => current = node,
                None => return current,
            }
        }
    }

    // ========================================================================
    // Copy & compare
    // ========================================================================

    /// Copy this node, its parameters and the rest of its chain.
    ///
    /// The copy has no parent and no prev: it starts a new expression.
    pub fn clone_deep(&self) -> Dsl {
        let head = self.clone_node();
        let mut tail = head.clone();
        let mut source = self.next();
        while let Some(node) = source {
            let copy = node.clone_node();
            tail.link_next(copy.clone());
            tail = copy;
            source = node.next();
        }
        head
    }

    /// Copy of this node and its parameters, without chain links.
    fn clone_node(&self) -> Dsl {
        let clone = Dsl::new(self.kind(), self.name());
        *clone.inner.entity.borrow_mut() = self.entity_ref();
        clone.set_relationships(self.relationships());
        clone.set_issues(self.issues());
        for param in self.params() {
            clone.attach_param(param.clone_deep());
        }
        clone
    }

    /// Same kind and same generated expression.
    pub fn equals(&self, other: &Dsl) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match (self.to_expression(), other.to_expression()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    // ========================================================================
    // Generation
    // ========================================================================

    /// The full expression: `$brooklyn:` prefix and chained calls for
    /// functions, chained calls for references, the literal for constants.
    pub fn to_expression(&self) -> DslResult<String> {
        let mut out = self.generate()?;
        match self.kind().family() {
            Family::Function => {
                out.insert_str(0, FUNCTION_PREFIX);
                self.append_chain(&mut out)?;
            }
            Family::Reference => self.append_chain(&mut out)?,
            Family::Constant => {}
        }
        Ok(out)
    }

    fn append_chain(&self, out: &mut String) -> DslResult<()> {
        let mut current = self.next();
        while let Some(node) = current {
            out.push('.');
            out.push_str(&node.generate()?);
            current = node.next();
        }
        Ok(())
    }

    /// This node alone: `name(params)`, `entity("id")` or a literal.
    ///
    /// Ports are quoted only when they sit inside an expression; a standalone
    /// `8080+` stays bare.
    pub fn generate(&self) -> DslResult<String> {
        let kind = self.kind();
        if kind.is_function() {
            return Ok(format!("{}({})", self.inner.name.borrow(), self.generate_params()?));
        }
        match kind {
            Kind::Entity => match self.entity_ref() {
                Some(entity) => Ok(format!("entity({})", quote_json(entity.id()))),
                None => Err(DslError::Structure(
                    "Cannot generate entity reference ... no entity set".to_string(),
                )),
            },
            Kind::String => Ok(quote_json(&self.inner.name.borrow())),
            Kind::Port if self.has_parent() || self.has_next() || self.has_prev() => {
                Ok(quote_json(&self.inner.name.borrow()))
            }
            _ => Ok(self.name()),
        }
    }

    /// Parameters as comma-separated expressions.
    pub fn generate_params(&self) -> DslResult<String> {
        let params = self
            .params()
            .iter()
            .map(Dsl::to_expression)
            .collect::<DslResult<Vec<_>>>()?;
        Ok(params.join(", "))
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Depth-first visit: the node, its params, then prev, then next.
    ///
    /// Nodes stay marked until the traversal ends, so each node is seen once
    /// and a nested traversal started by `visitor` skips them.
    pub fn visit<F: FnMut(&Dsl)>(&self, visitor: &mut F) {
        let mut entered = Vec::new();
        let mut pending = vec![self.clone()];
        while let Some(node) = pending.pop() {
            let Some(guard) = node.enter() else {
                continue;
            };
            entered.push(guard);
            visitor(&node);
            pending.extend(node.next());
            pending.extend(node.prev());
            pending.extend(node.params().into_iter().rev());
        }
    }

    fn enter(&self) -> Option<VisitGuard> {
        if self.inner.visiting.replace(true) {
            None
        } else {
            Some(VisitGuard(self.inner.clone()))
        }
    }

    /// Issues of every node reachable through [`visit`](Self::visit).
    pub fn all_issues(&self) -> Vec<Issue> {
        let mut all = Vec::new();
        self.visit(&mut |dsl: &Dsl| all.extend(dsl.issues()));
        all
    }
}

impl Dsl {
    fn debug_fields(&self, s: &mut fmt::DebugStruct<'_, '_>) {
        s.field("kind", &self.kind());
        s.field("name", &*self.inner.name.borrow());
        if let Some(entity) = self.entity_ref() {
            s.field("ref", &entity.id());
        }
        if self.has_params() {
            s.field("params", &*self.inner.params.borrow());
        }
    }
}

/// One call of a chain, printed without the calls after it.
struct ChainLink(Dsl);

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Dsl");
        self.0.debug_fields(&mut s);
        s.finish()
    }
}

impl fmt::Debug for Dsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Dsl");
        self.debug_fields(&mut s);
        let mut chain = Vec::new();
        let mut current = self.next();
        while let Some(node) = current {
            current = node.next();
            chain.push(ChainLink(node));
        }
        if !chain.is_empty() {
            s.field("chain", &chain);
        }
        s.finish()
    }
}

impl Serialize for Dsl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self
            .to_expression()
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

// ============================================================================
// TESTS
// ============================================================================
