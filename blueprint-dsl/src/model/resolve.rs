//! References and entity resolution
//!
//! An expression addresses entities in two ways: through chains of target
//! calls such as `parent().sibling("db")`, resolved relative to a base
//! entity, or through `Entity` nodes that already hold an entity.

use super::issue::Issue;
use super::kind::{Kind, Target};
use super::node::Dsl;
use crate::entity::{push_unique, root_of, same_entity, EntityRef, EntityResolver};
use tracing::debug;

/// Something an expression refers to.
#[derive(Debug, Clone)]
pub enum Reference {
    /// First target call of an addressing chain
    Target(Dsl),
    /// An entity held by an `Entity` node
    Entity(EntityRef),
}

impl Reference {
    fn same_as(&self, other: &Reference) -> bool {
        match (self, other) {
            (Reference::Target(a), Reference::Target(b)) => a.ptr_eq(b),
            (Reference::Entity(a), Reference::Entity(b)) => same_entity(a, b),
            _ => false,
        }
    }

    /// The entity this reference designates, relative to `base`.
    pub fn resolve<R>(&self, base: &EntityRef, resolver: &R) -> Option<EntityRef>
    where
        R: EntityResolver + ?Sized,
    {
        match self {
            Reference::Target(target) => target.resolve_entity(base, resolver),
            Reference::Entity(entity) => Some(entity.clone()),
        }
    }
}

impl Dsl {
    /// Every reference in the expression, de-duplicated, in visit order.
    ///
    /// Every target counts, except one chained directly after an `Entity`
    /// node: that node already names the entity.
    pub fn references(&self) -> Vec<Reference> {
        let mut references: Vec<Reference> = Vec::new();
        self.visit(&mut |dsl: &Dsl| {
            let reference = match dsl.kind() {
                Kind::Target => {
                    if dsl.prev().is_some_and(|p| p.kind() == Kind::Entity) {
                        return;
                    }
                    Reference::Target(dsl.clone())
                }
                Kind::Entity => match dsl.entity_ref() {
                    Some(entity) => Reference::Entity(entity),
                    None => return,
                },
                _ => return,
            };
            if !references.iter().any(|r| r.same_as(&reference)) {
                references.push(reference);
            }
        });
        references
    }

    /// Entities referenced by the expression, seen from `base`.
    ///
    /// Targets that do not resolve, or resolve to `base` itself, are left out.
    pub fn relationships_for<R>(&self, base: &EntityRef, resolver: &R) -> Vec<EntityRef>
    where
        R: EntityResolver + ?Sized,
    {
        let mut relationships = Vec::new();
        for reference in self.references() {
            match reference {
                Reference::Entity(entity) => push_unique(&mut relationships, entity),
                Reference::Target(target) => {
                    if let Some(entity) = target.resolve_entity(base, resolver) {
                        if !same_entity(&entity, base) {
                            push_unique(&mut relationships, entity);
                        }
                    }
                }
            }
        }
        relationships
    }

    /// Walk the target chain starting at `self`, moving a cursor from `base`.
    ///
    /// Problems are recorded as issues on `self`. `parent`, `root` and
    /// `scopeRoot` leave an empty cursor empty, while targets taking an id
    /// always look it up through `resolver`.
    pub fn resolve_entity<R>(&self, base: &EntityRef, resolver: &R) -> Option<EntityRef>
    where
        R: EntityResolver + ?Sized,
    {
        let mut cursor = Some(base.clone());
        let mut step = Some(self.clone());

        while let Some(dsl) = step.filter(|d| d.kind() == Kind::Target) {
            match Target::from_name(&dsl.name()) {
                Some(target) if target.takes_id() => {
                    cursor = match dsl.last_param() {
                        Some(param) => {
                            let id = param.name();
                            let resolved = resolver.resolve(&id);
                            if resolved.is_none() {
                                debug!(function = %target, id = %id, "Reference did not resolve");
                                self.push_issue(Issue::unknown_reference(&id));
                            }
                            resolved
                        }
                        None => {
                            self.push_issue(Issue::missing_argument(target.as_str()));
                            None
                        }
                    };
                }
                Some(Target::Parent) => {
                    cursor = cursor.and_then(|current| {
                        let parent = current.parent();
                        if parent.is_none() {
                            self.push_issue(Issue::missing_parent(current.id()));
                        }
                        parent
                    });
                }
                Some(Target::Root) | Some(Target::ScopeRoot) => {
                    cursor = cursor.as_ref().map(root_of);
                }
                Some(_) | None => {}
            }
            step = dsl.next();
        }
        cursor
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityNode;
    use crate::model::IssueKind;
    use std::rc::Rc;

    struct Tree {
        app: Rc<EntityNode>,
        web: EntityRef,
        db: EntityRef,
        worker: EntityRef,
    }

    fn tree() -> Tree {
        let app = EntityNode::new("app");
        let web = app.add_child(EntityNode::new("web"));
        let db = app.add_child(EntityNode::new("db"));
        let worker = web.add_child(EntityNode::new("worker"));
        Tree {
            web: web.as_entity(),
            db: db.as_entity(),
            worker: worker.as_entity(),
            app,
        }
    }

    fn lookup(tree: &Tree) -> impl Fn(&str) -> Option<EntityRef> + '_ {
        move |id: &str| tree.app.find(id).map(|n| n.as_entity())
    }

    fn target(name: &str, args: &[&str]) -> Dsl {
        let dsl = Dsl::new(Kind::Target, name);
        for arg in args {
            dsl.param(Dsl::new(Kind::String, *arg)).unwrap();
        }
        dsl
    }

    fn method(name: &str, key: &str) -> Dsl {
        Dsl::new(Kind::Method, name)
            .param(Dsl::new(Kind::String, key))
            .unwrap()
    }

    #[test]
    fn test_references_take_every_target_in_chain() {
        let chain = target("parent", &[]);
        let sibling = target("sibling", &["db"]);
        chain.chain(sibling.clone()).unwrap();
        chain.chain(method("attributeWhenReady", "host")).unwrap();
        let refs = chain.references();
        assert_eq!(refs.len(), 2);
        assert!(matches!(&refs[0], Reference::Target(t) if t.ptr_eq(&chain)));
        assert!(matches!(&refs[1], Reference::Target(t) if t.ptr_eq(&sibling)));
    }

    #[test]
    fn test_target_after_entity_is_not_a_reference() {
        let t = tree();
        let node = Dsl::entity(t.web.clone());
        node.chain(target("child", &["worker"])).unwrap();
        let refs = node.references();
        assert_eq!(refs.len(), 1);
        assert!(matches!(&refs[0], Reference::Entity(e) if same_entity(e, &t.web)));
    }

    #[test]
    fn test_parent_of_parent_relates_both_ancestors() {
        let t = tree();
        let resolver = lookup(&t);
        let chain = target("parent", &[]);
        chain.chain(target("parent", &[])).unwrap();
        assert_eq!(chain.references().len(), 2);
        let ids: Vec<String> = chain
            .relationships_for(&t.worker, &resolver)
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, ["app", "web"]);
    }

    #[test]
    fn test_references_across_params() {
        let format = Dsl::new(Kind::Utility, "formatString");
        format.param(Dsl::new(Kind::String, "%s:%s")).unwrap();
        for id in ["db", "nginx"] {
            let t = target("component", &[id]);
            t.chain(method("attributeWhenReady", "host")).unwrap();
            format.param(t).unwrap();
        }
        assert_eq!(format.references().len(), 2);
    }

    #[test]
    fn test_entity_references_are_deduplicated() {
        let t = tree();
        let format = Dsl::new(Kind::Utility, "formatString");
        format.param(Dsl::entity(t.db.clone())).unwrap();
        format.param(Dsl::entity(t.db.clone())).unwrap();
        let refs = format.references();
        assert_eq!(refs.len(), 1);
        assert!(matches!(&refs[0], Reference::Entity(e) if same_entity(e, &t.db)));
    }

    #[test]
    fn test_resolve_parent_and_sibling() {
        let t = tree();
        let resolver = lookup(&t);
        let chain = target("parent", &[]);
        chain.chain(target("sibling", &["db"])).unwrap();
        let resolved = chain.resolve_entity(&t.worker, &resolver).unwrap();
        assert!(same_entity(&resolved, &t.db));
        assert!(!chain.has_issues());
    }

    #[test]
    fn test_resolve_root() {
        let t = tree();
        let resolver = lookup(&t);
        for name in ["root", "scopeRoot"] {
            let resolved = target(name, &[]).resolve_entity(&t.worker, &resolver).unwrap();
            assert_eq!(resolved.id(), "app");
        }
    }

    #[test]
    fn test_component_uses_last_param() {
        let t = tree();
        let resolver = lookup(&t);
        let dsl = target("component", &["scope", "web"]);
        let resolved = dsl.resolve_entity(&t.db, &resolver).unwrap();
        assert!(same_entity(&resolved, &t.web));
    }

    #[test]
    fn test_missing_parent_records_issue() {
        let t = tree();
        let resolver = lookup(&t);
        let app = t.app.as_entity();
        let chain = target("parent", &[]);
        chain.chain(target("parent", &[])).unwrap();
        assert!(chain.resolve_entity(&app, &resolver).is_none());
        let issues = chain.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].message,
            "The entity with ID <code>app</code> does not have a parent"
        );
    }

    #[test]
    fn test_unknown_reference_records_issue() {
        let t = tree();
        let resolver = lookup(&t);
        let dsl = target("component", &["nope"]);
        assert!(dsl.resolve_entity(&t.web, &resolver).is_none());
        assert_eq!(dsl.issues()[0].kind, IssueKind::UnknownReference);
        assert_eq!(
            dsl.issues()[0].message,
            "The reference ID <code>nope</code> does not exist"
        );
    }

    #[test]
    fn test_id_target_without_argument_records_issue() {
        let t = tree();
        let resolver = lookup(&t);
        let dsl = target("sibling", &[]);
        assert!(dsl.resolve_entity(&t.web, &resolver).is_none());
        assert_eq!(dsl.issues()[0].kind, IssueKind::MissingArgument);
    }

    #[test]
    fn test_id_target_recovers_lost_cursor() {
        let t = tree();
        let resolver = lookup(&t);
        let chain = target("component", &["nope"]);
        chain.chain(target("child", &["worker"])).unwrap();
        chain.chain(target("root", &[])).unwrap();
        let resolved = chain.resolve_entity(&t.web, &resolver).unwrap();
        assert_eq!(resolved.id(), "app");
        assert_eq!(chain.issues().len(), 1);
    }

    #[test]
    fn test_parent_of_lost_cursor_stays_lost() {
        let t = tree();
        let resolver = lookup(&t);
        let chain = target("component", &["nope"]);
        chain.chain(target("parent", &[])).unwrap();
        chain.chain(target("scopeRoot", &[])).unwrap();
        assert!(chain.resolve_entity(&t.web, &resolver).is_none());
        assert_eq!(chain.issues().len(), 1);
        assert_eq!(chain.issues()[0].kind, IssueKind::UnknownReference);
    }

    #[test]
    fn test_resolution_stops_at_first_non_target() {
        let t = tree();
        let resolver = lookup(&t);
        let chain = target("parent", &[]);
        chain.chain(method("attributeWhenReady", "host")).unwrap();
        chain.chain(target("parent", &[])).unwrap();
        let resolved = chain.resolve_entity(&t.worker, &resolver).unwrap();
        assert!(same_entity(&resolved, &t.web));
    }

    #[test]
    fn test_relationships_exclude_base() {
        let t = tree();
        let resolver = lookup(&t);
        let dsl = target("self", &[]);
        dsl.chain(method("attributeWhenReady", "http.port")).unwrap();
        assert!(dsl.relationships_for(&t.web, &resolver).is_empty());

        let by_id = target("component", &["web"]);
        assert!(by_id.relationships_for(&t.web, &resolver).is_empty());
    }

    #[test]
    fn test_relationships_skip_unresolved_and_deduplicate() {
        let t = tree();
        let resolver = lookup(&t);
        let format = Dsl::new(Kind::Utility, "formatString");
        for id in ["db", "db", "nope"] {
            format.param(target("component", &[id])).unwrap();
        }
        format.param(Dsl::entity(t.worker.clone())).unwrap();
        let relationships = format.relationships_for(&t.web, &resolver);
        let ids: Vec<&str> = relationships.iter().map(|e| e.id()).collect();
        assert_eq!(ids, ["db", "worker"]);
    }

    #[test]
    fn test_reference_resolve() {
        let t = tree();
        let resolver = lookup(&t);
        let reference = Reference::Entity(t.db.clone());
        assert!(same_entity(&reference.resolve(&t.web, &resolver).unwrap(), &t.db));
    }
}
