//! Relationship refresh over an entity's configuration
//!
//! Every config value that reads as a DSL expression is parsed against the
//! blueprint; the entities it references become relationships of the config
//! key, and resolution problems become its issues.

use crate::entity::{push_unique, DescendantLookup, EntityNode, EntityRef};
use crate::model::{Dsl, Issue};
use crate::parser::{DslInput, DslParser};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

/// Expressions, relationships and issues found under one config key.
#[derive(Debug, Clone)]
pub struct ConfigRelationships {
    pub key: String,
    pub expressions: Vec<Dsl>,
    pub relationships: Vec<EntityRef>,
    pub issues: Vec<Issue>,
}

/// Config relationships of one entity of a blueprint.
#[derive(Debug, Clone)]
pub struct EntityRelationships {
    pub entity_id: String,
    pub config: Vec<ConfigRelationships>,
}

/// Parse the config of `entity` and collect relationships per key.
///
/// Strings are parsed directly; arrays and objects are walked one level deep.
/// Values that are not expressions are skipped. Ids resolve anywhere under
/// `root`.
pub fn refresh_relationships(
    parser: &DslParser,
    entity: &EntityRef,
    root: &EntityRef,
    config: &BTreeMap<String, Value>,
) -> Vec<ConfigRelationships> {
    let lookup = DescendantLookup::new(root.clone());
    config
        .iter()
        .map(|(key, value)| {
            let candidates: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Object(fields) => fields.values().collect(),
                other => vec![other],
            };

            let mut result = ConfigRelationships {
                key: key.clone(),
                expressions: Vec::new(),
                relationships: Vec::new(),
                issues: Vec::new(),
            };
            for candidate in candidates {
                let Some(dsl) = parse_expression(parser, candidate) else {
                    continue;
                };
                let relationships = dsl.relationships_for(entity, &lookup);
                for related in &relationships {
                    push_unique(&mut result.relationships, related.clone());
                }
                dsl.set_relationships(relationships);
                result.issues.extend(dsl.all_issues());
                result.expressions.push(dsl);
            }
            result
        })
        .collect()
}

/// [`refresh_relationships`] for every entity of the tree under `root`.
///
/// Entities without config are left out.
pub fn refresh_all_relationships(
    parser: &DslParser,
    root: &Rc<EntityNode>,
) -> Vec<EntityRelationships> {
    let root_entity = root.as_entity();
    root.descendants()
        .into_iter()
        .filter_map(|node| {
            let config = node.config();
            if config.is_empty() {
                return None;
            }
            let entity = node.as_entity();
            Some(EntityRelationships {
                entity_id: entity.id().to_string(),
                config: refresh_relationships(parser, &entity, &root_entity, &config),
            })
        })
        .collect()
}

fn parse_expression(parser: &DslParser, value: &Value) -> Option<Dsl> {
    let text = match DslInput::from_json(value) {
        Ok(DslInput::Text(text)) => text,
        _ => return None,
    };
    match parser.parse_expression_only(&text) {
        Ok(dsl) => Some(dsl),
        Err(e) => {
            debug!(value = %text, error = %e, "Cannot detect whether this is a DSL expression; assuming not");
            None
        }
    }
}
