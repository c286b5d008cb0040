//! Programmatic construction of common expressions
//!
//! Shortest addressing first: `self()` for the base entity, `parent()` for its
//! parent, `component("id")` for anything else.

use crate::entity::{same_entity, EntityRef};
use crate::error::DslResult;
use crate::model::{Dsl, Kind, Target};

/// The target call addressing `target` from `base`.
pub fn scoped_target(base: &EntityRef, target: &EntityRef) -> DslResult<Dsl> {
    if same_entity(base, target) {
        return Ok(Dsl::new(Kind::Target, Target::SelfEntity.as_str()));
    }
    if base.parent().is_some_and(|p| same_entity(&p, target)) {
        return Ok(Dsl::new(Kind::Target, Target::Parent.as_str()));
    }
    Dsl::new(Kind::Target, Target::Component.as_str()).param(Dsl::new(Kind::String, target.id()))
}

/// True for a bare `self()` call.
pub fn is_self_target(dsl: &Dsl) -> bool {
    dsl.kind() == Kind::Target && dsl.name() == Target::SelfEntity.as_str()
}

/// `config("key")` of `target`, as seen from `base`.
pub fn config_ref(base: &EntityRef, target: &EntityRef, key: &str) -> DslResult<Dsl> {
    scoped_method(base, target, "config", key)
}

/// `attributeWhenReady("sensor")` of `target`, as seen from `base`.
pub fn attribute_when_ready_ref(
    base: &EntityRef,
    target: &EntityRef,
    sensor: &str,
) -> DslResult<Dsl> {
    scoped_method(base, target, "attributeWhenReady", sensor)
}

/// `sensor("sensor")` of `target`, as seen from `base`.
pub fn sensor_ref(base: &EntityRef, target: &EntityRef, sensor: &str) -> DslResult<Dsl> {
    scoped_method(base, target, "sensor", sensor)
}

/// `formatString("pattern", args...)`.
pub fn format_string(pattern: &str, args: impl IntoIterator<Item = Dsl>) -> DslResult<Dsl> {
    let dsl = Dsl::new(Kind::Utility, "formatString");
    dsl.param(Dsl::new(Kind::String, pattern))?;
    for arg in args {
        dsl.param(arg)?;
    }
    Ok(dsl)
}

// Methods on `self()` are written bare: `config("k")`, not `self().config("k")`.
fn scoped_method(base: &EntityRef, target: &EntityRef, method: &str, key: &str) -> DslResult<Dsl> {
    let call = Dsl::new(Kind::Method, method).param(Dsl::new(Kind::String, key))?;
    let scope = scoped_target(base, target)?;
    if is_self_target(&scope) {
        return Ok(call);
    }
    scope.chain(call)?;
    Ok(scope)
}
