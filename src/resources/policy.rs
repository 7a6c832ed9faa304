//! Permission grant: attaches an inline policy to a role.

use super::{check_non_empty, check_text, put_list, put_opt, PropertyReader};
use crate::core::error::{Result, SynthError};
use crate::core::types::Value;
use indexmap::IndexMap;

/// Policy properties.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyProps {
    /// Role the policy is attached to
    pub role: Value,
    /// Allowed actions (e.g. `s3:GetObject`)
    pub actions: Vec<String>,
    /// Resources the actions apply to; strings or references
    pub resources: Vec<Value>,
    pub policy_name: Option<Value>,
}

pub const ATTRIBUTES: &[&str] = &["name"];

pub fn literal_source(attribute: &str) -> Option<&'static str> {
    match attribute {
        "name" => Some("policy_name"),
        _ => None,
    }
}

pub(crate) fn from_bag(r: &mut PropertyReader) -> Result<PolicyProps> {
    Ok(PolicyProps {
        role: r.text("role")?,
        actions: r.string_list("actions")?,
        resources: r.text_list("resources")?,
        policy_name: r.opt_text("policy_name")?,
    })
}

pub(crate) fn check(path: &str, p: &PolicyProps) -> Result<()> {
    check_text(path, "role", &p.role)?;
    if p.actions.is_empty() {
        return Err(SynthError::schema(path, "actions", "is required"));
    }
    for action in &p.actions {
        check_non_empty(path, "actions", action)?;
    }
    if p.resources.is_empty() {
        return Err(SynthError::schema(path, "resources", "is required"));
    }
    for resource in &p.resources {
        check_text(path, "resources", resource)?;
    }
    if let Some(ref name) = p.policy_name {
        check_text(path, "policy_name", name)?;
    }
    Ok(())
}

pub(crate) fn properties(p: &PolicyProps) -> IndexMap<String, Value> {
    let mut props = IndexMap::new();
    props.insert("role".to_string(), p.role.clone());
    put_list(&mut props, "actions", &p.actions);
    props.insert("resources".to_string(), Value::List(p.resources.clone()));
    put_opt(&mut props, "policy_name", &p.policy_name);
    props
}
