//! Execution role: the identity a function or service runs as.

use super::{check_non_empty, check_text, put_list, put_opt, PropertyReader};
use crate::core::error::Result;
use crate::core::types::Value;
use indexmap::IndexMap;

/// Role properties.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleProps {
    /// Service principal allowed to assume the role
    pub assumed_by: Value,
    pub role_name: Option<Value>,
    pub managed_policies: Vec<String>,
    pub description: Option<String>,
}

impl RoleProps {
    pub fn new(assumed_by: impl Into<Value>) -> Self {
        Self {
            assumed_by: assumed_by.into(),
            role_name: None,
            managed_policies: Vec::new(),
            description: None,
        }
    }
}

pub const ATTRIBUTES: &[&str] = &["name", "arn"];

pub fn literal_source(attribute: &str) -> Option<&'static str> {
    match attribute {
        "name" => Some("role_name"),
        _ => None,
    }
}

pub(crate) fn from_bag(r: &mut PropertyReader) -> Result<RoleProps> {
    Ok(RoleProps {
        assumed_by: r.text("assumed_by")?,
        role_name: r.opt_text("role_name")?,
        managed_policies: r.string_list("managed_policies")?,
        description: r.opt_string("description")?,
    })
}

pub(crate) fn check(path: &str, p: &RoleProps) -> Result<()> {
    check_text(path, "assumed_by", &p.assumed_by)?;
    if let Some(ref name) = p.role_name {
        check_text(path, "role_name", name)?;
    }
    for policy in &p.managed_policies {
        check_non_empty(path, "managed_policies", policy)?;
    }
    Ok(())
}

pub(crate) fn properties(p: &RoleProps) -> IndexMap<String, Value> {
    let mut props = IndexMap::new();
    props.insert("assumed_by".to_string(), p.assumed_by.clone());
    put_opt(&mut props, "role_name", &p.role_name);
    put_list(&mut props, "managed_policies", &p.managed_policies);
    put_opt(&mut props, "description", &p.description.clone().map(Value::Str));
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_bag() {
        let bag: IndexMap<String, Value> = serde_yaml_ng::from_str(
            "assumed_by: lambda.amazonaws.com\nmanaged_policies: [service-role/BasicExecution]\n",
        )
        .unwrap();
        let mut reader = PropertyReader::new("role", &bag);
        let p = from_bag(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(p.assumed_by, Value::from("lambda.amazonaws.com"));
        assert_eq!(p.managed_policies, vec!["service-role/BasicExecution"]);
        assert!(p.role_name.is_none());
    }

    #[test]
    fn test_role_missing_principal() {
        let bag = IndexMap::new();
        let mut reader = PropertyReader::new("role", &bag);
        let err = from_bag(&mut reader).unwrap_err();
        assert!(err.to_string().contains("'assumed_by': is required"));
    }

    #[test]
    fn test_role_check_blank_policy() {
        let mut p = RoleProps::new("lambda.amazonaws.com");
        p.managed_policies.push(String::new());
        assert!(check("role", &p).is_err());
    }

    #[test]
    fn test_role_name_is_literal_source() {
        assert_eq!(literal_source("name"), Some("role_name"));
        assert_eq!(literal_source("arn"), None);
    }
}
