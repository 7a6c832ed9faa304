//! Resource kinds: typed property records for each known construct kind.
//!
//! Each kind module provides:
//! 1. `from_bag`: lower a declared property bag into the typed record
//! 2. `check`: structural checks on the record (presence, shape)
//! 3. `properties`: the record as an ordered property map for emission
//! 4. `ATTRIBUTES` and `literal_source`: what the kind exposes to references

pub mod api;
pub mod asset;
pub mod bucket;
pub mod function;
pub mod policy;
pub mod role;
pub mod unknown;

use crate::core::error::{Result, SynthError};
use crate::core::types::{Reference, Value};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

pub use api::RestApiProps;
pub use asset::AssetProps;
pub use bucket::BucketProps;
pub use function::FunctionProps;
pub use policy::PolicyProps;
pub use role::RoleProps;
pub use unknown::UnknownProps;

/// Construct kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Role,
    Asset,
    Function,
    RestApi,
    Bucket,
    Policy,
    Unknown(String),
}

impl ConstructKind {
    /// Parse a kind name; anything unrecognized is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "role" => Self::Role,
            "asset" => Self::Asset,
            "function" => Self::Function,
            "rest_api" => Self::RestApi,
            "bucket" => Self::Bucket,
            "policy" => Self::Policy,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "role"),
            Self::Asset => write!(f, "asset"),
            Self::Function => write!(f, "function"),
            Self::RestApi => write!(f, "rest_api"),
            Self::Bucket => write!(f, "bucket"),
            Self::Policy => write!(f, "policy"),
            Self::Unknown(kind) => write!(f, "{}", kind),
        }
    }
}

/// Typed properties of a construct, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructProps {
    Role(RoleProps),
    Asset(AssetProps),
    Function(FunctionProps),
    RestApi(RestApiProps),
    Bucket(BucketProps),
    Policy(PolicyProps),
    Unknown(UnknownProps),
}

impl ConstructProps {
    pub fn kind(&self) -> ConstructKind {
        match self {
            Self::Role(_) => ConstructKind::Role,
            Self::Asset(_) => ConstructKind::Asset,
            Self::Function(_) => ConstructKind::Function,
            Self::RestApi(_) => ConstructKind::RestApi,
            Self::Bucket(_) => ConstructKind::Bucket,
            Self::Policy(_) => ConstructKind::Policy,
            Self::Unknown(u) => ConstructKind::Unknown(u.kind.clone()),
        }
    }

    /// Lower a declared property bag into the record for `kind`.
    pub fn from_bag(path: &str, kind: &str, bag: &IndexMap<String, Value>) -> Result<Self> {
        let mut reader = PropertyReader::new(path, bag);
        let props = match ConstructKind::parse(kind) {
            ConstructKind::Role => Self::Role(role::from_bag(&mut reader)?),
            ConstructKind::Asset => Self::Asset(asset::from_bag(&mut reader)?),
            ConstructKind::Function => Self::Function(function::from_bag(&mut reader)?),
            ConstructKind::RestApi => Self::RestApi(api::from_bag(&mut reader)?),
            ConstructKind::Bucket => Self::Bucket(bucket::from_bag(&mut reader)?),
            ConstructKind::Policy => Self::Policy(policy::from_bag(&mut reader)?),
            ConstructKind::Unknown(kind) => {
                return Ok(Self::Unknown(UnknownProps {
                    kind,
                    properties: bag.clone(),
                }))
            }
        };
        reader.finish()?;
        Ok(props)
    }

    /// Structural checks on the record.
    pub fn check(&self, path: &str) -> Result<()> {
        for (name, value) in self.properties() {
            if let Some(reason) = value.unrepresentable() {
                return Err(SynthError::schema(path, name, reason));
            }
        }
        match self {
            Self::Role(p) => role::check(path, p),
            Self::Asset(p) => asset::check(path, p),
            Self::Function(p) => function::check(path, p),
            Self::RestApi(p) => api::check(path, p),
            Self::Bucket(p) => bucket::check(path, p),
            Self::Policy(p) => policy::check(path, p),
            Self::Unknown(p) => unknown::check(path, p),
        }
    }

    /// Properties in emission order, defaults applied.
    pub fn properties(&self) -> IndexMap<String, Value> {
        match self {
            Self::Role(p) => role::properties(p),
            Self::Asset(p) => asset::properties(p),
            Self::Function(p) => function::properties(p),
            Self::RestApi(p) => api::properties(p),
            Self::Bucket(p) => bucket::properties(p),
            Self::Policy(p) => policy::properties(p),
            Self::Unknown(p) => p.properties.clone(),
        }
    }

    /// Every reference in the record, with the property it appears under.
    pub fn references(&self) -> Vec<(String, Reference)> {
        self.properties()
            .into_iter()
            .flat_map(|(name, value)| {
                value
                    .references()
                    .into_iter()
                    .map(|r| (name.clone(), r.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Whether the kind exposes `attribute` to references.
    pub fn exposes(&self, attribute: &str) -> bool {
        match self {
            Self::Unknown(_) => true,
            _ => self.attributes().contains(&attribute),
        }
    }

    /// Attributes the kind exposes (empty for unknown kinds, which accept any).
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Role(_) => role::ATTRIBUTES,
            Self::Asset(_) => asset::ATTRIBUTES,
            Self::Function(_) => function::ATTRIBUTES,
            Self::RestApi(_) => api::ATTRIBUTES,
            Self::Bucket(_) => bucket::ATTRIBUTES,
            Self::Policy(_) => policy::ATTRIBUTES,
            Self::Unknown(_) => &[],
        }
    }

    /// Property whose resolved value supplies `attribute`, if any.
    /// Attributes without a source are deploy-time only.
    pub fn literal_source(&self, attribute: &str) -> Option<&'static str> {
        match self {
            Self::Role(_) => role::literal_source(attribute),
            Self::Asset(_) => asset::literal_source(attribute),
            Self::Function(_) => function::literal_source(attribute),
            Self::RestApi(_) => api::literal_source(attribute),
            Self::Bucket(_) => bucket::literal_source(attribute),
            Self::Policy(_) => policy::literal_source(attribute),
            Self::Unknown(_) => None,
        }
    }
}

// ============================================================================
// Property bag reader
// ============================================================================

/// Reads typed fields out of a property bag, tracking which keys were used.
pub(crate) struct PropertyReader<'a> {
    path: &'a str,
    bag: &'a IndexMap<String, Value>,
    seen: HashSet<&'a str>,
}

impl<'a> PropertyReader<'a> {
    pub(crate) fn new(path: &'a str, bag: &'a IndexMap<String, Value>) -> Self {
        Self {
            path,
            bag,
            seen: HashSet::new(),
        }
    }

    fn get(&mut self, name: &'a str) -> Option<&'a Value> {
        self.seen.insert(name);
        self.bag.get(name).filter(|v| !matches!(v, Value::Null))
    }

    fn error(&self, name: &str, reason: impl Into<String>) -> SynthError {
        SynthError::schema(self.path, name, reason)
    }

    /// Required string-or-reference.
    pub(crate) fn text(&mut self, name: &'a str) -> Result<Value> {
        self.opt_text(name)?
            .ok_or_else(|| self.error(name, "is required"))
    }

    /// Optional string-or-reference.
    pub(crate) fn opt_text(&mut self, name: &'a str) -> Result<Option<Value>> {
        match self.get(name) {
            None => Ok(None),
            Some(v @ (Value::Str(_) | Value::Ref(_))) => Ok(Some(v.clone())),
            Some(other) => Err(self.error(
                name,
                format!("expected string or reference, got {}", other.type_name()),
            )),
        }
    }

    /// Required plain string.
    pub(crate) fn string(&mut self, name: &'a str) -> Result<String> {
        self.opt_string(name)?
            .ok_or_else(|| self.error(name, "is required"))
    }

    /// Optional plain string.
    pub(crate) fn opt_string(&mut self, name: &'a str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.error(
                name,
                format!("expected string, got {}", other.type_name()),
            )),
        }
    }

    /// Optional list of plain strings (missing = empty).
    pub(crate) fn string_list(&mut self, name: &'a str) -> Result<Vec<String>> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => items
                .iter()
                .map(|v| match v {
                    Value::Str(s) => Ok(s.clone()),
                    other => Err(self.error(
                        name,
                        format!("expected list of strings, found {}", other.type_name()),
                    )),
                })
                .collect(),
            Some(other) => Err(self.error(
                name,
                format!("expected list, got {}", other.type_name()),
            )),
        }
    }

    /// Optional list of strings or references (missing = empty).
    pub(crate) fn text_list(&mut self, name: &'a str) -> Result<Vec<Value>> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => items
                .iter()
                .map(|v| match v {
                    Value::Str(_) | Value::Ref(_) => Ok(v.clone()),
                    other => Err(self.error(
                        name,
                        format!(
                            "expected list of strings or references, found {}",
                            other.type_name()
                        ),
                    )),
                })
                .collect(),
            Some(other) => Err(self.error(
                name,
                format!("expected list, got {}", other.type_name()),
            )),
        }
    }

    /// Optional map of string-or-reference values (missing = empty).
    pub(crate) fn text_map(&mut self, name: &'a str) -> Result<IndexMap<String, Value>> {
        match self.get(name) {
            None => Ok(IndexMap::new()),
            Some(Value::Map(map)) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    match v {
                        Value::Str(_) | Value::Ref(_) => {
                            out.insert(k.clone(), v.clone());
                        }
                        other => {
                            return Err(self.error(
                                name,
                                format!(
                                    "entry '{}': expected string or reference, got {}",
                                    k,
                                    other.type_name()
                                ),
                            ))
                        }
                    }
                }
                Ok(out)
            }
            Some(other) => Err(self.error(
                name,
                format!("expected map, got {}", other.type_name()),
            )),
        }
    }

    /// Optional non-negative integer that fits in u32.
    pub(crate) fn opt_u32(&mut self, name: &'a str) -> Result<Option<u32>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Int(n)) => u32::try_from(*n)
                .map(Some)
                .map_err(|_| self.error(name, format!("expected unsigned integer, got {}", n))),
            Some(other) => Err(self.error(
                name,
                format!("expected integer, got {}", other.type_name()),
            )),
        }
    }

    /// Optional boolean.
    pub(crate) fn opt_bool(&mut self, name: &'a str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.error(
                name,
                format!("expected bool, got {}", other.type_name()),
            )),
        }
    }

    /// Reject keys no field asked for.
    pub(crate) fn finish(self) -> Result<()> {
        match self.bag.keys().find(|k| !self.seen.contains(k.as_str())) {
            Some(extra) => Err(SynthError::schema(
                self.path,
                extra.clone(),
                "is not a recognized property",
            )),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Shared structural checks
// ============================================================================

/// A required string-or-reference: a non-empty string or any reference.
pub(crate) fn check_text(path: &str, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Str(s) if s.trim().is_empty() => {
            Err(SynthError::schema(path, name, "must not be empty"))
        }
        Value::Str(_) | Value::Ref(_) => Ok(()),
        other => Err(SynthError::schema(
            path,
            name,
            format!("expected string or reference, got {}", other.type_name()),
        )),
    }
}

/// A required plain string must not be blank.
pub(crate) fn check_non_empty(path: &str, name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SynthError::schema(path, name, "must not be empty"));
    }
    Ok(())
}

/// Insert an optional value under `name`.
pub(crate) fn put_opt(props: &mut IndexMap<String, Value>, name: &str, value: &Option<Value>) {
    if let Some(v) = value {
        props.insert(name.to_string(), v.clone());
    }
}

/// Insert a string list under `name` when it is non-empty.
pub(crate) fn put_list(props: &mut IndexMap<String, Value>, name: &str, items: &[String]) {
    if !items.is_empty() {
        props.insert(
            name.to_string(),
            Value::List(items.iter().map(|s| Value::Str(s.clone())).collect()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(yaml: &str) -> IndexMap<String, Value> {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_kind_parse_and_display() {
        for name in ["role", "asset", "function", "rest_api", "bucket", "policy"] {
            let kind = ConstructKind::parse(name);
            assert!(kind.is_known());
            assert_eq!(kind.to_string(), name);
        }
        let other = ConstructKind::parse("queue");
        assert_eq!(other, ConstructKind::Unknown("queue".into()));
        assert!(!other.is_known());
    }

    #[test]
    fn test_from_bag_rejects_unrecognized_property() {
        let b = bag("path: ./pkg\ncolour: blue\n");
        let err = ConstructProps::from_bag("code", "asset", &b).unwrap_err();
        assert_eq!(
            err,
            SynthError::schema("code", "colour", "is not a recognized property")
        );
    }

    #[test]
    fn test_from_bag_unknown_kind_keeps_bag() {
        let b = bag("visibility_timeout: 30\n");
        let props = ConstructProps::from_bag("jobs", "queue", &b).unwrap();
        assert_eq!(props.kind(), ConstructKind::Unknown("queue".into()));
        assert_eq!(props.properties()["visibility_timeout"], Value::Int(30));
        assert!(props.exposes("anything"));
        assert_eq!(props.literal_source("anything"), None);
    }

    #[test]
    fn test_reader_type_errors() {
        let b = bag("memory_size: big\n");
        let mut reader = PropertyReader::new("fn", &b);
        let err = reader.opt_u32("memory_size").unwrap_err();
        assert!(err.to_string().contains("expected integer, got string"));

        let b = bag("memory_size: -1\n");
        let mut reader = PropertyReader::new("fn", &b);
        assert!(reader.opt_u32("memory_size").is_err());
    }

    #[test]
    fn test_reader_null_is_missing() {
        let b = bag("role_name: null\n");
        let mut reader = PropertyReader::new("role", &b);
        assert_eq!(reader.opt_text("role_name").unwrap(), None);
        reader.finish().unwrap();
    }

    #[test]
    fn test_references_carry_property_name() {
        let b = bag(
            "runtime: python3.12\nhandler: app.main.handler\ncode: { ref: code.location }\nrole: { ref: role.arn }\n",
        );
        let props = ConstructProps::from_bag("handler", "function", &b).unwrap();
        let refs = props.references();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].0, "code");
        assert_eq!(refs[0].1, Reference::new("code", "location"));
        assert_eq!(refs[1].0, "role");
    }

    #[test]
    fn test_check_text() {
        assert!(check_text("c", "p", &Value::from("x")).is_ok());
        assert!(check_text("c", "p", &Value::reference("a", "b")).is_ok());
        assert!(check_text("c", "p", &Value::from("  ")).is_err());
        assert!(check_text("c", "p", &Value::Int(1)).is_err());
    }
}
