//! Shared types: property values, references, manifest declarations and
//! the synthesized template.
//!
//! Input values may carry references; output values are either literals or
//! deferred expressions that only the deployment target can evaluate.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ============================================================================
// References
// ============================================================================

/// An edge from a consuming construct to an attribute of a producer.
///
/// `target` is a construct path (`role`, `backend/handler`), `attribute` is
/// one of the attributes the target's kind exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    pub target: String,
    pub attribute: String,
}

impl Reference {
    pub fn new(target: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            attribute: attribute.into(),
        }
    }

    /// Parse `target.attribute`. The attribute is everything after the last dot.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.rsplit_once('.') {
            Some((target, attribute)) if !target.is_empty() && !attribute.is_empty() => {
                Ok(Self::new(target, attribute))
            }
            _ => Err(format!("invalid reference '{}': expected target.attribute", s)),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute)
    }
}

// ============================================================================
// Input values
// ============================================================================

/// A declared property value.
///
/// Serialized as plain JSON/YAML; a reference is the single-key map
/// `{ ref: "target.attribute" }`. Maps keep their declared key order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Ref(Reference),
}

impl Value {
    /// Reference to `target.attribute`.
    pub fn reference(target: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Ref(Reference::new(target, attribute))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in schema errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Ref(_) => "reference",
        }
    }

    /// Every reference contained in this value, depth-first.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Ref(r) => out.push(r),
            Self::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Self::Map(map) => map.values().for_each(|v| v.collect_references(out)),
            _ => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = String;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Self::Int(i),
                (None, Some(u)) => return Err(integer_out_of_range(u)),
                (None, None) => Self::Float(finite(n.as_f64().unwrap_or(f64::NAN))?),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, Value::try_from(v)?);
                }
                Self::from_map(out)?
            }
        })
    }
}

impl Value {
    /// A single `ref` key makes a map a reference.
    fn from_map(map: IndexMap<String, Value>) -> Result<Self, String> {
        if map.len() == 1 {
            if let Some(target) = map.get("ref") {
                let s = target
                    .as_str()
                    .ok_or_else(|| "'ref' must be a string".to_string())?;
                return Reference::parse(s).map(Self::Ref);
            }
        }
        Ok(Self::Map(map))
    }

    /// First value that cannot be emitted faithfully, described for a
    /// schema error: non-finite floats and maps that would read back as a
    /// deferred expression.
    pub fn unrepresentable(&self) -> Option<String> {
        match self {
            Self::Float(f) if !f.is_finite() => Some(format!("{} is not a finite number", f)),
            Self::List(items) => items.iter().find_map(Value::unrepresentable),
            Self::Map(map) => {
                if map.len() == 1 && map.contains_key(DEFERRED_KEY) {
                    return Some(format!(
                        "a map with the single key '{}' is reserved for deferred values",
                        DEFERRED_KEY
                    ));
                }
                map.values().find_map(Value::unrepresentable)
            }
            _ => None,
        }
    }
}

fn integer_out_of_range(u: u64) -> String {
    format!("integer {} is out of range (max {})", u, i64::MAX)
}

fn finite(f: f64) -> Result<f64, String> {
    if f.is_finite() {
        Ok(f)
    } else {
        Err(format!("{} is not a finite number", f))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(finite(*f).map_err(S::Error::custom)?),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) => serializer.collect_seq(items),
            Self::Map(map) => serializer.collect_map(map),
            Self::Ref(r) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ref", &r.to_string())?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a property value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<Value, E> {
        i64::try_from(u)
            .map(Value::Int)
            .map_err(|_| E::custom(integer_out_of_range(u)))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Value, E> {
        finite(f).map(Value::Float).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::Str(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::Str(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Value::from_map(map).map_err(de::Error::custom)
    }
}

// ============================================================================
// Output values
// ============================================================================

/// Key of the single-entry map a deferred value serializes to.
pub const DEFERRED_KEY: &str = "Deferred";

/// A value only the deployment target can evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredExpr {
    pub logical_id: String,
    pub attribute: String,
}

/// A property value after synthesis.
///
/// Fully literal lists and maps collapse into `Literal`, so `List`/`Map`
/// only appear when some element is deferred.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Literal(serde_json::Value),
    Deferred(DeferredExpr),
    List(Vec<Resolved>),
    Map(IndexMap<String, Resolved>),
}

impl Resolved {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Build a list, collapsing to a literal array when possible.
    pub fn list(items: Vec<Resolved>) -> Self {
        if items.iter().all(Self::is_literal) {
            Self::Literal(serde_json::Value::Array(
                items.into_iter().filter_map(Self::into_literal).collect(),
            ))
        } else {
            Self::List(items)
        }
    }

    /// Build a map, collapsing to a literal object when possible.
    pub fn map(entries: IndexMap<String, Resolved>) -> Self {
        if entries.values().all(Self::is_literal) {
            Self::Literal(serde_json::Value::Object(
                entries
                    .into_iter()
                    .filter_map(|(k, v)| v.into_literal().map(|v| (k, v)))
                    .collect(),
            ))
        } else {
            Self::Map(entries)
        }
    }

    fn into_literal(self) -> Option<serde_json::Value> {
        match self {
            Self::Literal(v) => Some(v),
            _ => None,
        }
    }
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(v) => v.serialize(serializer),
            Self::Deferred(expr) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(DEFERRED_KEY, expr)?;
                map.end()
            }
            Self::List(items) => serializer.collect_seq(items),
            Self::Map(entries) => serializer.collect_map(entries),
        }
    }
}

// ============================================================================
// Synthesized template
// ============================================================================

/// The immutable per-stack synthesis artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedTemplate {
    pub format_version: String,
    pub stack: String,
    pub metadata: TemplateMetadata,
    /// Declarations in dependency order.
    pub resources: Vec<ResourceDeclaration>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, OutputDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub generator: String,
    /// BLAKE3 over the canonical resources and outputs
    pub fingerprint: String,
}

/// One resource in a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDeclaration {
    pub kind: String,
    pub logical_id: String,
    pub path: String,
    pub properties: IndexMap<String, Resolved>,
    pub depends_on: Vec<String>,
}

/// A value a stack exposes to other stacks or to the deployment driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDeclaration {
    pub value: Resolved,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub export_name: String,
}

impl SynthesizedTemplate {
    /// Pretty JSON, the on-disk form of the template.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Declaration for a construct path.
    pub fn resource(&self, path: &str) -> Option<&ResourceDeclaration> {
        self.resources.iter().find(|r| r.path == path)
    }

    /// Declaration index for a construct path.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.path == path)
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Root of a YAML app manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppManifest {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Application name
    pub app: String,

    /// Stacks in synthesis order
    #[serde(default)]
    pub stacks: IndexMap<String, StackDecl>,
}

/// A stack declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackDecl {
    #[serde(default)]
    pub description: Option<String>,

    /// Accept constructs of unrecognized kinds
    #[serde(default)]
    pub allow_unknown_kinds: bool,

    #[serde(default)]
    pub constructs: IndexMap<String, ConstructDecl>,

    #[serde(default)]
    pub outputs: IndexMap<String, OutputDecl>,
}

/// A construct declaration. Kind-specific properties are sibling keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructDecl {
    #[serde(rename = "type")]
    pub kind: String,

    /// Ordering-only dependencies (construct paths)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, ConstructDecl>,

    #[serde(flatten)]
    pub properties: IndexMap<String, Value>,
}

/// An output declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDecl {
    pub value: Value,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub export_name: Option<String>,
}
