//! Compute function: runs the packaged application behind the API surface.

use super::{check_non_empty, check_text, put_opt, PropertyReader};
use crate::core::error::{Result, SynthError};
use crate::core::types::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_MEMORY_SIZE: u32 = 128;
pub const DEFAULT_TIMEOUT: u32 = 3;

static HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$").expect("static regex")
});

static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

/// Function properties.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProps {
    /// Runtime identifier (e.g. `python3.12`)
    pub runtime: String,
    /// Entry point as `module.attribute` (e.g. `app.main.handler`)
    pub handler: String,
    /// Code location, usually a reference to an asset's `location`
    pub code: Value,
    /// Execution role, usually a reference to a role's `arn`
    pub role: Value,
    pub function_name: Option<Value>,
    /// Memory in MB
    pub memory_size: u32,
    /// Timeout in seconds
    pub timeout: u32,
    pub environment: IndexMap<String, Value>,
    pub description: Option<String>,
}

impl FunctionProps {
    pub fn new(
        runtime: impl Into<String>,
        handler: impl Into<String>,
        code: impl Into<Value>,
        role: impl Into<Value>,
    ) -> Self {
        Self {
            runtime: runtime.into(),
            handler: handler.into(),
            code: code.into(),
            role: role.into(),
            function_name: None,
            memory_size: DEFAULT_MEMORY_SIZE,
            timeout: DEFAULT_TIMEOUT,
            environment: IndexMap::new(),
            description: None,
        }
    }
}

pub const ATTRIBUTES: &[&str] = &["name", "arn"];

pub fn literal_source(attribute: &str) -> Option<&'static str> {
    match attribute {
        "name" => Some("function_name"),
        _ => None,
    }
}

pub(crate) fn from_bag(r: &mut PropertyReader) -> Result<FunctionProps> {
    Ok(FunctionProps {
        runtime: r.string("runtime")?,
        handler: r.string("handler")?,
        code: r.text("code")?,
        role: r.text("role")?,
        function_name: r.opt_text("function_name")?,
        memory_size: r.opt_u32("memory_size")?.unwrap_or(DEFAULT_MEMORY_SIZE),
        timeout: r.opt_u32("timeout")?.unwrap_or(DEFAULT_TIMEOUT),
        environment: r.text_map("environment")?,
        description: r.opt_string("description")?,
    })
}

pub(crate) fn check(path: &str, p: &FunctionProps) -> Result<()> {
    check_non_empty(path, "runtime", &p.runtime)?;
    if !HANDLER.is_match(&p.handler) {
        return Err(SynthError::schema(
            path,
            "handler",
            format!("'{}' is not of the form module.function", p.handler),
        ));
    }
    check_text(path, "code", &p.code)?;
    check_text(path, "role", &p.role)?;
    if let Some(ref name) = p.function_name {
        check_text(path, "function_name", name)?;
    }
    for (key, value) in &p.environment {
        if !ENV_NAME.is_match(key) {
            return Err(SynthError::schema(
                path,
                "environment",
                format!("'{}' is not a valid variable name", key),
            ));
        }
        if !matches!(value, Value::Str(_) | Value::Ref(_)) {
            return Err(SynthError::schema(
                path,
                "environment",
                format!("'{}' must be a string or reference", key),
            ));
        }
    }
    Ok(())
}

pub(crate) fn properties(p: &FunctionProps) -> IndexMap<String, Value> {
    let mut props = IndexMap::new();
    props.insert("runtime".to_string(), Value::Str(p.runtime.clone()));
    props.insert("handler".to_string(), Value::Str(p.handler.clone()));
    props.insert("code".to_string(), p.code.clone());
    props.insert("role".to_string(), p.role.clone());
    put_opt(&mut props, "function_name", &p.function_name);
    props.insert("memory_size".to_string(), Value::Int(i64::from(p.memory_size)));
    props.insert("timeout".to_string(), Value::Int(i64::from(p.timeout)));
    if !p.environment.is_empty() {
        props.insert("environment".to_string(), Value::Map(p.environment.clone()));
    }
    put_opt(&mut props, "description", &p.description.clone().map(Value::Str));
    props
}
