//! API surface: an HTTP endpoint proxying every request to a function.

use super::{check_non_empty, check_text, put_list, put_opt, PropertyReader};
use crate::core::error::Result;
use crate::core::types::Value;
use indexmap::IndexMap;

pub const DEFAULT_STAGE: &str = "prod";

/// REST API properties.
#[derive(Debug, Clone, PartialEq)]
pub struct RestApiProps {
    /// Integration target, usually a reference to a function's `arn`
    pub handler: Value,
    pub api_name: Option<Value>,
    pub stage: String,
    /// Route all paths and methods to the handler
    pub proxy: bool,
    pub binary_media_types: Vec<String>,
    pub description: Option<String>,
}

impl RestApiProps {
    pub fn new(handler: impl Into<Value>) -> Self {
        Self {
            handler: handler.into(),
            api_name: None,
            stage: DEFAULT_STAGE.to_string(),
            proxy: true,
            binary_media_types: Vec::new(),
            description: None,
        }
    }
}

pub const ATTRIBUTES: &[&str] = &["id", "url", "root_resource_id", "stage"];

pub fn literal_source(attribute: &str) -> Option<&'static str> {
    match attribute {
        "stage" => Some("stage"),
        _ => None,
    }
}

pub(crate) fn from_bag(r: &mut PropertyReader) -> Result<RestApiProps> {
    Ok(RestApiProps {
        handler: r.text("handler")?,
        api_name: r.opt_text("api_name")?,
        stage: r
            .opt_string("stage")?
            .unwrap_or_else(|| DEFAULT_STAGE.to_string()),
        proxy: r.opt_bool("proxy")?.unwrap_or(true),
        binary_media_types: r.string_list("binary_media_types")?,
        description: r.opt_string("description")?,
    })
}

pub(crate) fn check(path: &str, p: &RestApiProps) -> Result<()> {
    check_text(path, "handler", &p.handler)?;
    if let Some(ref name) = p.api_name {
        check_text(path, "api_name", name)?;
    }
    check_non_empty(path, "stage", &p.stage)?;
    for media in &p.binary_media_types {
        check_non_empty(path, "binary_media_types", media)?;
    }
    Ok(())
}

pub(crate) fn properties(p: &RestApiProps) -> IndexMap<String, Value> {
    let mut props = IndexMap::new();
    props.insert("handler".to_string(), p.handler.clone());
    put_opt(&mut props, "api_name", &p.api_name);
    props.insert("stage".to_string(), Value::Str(p.stage.clone()));
    props.insert("proxy".to_string(), Value::Bool(p.proxy));
    put_list(&mut props, "binary_media_types", &p.binary_media_types);
    put_opt(&mut props, "description", &p.description.clone().map(Value::Str));
    props
}
