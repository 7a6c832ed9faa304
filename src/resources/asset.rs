//! Packaged code artifact. Only the artifact's location is recorded;
//! packaging and upload belong to the deployment driver.

use super::{check_non_empty, put_list, PropertyReader};
use crate::core::error::Result;
use crate::core::types::Value;
use indexmap::IndexMap;

/// Asset properties.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetProps {
    /// Local path of the packaged artifact (directory or archive)
    pub path: String,
    /// Glob patterns excluded from the package
    pub exclude: Vec<String>,
}

impl AssetProps {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            exclude: Vec::new(),
        }
    }
}

/// `bucket`, `key` and `location` are assigned when the artifact is uploaded.
pub const ATTRIBUTES: &[&str] = &["path", "bucket", "key", "location"];

pub fn literal_source(attribute: &str) -> Option<&'static str> {
    match attribute {
        "path" => Some("path"),
        _ => None,
    }
}

pub(crate) fn from_bag(r: &mut PropertyReader) -> Result<AssetProps> {
    Ok(AssetProps {
        path: r.string("path")?,
        exclude: r.string_list("exclude")?,
    })
}

pub(crate) fn check(path: &str, p: &AssetProps) -> Result<()> {
    check_non_empty(path, "path", &p.path)?;
    for pattern in &p.exclude {
        check_non_empty(path, "exclude", pattern)?;
    }
    Ok(())
}

pub(crate) fn properties(p: &AssetProps) -> IndexMap<String, Value> {
    let mut props = IndexMap::new();
    props.insert("path".to_string(), Value::Str(p.path.clone()));
    put_list(&mut props, "exclude", &p.exclude);
    props
}
