//! Object storage bucket.

use super::{check_text, put_opt, PropertyReader};
use crate::core::error::Result;
use crate::core::types::Value;
use indexmap::IndexMap;

/// Bucket properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BucketProps {
    pub bucket_name: Option<Value>,
    pub versioned: bool,
    pub public_read: bool,
}

pub const ATTRIBUTES: &[&str] = &["name", "arn"];

pub fn literal_source(attribute: &str) -> Option<&'static str> {
    match attribute {
        "name" => Some("bucket_name"),
        _ => None,
    }
}

pub(crate) fn from_bag(r: &mut PropertyReader) -> Result<BucketProps> {
    Ok(BucketProps {
        bucket_name: r.opt_text("bucket_name")?,
        versioned: r.opt_bool("versioned")?.unwrap_or(false),
        public_read: r.opt_bool("public_read")?.unwrap_or(false),
    })
}

pub(crate) fn check(path: &str, p: &BucketProps) -> Result<()> {
    if let Some(ref name) = p.bucket_name {
        check_text(path, "bucket_name", name)?;
    }
    Ok(())
}

pub(crate) fn properties(p: &BucketProps) -> IndexMap<String, Value> {
    let mut props = IndexMap::new();
    put_opt(&mut props, "bucket_name", &p.bucket_name);
    props.insert("versioned".to_string(), Value::Bool(p.versioned));
    props.insert("public_read".to_string(), Value::Bool(p.public_read));
    props
}
