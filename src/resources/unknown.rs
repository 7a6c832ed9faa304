//! Constructs of kinds the core does not model. Properties pass through
//! untouched; every attribute is deploy-time only.

use super::check_non_empty;
use crate::core::error::Result;
use crate::core::types::Value;
use indexmap::IndexMap;

/// Untyped properties of an unrecognized kind.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownProps {
    pub kind: String,
    pub properties: IndexMap<String, Value>,
}

impl UnknownProps {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: IndexMap::new(),
        }
    }
}

pub(crate) fn check(path: &str, p: &UnknownProps) -> Result<()> {
    check_non_empty(path, "type", &p.kind)
}
