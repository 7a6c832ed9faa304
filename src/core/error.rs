//! Synthesis error taxonomy.
//!
//! Every variant is detected locally while building or synthesizing a tree,
//! and every variant names the offending identifier(s). None of them is
//! transient: retrying without changing the declared tree fails the same way.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for the synthesis core.
pub type Result<T, E = SynthError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthError {
    #[error("stack '{name}' is already registered")]
    DuplicateStack { name: String },

    #[error("'{id}' already exists under '{parent}'")]
    DuplicateId { parent: String, id: String },

    #[error("construct '{construct}' property '{property}': {reason}")]
    SchemaValidation {
        construct: String,
        property: String,
        reason: String,
    },

    #[error("reference cycle between: {}", members.join(" -> "))]
    CyclicReference { members: Vec<String> },

    #[error("construct '{construct}' references unknown construct '{target}'")]
    UnresolvedReference { construct: String, target: String },

    #[error("stack '{stack}' is frozen: synthesis has already been invoked")]
    FrozenStack { stack: String },

    #[error("invalid identifier '{id}': expected letters, digits or '-'")]
    InvalidIdentifier { id: String },

    #[error("stack '{stack}' has no construct at '{parent}'")]
    UnknownParent { stack: String, parent: String },

    #[error("stack '{stack}' already declares output '{name}'")]
    DuplicateOutput { stack: String, name: String },

    #[error("stack '{stack}': {source}")]
    Stack {
        stack: String,
        #[source]
        source: Box<SynthError>,
    },

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("cannot serialize template: {0}")]
    Serialize(String),

    #[error("cannot write {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl SynthError {
    /// Shorthand for a schema violation on one property.
    pub fn schema(
        construct: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaValidation {
            construct: construct.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Strip any `Stack` wrapping and return the underlying error.
    pub fn root(&self) -> &SynthError {
        match self {
            Self::Stack { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_members() {
        let e = SynthError::CyclicReference {
            members: vec!["a".into(), "b".into()],
        };
        assert_eq!(e.to_string(), "reference cycle between: a -> b");
    }

    #[test]
    fn test_stack_wrapper_root() {
        let inner = SynthError::FrozenStack {
            stack: "api".into(),
        };
        let wrapped = SynthError::Stack {
            stack: "api".into(),
            source: Box::new(inner.clone()),
        };
        assert_eq!(wrapped.root(), &inner);
        assert!(wrapped.to_string().starts_with("stack 'api': "));
    }

    #[test]
    fn test_schema_shorthand() {
        let e = SynthError::schema("handler", "runtime", "is required");
        assert_eq!(
            e.to_string(),
            "construct 'handler' property 'runtime': is required"
        );
    }
}
