//! Construct ownership tree.
//!
//! Constructs live in an arena in insertion order; the arena index is the
//! stable tie-break used when ordering declarations. Paths are the ids from
//! the stack root joined with `/`, and logical ids are derived from paths
//! only, so an unchanged tree always yields the same ids.

use super::error::{Result, SynthError};
use super::hasher;
use crate::resources::ConstructProps;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Separator between ids in a construct path.
pub const PATH_SEPARATOR: char = '/';

const LOGICAL_ID_HASH_LEN: usize = 8;
const LOGICAL_ID_MAX_HUMAN: usize = 240;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("static regex"));

/// Check an id against the identifier grammar (letters, digits, hyphen).
pub fn validate_identifier(id: &str) -> Result<()> {
    if IDENTIFIER.is_match(id) {
        Ok(())
    } else {
        Err(SynthError::InvalidIdentifier { id: id.to_string() })
    }
}

/// Logical id for a construct path: PascalCase path components followed by
/// a short hash of the full path.
pub fn logical_id(path: &str) -> String {
    let human: String = path
        .split(PATH_SEPARATOR)
        .flat_map(|component| component.split('-'))
        .map(pascal_segment)
        .collect::<String>()
        .chars()
        .take(LOGICAL_ID_MAX_HUMAN)
        .collect();
    format!("{}{}", human, hasher::short_hash(path, LOGICAL_ID_HASH_LEN))
}

fn pascal_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// A node in the ownership tree.
#[derive(Debug, Clone)]
pub struct Construct {
    /// Local id, unique among siblings
    pub id: String,
    /// Path from the stack root
    pub path: String,
    pub props: ConstructProps,
    /// Ordering-only dependencies (construct paths)
    pub depends_on: Vec<String>,
    children: Vec<usize>,
}

impl Construct {
    pub fn logical_id(&self) -> String {
        logical_id(&self.path)
    }

    /// Owned constructs in insertion order.
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// Arena-backed construct tree owned by one stack.
#[derive(Debug, Clone, Default)]
pub struct ConstructTree {
    nodes: Vec<Construct>,
    roots: Vec<usize>,
    by_path: HashMap<String, usize>,
}

impl ConstructTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Constructs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Construct> {
        self.nodes.iter()
    }

    pub fn node(&self, index: usize) -> &Construct {
        &self.nodes[index]
    }

    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    pub fn get(&self, path: &str) -> Option<&Construct> {
        self.index_of(path).map(|i| &self.nodes[i])
    }

    /// Top-level constructs in insertion order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Check that `id` can be added under `parent` and return its path.
    pub fn check_insert(&self, owner: &str, parent: Option<&str>, id: &str) -> Result<String> {
        validate_identifier(id)?;

        let (path, parent_label) = match parent {
            Some(parent_path) => {
                if self.index_of(parent_path).is_none() {
                    return Err(SynthError::UnknownParent {
                        stack: owner.to_string(),
                        parent: parent_path.to_string(),
                    });
                }
                (
                    format!("{}{}{}", parent_path, PATH_SEPARATOR, id),
                    parent_path,
                )
            }
            None => (id.to_string(), owner),
        };

        if self.by_path.contains_key(&path) {
            return Err(SynthError::DuplicateId {
                parent: parent_label.to_string(),
                id: id.to_string(),
            });
        }
        Ok(path)
    }

    /// Append `id` under `parent` (or at the root). `owner` names the root
    /// in errors. Returns the arena index of the new construct.
    pub fn insert(
        &mut self,
        owner: &str,
        parent: Option<&str>,
        id: &str,
        props: ConstructProps,
    ) -> Result<usize> {
        let path = self.check_insert(owner, parent, id)?;
        let parent_index = parent.and_then(|p| self.index_of(p));

        let index = self.nodes.len();
        self.nodes.push(Construct {
            id: id.to_string(),
            path: path.clone(),
            props,
            depends_on: Vec::new(),
            children: Vec::new(),
        });
        self.by_path.insert(path, index);
        match parent_index {
            Some(p) => self.nodes[p].children.push(index),
            None => self.roots.push(index),
        }
        Ok(index)
    }

    /// Record an ordering-only dependency. Targets are resolved at synthesis.
    pub fn add_dependency(&mut self, owner: &str, path: &str, on: &str) -> Result<()> {
        let index = self.index_of(path).ok_or_else(|| SynthError::UnknownParent {
            stack: owner.to_string(),
            parent: path.to_string(),
        })?;
        let deps = &mut self.nodes[index].depends_on;
        if !deps.iter().any(|d| d == on) {
            deps.push(on.to_string());
        }
        Ok(())
    }
}
