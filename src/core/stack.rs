//! Stack: a named, independently deployable construct tree.
//!
//! A stack is mutable only until synthesis is first invoked; after that
//! every mutation fails with `FrozenStack`, whether or not synthesis
//! succeeded.

use super::construct::{validate_identifier, Construct, ConstructTree};
use super::error::{Result, SynthError};
use super::resolver;
use super::synth::{self, EmitContext};
use super::types::{SynthesizedTemplate, Value};
use crate::resources::ConstructProps;
use indexmap::IndexMap;
use tracing::{debug, info, info_span};

/// Construction-time stack configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackProps {
    /// Free text, preserved verbatim in template metadata
    pub description: Option<String>,
    /// Accept constructs of unrecognized kinds
    pub allow_unknown_kinds: bool,
}

impl StackProps {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            allow_unknown_kinds: false,
        }
    }
}

/// A value the stack exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputProps {
    pub value: Value,
    pub description: Option<String>,
    /// Defaults to `<stack>:<output>`
    pub export_name: Option<String>,
}

impl OutputProps {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            description: None,
            export_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    props: StackProps,
    tree: ConstructTree,
    outputs: IndexMap<String, OutputProps>,
    frozen: bool,
    template: Option<SynthesizedTemplate>,
}

impl Stack {
    /// Create a detached stack. Applications create stacks through
    /// [`App::add_stack`](super::app::App::add_stack).
    pub fn new(name: &str, props: StackProps) -> Result<Self> {
        validate_identifier(name)?;
        Ok(Self {
            name: name.to_string(),
            props,
            tree: ConstructTree::new(),
            outputs: IndexMap::new(),
            frozen: false,
            template: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.props.description.as_deref()
    }

    pub fn allows_unknown_kinds(&self) -> bool {
        self.props.allow_unknown_kinds
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn tree(&self) -> &ConstructTree {
        &self.tree
    }

    pub fn construct(&self, path: &str) -> Option<&Construct> {
        self.tree.get(path)
    }

    pub fn outputs(&self) -> &IndexMap<String, OutputProps> {
        &self.outputs
    }

    /// Template from the last successful synthesis.
    pub fn template(&self) -> Option<&SynthesizedTemplate> {
        self.template.as_ref()
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.frozen {
            return Err(SynthError::FrozenStack {
                stack: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Append a construct under `parent` (a construct path) or at the root.
    /// Returns the new construct's path.
    pub fn add_construct(
        &mut self,
        parent: Option<&str>,
        id: &str,
        props: ConstructProps,
    ) -> Result<String> {
        self.ensure_mutable()?;
        let path = self.tree.check_insert(&self.name, parent, id)?;
        synth::check_kind(&path, &props, self.props.allow_unknown_kinds)?;
        props.check(&path)?;

        debug!(stack = %self.name, construct = %path, kind = %props.kind(), "add construct");
        self.tree.insert(&self.name, parent, id, props)?;
        Ok(path)
    }

    /// Declare that `path` must be deployed after `on`.
    pub fn add_dependency(&mut self, path: &str, on: &str) -> Result<()> {
        self.ensure_mutable()?;
        self.tree.add_dependency(&self.name, path, on)
    }

    /// Expose a value under `name`.
    pub fn add_output(&mut self, name: &str, output: OutputProps) -> Result<()> {
        self.ensure_mutable()?;
        validate_identifier(name)?;
        if let Some(reason) = output.value.unrepresentable() {
            return Err(SynthError::schema(format!("outputs/{}", name), "value", reason));
        }
        if self.outputs.contains_key(name) {
            return Err(SynthError::DuplicateOutput {
                stack: self.name.clone(),
                name: name.to_string(),
            });
        }
        self.outputs.insert(name.to_string(), output);
        Ok(())
    }

    /// Freeze the stack and lower its tree into a template.
    pub fn synthesize(&mut self) -> Result<SynthesizedTemplate> {
        self.frozen = true;
        let _span = info_span!("synthesize", stack = %self.name).entered();

        synth::validate(&self.tree, self.props.allow_unknown_kinds)?;
        let (graph, order) = resolver::build_declaration_order(&self.tree)?;
        debug!(constructs = order.len(), "declaration order fixed");

        let template = synth::emit(&EmitContext {
            stack: &self.name,
            description: self.description(),
            tree: &self.tree,
            graph: &graph,
            order: &order,
            outputs: &self.outputs,
        })?;

        info!(
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            fingerprint = %template.metadata.fingerprint,
            "synthesized"
        );
        self.template = Some(template.clone());
        Ok(template)
    }
}
