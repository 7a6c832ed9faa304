//! Structural validation and template emission.
//!
//! Emission walks constructs in declaration order, so every producer's
//! properties are resolved before any consumer asks for one of its
//! attributes. An attribute backed by a property that resolved to a value
//! is substituted; anything else becomes a deferred expression.

use super::construct::ConstructTree;
use super::error::{Result, SynthError};
use super::hasher;
use super::resolver::DependencyGraph;
use super::stack::OutputProps;
use super::types::*;
use crate::resources::ConstructProps;
use indexmap::IndexMap;
use tracing::{debug, warn};

pub const FORMAT_VERSION: &str = "1.0";

/// Generator string recorded in template metadata.
pub fn generator() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Structural validation of every construct: kind accepted, record
/// well-formed, and every reference naming an attribute its target exposes.
/// References to missing constructs are left to graph construction.
pub fn validate(tree: &ConstructTree, allow_unknown_kinds: bool) -> Result<()> {
    for construct in tree.iter() {
        check_kind(&construct.path, &construct.props, allow_unknown_kinds)?;
        construct.props.check(&construct.path)?;

        for (property, reference) in construct.props.references() {
            if let Some(target) = tree.get(&reference.target) {
                check_attribute(&construct.path, &property, target.path.as_str(), &target.props, &reference.attribute)?;
            }
        }
    }
    Ok(())
}

/// Unknown kinds are rejected unless the stack opted in.
pub fn check_kind(path: &str, props: &ConstructProps, allow_unknown_kinds: bool) -> Result<()> {
    let kind = props.kind();
    if kind.is_known() {
        return Ok(());
    }
    if !allow_unknown_kinds {
        return Err(SynthError::schema(
            path,
            "type",
            format!(
                "unknown kind '{}' (enable allow_unknown_kinds to pass it through)",
                kind
            ),
        ));
    }
    warn!(construct = path, kind = %kind, "passing through unknown kind");
    Ok(())
}

fn check_attribute(
    consumer: &str,
    property: &str,
    target_path: &str,
    target: &ConstructProps,
    attribute: &str,
) -> Result<()> {
    if target.exposes(attribute) {
        return Ok(());
    }
    Err(SynthError::schema(
        consumer,
        property,
        format!(
            "'{}' ({}) has no attribute '{}' (expected one of: {})",
            target_path,
            target.kind(),
            attribute,
            target.attributes().join(", ")
        ),
    ))
}

/// Inputs to emission for one stack.
pub struct EmitContext<'a> {
    pub stack: &'a str,
    pub description: Option<&'a str>,
    pub tree: &'a ConstructTree,
    pub graph: &'a DependencyGraph,
    pub order: &'a [usize],
    pub outputs: &'a IndexMap<String, OutputProps>,
}

/// Lower the validated, ordered tree into a template.
pub fn emit(ctx: &EmitContext) -> Result<SynthesizedTemplate> {
    let tree = ctx.tree;
    let mut position = vec![usize::MAX; tree.len()];
    for (pos, &index) in ctx.order.iter().enumerate() {
        position[index] = pos;
    }

    let mut resolver = ValueResolver {
        tree,
        resolved: vec![None; tree.len()],
    };
    let mut resources = Vec::with_capacity(ctx.order.len());

    for &index in ctx.order {
        let construct = tree.node(index);
        let mut properties = IndexMap::new();
        for (name, value) in construct.props.properties() {
            let resolved = resolver.resolve(&construct.path, &name, &value)?;
            properties.insert(name, resolved);
        }

        let mut producers = ctx.graph.dependencies(index).to_vec();
        producers.sort_by_key(|&p| position[p]);
        let depends_on = producers
            .into_iter()
            .map(|p| tree.node(p).logical_id())
            .collect();

        debug!(construct = %construct.path, kind = %construct.props.kind(), "emitted");
        resources.push(ResourceDeclaration {
            kind: construct.props.kind().to_string(),
            logical_id: construct.logical_id(),
            path: construct.path.clone(),
            properties: properties.clone(),
            depends_on,
        });
        resolver.resolved[index] = Some(properties);
    }

    let mut outputs = IndexMap::with_capacity(ctx.outputs.len());
    for (name, output) in ctx.outputs {
        let consumer = format!("outputs/{}", name);
        let value = resolver.resolve(&consumer, "value", &output.value)?;
        outputs.insert(
            name.clone(),
            OutputDeclaration {
                value,
                description: output.description.clone(),
                export_name: output
                    .export_name
                    .clone()
                    .unwrap_or_else(|| format!("{}:{}", ctx.stack, name)),
            },
        );
    }

    let fingerprint = fingerprint(&resources, &outputs)?;
    Ok(SynthesizedTemplate {
        format_version: FORMAT_VERSION.to_string(),
        stack: ctx.stack.to_string(),
        metadata: TemplateMetadata {
            description: ctx.description.map(str::to_string),
            generator: generator(),
            fingerprint,
        },
        resources,
        outputs,
    })
}

fn fingerprint(
    resources: &[ResourceDeclaration],
    outputs: &IndexMap<String, OutputDeclaration>,
) -> Result<String> {
    let resources =
        serde_json::to_string(resources).map_err(|e| SynthError::Serialize(e.to_string()))?;
    let outputs =
        serde_json::to_string(outputs).map_err(|e| SynthError::Serialize(e.to_string()))?;
    Ok(hasher::composite_hash(&[&resources, &outputs]))
}

/// Second resolution phase: substitutes references against the properties
/// of constructs already emitted.
struct ValueResolver<'a> {
    tree: &'a ConstructTree,
    resolved: Vec<Option<IndexMap<String, Resolved>>>,
}

impl ValueResolver<'_> {
    fn resolve(&self, consumer: &str, property: &str, value: &Value) -> Result<Resolved> {
        use serde_json::Value as Json;

        if let Some(reason) = value.unrepresentable() {
            return Err(SynthError::schema(consumer, property, reason));
        }
        Ok(match value {
            Value::Null => Resolved::Literal(Json::Null),
            Value::Bool(b) => Resolved::Literal(Json::Bool(*b)),
            Value::Int(i) => Resolved::Literal(Json::from(*i)),
            Value::Float(f) => Resolved::Literal(
                serde_json::Number::from_f64(*f)
                    .map(Json::Number)
                    .ok_or_else(|| SynthError::schema(consumer, property, "not a finite number"))?,
            ),
            Value::Str(s) => Resolved::Literal(Json::String(s.clone())),
            Value::Ref(reference) => self.resolve_reference(consumer, property, reference)?,
            Value::List(items) => Resolved::list(
                items
                    .iter()
                    .map(|v| self.resolve(consumer, property, v))
                    .collect::<Result<_>>()?,
            ),
            Value::Map(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (k, v) in entries {
                    out.insert(k.clone(), self.resolve(consumer, property, v)?);
                }
                Resolved::map(out)
            }
        })
    }

    fn resolve_reference(
        &self,
        consumer: &str,
        property: &str,
        reference: &Reference,
    ) -> Result<Resolved> {
        let index = self.tree.index_of(&reference.target).ok_or_else(|| {
            SynthError::UnresolvedReference {
                construct: consumer.to_string(),
                target: reference.target.clone(),
            }
        })?;
        let producer = self.tree.node(index);
        check_attribute(
            consumer,
            property,
            &producer.path,
            &producer.props,
            &reference.attribute,
        )?;

        let known = producer
            .props
            .literal_source(&reference.attribute)
            .and_then(|source| self.resolved[index].as_ref()?.get(source));

        Ok(match known {
            Some(value) => value.clone(),
            None => Resolved::Deferred(DeferredExpr {
                logical_id: producer.logical_id(),
                attribute: reference.attribute.clone(),
            }),
        })
    }
}
