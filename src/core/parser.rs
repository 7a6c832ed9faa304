//! YAML app manifests.
//!
//! Parses a manifest and lowers it into an [`App`]:
//! - Version must be "1.0"
//! - Stacks are registered in document order
//! - Constructs (and their `children`) are added depth-first in document
//!   order, so document order is the insertion-order tie-break
//! - Kind properties are lowered into typed records; unknown keys on a
//!   known kind are schema errors

use super::app::App;
use super::error::{Result, SynthError};
use super::stack::{OutputProps, Stack, StackProps};
use super::types::*;
use crate::resources::ConstructProps;
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

pub const MANIFEST_VERSION: &str = "1.0";

/// Parse a manifest file from disk.
pub fn parse_manifest_file(path: &Path) -> Result<AppManifest> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SynthError::Manifest(format!("failed to read {}: {}", path.display(), e)))?;
    parse_manifest(&content)
}

/// Parse a manifest from a string and check its version.
pub fn parse_manifest(yaml: &str) -> Result<AppManifest> {
    let manifest: AppManifest = serde_yaml_ng::from_str(yaml)
        .map_err(|e| SynthError::Manifest(format!("YAML parse error: {}", e)))?;

    if manifest.version != MANIFEST_VERSION {
        return Err(SynthError::Manifest(format!(
            "version must be \"{}\", got \"{}\"",
            MANIFEST_VERSION, manifest.version
        )));
    }
    if manifest.app.trim().is_empty() {
        return Err(SynthError::Manifest("app must not be empty".to_string()));
    }
    Ok(manifest)
}

/// Lower a parsed manifest into an unsynthesized app. Errors inside a stack
/// are wrapped with the stack name.
pub fn build_app(manifest: &AppManifest) -> Result<App> {
    let mut app = App::new();
    for (name, decl) in &manifest.stacks {
        let props = StackProps {
            description: decl.description.clone(),
            allow_unknown_kinds: decl.allow_unknown_kinds,
        };
        let stack = app.add_stack(name, props)?;
        populate_stack(stack, decl).map_err(|e| SynthError::Stack {
            stack: name.clone(),
            source: Box::new(e),
        })?;
        debug!(stack = %name, constructs = stack.tree().len(), "stack loaded");
    }
    Ok(app)
}

/// Parse and lower in one step.
pub fn load_app(path: &Path) -> Result<(AppManifest, App)> {
    let manifest = parse_manifest_file(path)?;
    let app = build_app(&manifest)?;
    Ok((manifest, app))
}

fn populate_stack(stack: &mut Stack, decl: &StackDecl) -> Result<()> {
    add_constructs(stack, None, &decl.constructs)?;

    for (name, output) in &decl.outputs {
        stack.add_output(
            name,
            OutputProps {
                value: output.value.clone(),
                description: output.description.clone(),
                export_name: output.export_name.clone(),
            },
        )?;
    }
    Ok(())
}

fn add_constructs(
    stack: &mut Stack,
    parent: Option<&str>,
    constructs: &IndexMap<String, ConstructDecl>,
) -> Result<()> {
    for (id, decl) in constructs {
        let path = match parent {
            Some(p) => format!("{}/{}", p, id),
            None => id.clone(),
        };
        let props = ConstructProps::from_bag(&path, &decl.kind, &decl.properties)?;
        let path = stack.add_construct(parent, id, props)?;
        for on in &decl.depends_on {
            stack.add_dependency(&path, on)?;
        }
        add_constructs(stack, Some(&path), &decl.children)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ConstructKind;

    const PYTHON_API: &str = r#"
version: "1.0"
app: python-api
stacks:
  PythonLambdaStack:
    description: Python FastAPI Lambda API deployed with CDK
    constructs:
      exec-role:
        type: role
        assumed_by: lambda.amazonaws.com
        managed_policies:
          - service-role/AWSLambdaBasicExecutionRole
      code:
        type: asset
        path: lambda/phobos/package
      handler:
        type: function
        runtime: python3.12
        handler: app.main.handler
        code: { ref: code.location }
        role: { ref: exec-role.arn }
        timeout: 30
        environment:
          AWS_S3_BUCKET: uploads
      http:
        type: rest_api
        handler: { ref: handler.arn }
    outputs:
      ApiUrl:
        value: { ref: http.url }
        description: Endpoint URL
"#;

    #[test]
    fn test_parse_valid() {
        let m = parse_manifest(PYTHON_API).unwrap();
        assert_eq!(m.app, "python-api");
        let stack = &m.stacks["PythonLambdaStack"];
        let ids: Vec<_> = stack.constructs.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["exec-role", "code", "handler", "http"]);
        assert_eq!(stack.constructs["handler"].kind, "function");
        assert_eq!(
            stack.constructs["handler"].properties["role"],
            Value::reference("exec-role", "arn")
        );
        assert!(!stack.constructs["handler"].properties.contains_key("type"));
    }

    #[test]
    fn test_bad_version() {
        let yaml = "version: \"2.0\"\napp: x\n";
        let err = parse_manifest(yaml).unwrap_err();
        assert!(matches!(err, SynthError::Manifest(m) if m.contains("2.0")));
    }

    #[test]
    fn test_empty_app_name() {
        let yaml = "version: \"1.0\"\napp: \"\"\n";
        assert!(matches!(parse_manifest(yaml), Err(SynthError::Manifest(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse_manifest("{{not yaml"),
            Err(SynthError::Manifest(_))
        ));
    }

    #[test]
    fn test_build_and_synthesize() {
        let m = parse_manifest(PYTHON_API).unwrap();
        let mut app = build_app(&m).unwrap();
        let templates = app.synthesize_all().unwrap();
        let t = &templates["PythonLambdaStack"];
        let order: Vec<_> = t.resources.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(order, vec!["exec-role", "code", "handler", "http"]);
        assert_eq!(
            t.metadata.description.as_deref(),
            Some("Python FastAPI Lambda API deployed with CDK")
        );
        assert_eq!(t.outputs["ApiUrl"].description.as_deref(), Some("Endpoint URL"));
        assert_eq!(
            t.resource("handler").unwrap().properties["timeout"],
            Resolved::Literal(serde_json::json!(30))
        );
    }

    #[test]
    fn test_children_and_depends_on() {
        let yaml = r#"
version: "1.0"
app: nested
stacks:
  data:
    constructs:
      storage:
        type: bucket
        children:
          seed:
            type: asset
            path: seed/
      loader-role:
        type: role
        assumed_by: lambda.amazonaws.com
        depends_on: [storage/seed]
"#;
        let app = build_app(&parse_manifest(yaml).unwrap()).unwrap();
        let stack = app.stack("data").unwrap();
        let seed = stack.construct("storage/seed").unwrap();
        assert_eq!(seed.props.kind(), ConstructKind::Asset);
        assert_eq!(stack.construct("loader-role").unwrap().depends_on, vec!["storage/seed"]);
    }

    #[test]
    fn test_unknown_property_rejected() {
        let yaml = r#"
version: "1.0"
app: typo
stacks:
  api:
    constructs:
      role:
        type: role
        assumed_by: lambda.amazonaws.com
        assume_by: typo
"#;
        let err = build_app(&parse_manifest(yaml).unwrap()).unwrap_err();
        assert!(matches!(&err, SynthError::Stack { stack, .. } if stack == "api"));
        match err.root() {
            SynthError::SchemaValidation {
                construct,
                property,
                ..
            } => {
                assert_eq!(construct, "role");
                assert_eq!(property, "assume_by");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_requires_opt_in() {
        let strict = r#"
version: "1.0"
app: q
stacks:
  jobs:
    constructs:
      queue:
        type: queue
        visibility_timeout: 30
"#;
        let err = build_app(&parse_manifest(strict).unwrap()).unwrap_err();
        assert!(matches!(err.root(), SynthError::SchemaValidation { .. }));

        let lenient = strict.replace("  jobs:\n", "  jobs:\n    allow_unknown_kinds: true\n");
        let mut app = build_app(&parse_manifest(&lenient).unwrap()).unwrap();
        let t = app.synthesize_all().unwrap();
        assert_eq!(t["jobs"].resources[0].kind, "queue");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stacksmith.yaml");
        std::fs::write(&path, PYTHON_API).unwrap();
        let (manifest, app) = load_app(&path).unwrap();
        assert_eq!(manifest.stacks.len(), 1);
        assert_eq!(app.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_manifest_file(Path::new("/nonexistent/stacksmith.yaml")).unwrap_err();
        assert!(matches!(err, SynthError::Manifest(m) if m.contains("failed to read")));
    }
}
