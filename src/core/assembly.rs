//! Cloud assembly: the directory of synthesized templates handed to the
//! deployment driver.
//!
//! Layout:
//! - `<out>/<stack>.template.json` per stack
//! - `<out>/manifest.json` listing stacks in synthesis order
//!
//! Every file is written to a temp path and renamed into place, so a reader
//! never observes a half-written template.

use super::error::{Result, SynthError};
use super::types::SynthesizedTemplate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ASSEMBLY_MANIFEST: &str = "manifest.json";

/// Index of an assembly directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    pub version: String,
    pub app: String,
    pub generator: String,
    pub stacks: Vec<AssemblyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyEntry {
    pub name: String,
    /// File name relative to the assembly directory
    pub template: String,
    pub fingerprint: String,
    pub resources: usize,
}

/// Template file name for a stack.
pub fn template_file_name(stack: &str) -> String {
    format!("{}.template.json", stack)
}

/// Write every template plus the assembly manifest into `out_dir`.
pub fn write_assembly(
    out_dir: &Path,
    app: &str,
    templates: &IndexMap<String, SynthesizedTemplate>,
) -> Result<AssemblyManifest> {
    std::fs::create_dir_all(out_dir).map_err(|e| io_error(out_dir, e))?;

    let mut stacks = Vec::with_capacity(templates.len());
    for (name, template) in templates {
        let file = template_file_name(name);
        let json = template
            .to_json()
            .map_err(|e| SynthError::Serialize(e.to_string()))?;
        write_atomic(&out_dir.join(&file), &json)?;
        debug!(stack = %name, file = %file, "template written");

        stacks.push(AssemblyEntry {
            name: name.clone(),
            template: file,
            fingerprint: template.metadata.fingerprint.clone(),
            resources: template.resources.len(),
        });
    }

    let manifest = AssemblyManifest {
        version: super::synth::FORMAT_VERSION.to_string(),
        app: app.to_string(),
        generator: super::synth::generator(),
        stacks,
    };
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| SynthError::Serialize(e.to_string()))?;
    write_atomic(&out_dir.join(ASSEMBLY_MANIFEST), &json)?;

    info!(dir = %out_dir.display(), stacks = manifest.stacks.len(), "assembly written");
    Ok(manifest)
}

/// Read the assembly manifest back from `out_dir`.
pub fn read_manifest(out_dir: &Path) -> Result<AssemblyManifest> {
    let path = out_dir.join(ASSEMBLY_MANIFEST);
    let content = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| SynthError::Manifest(format!("{}: {}", path.display(), e)))
}

/// Temp file + rename. Content gets a trailing newline.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp_path = tmp_path(path);
    let mut body = String::with_capacity(content.len() + 1);
    body.push_str(content);
    body.push('\n');

    std::fs::write(&tmp_path, body).map_err(|e| io_error(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| io_error(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(path: &Path, e: std::io::Error) -> SynthError {
    SynthError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::App;
    use crate::core::stack::StackProps;
    use crate::core::types::Value;
    use crate::resources::*;

    fn templates() -> IndexMap<String, SynthesizedTemplate> {
        let mut app = App::new();
        for name in ["storage", "api"] {
            let stack = app.add_stack(name, StackProps::default()).unwrap();
            stack
                .add_construct(None, "role", ConstructProps::Role(RoleProps::new("lambda.amazonaws.com")))
                .unwrap();
            stack
                .add_construct(
                    None,
                    "policy",
                    ConstructProps::Policy(PolicyProps {
                        role: Value::reference("role", "name"),
                        actions: vec!["s3:GetObject".into()],
                        resources: vec![Value::Str("*".into())],
                        policy_name: None,
                    }),
                )
                .unwrap();
        }
        app.synthesize_all().unwrap()
    }

    #[test]
    fn test_write_assembly_layout() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stack.out");
        let templates = templates();
        let manifest = write_assembly(&out, "demo", &templates).unwrap();

        assert_eq!(manifest.stacks.len(), 2);
        assert_eq!(manifest.stacks[0].name, "storage");
        assert_eq!(manifest.stacks[1].template, "api.template.json");
        assert_eq!(manifest.stacks[1].resources, 2);
        assert_eq!(read_manifest(&out).unwrap(), manifest);

        let json = std::fs::read_to_string(out.join("api.template.json")).unwrap();
        assert!(json.ends_with("}\n"));
        assert_eq!(json.trim_end(), templates["api"].to_json().unwrap());
    }

    #[test]
    fn test_no_temp_files_left() {
        let dir = tempfile::tempdir().unwrap();
        write_assembly(dir.path(), "demo", &templates()).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_rewrite_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        write_assembly(dir.path(), "demo", &templates()).unwrap();
        let first = std::fs::read(dir.path().join("storage.template.json")).unwrap();
        write_assembly(dir.path(), "demo", &templates()).unwrap();
        let second = std::fs::read(dir.path().join("storage.template.json")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_assembly(&blocker.join("out"), "demo", &templates()).unwrap_err();
        assert!(matches!(err, SynthError::Io { .. }));
    }

    #[test]
    fn test_tmp_path() {
        assert_eq!(
            tmp_path(Path::new("/out/api.template.json")),
            PathBuf::from("/out/api.template.json.tmp")
        );
    }
}
