//! CLI subcommands: init, validate, synth, graph.

pub mod logging;

use crate::core::app::App;
use crate::core::construct::ConstructTree;
use crate::core::stack::Stack;
use crate::core::types::SynthesizedTemplate;
use crate::core::{assembly, parser, resolver};
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Subcommand};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST: &str = "stacksmith.yaml";

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter manifest for a Python Lambda API
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Synthesize in memory and report problems without writing anything
    Validate {
        /// Path to the app manifest
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        file: PathBuf,
    },

    /// Synthesize templates and write the assembly directory
    Synth {
        /// Path to the app manifest
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        file: PathBuf,

        /// Assembly output directory
        #[arg(short, long, env = "STACKSMITH_OUTDIR", default_value = "stack.out")]
        out: PathBuf,

        /// Synthesize a single stack
        #[arg(short, long)]
        stack: Option<String>,

        /// Synthesize stacks on separate threads
        #[arg(long)]
        parallel: bool,
    },

    /// Print a stack's declaration order with each construct's dependencies
    Graph {
        /// Path to the app manifest
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        file: PathBuf,

        /// Stack to inspect
        #[arg(short, long)]
        stack: String,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Synth {
            file,
            out,
            stack,
            parallel,
        } => cmd_synth(&file, &out, stack.as_deref(), parallel),
        Commands::Graph { file, stack } => cmd_graph(&file, &stack),
    }
}

const STARTER_MANIFEST: &str = r#"version: "1.0"
app: python-lambda-api

stacks:
  PythonLambdaStack:
    description: Python FastAPI Lambda API deployed with CDK
    constructs:
      exec-role:
        type: role
        assumed_by: lambda.amazonaws.com
        managed_policies:
          - service-role/AWSLambdaBasicExecutionRole

      uploads:
        type: bucket
        versioned: true

      code:
        type: asset
        path: lambda/phobos/package
        exclude:
          - "**/__pycache__"
          - "tests/**"

      handler:
        type: function
        runtime: python3.12
        handler: app.main.handler
        code: { ref: code.location }
        role: { ref: exec-role.arn }
        memory_size: 512
        timeout: 30
        environment:
          AWS_S3_BUCKET: { ref: uploads.name }
          SUPABASE_URL: ""
          SUPABASE_KEY: ""

      uploads-access:
        type: policy
        role: { ref: exec-role.name }
        actions:
          - "s3:GetObject"
          - "s3:PutObject"
        resources:
          - { ref: uploads.arn }

      http:
        type: rest_api
        handler: { ref: handler.arn }
        description: FastAPI proxy

    outputs:
      ApiUrl:
        value: { ref: http.url }
        description: Endpoint URL
"#;

fn cmd_init(path: &Path) -> Result<()> {
    let manifest_path = path.join(DEFAULT_MANIFEST);
    if manifest_path.exists() {
        bail!("{} already exists", manifest_path.display());
    }

    std::fs::create_dir_all(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    std::fs::write(&manifest_path, STARTER_MANIFEST)
        .with_context(|| format!("cannot write {}", manifest_path.display()))?;

    println!("Initialized stacksmith app at {}", path.display());
    println!("  Created: {}", manifest_path.display());
    Ok(())
}

fn load(file: &Path) -> Result<(String, App)> {
    let (manifest, app) =
        parser::load_app(file).with_context(|| format!("cannot load {}", file.display()))?;
    Ok((manifest.app, app))
}

fn cmd_validate(file: &Path) -> Result<()> {
    let (name, mut app) = load(file)?;
    let templates = app.synthesize_all()?;
    let resources: usize = templates.values().map(|t| t.resources.len()).sum();
    let outputs: usize = templates.values().map(|t| t.outputs.len()).sum();
    println!(
        "OK: {} ({} stacks, {} resources, {} outputs)",
        name,
        templates.len(),
        resources,
        outputs
    );
    Ok(())
}

fn cmd_synth(file: &Path, out: &Path, only: Option<&str>, parallel: bool) -> Result<()> {
    let (name, mut app) = load(file)?;
    let templates = synthesize(&mut app, only, parallel)?;

    let manifest = assembly::write_assembly(out, &name, &templates)
        .with_context(|| format!("cannot write assembly to {}", out.display()))?;
    for entry in &manifest.stacks {
        println!(
            "  {} -> {} ({} resources, {})",
            entry.name,
            out.join(&entry.template).display(),
            entry.resources,
            entry.fingerprint
        );
    }
    println!("Synthesized {} stack(s) into {}", manifest.stacks.len(), out.display());
    Ok(())
}

fn synthesize(
    app: &mut App,
    only: Option<&str>,
    parallel: bool,
) -> Result<IndexMap<String, SynthesizedTemplate>> {
    match only {
        Some(name) => {
            let stack = app
                .stack_mut(name)
                .with_context(|| format!("no stack named '{}'", name))?;
            let template = stack.synthesize()?;
            Ok(IndexMap::from([(name.to_string(), template)]))
        }
        None if parallel => Ok(app.synthesize_all_parallel()?),
        None => Ok(app.synthesize_all()?),
    }
}

fn cmd_graph(file: &Path, stack_name: &str) -> Result<()> {
    let (_, app) = load(file)?;
    let stack = app
        .stack(stack_name)
        .with_context(|| format!("no stack named '{}'", stack_name))?;
    print!("{}", render_graph(stack)?);
    Ok(())
}

/// One line per construct in declaration order, followed by its producers,
/// then the ownership tree.
fn render_graph(stack: &Stack) -> Result<String> {
    let tree = stack.tree();
    let (graph, order) = resolver::build_declaration_order(tree)?;

    let mut out = String::new();
    writeln!(out, "{} ({} constructs)", stack.name(), order.len())?;
    for (pos, &index) in order.iter().enumerate() {
        let construct = tree.node(index);
        writeln!(
            out,
            "  {}. {} [{}] {}",
            pos + 1,
            construct.path,
            construct.props.kind(),
            construct.logical_id()
        )?;
        for &dep in graph.dependencies(index) {
            writeln!(out, "       <- {}", tree.node(dep).path)?;
        }
    }

    writeln!(out, "ownership:")?;
    for &root in tree.roots() {
        render_owned(&mut out, tree, root, 1)?;
    }
    Ok(out)
}

fn render_owned(
    out: &mut String,
    tree: &ConstructTree,
    index: usize,
    depth: usize,
) -> std::fmt::Result {
    let construct = tree.node(index);
    writeln!(out, "{}{}", "  ".repeat(depth), construct.id)?;
    for &child in construct.children() {
        render_owned(out, tree, child, depth + 1)?;
    }
    Ok(())
}
