// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` material compiler
//!
//! Compiles a material graph snapshot and prints:
//! - Compile diagnostics
//! - The normalized outline order
//! - The generated WGSL
//!
//! Without a snapshot argument the starter graph is compiled.

use ordoplay_material_graph::compiler::Material;
use ordoplay_material_graph::{
    compile_material_graph_with, create_initial_graph, emit_material, normalize_graph, ConnectionError,
    GraphOutline, GraphSnapshot, MaterialDefaults, SequentialEdgeIds,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const USAGE: &str = "usage: ordoplay_material [SNAPSHOT.ron] [--defaults DEFAULTS.ron] [--dump-snapshot]";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{USAGE}: {0}")]
    Usage(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] ron::Error),
    #[error("Failed to build starter graph: {0}")]
    Starter(#[from] ConnectionError),
}

#[derive(Debug, Default)]
struct Options {
    snapshot: Option<PathBuf>,
    defaults: Option<PathBuf>,
    dump_snapshot: bool,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, CliError> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--defaults" => {
                    let path = args
                        .next()
                        .ok_or_else(|| CliError::Usage("--defaults needs a path".to_string()))?;
                    options.defaults = Some(path.into());
                }
                "--dump-snapshot" => options.dump_snapshot = true,
                flag if flag.starts_with("--") => {
                    return Err(CliError::Usage(format!("unknown flag {flag}")));
                }
                _ if options.snapshot.is_some() => {
                    return Err(CliError::Usage("only one snapshot may be given".to_string()));
                }
                _ => options.snapshot = Some(arg.into()),
            }
        }
        Ok(options)
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_snapshot(path: Option<&Path>) -> Result<GraphSnapshot, CliError> {
    let Some(path) = path else {
        tracing::info!("No snapshot given, compiling the starter graph");
        return Ok(create_initial_graph(&mut SequentialEdgeIds::new())?.snapshot());
    };
    GraphSnapshot::from_ron(&read(path)?).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn load_defaults(path: Option<&Path>) -> Result<MaterialDefaults, CliError> {
    let Some(path) = path else {
        return Ok(MaterialDefaults::default());
    };
    MaterialDefaults::from_ron(&read(path)?).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn run(options: &Options) -> Result<(), CliError> {
    let snapshot = load_snapshot(options.snapshot.as_deref())?;
    if options.dump_snapshot {
        println!("{}", snapshot.to_ron()?);
        return Ok(());
    }
    let defaults = load_defaults(options.defaults.as_deref())?;

    let result = compile_material_graph_with(&snapshot, &defaults);
    for diagnostic in &result.diagnostics {
        println!("warning: {diagnostic}");
    }

    let outline = normalize_graph(&GraphOutline::from(&snapshot));
    for message in &outline.diagnostics.messages {
        println!("outline: {message}");
    }
    println!("// Nodes: {}", outline.ordered_node_ids.join(", "));

    match &result.material {
        Material::Node(material) => print!("{}", emit_material(material)),
        Material::Fallback(fallback) => println!("// Fallback material: {fallback:?}"),
    }
    Ok(())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_material_graph=debug,ordoplay_material_cli=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting OrdoPlay material compiler v{}", env!("CARGO_PKG_VERSION"));

    let result = Options::parse(std::env::args().skip(1)).and_then(|options| run(&options));
    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
