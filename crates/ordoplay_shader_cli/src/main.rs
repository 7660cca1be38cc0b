// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` shader graph compiler.
//!
//! Reads a RON graph document, compiles it with one backend and writes one
//! GLSL file per stage plus a JSON manifest describing what the host has to
//! bind. With `--watch` the document is recompiled on every change; a failed
//! recompile leaves the previous files in place.

mod output;
mod settings;
mod watch;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use ordoplay_shader_graph::CompileContext;
use output::Compiler;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "ordoplay_shader_graph=info,ordoplay_shader_cli=info";

/// Compilation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Vertex and fragment shader
    Material,
    /// One simulation shader per particle state texture
    Particles,
    /// Point builder function
    Points,
}

impl Backend {
    /// Name used in file names and the manifest
    pub fn name(self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Particles => "particles",
            Self::Points => "points",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ordoplay_shader_cli", version, about = "Compile OrdoPlay shader graphs to GLSL")]
struct Cli {
    /// Graph document (.ron)
    document: Option<PathBuf>,

    /// Backend to compile with
    #[arg(short, long, value_enum, default_value_t = Backend::Material)]
    backend: Backend,

    /// Compiler configuration (.ron)
    #[arg(short, long, env = "ORDOPLAY_SHADER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the stage files and manifest are written to
    #[arg(short, long, default_value = "shaders")]
    out: PathBuf,

    /// Recompile whenever the document changes
    #[arg(short, long)]
    watch: bool,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = settings::load_config(cli.config.as_deref())?;
    if cli.print_config {
        println!("{}", config.to_ron_string()?);
        return Ok(());
    }
    let Some(document) = cli.document else {
        anyhow::bail!("no graph document given");
    };

    tracing::debug!("ordoplay_shader_cli v{}", env!("CARGO_PKG_VERSION"));
    let context = CompileContext::new(config);
    let mut compiler = Compiler::new(cli.backend);
    if cli.watch {
        return watch::run(&document, &cli.out, &mut compiler, &context);
    }

    let mut graph = settings::load_document(&document)?;
    let artifacts = compiler.compile(&mut graph, &context)?;
    let written = output::write(&cli.out, &artifacts)?;
    tracing::info!(
        backend = cli.backend.name(),
        files = written.len(),
        "Wrote {}",
        cli.out.display()
    );
    Ok(())
}
