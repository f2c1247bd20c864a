//! brep-convert: turn a B-Rep shape into a render mesh file.
//!
//! Usage: brep-convert [OPTIONS] <COMMAND>
//!
//! The shape is either a built-in primitive or an imported shape document.
//! The output format follows the `--output` extension (`.json`, `.glb`,
//! `.stl`) unless `--format` says otherwise.

mod convert;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brep-convert")]
#[command(author, version, about = "B-Rep to render mesh converter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Shape,

    /// Output file
    #[arg(short, long, global = true, default_value = "model.json")]
    pub output: PathBuf,

    /// Output format (default: from the output extension)
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Tessellation parameters as a JSON file
    #[arg(long, global = true)]
    pub params: Option<PathBuf>,

    /// Linear deflection, overrides the parameter file
    #[arg(long, global = true)]
    pub linear_deflection: Option<f64>,

    /// Angular deflection in radians, overrides the parameter file
    #[arg(long, global = true)]
    pub angular_deflection: Option<f64>,

    /// Model name
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Part color as #rrggbb
    #[arg(long, global = true, default_value = brep_mesh::DEFAULT_COLOR)]
    pub color: String,

    /// Reuse results from this cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Shape {
    /// Torus around +Z
    Torus {
        #[arg(default_value = "30")]
        major_radius: f64,
        #[arg(default_value = "10")]
        minor_radius: f64,
    },

    /// Box with one corner at the origin
    #[command(name = "box")]
    #[serde(rename = "box")]
    Cuboid { dx: f64, dy: f64, dz: f64 },

    /// Sphere centered at the origin
    Sphere { radius: f64 },

    /// Cylinder along +Z from the origin
    Cylinder { radius: f64, height: f64 },

    /// Shape document (JSON)
    Import { input: PathBuf },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Viewer JSON
    Json,
    /// Binary glTF
    Glb,
    /// Binary STL
    Stl,
    /// ASCII STL
    StlAscii,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let written = convert::run(&cli)?;
    println!("{}  {}", written.sha256, written.path.display());
    Ok(())
}
