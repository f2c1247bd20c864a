//! One CLI conversion: resolve parameters, build or import the shape,
//! convert it in a kernel session, encode and write the artifact.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use brep_mesh::{MeshAssembler, TessellationParams};
use kernel_adapter::{AnalyticKernel, Kernel, KernelSession};
use mesh_export::{
    content_hash, export_ascii_stl, export_binary_stl, model_to_glb, save_model, ArtifactCache,
};
use mesh_types::ModelDescription;
use serde::Serialize;
use tracing::{debug, info};

use crate::{Cli, OutputFormat, Shape};

/// What [`run`] wrote.
#[derive(Debug)]
pub struct Written {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
}

/// Everything besides the shape source that changes the artifact bytes.
#[derive(Serialize)]
struct CacheSettings<'a> {
    format: OutputFormat,
    params: &'a TessellationParams,
    name: &'a str,
    color: &'a str,
}

pub fn output_format(cli: &Cli) -> Result<OutputFormat> {
    if let Some(format) = cli.format {
        return Ok(format);
    }
    let ext = cli
        .output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => Ok(OutputFormat::Json),
        Some("glb") => Ok(OutputFormat::Glb),
        Some("stl") => Ok(OutputFormat::Stl),
        _ => bail!(
            "cannot infer format from {}; use --format",
            cli.output.display()
        ),
    }
}

/// Parameters from `--params`, then the deflection flags on top.
pub fn resolve_params(cli: &Cli) -> Result<TessellationParams> {
    let mut params = match &cli.params {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading parameters from {}", path.display()))?;
            TessellationParams::from_json(&text)
                .with_context(|| format!("parsing parameters in {}", path.display()))?
        }
        None => TessellationParams::default(),
    };
    if let Some(linear) = cli.linear_deflection {
        params.linear_deflection = linear;
    }
    if let Some(angular) = cli.angular_deflection {
        params.angular_deflection = angular;
    }
    params.validate()?;
    Ok(params)
}

fn model_name(cli: &Cli) -> String {
    if let Some(name) = &cli.name {
        return name.clone();
    }
    match &cli.command {
        Shape::Import { input } => input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(brep_mesh::DEFAULT_MODEL_NAME)
            .to_string(),
        _ => brep_mesh::DEFAULT_MODEL_NAME.to_string(),
    }
}

/// Bytes that identify the shape: the document for imports, the command
/// itself for primitives.
fn shape_source(shape: &Shape) -> Result<Vec<u8>> {
    match shape {
        Shape::Import { input } => {
            fs::read(input).with_context(|| format!("reading shape from {}", input.display()))
        }
        primitive => Ok(serde_json::to_vec(primitive)?),
    }
}

/// Build the shape in a fresh kernel session and convert it.
pub fn convert_shape(
    shape: &Shape,
    source: &[u8],
    assembler: &MeshAssembler,
) -> Result<ModelDescription> {
    let session: KernelSession<AnalyticKernel, ModelDescription> =
        KernelSession::new(AnalyticKernel::new());
    let model = assembler
        .convert_in_session(&session, |k| match shape {
            Shape::Torus {
                major_radius,
                minor_radius,
            } => k.make_torus(*major_radius, *minor_radius),
            Shape::Cuboid { dx, dy, dz } => k.make_box(*dx, *dy, *dz),
            Shape::Sphere { radius } => k.make_sphere(*radius),
            Shape::Cylinder { radius, height } => k.make_cylinder(*radius, *height),
            Shape::Import { .. } => k.read_shape(source),
        })
        .map_err(|e| anyhow!("{}: {}", e.status(), e))?;
    Ok((*model).clone())
}

pub fn encode(model: &ModelDescription, format: OutputFormat) -> Result<Vec<u8>> {
    let body = model
        .parts
        .first()
        .ok_or_else(|| anyhow!("model has no parts"))?;
    Ok(match format {
        OutputFormat::Json => save_model(model)?.into_bytes(),
        OutputFormat::Glb => model_to_glb(model)?,
        OutputFormat::Stl => export_binary_stl(&body.shape, &model.name)?,
        OutputFormat::StlAscii => export_ascii_stl(&body.shape, &model.name)?.into_bytes(),
    })
}

fn produce(cli: &Cli, source: &[u8], assembler: &MeshAssembler, format: OutputFormat) -> Result<Vec<u8>> {
    let model = convert_shape(&cli.command, source, assembler)?;
    info!(
        name = %model.name,
        vertices = model.total_vertex_count(),
        triangles = model.total_triangle_count(),
        bb = ?model.bounding_box.to_array(),
        "model ready"
    );
    encode(&model, format)
}

pub fn run(cli: &Cli) -> Result<Written> {
    let format = output_format(cli)?;
    let params = resolve_params(cli)?;
    let name = model_name(cli);
    let assembler = MeshAssembler::new()
        .with_name(name.clone())
        .with_color(cli.color.clone())
        .with_params(params);
    let source = shape_source(&cli.command)?;

    let data = match &cli.cache_dir {
        Some(dir) => {
            let cache = ArtifactCache::new(dir)
                .with_context(|| format!("opening cache {}", dir.display()))?;
            let settings = CacheSettings {
                format,
                params: &params,
                name: &name,
                color: &cli.color,
            };
            let key = ArtifactCache::generate_key(&source, &settings)?;
            debug!(key = %key, "cache lookup");
            cache.get_or_insert_with(&key, || produce(cli, &source, &assembler, format))?
        }
        None => produce(cli, &source, &assembler, format)?,
    };

    write_output(&cli.output, &data)?;
    let written = Written {
        path: cli.output.clone(),
        sha256: content_hash(&data),
        bytes: data.len(),
    };
    info!(path = %written.path.display(), bytes = written.bytes, sha256 = %written.sha256, "written");
    Ok(written)
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("brep-convert-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("brep-convert").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn torus_defaults() {
        let cli = parse(&["torus"]);
        assert_eq!(
            cli.command,
            Shape::Torus {
                major_radius: 30.0,
                minor_radius: 10.0
            }
        );
        assert_eq!(output_format(&cli).unwrap(), OutputFormat::Json);
        assert_eq!(resolve_params(&cli).unwrap(), TessellationParams::default());
    }

    #[test]
    fn format_follows_extension_unless_given() {
        assert_eq!(output_format(&parse(&["sphere", "1", "-o", "a.GLB"])).unwrap(), OutputFormat::Glb);
        assert_eq!(output_format(&parse(&["sphere", "1", "-o", "a.stl"])).unwrap(), OutputFormat::Stl);
        assert_eq!(
            output_format(&parse(&["sphere", "1", "-o", "a.stl", "--format", "stl-ascii"])).unwrap(),
            OutputFormat::StlAscii
        );
        assert!(output_format(&parse(&["sphere", "1", "-o", "a.obj"])).is_err());
    }

    #[test]
    fn deflection_flags_override_file() {
        let dir = scratch("params");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("params.json");
        fs::write(&file, r#"{ "linear_deflection": 0.5, "edge_max_points": 50 }"#).unwrap();
        let cli = parse(&[
            "box", "1", "2", "3",
            "--params", file.to_str().unwrap(),
            "--angular-deflection", "0.25",
        ]);
        let params = resolve_params(&cli).unwrap();
        assert_eq!(params.linear_deflection, 0.5);
        assert_eq!(params.angular_deflection, 0.25);
        assert_eq!(params.edge_max_points, 50);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_deflection_rejected() {
        assert!(resolve_params(&parse(&["torus", "--linear-deflection=-1"])).is_err());
    }

    #[test]
    fn writes_each_format() {
        let dir = scratch("formats");
        for (file, magic) in [
            ("t.json", &b"{"[..]),
            ("t.glb", &b"glTF"[..]),
            ("t.stl", &b"binary STL"[..]),
        ] {
            let out = dir.join(file);
            let cli = parse(&["torus", "-o", out.to_str().unwrap(), "--name", "t"]);
            let written = run(&cli).unwrap();
            let data = fs::read(&out).unwrap();
            assert!(data.starts_with(magic), "{}", file);
            assert_eq!(written.sha256, content_hash(&data));
            assert_eq!(written.bytes, data.len());
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn import_uses_file_stem_as_name() {
        let dir = scratch("import");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("bracket.json");
        fs::write(
            &input,
            r#"{ "faces": [ { "triangulation": { "nodes": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[1,2,3]] } } ] }"#,
        )
        .unwrap();
        let out = dir.join("out.json");
        let cli = parse(&["import", input.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        run(&cli).unwrap();
        let model = mesh_export::load_model(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(model.name, "bracket");
        assert_eq!(model.id, "/bracket");
        assert_eq!(model.parts[0].shape.triangles, vec![0, 1, 2]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_import_reports_status() {
        let dir = scratch("bad-import");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("bad.step");
        fs::write(&input, "ISO-10303-21;").unwrap();
        let cli = parse(&["import", input.to_str().unwrap(), "-o", dir.join("o.glb").to_str().unwrap()]);
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().starts_with("shape could not be loaded"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn cache_returns_same_bytes() {
        let dir = scratch("cache");
        let cache = dir.join("cache");
        let out = dir.join("s.glb");
        let args = [
            "sphere", "2", "-o", out.to_str().unwrap(), "--cache-dir", cache.to_str().unwrap(),
        ];
        let first = run(&parse(&args)).unwrap();
        assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
        let second = run(&parse(&args)).unwrap();
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
        fs::remove_dir_all(&dir).unwrap();
    }
}
