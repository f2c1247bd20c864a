//! Rich assertion helpers with diagnostic output.
//!
//! Every failure names the context and the expected vs actual values.

use mesh_export::{load_model, model_to_glb, read_glb, save_model};
use mesh_types::ModelDescription;

use crate::helpers::HarnessError;
use crate::oracle::OracleVerdict;

/// Assert the model bounding box `[xmin, xmax, ymin, ymax, zmin, zmax]`
/// matches within tolerance.
pub fn assert_bounding_box(
    model: &ModelDescription,
    expected: [f64; 6],
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    const LABELS: [&str; 6] = ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"];
    let actual = model.bounding_box.to_array();
    for i in 0..6 {
        if (actual[i] - expected[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box {}: expected {:.6}, got {:.6} (tol={})",
                    ctx, LABELS[i], expected[i], actual[i], tol,
                ),
            });
        }
    }
    Ok(())
}

/// Assert every verdict passed, listing all failures otherwise.
pub fn assert_all_pass(verdicts: &[OracleVerdict], ctx: &str) -> Result<(), HarnessError> {
    let failures: Vec<&OracleVerdict> = verdicts.iter().filter(|v| !v.passed).collect();
    match failures.as_slice() {
        [] => Ok(()),
        [only] => Err(HarnessError::OracleFailure {
            oracle: only.oracle_name.clone(),
            detail: format!("[{}] {}", ctx, only.detail),
        }),
        many => Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] {} oracles failed:\n{}",
                ctx,
                many.len(),
                many.iter()
                    .map(|v| format!("  {}: {}", v.oracle_name, v.detail))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }),
    }
}

/// Assert the triangle count of the named part lies in `min..=max`.
pub fn assert_triangle_count(
    model: &ModelDescription,
    part: &str,
    min: usize,
    max: usize,
    ctx: &str,
) -> Result<(), HarnessError> {
    let shape = &model
        .part(part)
        .ok_or_else(|| HarnessError::AssertionFailed {
            detail: format!(
                "[{}] part {:?} missing. Available: [{}]",
                ctx,
                part,
                model
                    .parts
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        })?
        .shape;
    let n = shape.triangle_count();
    if (min..=max).contains(&n) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected {}..={} triangles, got {}", ctx, min, max, n),
        })
    }
}

/// Assert the first part's mesh comes back bit-identical from both the JSON
/// and the GLB transport.
pub fn assert_transport_identical(
    model: &ModelDescription,
    ctx: &str,
) -> Result<(), HarnessError> {
    let part = model.parts.first().ok_or_else(|| HarnessError::AssertionFailed {
        detail: format!("[{}] model has no parts", ctx),
    })?;

    let from_json = load_model(&save_model(model)?)?;
    let json_mesh = from_json.parts.into_iter().next().map(|p| p.shape).unwrap_or_default();
    let glb_mesh = read_glb(&model_to_glb(model)?)?;

    for (transport, mesh) in [("json", &json_mesh), ("glb", &glb_mesh)] {
        if mesh != &part.shape {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] {} transport changed the mesh: {} vertices/{} triangles/{} segments \
                     became {}/{}/{}",
                    ctx,
                    transport,
                    part.shape.vertex_count(),
                    part.shape.triangle_count(),
                    part.shape.segment_count(),
                    mesh.vertex_count(),
                    mesh.triangle_count(),
                    mesh.segment_count(),
                ),
            });
        }
    }
    Ok(())
}
