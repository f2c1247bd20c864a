//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail instead of
//! panicking, so a test can collect all failures in one pass.

use std::collections::HashMap;

use mesh_types::{ModelDescription, RenderMesh};

use crate::helpers::{mesh_bounding_box, triangle_normal};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

fn point(mesh: &RenderMesh, index: u32) -> Option<[f64; 3]> {
    mesh.vertex(index as usize)
        .map(|v| [v[0] as f64, v[1] as f64, v[2] as f64])
}

fn stored_normal(mesh: &RenderMesh, index: u32) -> Option<[f64; 3]> {
    mesh.normal(index as usize)
        .map(|v| [v[0] as f64, v[1] as f64, v[2] as f64])
}

// ── Mesh Layout Oracles ─────────────────────────────────────────────────────

/// Check buffer lengths: positions and normals in triples of equal length,
/// indices in triples, edge segments in sixes.
pub fn check_buffer_layout(mesh: &RenderMesh) -> OracleVerdict {
    let mut problems = Vec::new();
    if mesh.vertices.len() % 3 != 0 {
        problems.push(format!("vertices.len()={} not a multiple of 3", mesh.vertices.len()));
    }
    if mesh.normals.len() != mesh.vertices.len() {
        problems.push(format!(
            "normals.len()={} != vertices.len()={}",
            mesh.normals.len(),
            mesh.vertices.len()
        ));
    }
    if mesh.triangles.len() % 3 != 0 {
        problems.push(format!("triangles.len()={} not a multiple of 3", mesh.triangles.len()));
    }
    if mesh.edge_segments.len() % 6 != 0 {
        problems.push(format!("edges.len()={} not a multiple of 6", mesh.edge_segments.len()));
    }
    if problems.is_empty() {
        OracleVerdict::pass("buffer_layout", "buffers well formed".to_string())
    } else {
        OracleVerdict::fail("buffer_layout", problems.join("; "))
    }
}

/// Check that all index values are within bounds.
pub fn check_valid_indices(mesh: &RenderMesh) -> OracleVerdict {
    let vertex_count = mesh.vertex_count();
    let bad: Vec<(usize, u32)> = mesh
        .triangles
        .iter()
        .enumerate()
        .filter(|(_, &idx)| idx as usize >= vertex_count)
        .map(|(i, &idx)| (i, idx))
        .collect();

    if bad.is_empty() {
        OracleVerdict::pass("valid_indices", format!("all indices < {}", vertex_count))
    } else {
        OracleVerdict::fail(
            "valid_indices",
            format!(
                "{} out-of-bounds indices (vertex_count={}): {:?}",
                bad.len(),
                vertex_count,
                &bad[..bad.len().min(5)]
            ),
        )
    }
}

/// Check that all stored normals have approximately unit length.
pub fn check_unit_normals(mesh: &RenderMesh) -> OracleVerdict {
    let total = mesh.normals.len() / 3;
    let bad = mesh
        .normals
        .chunks_exact(3)
        .filter(|n| ((n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt() - 1.0).abs() > 1e-3)
        .count();

    if bad == 0 {
        OracleVerdict::pass("unit_normals", format!("all {} normals are unit length", total))
    } else {
        OracleVerdict::fail(
            "unit_normals",
            format!("{} of {} normals are not unit length", bad, total),
        )
    }
}

/// Check that the winding of every non-degenerate triangle agrees with the
/// average of its stored vertex normals.
pub fn check_consistent_normals(mesh: &RenderMesh) -> OracleVerdict {
    let total = mesh.triangle_count();
    let mut inconsistent = 0usize;

    for tri in mesh.triangles.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (point(mesh, tri[0]), point(mesh, tri[1]), point(mesh, tri[2]))
        else {
            continue;
        };
        let (Some(na), Some(nb), Some(nc)) = (
            stored_normal(mesh, tri[0]),
            stored_normal(mesh, tri[1]),
            stored_normal(mesh, tri[2]),
        ) else {
            continue;
        };
        let g = triangle_normal([a, b, c]);
        if (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt() < 1e-9 {
            continue;
        }
        let dot = (0..3).map(|k| g[k] * (na[k] + nb[k] + nc[k])).sum::<f64>();
        if dot <= 0.0 {
            inconsistent += 1;
        }
    }

    if inconsistent == 0 {
        OracleVerdict::pass(
            "consistent_normals",
            format!("all {} triangles have consistent winding", total),
        )
    } else {
        OracleVerdict::fail(
            "consistent_normals",
            format!("{} of {} triangles have reversed normals", inconsistent, total),
        )
        .with_value(inconsistent as f64)
    }
}

/// Check that no triangle has zero area.
pub fn check_no_degenerate_triangles(mesh: &RenderMesh) -> OracleVerdict {
    let total = mesh.triangle_count();
    let degenerate = mesh
        .triangles
        .chunks_exact(3)
        .filter_map(|tri| Some([point(mesh, tri[0])?, point(mesh, tri[1])?, point(mesh, tri[2])?]))
        .filter(|&t| {
            let n = triangle_normal(t);
            (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt() / 2.0 < 1e-12
        })
        .count();

    if degenerate == 0 {
        OracleVerdict::pass(
            "no_degenerate_triangles",
            format!("all {} triangles have non-zero area", total),
        )
    } else {
        OracleVerdict::fail(
            "no_degenerate_triangles",
            format!("{} of {} triangles are degenerate", degenerate, total),
        )
    }
}

/// Check that the mesh is watertight: every triangle edge is shared by
/// exactly two triangles.
///
/// Edges are matched by position (quantized to 1e-4), since faces do not
/// share vertex indices.
pub fn check_watertight_mesh(mesh: &RenderMesh) -> OracleVerdict {
    type Key = (i64, i64, i64);

    fn quantize(v: f32) -> i64 {
        (v as f64 * 10000.0).round() as i64
    }

    let key = |idx: u32| -> Option<Key> {
        let v = mesh.vertex(idx as usize)?;
        Some((quantize(v[0]), quantize(v[1]), quantize(v[2])))
    };

    let mut edge_counts: HashMap<(Key, Key), usize> = HashMap::new();
    for tri in mesh.triangles.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (key(tri[0]), key(tri[1]), key(tri[2])) else {
            continue;
        };
        for (p, q) in [(a, b), (b, c), (c, a)] {
            let e = if p <= q { (p, q) } else { (q, p) };
            *edge_counts.entry(e).or_insert(0) += 1;
        }
    }

    let non_paired = edge_counts.values().filter(|&&c| c != 2).count();
    if non_paired == 0 {
        OracleVerdict::pass(
            "watertight_mesh",
            format!("all {} edges paired", edge_counts.len()),
        )
    } else {
        OracleVerdict::fail(
            "watertight_mesh",
            format!("{} unpaired edges out of {} total", non_paired, edge_counts.len()),
        )
    }
}

// ── Model Oracles ───────────────────────────────────────────────────────────

/// Check that the model's bounding box contains every vertex of every part,
/// compared exactly against the stored `f32` positions.
pub fn check_bbox_contains_vertices(model: &ModelDescription) -> OracleVerdict {
    let bb = &model.bounding_box;

    let mut outside = 0usize;
    let mut total = 0usize;
    for part in &model.parts {
        for i in 0..part.shape.vertex_count() {
            total += 1;
            let Some(v) = point(&part.shape, i as u32) else {
                continue;
            };
            if !bb.contains(v) {
                outside += 1;
            }
        }
    }

    if outside == 0 {
        OracleVerdict::pass("bbox_contains_vertices", format!("{} vertices inside", total))
    } else {
        OracleVerdict::fail(
            "bbox_contains_vertices",
            format!("{} of {} vertices outside {:?}", outside, total, bb.to_array()),
        )
    }
}

/// Check that the mesh bounding box matches expected bounds.
pub fn check_bounding_box(
    mesh: &RenderMesh,
    expected_min: [f32; 3],
    expected_max: [f32; 3],
    tolerance: f32,
) -> OracleVerdict {
    let Some((actual_min, actual_max)) = mesh_bounding_box(mesh) else {
        return OracleVerdict::fail("bounding_box", "mesh has no vertices".to_string());
    };

    for i in 0..3 {
        if (actual_min[i] - expected_min[i]).abs() > tolerance {
            return OracleVerdict::fail(
                "bounding_box",
                format!(
                    "min[{}]: expected {:.4}, got {:.4} (tol={})",
                    i, expected_min[i], actual_min[i], tolerance
                ),
            );
        }
        if (actual_max[i] - expected_max[i]).abs() > tolerance {
            return OracleVerdict::fail(
                "bounding_box",
                format!(
                    "max[{}]: expected {:.4}, got {:.4} (tol={})",
                    i, expected_max[i], actual_max[i], tolerance
                ),
            );
        }
    }
    OracleVerdict::pass(
        "bounding_box",
        format!("min={:?} max={:?}", actual_min, actual_max),
    )
}

// ── Composite ───────────────────────────────────────────────────────────────

/// Run all mesh checks that hold for any conversion output.
pub fn run_all_mesh_checks(mesh: &RenderMesh) -> Vec<OracleVerdict> {
    vec![
        check_buffer_layout(mesh),
        check_valid_indices(mesh),
        check_unit_normals(mesh),
        check_no_degenerate_triangles(mesh),
    ]
}

/// Run every part through [`run_all_mesh_checks`] plus the model checks.
pub fn run_model_checks(model: &ModelDescription) -> Vec<OracleVerdict> {
    let mut verdicts: Vec<OracleVerdict> = model
        .parts
        .iter()
        .flat_map(|p| run_all_mesh_checks(&p.shape))
        .collect();
    verdicts.push(check_bbox_contains_vertices(model));
    verdicts
}
