//! Helper functions: error type and mesh math.

use std::collections::HashMap;

use brep_mesh::ConvertError;
use kernel_adapter::KernelError;
use mesh_export::ExportError;
use mesh_types::RenderMesh;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("model not found: {name}")]
    ModelNotFound { name: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

// ── Mesh Math Utilities ─────────────────────────────────────────────────────

fn corner(mesh: &RenderMesh, index: u32) -> Option<[f64; 3]> {
    mesh.vertex(index as usize)
        .map(|v| [v[0] as f64, v[1] as f64, v[2] as f64])
}

fn triangles(mesh: &RenderMesh) -> impl Iterator<Item = [[f64; 3]; 3]> + '_ {
    mesh.triangles.chunks_exact(3).filter_map(move |tri| {
        Some([
            corner(mesh, tri[0])?,
            corner(mesh, tri[1])?,
            corner(mesh, tri[2])?,
        ])
    })
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Unnormalized geometric normal of a triangle from its winding.
pub fn triangle_normal(t: [[f64; 3]; 3]) -> [f64; 3] {
    cross(sub(t[1], t[0]), sub(t[2], t[0]))
}

/// Axis-aligned bounding box of the mesh vertices. `None` for an empty mesh.
pub fn mesh_bounding_box(mesh: &RenderMesh) -> Option<([f32; 3], [f32; 3])> {
    if mesh.vertices.len() < 3 {
        return None;
    }
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for chunk in mesh.vertices.chunks_exact(3) {
        for i in 0..3 {
            min[i] = min[i].min(chunk[i]);
            max[i] = max[i].max(chunk[i]);
        }
    }
    Some((min, max))
}

/// Signed-tetrahedron volume of a triangle mesh.
///
/// For a closed, outward-wound mesh this is the enclosed volume.
pub fn mesh_volume(mesh: &RenderMesh) -> f64 {
    let volume: f64 = triangles(mesh)
        .map(|[a, b, c]| {
            let bc = cross(b, c);
            a[0] * bc[0] + a[1] * bc[1] + a[2] * bc[2]
        })
        .sum();
    volume / 6.0
}

/// Total surface area of a triangle mesh.
pub fn mesh_surface_area(mesh: &RenderMesh) -> f64 {
    triangles(mesh)
        .map(|t| {
            let n = triangle_normal(t);
            (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt() / 2.0
        })
        .sum()
}

/// Count mesh edges by index: returns (total_edges, boundary_edges).
///
/// A boundary edge is used by exactly one triangle.
pub fn count_mesh_edges(mesh: &RenderMesh) -> (usize, usize) {
    let mut edge_counts: HashMap<(u32, u32), usize> = HashMap::new();
    for tri in mesh.triangles.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            *edge_counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    let total = edge_counts.len();
    let boundary = edge_counts.values().filter(|&&c| c == 1).count();
    (total, boundary)
}

/// Total length of the edge polyline segments.
pub fn edge_length(mesh: &RenderMesh) -> f64 {
    mesh.segments()
        .map(|(s, e)| {
            let d = [
                (e[0] - s[0]) as f64,
                (e[1] - s[1]) as f64,
                (e[2] - s[2]) as f64,
            ];
            (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
        })
        .sum()
}
