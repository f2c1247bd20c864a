//! Face walk: placed vertices, normals and orientation-corrected triangles.

use kernel_adapter::{ConversionTicket, KernelId, KernelIntrospect, ShapeHandle};
use mesh_types::RenderMesh;
use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::bounding_box::BoundingBoxAccumulator;
use crate::error::ConvertError;

/// Normal used when a face has no UV nodes or the surface normal is unusable.
pub const FALLBACK_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Counters from one face walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceMeshStats {
    pub faces_meshed: usize,
    /// Faces without a triangulation.
    pub faces_skipped: usize,
    /// Triangles referencing nodes outside the face triangulation.
    pub triangles_dropped: usize,
    /// Vertices that received [`FALLBACK_NORMAL`].
    pub normal_fallbacks: usize,
}

/// Append every triangulated face of `shape` to `mesh`.
///
/// The shape must already be tessellated. Faces are visited in kernel order;
/// each face's vertices are appended as one block and its triangles are offset
/// by the block start.
pub fn extract_faces<K: KernelIntrospect + ?Sized>(
    kernel: &K,
    shape: &ShapeHandle,
    ticket: &ConversionTicket,
    mesh: &mut RenderMesh,
    bbox: &mut BoundingBoxAccumulator,
) -> Result<FaceMeshStats, ConvertError> {
    let mut stats = FaceMeshStats::default();
    for face in kernel.faces(shape)? {
        if ticket.is_cancelled() {
            return Err(ConvertError::Superseded);
        }
        append_face(kernel, face, mesh, bbox, &mut stats)?;
    }
    Ok(stats)
}

fn append_face<K: KernelIntrospect + ?Sized>(
    kernel: &K,
    face: KernelId,
    mesh: &mut RenderMesh,
    bbox: &mut BoundingBoxAccumulator,
    stats: &mut FaceMeshStats,
) -> Result<(), ConvertError> {
    let orientation = match kernel.face_orientation(face) {
        Ok(o) => o,
        Err(e) => {
            warn!(?face, error = %e, "face skipped: orientation unavailable");
            stats.faces_skipped += 1;
            return Ok(());
        }
    };
    let placed = match kernel.face_triangulation(face) {
        Ok(Some(t)) => t,
        Ok(None) => {
            debug!(?face, "face skipped: no triangulation");
            stats.faces_skipped += 1;
            return Ok(());
        }
        Err(e) => {
            warn!(?face, error = %e, "face skipped: triangulation unavailable");
            stats.faces_skipped += 1;
            return Ok(());
        }
    };
    let tri = placed.triangulation;
    let node_count = tri.node_count();
    let base = mesh.vertex_count();
    if base + node_count > u32::MAX as usize {
        return Err(ConvertError::MeshTooLarge {
            limit: u32::MAX as u64,
        });
    }

    mesh.vertices.reserve(node_count * 3);
    mesh.normals.reserve(node_count * 3);
    for i in 1..=node_count {
        let Some(node) = tri.node(i) else { break };
        let p = placed.location.transform_point(&node);
        let v = [p.x as f32, p.y as f32, p.z as f32];
        mesh.vertices.extend_from_slice(&v);
        // Observe the stored f32 values so every emitted vertex is inside the box.
        bbox.observe([v[0] as f64, v[1] as f64, v[2] as f64]);

        let normal = tri
            .uv_node(i)
            .and_then(|uv| kernel.surface_normal(face, uv).ok())
            .and_then(|n: Vector3<f64>| n.try_normalize(f64::EPSILON))
            .map(|n| [n.x as f32, n.y as f32, n.z as f32]);
        match normal {
            Some(n) => mesh.normals.extend_from_slice(&n),
            None => {
                stats.normal_fallbacks += 1;
                mesh.normals.extend_from_slice(&FALLBACK_NORMAL);
            }
        }
    }

    let reversed = orientation.is_reversed();
    let mut dropped = 0usize;
    for t in 1..=tri.triangle_count() {
        let Some([a, b, c]) = tri.triangle(t) else { break };
        if [a, b, c].iter().any(|&n| n == 0 || n > node_count) {
            dropped += 1;
            continue;
        }
        let (a, mut b, mut c) = (
            (base + a - 1) as u32,
            (base + b - 1) as u32,
            (base + c - 1) as u32,
        );
        if reversed {
            std::mem::swap(&mut b, &mut c);
        }
        mesh.triangles.extend_from_slice(&[a, b, c]);
    }
    if dropped > 0 {
        warn!(?face, dropped, "triangles with out-of-range node indices dropped");
        stats.triangles_dropped += dropped;
    }
    stats.faces_meshed += 1;
    Ok(())
}
