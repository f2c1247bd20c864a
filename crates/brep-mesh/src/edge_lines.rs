//! Edge walk: line segments approximating every edge of a shape.

use kernel_adapter::{ConversionTicket, KernelError, KernelId, KernelIntrospect, ShapeHandle};
use mesh_types::RenderMesh;
use nalgebra::Point3;
use tracing::debug;

use crate::deflection::sample_curve;
use crate::error::ConvertError;
use crate::params::TessellationParams;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeLineStats {
    pub edges_drawn: usize,
    /// Edges that produced no segments.
    pub edges_skipped: usize,
    pub segments: usize,
}

/// Append line segments for every edge of `shape` to `mesh.edge_segments`.
///
/// A precomputed edge polygon is used as-is; otherwise the edge curve is
/// sampled with [`sample_curve`]. Edges that yield fewer than two points, or
/// whose curve cannot be evaluated, contribute nothing.
pub fn extract_edges<K: KernelIntrospect + ?Sized>(
    kernel: &K,
    shape: &ShapeHandle,
    params: &TessellationParams,
    ticket: &ConversionTicket,
    mesh: &mut RenderMesh,
) -> Result<EdgeLineStats, ConvertError> {
    let mut stats = EdgeLineStats::default();
    for edge in kernel.edges(shape)? {
        if ticket.is_cancelled() {
            return Err(ConvertError::Superseded);
        }
        let points = match edge_points(kernel, edge, params) {
            Ok(points) if points.len() >= 2 => points,
            Ok(points) => {
                debug!(?edge, count = points.len(), "edge skipped: too few points");
                stats.edges_skipped += 1;
                continue;
            }
            Err(e) => {
                debug!(?edge, error = %e, "edge skipped");
                stats.edges_skipped += 1;
                continue;
            }
        };
        mesh.edge_segments.reserve((points.len() - 1) * 6);
        for pair in points.windows(2) {
            let (s, e) = (pair[0], pair[1]);
            mesh.edge_segments.extend_from_slice(&[
                s.x as f32, s.y as f32, s.z as f32, e.x as f32, e.y as f32, e.z as f32,
            ]);
        }
        stats.segments += points.len() - 1;
        stats.edges_drawn += 1;
    }
    Ok(stats)
}

fn edge_points<K: KernelIntrospect + ?Sized>(
    kernel: &K,
    edge: KernelId,
    params: &TessellationParams,
) -> Result<Vec<Point3<f64>>, KernelError> {
    if let Some(polygon) = kernel.edge_polygon(edge)? {
        return Ok(polygon
            .nodes
            .iter()
            .map(|p| polygon.location.transform_point(p))
            .collect());
    }
    let curve = kernel.edge_curve(edge)?;
    sample_curve(&*curve, params)
}
