//! STL export from a [`RenderMesh`], binary and ASCII.
//!
//! STL carries triangles only; normals are recomputed per facet and edge
//! segments are dropped.

use mesh_types::RenderMesh;

use crate::errors::ExportError;

fn check_indices(mesh: &RenderMesh) -> Result<(), ExportError> {
    let vertex_count = mesh.vertex_count();
    match mesh.triangles.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(ExportError::IndexOutOfRange {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// Facet normal from the winding; degenerate facets get +Z.
fn facet_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let (ax, ay, az) = (b[0] - a[0], b[1] - a[1], b[2] - a[2]);
    let (bx, by, bz) = (c[0] - a[0], c[1] - a[1], c[2] - a[2]);
    let nx = ay * bz - az * by;
    let ny = az * bx - ax * bz;
    let nz = ax * by - ay * bx;
    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len > 1e-12 {
        [nx / len, ny / len, nz / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn facets(mesh: &RenderMesh) -> impl Iterator<Item = ([f32; 3], [[f32; 3]; 3])> + '_ {
    mesh.triangles.chunks_exact(3).map(move |tri| {
        let v = |i: u32| {
            let o = i as usize * 3;
            [mesh.vertices[o], mesh.vertices[o + 1], mesh.vertices[o + 2]]
        };
        let corners = [v(tri[0]), v(tri[1]), v(tri[2])];
        (facet_normal(corners[0], corners[1], corners[2]), corners)
    })
}

/// Export a mesh as a binary STL file.
///
/// Layout:
/// - 80-byte header (`binary STL: <name>`, zero padded)
/// - u32 LE triangle count
/// - per triangle, 50 bytes: 3×f32 normal, 3×3×f32 vertices, u16 attribute
pub fn export_binary_stl(mesh: &RenderMesh, name: &str) -> Result<Vec<u8>, ExportError> {
    check_indices(mesh)?;
    let tri_count = mesh.triangle_count();
    let mut buf = Vec::with_capacity(84 + tri_count * 50);

    let header = format!("binary STL: {}", name);
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(80)]);
    buf.resize(80, 0u8);

    buf.extend_from_slice(&(tri_count as u32).to_le_bytes());

    for (normal, corners) in facets(mesh) {
        for c in normal {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for v in corners {
            for c in v {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(buf)
}

/// Export a mesh as an ASCII STL string.
pub fn export_ascii_stl(mesh: &RenderMesh, name: &str) -> Result<String, ExportError> {
    check_indices(mesh)?;
    let mut out = String::with_capacity(mesh.triangle_count() * 300 + 64);
    out.push_str(&format!("solid {}\n", name));

    for (n, corners) in facets(mesh) {
        out.push_str(&format!("  facet normal {} {} {}\n", n[0], n[1], n[2]));
        out.push_str("    outer loop\n");
        for v in corners {
            out.push_str(&format!("      vertex {} {} {}\n", v[0], v[1], v[2]));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }

    out.push_str(&format!("endsolid {}\n", name));
    Ok(out)
}
