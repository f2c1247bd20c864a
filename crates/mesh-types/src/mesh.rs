use serde::{Deserialize, Serialize};

/// Half-extent of the box reported when a conversion emitted no vertices.
pub const FALLBACK_HALF_EXTENT: f64 = 100.0;

/// Triangulated surface plus edge polylines, laid out for direct GPU upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderMesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Flat array of unit vertex normals, index-aligned with `vertices`.
    pub normals: Vec<f32>,
    /// Triangle index triples (0-based) into the vertex array.
    pub triangles: Vec<u32>,
    /// Line segments [sx, sy, sz, ex, ey, ez, ...], independent of `triangles`.
    #[serde(rename = "edges")]
    pub edge_segments: Vec<f32>,
}

impl RenderMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn segment_count(&self) -> usize {
        self.edge_segments.len() / 6
    }

    /// True when neither faces nor edges produced any geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edge_segments.is_empty()
    }

    pub fn vertex(&self, index: usize) -> Option<[f32; 3]> {
        let base = index.checked_mul(3)?;
        let v = self.vertices.get(base..base + 3)?;
        Some([v[0], v[1], v[2]])
    }

    pub fn normal(&self, index: usize) -> Option<[f32; 3]> {
        let base = index.checked_mul(3)?;
        let n = self.normals.get(base..base + 3)?;
        Some([n[0], n[1], n[2]])
    }

    pub fn triangle(&self, index: usize) -> Option<[u32; 3]> {
        let base = index.checked_mul(3)?;
        let t = self.triangles.get(base..base + 3)?;
        Some([t[0], t[1], t[2]])
    }

    /// Iterate segments as (start, end) pairs.
    pub fn segments(&self) -> impl Iterator<Item = ([f32; 3], [f32; 3])> + '_ {
        self.edge_segments
            .chunks_exact(6)
            .map(|s| ([s[0], s[1], s[2]], [s[3], s[4], s[5]]))
    }
}

/// Axis-aligned bounding box of a converted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

impl BoundingBox {
    /// Cube of half-extent [`FALLBACK_HALF_EXTENT`] centered at the origin.
    pub fn fallback() -> Self {
        let h = FALLBACK_HALF_EXTENT;
        Self {
            xmin: -h,
            xmax: h,
            ymin: -h,
            ymax: h,
            zmin: -h,
            zmax: h,
        }
    }

    pub fn contains(&self, p: [f64; 3]) -> bool {
        self.xmin <= p[0]
            && p[0] <= self.xmax
            && self.ymin <= p[1]
            && p[1] <= self.ymax
            && self.zmin <= p[2]
            && p[2] <= self.zmax
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.xmin + self.xmax) * 0.5,
            (self.ymin + self.ymax) * 0.5,
            (self.zmin + self.zmax) * 0.5,
        ]
    }

    pub fn size(&self) -> [f64; 3] {
        [
            self.xmax - self.xmin,
            self.ymax - self.ymin,
            self.zmax - self.zmin,
        ]
    }

    /// (xmin, xmax, ymin, ymax, zmin, zmax)
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.xmin, self.xmax, self.ymin, self.ymax, self.zmin, self.zmax,
        ]
    }
}
