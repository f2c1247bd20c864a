use serde::{Deserialize, Serialize};

use crate::mesh::{BoundingBox, RenderMesh};

/// Layout version understood by the viewer.
pub const MODEL_FORMAT_VERSION: u32 = 3;

/// Local placement of a part: translation plus rotation quaternion (x, y, z, w).
///
/// Serialized as `[[tx, ty, tz], [qx, qy, qz, qw]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "([f64; 3], [f64; 4])", into = "([f64; 3], [f64; 4])")]
pub struct Placement {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            translation: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<([f64; 3], [f64; 4])> for Placement {
    fn from((translation, rotation): ([f64; 3], [f64; 4])) -> Self {
        Self {
            translation,
            rotation,
        }
    }
}

impl From<Placement> for ([f64; 3], [f64; 4]) {
    fn from(p: Placement) -> Self {
        (p.translation, p.rotation)
    }
}

/// Kind tag of a part. The viewer only renders shape parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Shapes,
}

/// One named, colored piece of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub shape: RenderMesh,
    /// CSS-style hex color, e.g. `#999999`.
    pub color: String,
    pub loc: Placement,
}

/// Complete description of a converted model, ready for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub version: u32,
    pub name: String,
    pub id: String,
    pub parts: Vec<Part>,
    #[serde(rename = "bb")]
    pub bounding_box: BoundingBox,
}

impl ModelDescription {
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn total_vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.shape.vertex_count()).sum()
    }

    pub fn total_triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.shape.triangle_count()).sum()
    }
}

/// Parse a hex color (`#rgb` or `#rrggbb`) into linear RGBA factors in [0, 1].
/// Unparseable input yields mid grey.
pub fn color_to_rgba(color: &str) -> [f32; 4] {
    const GREY: [f32; 4] = [0.6, 0.6, 0.6, 1.0];
    let hex = color.trim().trim_start_matches('#');
    let channels: Option<Vec<u8>> = match hex.len() {
        6 => (0..3)
            .map(|i| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok())
            .collect(),
        3 => hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| (d * 17) as u8))
            .collect(),
        _ => None,
    };
    match channels {
        Some(c) if c.len() == 3 => [
            c[0] as f32 / 255.0,
            c[1] as f32 / 255.0,
            c[2] as f32 / 255.0,
            1.0,
        ],
        _ => GREY,
    }
}
