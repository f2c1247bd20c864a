use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Tolerances for one conversion.
///
/// Surface meshing uses `linear_deflection` and `angular_deflection`; edge
/// sampling uses the `edge_*` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationParams {
    /// Maximum chordal distance between a triangle and the surface.
    pub linear_deflection: f64,
    /// Maximum angle (radians) between adjacent triangle normals.
    pub angular_deflection: f64,
    pub edge_min_deflection: f64,
    pub edge_angular_deflection: f64,
    pub edge_min_points: usize,
    /// Derivatives shorter than this skip the angular test.
    pub edge_curvature_tolerance: f64,
    /// Parameter intervals shorter than this are never split.
    pub edge_min_param_step: f64,
    pub edge_max_points: usize,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            linear_deflection: 0.1,
            angular_deflection: 0.5,
            edge_min_deflection: 0.1,
            edge_angular_deflection: 0.1,
            edge_min_points: 2,
            edge_curvature_tolerance: 1e-7,
            edge_min_param_step: 1e-2,
            edge_max_points: 10_000,
        }
    }
}

impl TessellationParams {
    /// Same edge bounds, different surface tolerances.
    pub fn with_deflection(mut self, linear: f64, angular: f64) -> Self {
        self.linear_deflection = linear;
        self.angular_deflection = angular;
        self
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        let positive = [
            ("linear_deflection", self.linear_deflection),
            ("angular_deflection", self.angular_deflection),
            ("edge_min_deflection", self.edge_min_deflection),
            ("edge_angular_deflection", self.edge_angular_deflection),
            ("edge_curvature_tolerance", self.edge_curvature_tolerance),
            ("edge_min_param_step", self.edge_min_param_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConvertError::InvalidParams {
                    reason: format!("{} must be positive and finite, got {}", name, value),
                });
            }
        }
        if self.edge_min_points < 2 {
            return Err(ConvertError::InvalidParams {
                reason: format!("edge_min_points must be at least 2, got {}", self.edge_min_points),
            });
        }
        if self.edge_max_points < self.edge_min_points {
            return Err(ConvertError::InvalidParams {
                reason: format!(
                    "edge_max_points {} is below edge_min_points {}",
                    self.edge_max_points, self.edge_min_points
                ),
            });
        }
        Ok(())
    }

    /// Parse and validate. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConvertError> {
        let params: Self = serde_json::from_str(text).map_err(|e| ConvertError::InvalidParams {
            reason: e.to_string(),
        })?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let p = TessellationParams::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.linear_deflection, 0.1);
        assert_eq!(p.angular_deflection, 0.5);
        assert_eq!(p.edge_max_points, 10_000);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut p = TessellationParams::default();
        p.linear_deflection = 0.0;
        assert!(p.validate().is_err());

        let mut p = TessellationParams::default();
        p.edge_angular_deflection = f64::NAN;
        assert!(p.validate().is_err());

        let mut p = TessellationParams::default();
        p.edge_min_points = 1;
        assert!(p.validate().is_err());

        let mut p = TessellationParams::default();
        p.edge_max_points = 1;
        p.edge_min_points = 2;
        assert!(matches!(p.validate(), Err(ConvertError::InvalidParams { .. })));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p = TessellationParams::from_json(r#"{ "linear_deflection": 0.2 }"#).unwrap();
        assert_eq!(p.linear_deflection, 0.2);
        assert_eq!(p.angular_deflection, 0.5);
        assert!(TessellationParams::from_json(r#"{ "edge_min_points": 0 }"#).is_err());
        assert!(TessellationParams::from_json("[]").is_err());
    }
}
