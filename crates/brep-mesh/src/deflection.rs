//! Tangential-deflection sampling of a bounded curve.
//!
//! Starts from `edge_min_points` evenly spaced parameters and bisects any
//! interval whose midpoint sags more than `edge_min_deflection` from the chord
//! or whose end tangents turn by more than `edge_angular_deflection`.
//! Bisection stops below `edge_min_param_step` or once `edge_max_points` is
//! reached. Intervals are processed depth-first in parameter order, so the
//! output is deterministic.

use kernel_adapter::{CurveAdaptor, KernelError};
use nalgebra::{Point3, Vector3};

use crate::params::TessellationParams;

#[derive(Debug, Clone, Copy)]
struct Sample {
    t: f64,
    point: Point3<f64>,
    tangent: Vector3<f64>,
}

fn sample(curve: &dyn CurveAdaptor, t: f64) -> Result<Sample, KernelError> {
    let (point, tangent) = curve.d1(t)?;
    Ok(Sample { t, point, tangent })
}

/// Distance from `p` to the segment `a`-`b`.
fn distance_to_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let s = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * s)).norm()
}

fn turning_angle(a: &Vector3<f64>, b: &Vector3<f64>, curvature_tolerance: f64) -> f64 {
    if a.norm() < curvature_tolerance || b.norm() < curvature_tolerance {
        return 0.0;
    }
    a.angle(b)
}

/// Points approximating `curve` over its full parameter range, first to last.
pub fn sample_curve(
    curve: &dyn CurveAdaptor,
    params: &TessellationParams,
) -> Result<Vec<Point3<f64>>, KernelError> {
    let (t0, t1) = (curve.first_parameter(), curve.last_parameter());
    if !(t0.is_finite() && t1.is_finite()) || t1 <= t0 {
        return Err(KernelError::EvaluationFailed {
            reason: format!("empty parameter range [{}, {}]", t0, t1),
        });
    }

    let n = params.edge_min_points.max(2);
    let mut seeds = Vec::with_capacity(n);
    for i in 0..n {
        let t = if i == n - 1 {
            t1
        } else {
            t0 + (t1 - t0) * (i as f64 / (n - 1) as f64)
        };
        seeds.push(sample(curve, t)?);
    }

    let mut segments = n - 1;
    let mut points = Vec::with_capacity(n);
    points.push(seeds[0].point);
    let mut stack: Vec<(Sample, Sample)> = Vec::new();

    for pair in seeds.windows(2) {
        stack.push((pair[0], pair[1]));
        while let Some((a, b)) = stack.pop() {
            let can_split = b.t - a.t >= params.edge_min_param_step
                && segments + 1 < params.edge_max_points;
            if can_split {
                let mid = sample(curve, 0.5 * (a.t + b.t))?;
                let sag = distance_to_segment(&mid.point, &a.point, &b.point);
                let angle = turning_angle(&a.tangent, &b.tangent, params.edge_curvature_tolerance);
                if sag > params.edge_min_deflection || angle > params.edge_angular_deflection {
                    segments += 1;
                    stack.push((mid, b));
                    stack.push((a, mid));
                    continue;
                }
            }
            points.push(b.point);
        }
    }
    Ok(points)
}
