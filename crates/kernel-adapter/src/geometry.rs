//! Analytic surfaces and curves backing the reference kernel.

use nalgebra::{Point3, Vector3};

/// Upper bound on subdivisions of one parametric direction.
pub const MAX_SEGMENTS: usize = 4096;

/// Right-handed orthonormal frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point3<f64>,
    pub x: Vector3<f64>,
    pub y: Vector3<f64>,
    pub z: Vector3<f64>,
}

impl Frame {
    pub fn standard() -> Self {
        Self {
            origin: Point3::origin(),
            x: Vector3::x(),
            y: Vector3::y(),
            z: Vector3::z(),
        }
    }

    /// Frame with normal `z`; `x` is projected onto the plane normal to `z`.
    /// Returns `None` for a zero normal or an `x` parallel to it.
    pub fn new(origin: Point3<f64>, z: Vector3<f64>, x: Vector3<f64>) -> Option<Self> {
        let z = z.try_normalize(1e-15)?;
        let x = (x - z * x.dot(&z)).try_normalize(1e-15)?;
        let y = z.cross(&x);
        Some(Self { origin, x, y, z })
    }

    /// Frame with normal `z` and an arbitrary perpendicular `x`.
    pub fn from_normal(origin: Point3<f64>, z: Vector3<f64>) -> Option<Self> {
        let z = z.try_normalize(1e-15)?;
        let reference = if z.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        Self::new(origin, z, reference)
    }

    fn radial(&self, angle: f64) -> Vector3<f64> {
        self.x * angle.cos() + self.y * angle.sin()
    }

    fn tangential(&self, angle: f64) -> Vector3<f64> {
        -self.x * angle.sin() + self.y * angle.cos()
    }
}

/// Plane through the frame origin: P(u, v) = O + u X + v Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub frame: Frame,
}

/// Cylinder around the frame's Z axis: P(u, v) = O + r (cos u X + sin u Y) + v Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub frame: Frame,
    pub radius: f64,
}

/// Sphere: u is longitude, v latitude in [-pi/2, pi/2].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub frame: Frame,
    pub radius: f64,
}

/// Torus around the frame's Z axis: u is the major angle, v the minor angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torus {
    pub frame: Frame,
    pub major_radius: f64,
    pub minor_radius: f64,
}

/// Analytic surface representations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Plane(Plane),
    Cylinder(Cylinder),
    Sphere(Sphere),
    Torus(Torus),
}

impl Surface {
    pub fn evaluate(&self, u: f64, v: f64) -> Point3<f64> {
        match self {
            Surface::Plane(p) => p.frame.origin + p.frame.x * u + p.frame.y * v,
            Surface::Cylinder(c) => {
                c.frame.origin + c.frame.radial(u) * c.radius + c.frame.z * v
            }
            Surface::Sphere(s) => {
                s.frame.origin
                    + s.frame.radial(u) * (s.radius * v.cos())
                    + s.frame.z * (s.radius * v.sin())
            }
            Surface::Torus(t) => {
                t.frame.origin
                    + t.frame.radial(u) * (t.major_radius + t.minor_radius * v.cos())
                    + t.frame.z * (t.minor_radius * v.sin())
            }
        }
    }

    /// Unit normal in the direction of dP/du x dP/dv.
    pub fn normal_at(&self, u: f64, v: f64) -> Vector3<f64> {
        match self {
            Surface::Plane(p) => p.frame.z,
            Surface::Cylinder(c) => c.frame.radial(u),
            Surface::Sphere(s) => s.frame.radial(u) * v.cos() + s.frame.z * v.sin(),
            Surface::Torus(t) => t.frame.radial(u) * v.cos() + t.frame.z * v.sin(),
        }
    }

    /// Largest radius of curvature along u, or `None` when u lines are straight.
    pub fn u_radius(&self) -> Option<f64> {
        match self {
            Surface::Plane(_) => None,
            Surface::Cylinder(c) => Some(c.radius),
            Surface::Sphere(s) => Some(s.radius),
            Surface::Torus(t) => Some(t.major_radius + t.minor_radius),
        }
    }

    /// Radius of curvature along v, or `None` when v lines are straight.
    pub fn v_radius(&self) -> Option<f64> {
        match self {
            Surface::Plane(_) | Surface::Cylinder(_) => None,
            Surface::Sphere(s) => Some(s.radius),
            Surface::Torus(t) => Some(t.minor_radius),
        }
    }

    /// Frame of a planar surface.
    pub fn plane_frame(&self) -> Option<&Frame> {
        match self {
            Surface::Plane(p) => Some(&p.frame),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Surface::Plane(_) => "Plane",
            Surface::Cylinder(_) => "Cylinder",
            Surface::Sphere(_) => "Sphere",
            Surface::Torus(_) => "Torus",
        }
    }
}

/// Infinite line parametrized by arc length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

/// Circle in the frame's XY plane, parametrized by angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub frame: Frame,
    pub radius: f64,
}

/// Analytic curve representations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Line(Line),
    Circle(Circle),
    /// Edge collapsed to a point (e.g. a sphere pole). Has no usable 3D curve.
    Degenerated(Point3<f64>),
}

impl Curve {
    pub fn evaluate(&self, t: f64) -> Point3<f64> {
        match self {
            Curve::Line(l) => l.origin + l.direction * t,
            Curve::Circle(c) => c.frame.origin + c.frame.radial(t) * c.radius,
            Curve::Degenerated(p) => *p,
        }
    }

    pub fn derivative(&self, t: f64) -> Vector3<f64> {
        match self {
            Curve::Line(l) => l.direction,
            Curve::Circle(c) => c.frame.tangential(t) * c.radius,
            Curve::Degenerated(_) => Vector3::zeros(),
        }
    }

    pub fn is_degenerated(&self) -> bool {
        matches!(self, Curve::Degenerated(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Curve::Line(_) => "Line",
            Curve::Circle(_) => "Circle",
            Curve::Degenerated(_) => "Degenerated",
        }
    }
}

/// Number of segments needed to approximate an arc of `span` radians on a
/// circle of `radius` within `linear_deflection` sag and `angular_deflection`
/// turning per segment. Rounded up to a multiple of four so quadrant points
/// are always sampled.
pub fn arc_segments(radius: f64, span: f64, linear_deflection: f64, angular_deflection: f64) -> usize {
    if !(radius > 0.0) || !(span > 0.0) {
        return 1;
    }
    let mut max_step = if angular_deflection > 0.0 {
        angular_deflection
    } else {
        span
    };
    if linear_deflection > 0.0 && linear_deflection < radius {
        let sag_step = 2.0 * (1.0 - linear_deflection / radius).acos();
        max_step = max_step.min(sag_step);
    }
    let n = (span / max_step).ceil().max(1.0) as usize;
    let n = n.div_ceil(4) * 4;
    n.min(MAX_SEGMENTS)
}
