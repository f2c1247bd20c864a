//! Property-based tests for conversion invariants using the `proptest` crate.

use proptest::prelude::*;

use brep_mesh::{sample_curve, MeshAssembler, TessellationParams};
use kernel_adapter::{AnalyticKernel, CurveAdaptor, Kernel, KernelError};
use mesh_types::{ModelDescription, RenderMesh};
use nalgebra::{Point3, Vector3};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_dim() -> impl Strategy<Value = f64> {
    0.5f64..200.0
}

fn arb_deflection() -> impl Strategy<Value = (f64, f64)> {
    (0.05f64..2.0, 0.1f64..1.5)
}

fn mesh(model: &ModelDescription) -> &RenderMesh {
    &model.parts[0].shape
}

fn check_layout(model: &ModelDescription) -> Result<(), TestCaseError> {
    let m = mesh(model);
    prop_assert_eq!(m.vertices.len() % 3, 0);
    prop_assert_eq!(m.normals.len(), m.vertices.len());
    prop_assert_eq!(m.triangles.len() % 3, 0);
    prop_assert_eq!(m.edge_segments.len() % 6, 0);
    let n = m.vertex_count() as u32;
    prop_assert!(m.triangles.iter().all(|&i| i < n));
    let bb = &model.bounding_box;
    prop_assert!(bb.xmin <= bb.xmax && bb.ymin <= bb.ymax && bb.zmin <= bb.zmax);
    Ok(())
}

// ---------------------------------------------------------------------------
// 1. Box: layout invariants and exact bounding box
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn box_layout_and_bounds(dx in arb_dim(), dy in arb_dim(), dz in arb_dim()) {
        let mut kernel = AnalyticKernel::new();
        let h = kernel.make_box(dx, dy, dz).unwrap();
        let model = MeshAssembler::new().assemble(&mut kernel, &h).unwrap();
        check_layout(&model)?;
        let (fx, fy, fz) = (dx as f32 as f64, dy as f32 as f64, dz as f32 as f64);
        prop_assert_eq!(model.bounding_box.to_array(), [0.0, fx, 0.0, fy, 0.0, fz]);
        let m = mesh(&model);
        for i in 0..m.vertex_count() {
            let v = m.vertex(i).unwrap();
            prop_assert!(model.bounding_box.contains([v[0] as f64, v[1] as f64, v[2] as f64]));
        }
        prop_assert_eq!(mesh(&model).triangle_count(), 12);
        kernel.release(h);
        prop_assert_eq!(kernel.live_shape_count(), 0);
    }
}

// ---------------------------------------------------------------------------
// 2. Sphere: every vertex lies on the sphere and inside the bounding box
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sphere_vertices_on_surface(r in 0.5f64..50.0, (lin, ang) in arb_deflection()) {
        let mut kernel = AnalyticKernel::new();
        let params = TessellationParams::default().with_deflection(lin, ang);
        let h = kernel.make_sphere(r).unwrap();
        let model = MeshAssembler::new()
            .with_params(params)
            .assemble_owned(&mut kernel, h, &kernel_adapter::ConversionTicket::detached())
            .unwrap();
        check_layout(&model)?;
        let m = mesh(&model);
        for i in 0..m.vertex_count() {
            let v = m.vertex(i).unwrap();
            let d = ((v[0] as f64).powi(2) + (v[1] as f64).powi(2) + (v[2] as f64).powi(2)).sqrt();
            prop_assert!((d - r).abs() <= 1e-5 * r.max(1.0));
        }
        prop_assert_eq!(kernel.live_shape_count(), 0);
    }
}

// ---------------------------------------------------------------------------
// 3. Torus: bounding box is (R + r, R + r, r) at every tolerance, up to f32 rounding
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn torus_bounds_match_radii(
        major in 5.0f64..100.0,
        ratio in 0.05f64..0.9,
        (lin, ang) in arb_deflection(),
    ) {
        let minor = major * ratio;
        let mut kernel = AnalyticKernel::new();
        let model = MeshAssembler::new()
            .with_params(TessellationParams::default().with_deflection(lin, ang))
            .assemble_torus(&mut kernel, major, minor)
            .unwrap();
        check_layout(&model)?;
        let outer = major + minor;
        // Vertices are stored as f32.
        let tol = 1e-6 * outer;
        let bb = model.bounding_box;
        prop_assert!((bb.xmax - outer).abs() <= tol);
        prop_assert!((bb.xmin + outer).abs() <= tol);
        prop_assert!((bb.ymax - outer).abs() <= tol);
        prop_assert!((bb.ymin + outer).abs() <= tol);
        prop_assert!((bb.zmax - minor).abs() <= tol);
        prop_assert!((bb.zmin + minor).abs() <= tol);
    }
}

// ---------------------------------------------------------------------------
// 4. Curve sampling stays within bounds
// ---------------------------------------------------------------------------

struct Arc3 {
    radius: f64,
    span: f64,
}

impl CurveAdaptor for Arc3 {
    fn first_parameter(&self) -> f64 {
        0.0
    }
    fn last_parameter(&self) -> f64 {
        self.span
    }
    fn value(&self, t: f64) -> Result<Point3<f64>, KernelError> {
        Ok(Point3::new(self.radius * t.cos(), self.radius * t.sin(), t))
    }
    fn d1(&self, t: f64) -> Result<(Point3<f64>, Vector3<f64>), KernelError> {
        Ok((
            self.value(t)?,
            Vector3::new(-self.radius * t.sin(), self.radius * t.cos(), 1.0),
        ))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sampled_points_lie_on_curve_in_order(
        radius in 0.1f64..100.0,
        span in 0.1f64..20.0,
        max_points in 2usize..500,
    ) {
        let params = TessellationParams { edge_max_points: max_points, ..TessellationParams::default() };
        let curve = Arc3 { radius, span };
        let pts = sample_curve(&curve, &params).unwrap();
        prop_assert!(pts.len() >= 2);
        prop_assert!(pts.len() <= max_points);
        prop_assert_eq!(pts[0], Point3::new(radius, 0.0, 0.0));
        // z equals the parameter, so it must increase strictly.
        for w in pts.windows(2) {
            prop_assert!(w[1].z > w[0].z);
        }
        prop_assert!((pts[pts.len() - 1].z - span).abs() < 1e-12);
    }
}
