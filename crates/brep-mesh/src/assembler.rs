//! Pipeline entry point: tessellate, walk faces and edges, finalize the box,
//! package one `body` part.

use std::sync::Arc;

use kernel_adapter::{
    ConversionTicket, Kernel, KernelBundle, KernelError, KernelIntrospect, KernelSession,
    ShapeGuard, ShapeHandle,
};
use mesh_types::{ModelDescription, Part, PartKind, Placement, RenderMesh, MODEL_FORMAT_VERSION};
use tracing::{info, instrument};

use crate::bounding_box::BoundingBoxAccumulator;
use crate::edge_lines::extract_edges;
use crate::error::ConvertError;
use crate::face_mesh::extract_faces;
use crate::params::TessellationParams;

pub const DEFAULT_MODEL_NAME: &str = "brep-model";
pub const DEFAULT_COLOR: &str = "#999999";
pub const BODY_PART_NAME: &str = "body";

/// Builds a [`ModelDescription`] from a kernel shape.
///
/// Holds only the output metadata and tolerances, so one assembler can be
/// reused across conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAssembler {
    name: String,
    id: String,
    color: String,
    params: TessellationParams,
}

impl Default for MeshAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshAssembler {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            id: format!("/{}", DEFAULT_MODEL_NAME),
            color: DEFAULT_COLOR.to_string(),
            params: TessellationParams::default(),
        }
    }

    /// Set the model name; the id becomes `/<name>`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.id = format!("/{}", self.name);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_params(mut self, params: TessellationParams) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &TessellationParams {
        &self.params
    }

    /// Convert a shape owned by the caller. The shape is left loaded.
    pub fn assemble<K: KernelBundle + ?Sized>(
        &self,
        kernel: &mut K,
        shape: &ShapeHandle,
    ) -> Result<ModelDescription, ConvertError> {
        self.params.validate()?;
        kernel.tessellate(
            shape,
            self.params.linear_deflection,
            self.params.angular_deflection,
        )?;
        self.extract(kernel.as_introspect(), shape, &ConversionTicket::detached())
    }

    /// Convert a shape and release it afterwards, whatever the outcome.
    pub fn assemble_owned<K: KernelBundle + ?Sized>(
        &self,
        kernel: &mut K,
        shape: ShapeHandle,
        ticket: &ConversionTicket,
    ) -> Result<ModelDescription, ConvertError> {
        let mut guard = ShapeGuard::new(kernel, shape);
        self.params.validate()?;
        if ticket.is_cancelled() {
            return Err(ConvertError::Superseded);
        }
        guard.tessellate(self.params.linear_deflection, self.params.angular_deflection)?;
        self.extract(guard.kernel().as_introspect(), guard.handle(), ticket)
    }

    /// Build a torus around +Z and convert it.
    pub fn assemble_torus<K: KernelBundle + ?Sized>(
        &self,
        kernel: &mut K,
        major_radius: f64,
        minor_radius: f64,
    ) -> Result<ModelDescription, ConvertError> {
        self.params.validate()?;
        let shape = kernel.make_torus(major_radius, minor_radius)?;
        self.assemble_owned(kernel, shape, &ConversionTicket::detached())
    }

    /// Load a serialized shape and convert it.
    pub fn assemble_document<K: KernelBundle + ?Sized>(
        &self,
        kernel: &mut K,
        data: &[u8],
    ) -> Result<ModelDescription, ConvertError> {
        self.params.validate()?;
        let shape = kernel.read_shape(data)?;
        self.assemble_owned(kernel, shape, &ConversionTicket::detached())
    }

    /// Convert inside a session. Starting the request supersedes any earlier
    /// one still running; the result is published only if no newer request
    /// started in the meantime.
    pub fn convert_in_session<K, F>(
        &self,
        session: &KernelSession<K, ModelDescription>,
        build: F,
    ) -> Result<Arc<ModelDescription>, ConvertError>
    where
        K: KernelBundle,
        F: FnOnce(&mut K) -> Result<ShapeHandle, KernelError>,
    {
        let ticket = session.begin();
        let mut kernel = session.lock()?;
        if ticket.is_cancelled() {
            return Err(ConvertError::Superseded);
        }
        let shape = build(&mut *kernel)?;
        let model = self.assemble_owned(&mut *kernel, shape, &ticket)?;
        drop(kernel);
        session.publish(&ticket, model).ok_or(ConvertError::Superseded)
    }

    #[instrument(skip_all, fields(name = %self.name, shape = shape.id()))]
    fn extract(
        &self,
        kernel: &dyn KernelIntrospect,
        shape: &ShapeHandle,
        ticket: &ConversionTicket,
    ) -> Result<ModelDescription, ConvertError> {
        let mut mesh = RenderMesh::new();
        let mut bbox = BoundingBoxAccumulator::new();
        let faces = extract_faces(kernel, shape, ticket, &mut mesh, &mut bbox)?;
        let edges = extract_edges(kernel, shape, &self.params, ticket, &mut mesh)?;
        let bounding_box = bbox.finalize();

        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            segments = mesh.segment_count(),
            faces_skipped = faces.faces_skipped,
            edges_skipped = edges.edges_skipped,
            "shape converted"
        );

        Ok(ModelDescription {
            version: MODEL_FORMAT_VERSION,
            name: self.name.clone(),
            id: self.id.clone(),
            parts: vec![Part {
                id: format!("{}/{}", self.id, BODY_PART_NAME),
                name: BODY_PART_NAME.to_string(),
                kind: PartKind::Shapes,
                shape: mesh,
                color: self.color.clone(),
                loc: Placement::identity(),
            }],
            bounding_box,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_adapter::AnalyticKernel;

    #[test]
    fn test_defaults_match_viewer_layout() {
        let mut kernel = AnalyticKernel::new();
        let model = MeshAssembler::new()
            .assemble_torus(&mut kernel, 30.0, 10.0)
            .unwrap();
        assert_eq!(model.version, 3);
        assert_eq!(model.name, "brep-model");
        assert_eq!(model.id, "/brep-model");
        assert_eq!(model.parts.len(), 1);
        let body = &model.parts[0];
        assert_eq!(body.id, "/brep-model/body");
        assert_eq!(body.name, "body");
        assert_eq!(body.color, "#999999");
        assert!(body.loc.is_identity());
        assert_eq!(kernel.live_shape_count(), 0);
    }

    #[test]
    fn test_custom_metadata() {
        let mut kernel = AnalyticKernel::new();
        let h = kernel.make_box(1.0, 1.0, 1.0).unwrap();
        let model = MeshAssembler::new()
            .with_name("step-model")
            .with_color("#ff0000")
            .assemble(&mut kernel, &h)
            .unwrap();
        assert_eq!(model.id, "/step-model");
        assert_eq!(model.parts[0].color, "#ff0000");
        // Caller-owned shape stays loaded.
        assert_eq!(kernel.live_shape_count(), 1);
        kernel.release(h);
    }

    #[test]
    fn test_invalid_params_release_shape() {
        let mut kernel = AnalyticKernel::new();
        let h = kernel.make_box(1.0, 1.0, 1.0).unwrap();
        let params = TessellationParams::default().with_deflection(-1.0, 0.5);
        let err = MeshAssembler::new()
            .with_params(params)
            .assemble_owned(&mut kernel, h, &ConversionTicket::detached())
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidParams { .. }));
        assert_eq!(kernel.live_shape_count(), 0);
    }

    #[test]
    fn test_cancelled_ticket_aborts_and_releases() {
        let session: KernelSession<AnalyticKernel, ModelDescription> =
            KernelSession::new(AnalyticKernel::new());
        let stale = session.begin();
        let _newer = session.begin();
        let result = session
            .with_kernel(|k| {
                let h = k.make_sphere(1.0).unwrap();
                MeshAssembler::new().assemble_owned(k, h, &stale)
            })
            .unwrap();
        assert!(matches!(result, Err(ConvertError::Superseded)));
        assert!(session.latest().is_none());
        assert_eq!(session.into_kernel().unwrap().live_shape_count(), 0);
    }
}
