//! ModelBuilder: fluent API for scripting conversions in tests.
//!
//! Drives the real pipeline against an [`AnalyticKernel`]. Results are kept
//! under string names so scenarios read top to bottom.

use std::collections::HashMap;

use brep_mesh::{MeshAssembler, TessellationParams};
use kernel_adapter::{AnalyticKernel, ConversionTicket, Kernel, KernelError, ShapeHandle};
use mesh_export::{export_binary_stl, model_to_glb};
use mesh_types::{ModelDescription, RenderMesh};

use crate::assertions::assert_all_pass;
use crate::helpers::HarnessError;
use crate::oracle::{self, OracleVerdict};

/// A fluent builder for converting and verifying shapes in tests.
pub struct ModelBuilder {
    kernel: AnalyticKernel,
    assembler: MeshAssembler,
    models: HashMap<String, ModelDescription>,
    history: Vec<(String, String)>,
    auto_check: bool,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self {
            kernel: AnalyticKernel::new(),
            assembler: MeshAssembler::new(),
            models: HashMap::new(),
            history: Vec::new(),
            auto_check: false,
        }
    }

    /// Enable auto-checking: after every conversion, run the model oracles
    /// and verify no shape handle leaked.
    pub fn with_auto_check(mut self) -> Self {
        self.auto_check = true;
        self
    }

    pub fn with_params(mut self, params: TessellationParams) -> Self {
        self.assembler = self.assembler.with_params(params);
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.assembler = self.assembler.with_color(color);
        self
    }

    // ── Conversions ─────────────────────────────────────────────────────

    pub fn torus(
        &mut self,
        name: &str,
        major_radius: f64,
        minor_radius: f64,
    ) -> Result<&ModelDescription, HarnessError> {
        self.convert(name, "torus", |k| k.make_torus(major_radius, minor_radius))
    }

    pub fn cube(
        &mut self,
        name: &str,
        dx: f64,
        dy: f64,
        dz: f64,
    ) -> Result<&ModelDescription, HarnessError> {
        self.convert(name, "box", |k| k.make_box(dx, dy, dz))
    }

    pub fn sphere(&mut self, name: &str, radius: f64) -> Result<&ModelDescription, HarnessError> {
        self.convert(name, "sphere", |k| k.make_sphere(radius))
    }

    pub fn cylinder(
        &mut self,
        name: &str,
        radius: f64,
        height: f64,
    ) -> Result<&ModelDescription, HarnessError> {
        self.convert(name, "cylinder", |k| k.make_cylinder(radius, height))
    }

    /// Import a serialized shape document.
    pub fn document(&mut self, name: &str, data: &[u8]) -> Result<&ModelDescription, HarnessError> {
        self.convert(name, "document", |k| k.read_shape(data))
    }

    fn convert<F>(&mut self, name: &str, op: &str, build: F) -> Result<&ModelDescription, HarnessError>
    where
        F: FnOnce(&mut AnalyticKernel) -> Result<ShapeHandle, KernelError>,
    {
        if self.models.contains_key(name) {
            return Err(HarnessError::DuplicateName {
                name: name.to_string(),
            });
        }

        let shape = build(&mut self.kernel)?;
        let model = self.assembler.clone().with_name(name).assemble_owned(
            &mut self.kernel,
            shape,
            &ConversionTicket::detached(),
        )?;

        if self.auto_check {
            assert_all_pass(&oracle::run_model_checks(&model), name)?;
            if self.kernel.live_shape_count() != 0 {
                return Err(HarnessError::AssertionFailed {
                    detail: format!(
                        "[{}] {} shape handles still live after conversion",
                        name,
                        self.kernel.live_shape_count()
                    ),
                });
            }
        }

        self.history.push((name.to_string(), op.to_string()));
        let model = self.models.entry(name.to_string()).or_insert(model);
        Ok(&*model)
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn model(&self, name: &str) -> Result<&ModelDescription, HarnessError> {
        self.models
            .get(name)
            .ok_or_else(|| HarnessError::ModelNotFound {
                name: name.to_string(),
            })
    }

    /// Mesh of the model's single body part.
    pub fn mesh(&self, name: &str) -> Result<&RenderMesh, HarnessError> {
        let model = self.model(name)?;
        model
            .parts
            .first()
            .map(|p| &p.shape)
            .ok_or_else(|| HarnessError::AssertionFailed {
                detail: format!("[{}] model has no parts", name),
            })
    }

    pub fn kernel(&self) -> &AnalyticKernel {
        &self.kernel
    }

    /// Conversions performed so far as `(name, operation)`.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    // ── Verification & Export ───────────────────────────────────────────

    pub fn check(&self, name: &str) -> Result<Vec<OracleVerdict>, HarnessError> {
        Ok(oracle::run_model_checks(self.model(name)?))
    }

    pub fn assert_clean(&self, name: &str) -> Result<(), HarnessError> {
        assert_all_pass(&self.check(name)?, name)
    }

    pub fn export_glb(&self, name: &str) -> Result<Vec<u8>, HarnessError> {
        Ok(model_to_glb(self.model(name)?)?)
    }

    pub fn export_stl(&self, name: &str) -> Result<Vec<u8>, HarnessError> {
        Ok(export_binary_stl(self.mesh(name)?, name)?)
    }
}
