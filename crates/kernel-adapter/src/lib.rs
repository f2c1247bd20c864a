//! Geometry-kernel boundary for the B-Rep meshing pipeline.
//!
//! [`Kernel`] and [`KernelIntrospect`] describe what the pipeline needs from a
//! solid-modeling kernel. [`AnalyticKernel`] is a deterministic in-process
//! implementation over analytic surfaces and curves. [`ShapeGuard`] and
//! [`KernelSession`] give scoped handle release and serialized access to a
//! non-reentrant kernel.

pub mod analytic_kernel;
pub mod document;
pub mod geometry;
pub mod guard;
pub mod primitives;
pub mod session;
pub mod traits;
pub mod types;

pub use analytic_kernel::AnalyticKernel;
pub use document::{CurveDef, EdgeDef, FaceDef, FaceDomain, ShapeDocument, SurfaceDef};
pub use guard::ShapeGuard;
pub use session::{ConversionTicket, KernelSession};
pub use traits::*;
pub use types::*;
