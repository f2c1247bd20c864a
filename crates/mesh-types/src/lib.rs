pub mod mesh;
pub mod model;

pub use mesh::*;
pub use model::*;
