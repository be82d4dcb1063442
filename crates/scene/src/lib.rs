//! Scene graph consumed by the offscreen renderer.
//!
//! # Invariants
//! - Every face index of a [`TriMesh`] addresses an existing vertex.
//! - A [`TriMesh`] carries exactly one color per vertex.
//! - A scene has at most one main camera; the first camera added becomes it.

mod camera;
mod error;
mod light;
mod mesh;
mod scene;
mod trimesh;

pub use camera::IntrinsicsCamera;
pub use error::SceneError;
pub use light::DirectionalLight;
pub use mesh::{Material, Mesh, Primitive, PrimitiveMode};
pub use scene::{Node, NodeContent, NodeId, Scene};
pub use trimesh::{DEFAULT_VERTEX_COLOR, TriMesh};

pub fn crate_info() -> &'static str {
    "offrender-scene v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("scene"));
    }
}
