//! wgpu backend for the offscreen renderer.
//!
//! [`WgpuBackend`] maps each [`PlatformKind`](offrender_render::PlatformKind)
//! onto an adapter choice and draws scenes with a small metallic-roughness
//! forward renderer: directional lights with optional shadow maps, wireframe
//! and normal overlays, and screen-space points.
//!
//! # Invariants
//! - Renderer never mutates the scene.
//! - Depth readback is linear scene depth; 0 where nothing was drawn.

mod batch;
mod gpu;
mod platform;
mod shaders;
mod target;

pub use gpu::WgpuSceneRenderer;
pub use platform::{Gpu, WgpuBackend, WgpuPlatform};
pub use target::{COLOR_FORMAT, DEPTH_FORMAT, DepthResolve, RenderTarget};

/// Offscreen renderer on the wgpu backend.
pub type WgpuOffscreenRenderer = offrender_render::OffscreenRenderer<WgpuBackend>;
