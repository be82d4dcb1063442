//! Offscreen rendering adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Exactly one platform context is live per [`OffscreenRenderer`].
//! - The renderer is released before the context it was created on.
//! - Wireframe options translate with priority flip > all-wireframe > all-solid.
//!
//! The [`GraphicsBackend`] trait is the seam between context management and
//! the GPU. [`debug::DebugBackend`] is a CPU stand-in that records every
//! lifecycle call, so the manager can be exercised without a device.

pub mod debug;
mod error;
mod flags;
mod image;
mod offscreen;
mod options;
mod platform;
mod renderer;

pub use error::RenderError;
pub use flags::RenderFlags;
pub use image::{ColorImage, DepthImage, RenderOutput};
pub use offscreen::OffscreenRenderer;
pub use options::RenderOptions;
pub use platform::{DEVICE_ENV, PLATFORM_ENV, Platform, PlatformError, PlatformKind};
pub use renderer::{GraphicsBackend, SceneRenderer};

pub fn crate_info() -> &'static str {
    "offrender-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
