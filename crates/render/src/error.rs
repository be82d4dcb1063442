use crate::PlatformError;

/// Errors surfaced by platforms, scene renderers, and the offscreen manager.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("no live graphics context")]
    NoContext,
    #[error("scene has no main camera")]
    NoCamera,
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("no graphics adapter available for {0}")]
    NoAdapter(String),
    #[error("device request failed: {0}")]
    Device(String),
    #[error("buffer readback failed: {0}")]
    Readback(String),
}
