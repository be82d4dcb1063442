use crate::RenderError;
use offrender_common::ContextId;
use std::fmt;

/// Environment variable selecting the platform: unset, `egl`, or `osmesa`.
pub const PLATFORM_ENV: &str = "OFFRENDER_PLATFORM";
/// Environment variable holding the EGL device index. Defaults to 0.
pub const DEVICE_ENV: &str = "EGL_DEVICE_ID";

/// Which kind of graphics context to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    /// Context owned by a hidden window on the native GPU API.
    HiddenWindow,
    /// Headless EGL context on the indexed device.
    Egl { device_index: usize },
    /// Software rasterizer without framebuffer-object support.
    OsMesa,
}

/// Configuration errors raised while selecting a platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("unsupported platform: {0:?} (expected unset, \"egl\" or \"osmesa\")")]
    Unsupported(String),
    #[error("invalid EGL device index: {0:?}")]
    InvalidDeviceIndex(String),
}

impl PlatformKind {
    /// Resolve the platform from [`PLATFORM_ENV`] and [`DEVICE_ENV`].
    pub fn from_env() -> Result<Self, PlatformError> {
        let platform = std::env::var(PLATFORM_ENV).ok();
        let device = std::env::var(DEVICE_ENV).ok();
        Self::from_vars(platform.as_deref(), device.as_deref())
    }

    /// Resolve the platform from raw variable values.
    pub fn from_vars(platform: Option<&str>, device: Option<&str>) -> Result<Self, PlatformError> {
        match platform {
            None => Ok(Self::HiddenWindow),
            Some("egl") => {
                let device_index = match device {
                    None => 0,
                    Some(raw) => raw
                        .trim()
                        .parse()
                        .map_err(|_| PlatformError::InvalidDeviceIndex(raw.to_string()))?,
                };
                Ok(Self::Egl { device_index })
            }
            Some("osmesa") => Ok(Self::OsMesa),
            Some(other) => Err(PlatformError::Unsupported(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::HiddenWindow => "hidden-window",
            Self::Egl { .. } => "egl",
            Self::OsMesa => "osmesa",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Egl { device_index } => write!(f, "egl:{device_index}"),
            other => f.write_str(other.name()),
        }
    }
}

/// A graphics context.
///
/// The viewport is fixed at creation. Platforms that cannot allocate their
/// own framebuffers must be recreated to change size.
pub trait Platform {
    /// Identity of the underlying context, fresh for each creation.
    fn id(&self) -> ContextId;

    fn kind(&self) -> PlatformKind;

    /// Viewport the context was created with, as `(width, height)`.
    fn viewport(&self) -> (u32, u32);

    /// Whether renderers may allocate resizable framebuffers on this context.
    fn supports_framebuffers(&self) -> bool;

    fn init_context(&mut self) -> Result<(), RenderError>;

    /// Make this the context subsequent calls apply to.
    fn make_current(&mut self) -> Result<(), RenderError>;

    /// Release the context. Calling it again is a no-op.
    fn delete_context(&mut self) -> Result<(), RenderError>;
}
