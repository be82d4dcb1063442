use crate::{ColorImage, DepthImage, Platform, PlatformKind, RenderError, RenderFlags, RenderOutput};
use offrender_scene::Scene;

/// Draws scenes on a platform context.
///
/// The renderer reads the scene; it never mutates it.
pub trait SceneRenderer {
    type Platform: Platform;

    fn set_viewport(&mut self, width: u32, height: u32);

    fn set_point_size(&mut self, size: f32);

    /// Render one frame.
    ///
    /// With [`RenderFlags::OFFSCREEN`] the renderer draws into its own
    /// framebuffer and returns the buffers. Without it, drawing goes to the
    /// platform's default target and `None` is returned; the buffers are then
    /// fetched with [`read_depth_buf`](Self::read_depth_buf) and
    /// [`read_color_buf`](Self::read_color_buf).
    fn render(
        &mut self,
        platform: &mut Self::Platform,
        scene: &Scene,
        flags: RenderFlags,
    ) -> Result<Option<RenderOutput>, RenderError>;

    /// Read back the default target's color from the last render.
    fn read_color_buf(&mut self, platform: &mut Self::Platform) -> Result<ColorImage, RenderError>;

    /// Read back the default target's linear depth from the last render.
    fn read_depth_buf(&mut self, platform: &mut Self::Platform) -> Result<DepthImage, RenderError>;

    /// Free renderer resources. Calling it again is a no-op.
    fn delete(&mut self, platform: &mut Self::Platform);
}

/// Creates platform contexts and the renderers paired with them.
pub trait GraphicsBackend {
    type Platform: Platform;
    type Renderer: SceneRenderer<Platform = Self::Platform>;

    /// Build an uninitialized platform of the given kind.
    fn create_platform(
        &mut self,
        kind: PlatformKind,
        width: u32,
        height: u32,
    ) -> Result<Self::Platform, RenderError>;

    /// Build a renderer on an initialized, current platform.
    fn create_renderer(
        &mut self,
        platform: &mut Self::Platform,
        width: u32,
        height: u32,
    ) -> Result<Self::Renderer, RenderError>;
}
