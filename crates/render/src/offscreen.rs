use crate::{
    GraphicsBackend, Platform, PlatformError, PlatformKind, RenderError, RenderFlags,
    RenderOptions, RenderOutput, SceneRenderer,
};
use offrender_common::ContextId;
use offrender_scene::Scene;

/// A live context paired with the renderer created on it.
struct Live<B: GraphicsBackend> {
    platform: B::Platform,
    renderer: B::Renderer,
}

/// Owns one graphics context and its scene renderer, and renders scenes
/// into color and depth buffers.
///
/// The context is created on construction. It is recreated when the
/// viewport changes on a platform without framebuffer support, and released
/// by [`delete`](Self::delete) or on drop.
pub struct OffscreenRenderer<B: GraphicsBackend> {
    backend: B,
    kind: PlatformKind,
    viewport_width: u32,
    viewport_height: u32,
    point_size: f32,
    options: RenderOptions,
    live: Option<Live<B>>,
}

impl<B: GraphicsBackend> OffscreenRenderer<B> {
    /// Create a renderer and its context on the given platform.
    pub fn new(
        backend: B,
        kind: PlatformKind,
        viewport_width: u32,
        viewport_height: u32,
        mut options: RenderOptions,
    ) -> Result<Self, RenderError> {
        check_viewport(viewport_width, viewport_height)?;
        if cfg!(target_os = "macos") && options.shadows {
            tracing::warn!("shadows are not supported on macOS; disabling");
            options.shadows = false;
        }
        let mut this = Self {
            backend,
            kind,
            viewport_width,
            viewport_height,
            point_size: options.point_size,
            options,
            live: None,
        };
        this.create()?;
        Ok(this)
    }

    /// Like [`new`](Self::new), with the platform taken from the environment.
    pub fn from_env(
        backend: B,
        viewport_width: u32,
        viewport_height: u32,
        options: RenderOptions,
    ) -> Result<Self, RenderError> {
        Self::with_resolved_platform(
            backend,
            PlatformKind::from_env(),
            viewport_width,
            viewport_height,
            options,
        )
    }

    fn with_resolved_platform(
        backend: B,
        kind: Result<PlatformKind, PlatformError>,
        viewport_width: u32,
        viewport_height: u32,
        options: RenderOptions,
    ) -> Result<Self, RenderError> {
        Self::new(backend, kind?, viewport_width, viewport_height, options)
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    /// Request a new viewport. Takes effect on the next render.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.point_size = size;
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    pub fn platform_kind(&self) -> PlatformKind {
        self.kind
    }

    /// Identity of the live context, if any.
    pub fn context_id(&self) -> Option<ContextId> {
        self.live.as_ref().map(|l| l.platform.id())
    }

    /// Viewport of the live context, if any.
    pub fn platform_viewport(&self) -> Option<(u32, u32)> {
        self.live.as_ref().map(|l| l.platform.viewport())
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Render `scene`, OR-ing the translated options into `flags`.
    ///
    /// Returns color and depth, or depth alone with
    /// [`RenderFlags::DEPTH_ONLY`]. A renderer that was deleted gets a fresh
    /// context first.
    pub fn render(&mut self, scene: &Scene, flags: RenderFlags) -> Result<RenderOutput, RenderError> {
        check_viewport(self.viewport_width, self.viewport_height)?;
        if self.live.is_none() {
            tracing::debug!(platform = %self.kind, "no live context; creating");
            self.create()?;
        }

        let requested = (self.viewport_width, self.viewport_height);
        let needs_recreate = {
            let live = self.live.as_mut().ok_or(RenderError::NoContext)?;
            live.platform.make_current()?;
            live.platform.viewport() != requested && !live.platform.supports_framebuffers()
        };
        if needs_recreate {
            tracing::debug!(
                width = requested.0,
                height = requested.1,
                "platform cannot resize framebuffers; recreating context"
            );
            self.delete()?;
            self.create()?;
        }

        let mut flags = self.options.translate(flags);
        let Live { platform, renderer } = self.live.as_mut().ok_or(RenderError::NoContext)?;
        platform.make_current()?;
        renderer.set_viewport(requested.0, requested.1);
        renderer.set_point_size(self.point_size);

        if platform.supports_framebuffers() {
            flags |= RenderFlags::OFFSCREEN;
            return renderer.render(platform, scene, flags)?.ok_or_else(|| {
                RenderError::Readback("offscreen render returned no buffers".into())
            });
        }

        renderer.render(platform, scene, flags)?;
        let depth = renderer.read_depth_buf(platform)?;
        if flags.contains(RenderFlags::DEPTH_ONLY) {
            return Ok(RenderOutput::DepthOnly(depth));
        }
        let color = renderer.read_color_buf(platform)?;
        Ok(RenderOutput::ColorDepth { color, depth })
    }

    /// Release the renderer, then the context. Safe to call repeatedly.
    pub fn delete(&mut self) -> Result<(), RenderError> {
        let Some(Live {
            mut platform,
            mut renderer,
        }) = self.live.take()
        else {
            return Ok(());
        };
        renderer.delete(&mut platform);
        drop(renderer);
        let id = platform.id();
        platform.delete_context()?;
        tracing::debug!(context = %id, "context deleted");
        Ok(())
    }

    fn create(&mut self) -> Result<(), RenderError> {
        let (w, h) = (self.viewport_width, self.viewport_height);
        let mut platform = self.backend.create_platform(self.kind, w, h)?;
        let renderer = platform
            .init_context()
            .and_then(|()| platform.make_current())
            .and_then(|()| self.backend.create_renderer(&mut platform, w, h));
        let renderer = match renderer {
            Ok(r) => r,
            Err(e) => {
                // Partially constructed: the context may be live without a renderer.
                if let Err(cleanup) = platform.delete_context() {
                    tracing::warn!(error = %cleanup, "failed to release context after error");
                }
                return Err(e);
            }
        };
        tracing::info!(
            platform = %self.kind,
            context = %platform.id(),
            width = w,
            height = h,
            framebuffers = platform.supports_framebuffers(),
            "context created"
        );
        self.live = Some(Live { platform, renderer });
        Ok(())
    }
}

impl<B: GraphicsBackend> Drop for OffscreenRenderer<B> {
    fn drop(&mut self) {
        if let Err(e) = self.delete() {
            tracing::warn!(error = %e, "error releasing context on drop");
        }
    }
}

fn check_viewport(width: u32, height: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidViewport { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::DebugBackend;
    use glam::Vec4;

    fn renderer(framebuffers: bool) -> OffscreenRenderer<DebugBackend> {
        OffscreenRenderer::new(
            DebugBackend::new(framebuffers),
            PlatformKind::HiddenWindow,
            64,
            48,
            RenderOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn construction_creates_live_context() {
        for kind in [
            PlatformKind::HiddenWindow,
            PlatformKind::Egl { device_index: 0 },
            PlatformKind::OsMesa,
        ] {
            let r = OffscreenRenderer::new(
                DebugBackend::new(true),
                kind,
                8,
                8,
                RenderOptions::default(),
            )
            .unwrap();
            assert!(r.is_live());
            assert_eq!(r.platform_kind(), kind);
            assert_eq!(r.backend().log().platforms_created, 1);
        }
    }

    #[test]
    fn unsupported_platform_fails_construction() {
        let backend = DebugBackend::new(true);
        let log = backend.shared_log();
        let err = OffscreenRenderer::with_resolved_platform(
            backend,
            PlatformKind::from_vars(Some("wayland"), None),
            8,
            8,
            RenderOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            RenderError::Platform(PlatformError::Unsupported(ref name)) if name == "wayland"
        ));
        assert_eq!(log.borrow().platforms_created, 0);
    }

    #[test]
    fn zero_viewport_rejected() {
        let err = OffscreenRenderer::new(
            DebugBackend::new(true),
            PlatformKind::HiddenWindow,
            0,
            8,
            RenderOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, RenderError::InvalidViewport { width: 0, height: 8 }));
    }

    #[test]
    fn delete_twice_is_ok() {
        let mut r = renderer(true);
        r.delete().unwrap();
        r.delete().unwrap();
        assert!(!r.is_live());
        let log = r.backend().log();
        assert_eq!(log.renderers_deleted, 1);
        assert_eq!(log.platforms_deleted, 1);
    }

    #[test]
    fn renderer_released_before_context() {
        let mut r = renderer(true);
        r.delete().unwrap();
        assert_eq!(
            r.backend().log().events,
            vec!["create_platform", "create_renderer", "delete_renderer", "delete_context"]
        );
    }

    #[test]
    fn drop_releases_context() {
        let backend = DebugBackend::new(true);
        let log = backend.shared_log();
        {
            let _r = OffscreenRenderer::new(
                backend,
                PlatformKind::OsMesa,
                4,
                4,
                RenderOptions::default(),
            )
            .unwrap();
        }
        assert_eq!(log.borrow().platforms_deleted, 1);
    }

    #[test]
    fn failed_renderer_creation_releases_context() {
        let mut backend = DebugBackend::new(true);
        backend.fail_renderer_creation = true;
        let log = backend.shared_log();
        let err = OffscreenRenderer::new(backend, PlatformKind::OsMesa, 4, 4, RenderOptions::default());
        assert!(matches!(err, Err(RenderError::Device(_))));
        assert_eq!(log.borrow().platforms_deleted, 1);
    }

    #[test]
    fn resize_without_framebuffers_recreates_context() {
        let mut r = renderer(false);
        let scene = Scene::default();
        r.render(&scene, RenderFlags::NONE).unwrap();
        let before = r.context_id().unwrap();

        r.set_viewport(32, 16);
        let out = r.render(&scene, RenderFlags::NONE).unwrap();
        let after = r.context_id().unwrap();

        assert_ne!(before, after);
        assert_eq!(r.platform_viewport(), Some((32, 16)));
        assert_eq!((out.depth().width, out.depth().height), (32, 16));
        assert_eq!(r.backend().log().platforms_created, 2);
    }

    #[test]
    fn resize_with_framebuffers_keeps_context() {
        let mut r = renderer(true);
        let scene = Scene::default();
        let before = r.context_id().unwrap();
        r.set_viewport(32, 16);
        let out = r.render(&scene, RenderFlags::NONE).unwrap();
        assert_eq!(r.context_id().unwrap(), before);
        assert_eq!(out.color().unwrap().width, 32);
    }

    #[test]
    fn framebuffer_path_sets_offscreen() {
        let mut r = renderer(true);
        r.render(&Scene::default(), RenderFlags::NONE).unwrap();
        let flags = *r.backend().log().flags.last().unwrap();
        assert!(flags.contains(RenderFlags::OFFSCREEN));
    }

    #[test]
    fn readback_path_honors_depth_only() {
        let mut r = renderer(false);
        let out = r.render(&Scene::default(), RenderFlags::DEPTH_ONLY).unwrap();
        assert!(out.color().is_none());
        let flags = *r.backend().log().flags.last().unwrap();
        assert!(!flags.contains(RenderFlags::OFFSCREEN));
    }

    #[test]
    fn readback_path_returns_background() {
        let mut r = renderer(false);
        let mut scene = Scene::default();
        scene.bg_color = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let out = r.render(&scene, RenderFlags::NONE).unwrap();
        let color = out.color().unwrap();
        assert_eq!(color.channels, 3);
        assert_eq!(color.pixel(0, 0), &[255, 0, 0]);
        assert_eq!(out.depth().coverage(), 0);
    }

    #[test]
    fn options_reach_renderer_in_priority_order() {
        let mut r = renderer(true);
        {
            let opts = r.options_mut();
            opts.flip_wireframe = true;
            opts.all_wireframe = true;
            opts.all_solid = true;
        }
        r.render(&Scene::default(), RenderFlags::NONE).unwrap();
        let flags = *r.backend().log().flags.last().unwrap();
        assert!(flags.contains(RenderFlags::FLIP_WIREFRAME));
        assert!(!flags.intersects(RenderFlags::ALL_WIREFRAME | RenderFlags::ALL_SOLID));
    }

    #[test]
    fn render_after_delete_recreates() {
        let mut r = renderer(true);
        r.delete().unwrap();
        r.render(&Scene::default(), RenderFlags::NONE).unwrap();
        assert!(r.is_live());
        assert_eq!(r.backend().log().platforms_created, 2);
    }

    #[test]
    fn point_size_reaches_renderer() {
        let mut r = renderer(true);
        r.set_point_size(4.0);
        r.render(&Scene::default(), RenderFlags::NONE).unwrap();
        assert_eq!(r.backend().log().last_point_size, 4.0);
    }
}
