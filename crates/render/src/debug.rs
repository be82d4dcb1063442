//! CPU stand-in backend.
//!
//! Produces background-only frames and records every lifecycle call in a
//! shared [`DebugLog`]. Useful for exercising [`OffscreenRenderer`] and the
//! turntable driver without a GPU.
//!
//! [`OffscreenRenderer`]: crate::OffscreenRenderer

use crate::{
    ColorImage, DepthImage, GraphicsBackend, Platform, PlatformKind, RenderError, RenderFlags,
    RenderOutput, SceneRenderer,
};
use offrender_common::ContextId;
use offrender_scene::Scene;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Everything the debug backend observed.
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    pub events: Vec<&'static str>,
    pub platforms_created: usize,
    pub platforms_deleted: usize,
    pub renderers_deleted: usize,
    /// Flags of every render call, in order.
    pub flags: Vec<RenderFlags>,
    pub last_point_size: f32,
    pub last_mesh_count: usize,
}

/// Backend whose platforms optionally support framebuffers.
#[derive(Debug, Default)]
pub struct DebugBackend {
    framebuffers: bool,
    /// Make the next renderer creation fail with [`RenderError::Device`].
    pub fail_renderer_creation: bool,
    log: Rc<RefCell<DebugLog>>,
}

impl DebugBackend {
    pub fn new(framebuffers: bool) -> Self {
        Self {
            framebuffers,
            ..Self::default()
        }
    }

    pub fn log(&self) -> Ref<'_, DebugLog> {
        self.log.borrow()
    }

    /// Handle to the log that outlives the backend.
    pub fn shared_log(&self) -> Rc<RefCell<DebugLog>> {
        Rc::clone(&self.log)
    }
}

struct Frame {
    rgba: Vec<u8>,
    depth: Vec<f32>,
}

pub struct DebugPlatform {
    id: ContextId,
    kind: PlatformKind,
    width: u32,
    height: u32,
    framebuffers: bool,
    live: bool,
    default_target: Option<Frame>,
    log: Rc<RefCell<DebugLog>>,
}

impl Platform for DebugPlatform {
    fn id(&self) -> ContextId {
        self.id
    }

    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn supports_framebuffers(&self) -> bool {
        self.framebuffers
    }

    fn init_context(&mut self) -> Result<(), RenderError> {
        self.live = true;
        Ok(())
    }

    fn make_current(&mut self) -> Result<(), RenderError> {
        if self.live {
            Ok(())
        } else {
            Err(RenderError::NoContext)
        }
    }

    fn delete_context(&mut self) -> Result<(), RenderError> {
        if std::mem::take(&mut self.live) {
            self.default_target = None;
            let mut log = self.log.borrow_mut();
            log.platforms_deleted += 1;
            log.events.push("delete_context");
        }
        Ok(())
    }
}

pub struct DebugRenderer {
    width: u32,
    height: u32,
    keep_alpha: bool,
    deleted: bool,
    log: Rc<RefCell<DebugLog>>,
}

fn clear_frame(scene: &Scene, width: u32, height: u32) -> Frame {
    let bg = (scene.bg_color.clamp(glam::Vec4::ZERO, glam::Vec4::ONE) * 255.0).round();
    let texel = [bg.x as u8, bg.y as u8, bg.z as u8, bg.w as u8];
    let pixels = (width * height) as usize;
    Frame {
        rgba: texel.repeat(pixels),
        depth: vec![0.0; pixels],
    }
}

impl SceneRenderer for DebugRenderer {
    type Platform = DebugPlatform;

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_point_size(&mut self, size: f32) {
        self.log.borrow_mut().last_point_size = size;
    }

    fn render(
        &mut self,
        platform: &mut DebugPlatform,
        scene: &Scene,
        flags: RenderFlags,
    ) -> Result<Option<RenderOutput>, RenderError> {
        platform.make_current()?;
        {
            let mut log = self.log.borrow_mut();
            log.flags.push(flags);
            log.last_mesh_count = scene.meshes().count();
        }
        self.keep_alpha = flags.contains(RenderFlags::RGBA);

        if !flags.contains(RenderFlags::OFFSCREEN) {
            let (w, h) = platform.viewport();
            platform.default_target = Some(clear_frame(scene, w, h));
            return Ok(None);
        }

        let frame = clear_frame(scene, self.width, self.height);
        let depth = DepthImage {
            width: self.width,
            height: self.height,
            data: frame.depth,
        };
        if flags.contains(RenderFlags::DEPTH_ONLY) {
            return Ok(Some(RenderOutput::DepthOnly(depth)));
        }
        let color = ColorImage::from_rgba8(self.width, self.height, &frame.rgba, self.keep_alpha);
        Ok(Some(RenderOutput::ColorDepth { color, depth }))
    }

    fn read_color_buf(&mut self, platform: &mut DebugPlatform) -> Result<ColorImage, RenderError> {
        let (w, h) = platform.viewport();
        let frame = platform
            .default_target
            .as_ref()
            .ok_or_else(|| RenderError::Readback("nothing rendered yet".into()))?;
        Ok(ColorImage::from_rgba8(w, h, &frame.rgba, self.keep_alpha))
    }

    fn read_depth_buf(&mut self, platform: &mut DebugPlatform) -> Result<DepthImage, RenderError> {
        let (width, height) = platform.viewport();
        let frame = platform
            .default_target
            .as_ref()
            .ok_or_else(|| RenderError::Readback("nothing rendered yet".into()))?;
        Ok(DepthImage {
            width,
            height,
            data: frame.depth.clone(),
        })
    }

    fn delete(&mut self, _platform: &mut DebugPlatform) {
        if !std::mem::replace(&mut self.deleted, true) {
            let mut log = self.log.borrow_mut();
            log.renderers_deleted += 1;
            log.events.push("delete_renderer");
        }
    }
}

impl GraphicsBackend for DebugBackend {
    type Platform = DebugPlatform;
    type Renderer = DebugRenderer;

    fn create_platform(
        &mut self,
        kind: PlatformKind,
        width: u32,
        height: u32,
    ) -> Result<DebugPlatform, RenderError> {
        {
            let mut log = self.log.borrow_mut();
            log.platforms_created += 1;
            log.events.push("create_platform");
        }
        Ok(DebugPlatform {
            id: ContextId::new(),
            kind,
            width,
            height,
            framebuffers: self.framebuffers,
            live: false,
            default_target: None,
            log: Rc::clone(&self.log),
        })
    }

    fn create_renderer(
        &mut self,
        _platform: &mut DebugPlatform,
        width: u32,
        height: u32,
    ) -> Result<DebugRenderer, RenderError> {
        if std::mem::take(&mut self.fail_renderer_creation) {
            return Err(RenderError::Device("renderer creation disabled".into()));
        }
        self.log.borrow_mut().events.push("create_renderer");
        Ok(DebugRenderer {
            width,
            height,
            keep_alpha: false,
            deleted: false,
            log: Rc::clone(&self.log),
        })
    }
}
