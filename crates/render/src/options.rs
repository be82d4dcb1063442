use crate::RenderFlags;
use serde::{Deserialize, Serialize};

/// Named render options, translated into [`RenderFlags`] on every render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Invert each material's wireframe setting.
    pub flip_wireframe: bool,
    /// Draw everything as wireframe.
    pub all_wireframe: bool,
    /// Draw everything filled.
    pub all_solid: bool,
    /// Render shadows from directional and spot lights.
    pub shadows: bool,
    /// Draw vertex normals as blue lines.
    pub vertex_normals: bool,
    /// Draw face normals as blue lines.
    pub face_normals: bool,
    /// Cull back faces.
    pub cull_faces: bool,
    /// Screen-space point size in pixels.
    pub point_size: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            flip_wireframe: false,
            all_wireframe: false,
            all_solid: false,
            shadows: false,
            vertex_normals: false,
            face_normals: false,
            cull_faces: true,
            point_size: 1.0,
        }
    }
}

impl RenderOptions {
    /// OR the options into `base`.
    ///
    /// The wireframe options are mutually exclusive downstream: only the
    /// highest-priority one that is set contributes its bit.
    pub fn translate(&self, base: RenderFlags) -> RenderFlags {
        let mut flags = base;
        if self.flip_wireframe {
            flags |= RenderFlags::FLIP_WIREFRAME;
        } else if self.all_wireframe {
            flags |= RenderFlags::ALL_WIREFRAME;
        } else if self.all_solid {
            flags |= RenderFlags::ALL_SOLID;
        }
        if self.shadows {
            flags |= RenderFlags::SHADOWS_DIRECTIONAL | RenderFlags::SHADOWS_SPOT;
        }
        if self.vertex_normals {
            flags |= RenderFlags::VERTEX_NORMALS;
        }
        if self.face_normals {
            flags |= RenderFlags::FACE_NORMALS;
        }
        if !self.cull_faces {
            flags |= RenderFlags::SKIP_CULL_FACES;
        }
        flags
    }
}
