bitflags::bitflags! {
    /// Bitmask consumed by scene renderers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        /// Render depth only; no color buffer is produced.
        const DEPTH_ONLY = 1;
        /// Render into the renderer's own framebuffer and return the buffers.
        const OFFSCREEN = 1 << 1;
        /// Invert each material's wireframe setting.
        const FLIP_WIREFRAME = 1 << 2;
        /// Draw every primitive as wireframe.
        const ALL_WIREFRAME = 1 << 3;
        /// Draw every primitive filled.
        const ALL_SOLID = 1 << 4;
        const SHADOWS_DIRECTIONAL = 1 << 5;
        const SHADOWS_POINT = 1 << 6;
        const SHADOWS_SPOT = 1 << 7;
        const SHADOWS_ALL = Self::SHADOWS_DIRECTIONAL.bits()
            | Self::SHADOWS_POINT.bits()
            | Self::SHADOWS_SPOT.bits();
        /// Draw vertex normals as blue lines.
        const VERTEX_NORMALS = 1 << 8;
        /// Draw face normals as blue lines.
        const FACE_NORMALS = 1 << 9;
        /// Disable back-face culling.
        const SKIP_CULL_FACES = 1 << 10;
        /// Return four-channel color.
        const RGBA = 1 << 11;
    }
}

impl RenderFlags {
    pub const NONE: Self = Self::empty();

    /// Whether a primitive whose material says `wireframe` is drawn as lines.
    pub fn resolve_wireframe(self, material_wireframe: bool) -> bool {
        if self.contains(Self::FLIP_WIREFRAME) {
            !material_wireframe
        } else if self.contains(Self::ALL_WIREFRAME) {
            true
        } else if self.contains(Self::ALL_SOLID) {
            false
        } else {
            material_wireframe
        }
    }
}
