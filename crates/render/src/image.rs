/// 8-bit color buffer, row-major with the top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    /// 3 for RGB, 4 for RGBA.
    pub channels: u8,
    pub data: Vec<u8>,
}

impl ColorImage {
    /// Build an RGB or RGBA image from tightly packed RGBA8 texels.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8], keep_alpha: bool) -> Self {
        let data = if keep_alpha {
            rgba.to_vec()
        } else {
            rgba.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect()
        };
        Self {
            width,
            height,
            channels: if keep_alpha { 4 } else { 3 },
            data,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let i = (y as usize * self.width as usize + x as usize) * c;
        &self.data[i..i + c]
    }
}

/// Linear depth in scene units, row-major with the top row first.
/// Pixels where nothing was drawn hold 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl DepthImage {
    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Number of pixels covered by geometry.
    pub fn coverage(&self) -> usize {
        self.data.iter().filter(|d| **d > 0.0).count()
    }
}

/// What a render call produces.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutput {
    ColorDepth { color: ColorImage, depth: DepthImage },
    DepthOnly(DepthImage),
}

impl RenderOutput {
    pub fn color(&self) -> Option<&ColorImage> {
        match self {
            Self::ColorDepth { color, .. } => Some(color),
            Self::DepthOnly(_) => None,
        }
    }

    pub fn depth(&self) -> &DepthImage {
        match self {
            Self::ColorDepth { depth, .. } | Self::DepthOnly(depth) => depth,
        }
    }

    pub fn into_parts(self) -> (Option<ColorImage>, DepthImage) {
        match self {
            Self::ColorDepth { color, depth } => (Some(color), depth),
            Self::DepthOnly(depth) => (None, depth),
        }
    }
}
