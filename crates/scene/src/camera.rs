use glam::{Mat4, Vec4};

pub const DEFAULT_Z_NEAR: f32 = 0.05;
pub const DEFAULT_Z_FAR: f32 = 100.0;

/// Pinhole camera described by its intrinsics, in pixels.
///
/// The camera looks down its local -Z axis with +Y up. Projection maps
/// view depth into the `[0, 1]` clip range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntrinsicsCamera {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl IntrinsicsCamera {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            znear: DEFAULT_Z_NEAR,
            zfar: DEFAULT_Z_FAR,
        }
    }

    /// Projection matrix for a viewport of the given size.
    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let (n, f) = (self.znear, self.zfar);
        Mat4::from_cols(
            Vec4::new(2.0 * self.fx / w, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 * self.fy / h, 0.0, 0.0),
            Vec4::new(
                1.0 - 2.0 * self.cx / w,
                2.0 * self.cy / h - 1.0,
                f / (n - f),
                -1.0,
            ),
            Vec4::new(0.0, 0.0, f * n / (n - f), 0.0),
        )
    }

    /// Convert a `[0, 1]` depth-buffer value to distance along the view axis.
    /// Cleared depth (1.0 or beyond) maps to 0.
    pub fn linear_depth(&self, depth: f32) -> f32 {
        if depth >= 1.0 {
            return 0.0;
        }
        let (n, f) = (self.znear, self.zfar);
        f * n / (f - depth * (f - n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn cam() -> IntrinsicsCamera {
        IntrinsicsCamera::new(500.0, 500.0, 256.0, 256.0)
    }

    #[test]
    fn near_and_far_planes_map_to_unit_range() {
        let c = cam();
        let p = c.projection_matrix(512, 512);
        let near = p.project_point3(Vec3::new(0.0, 0.0, -c.znear));
        let far = p.project_point3(Vec3::new(0.0, 0.0, -c.zfar));
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn centered_principal_point_hits_origin() {
        let p = cam().projection_matrix(512, 512);
        let ndc = p.project_point3(Vec3::new(0.0, 0.0, -5.0));
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn focal_length_sets_pixel_scale() {
        let p = cam().projection_matrix(512, 512);
        // One unit off-axis at distance 500/256 lands on the image border.
        let ndc = p.project_point3(Vec3::new(1.0, 0.0, -500.0 / 256.0));
        assert_relative_eq!(ndc.x, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn linear_depth_inverts_projection() {
        let c = cam();
        let p = c.projection_matrix(512, 512);
        let d = p.project_point3(Vec3::new(0.0, 0.0, -10.0)).z;
        assert_relative_eq!(c.linear_depth(d), 10.0, epsilon = 1e-2);
        assert_eq!(c.linear_depth(1.0), 0.0);
    }
}
