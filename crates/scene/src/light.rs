use glam::{Mat4, Vec3};
use offrender_common::Rgb;

/// Infinitely distant light shining along the -Z axis of its node pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(color: Rgb, intensity: f32) -> Self {
        Self { color, intensity }
    }

    /// World-space unit direction the light travels in.
    pub fn direction(pose: &Mat4) -> Vec3 {
        (-pose.z_axis.truncate()).normalize_or_zero()
    }

    /// Color premultiplied by intensity.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::ONE, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use offrender_common::rotation_x;

    #[test]
    fn identity_pose_points_down_negative_z() {
        assert_eq!(DirectionalLight::direction(&Mat4::IDENTITY), Vec3::NEG_Z);
    }

    #[test]
    fn tilted_light_shines_downward() {
        let dir = DirectionalLight::direction(&rotation_x(45.0));
        assert!(dir.y < 0.0);
        assert_relative_eq!(dir.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn radiance_scales_color() {
        let light = DirectionalLight::new(Vec3::ONE, 1.8);
        assert_eq!(light.radiance(), Vec3::splat(1.8));
    }
}
