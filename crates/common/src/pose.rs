//! Homogeneous pose helpers. All angles are in degrees.

use glam::{Mat3, Mat4, Vec3};

/// Rotation about the X axis that tilts +Z toward +Y for positive angles.
///
/// Lights posed with a positive tilt therefore shine downward, since a
/// directional light points along the -Z axis of its pose.
pub fn rotation_x(degrees: f32) -> Mat4 {
    Mat4::from_rotation_x(-degrees.to_radians())
}

/// Right-handed rotation about the vertical (+Y) axis.
pub fn rotation_y(degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(degrees.to_radians())
}

/// Pure translation.
pub fn location(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

/// Apply the rotational part of `pose` to every point in place.
pub fn rotate_points(points: &mut [Vec3], pose: &Mat4) {
    let rot = Mat3::from_mat4(*pose);
    for p in points.iter_mut() {
        *p = rot * *p;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rotation_y_quarter_turn() {
        let m = rotation_y(90.0);
        let v = m.transform_vector3(Vec3::X);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn rotation_x_tilts_z_toward_y() {
        let m = rotation_x(90.0);
        let v = m.transform_vector3(Vec3::Z);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn location_moves_origin() {
        let m = location(1.0, 2.0, 3.0);
        assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rotate_points_ignores_translation() {
        let mut pts = vec![Vec3::X];
        rotate_points(&mut pts, &(location(5.0, 5.0, 5.0) * rotation_y(180.0)));
        assert_relative_eq!(pts[0].x, -1.0, epsilon = 1e-6);
        assert_relative_eq!(pts[0].y, 0.0, epsilon = 1e-6);
    }
}
