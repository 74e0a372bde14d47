//! Angle helpers
//!
//! The world is Z-up. Orientation is stored as a `Vec3` of Euler angles in
//! degrees laid out as `(pitch, yaw, roll)`: yaw 0 faces +X and increases
//! counter-clockwise seen from above, positive pitch looks up.

use glam::Vec3;

/// Index of pitch in an angle vector
pub const PITCH: usize = 0;
/// Index of yaw in an angle vector
pub const YAW: usize = 1;
/// Index of roll in an angle vector
pub const ROLL: usize = 2;

/// Wrap an angle into [0, 360)
pub fn angle_mod(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into (-180, 180]
pub fn angle_normalize_180(angle: f32) -> f32 {
    let wrapped = angle_mod(angle);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Shortest signed rotation from `from` to `to`, in (-180, 180]
pub fn angle_delta(to: f32, from: f32) -> f32 {
    angle_normalize_180(to - from)
}

/// Yaw of a direction, ignoring its vertical component
pub fn vec_to_yaw(v: Vec3) -> f32 {
    if v.x == 0.0 && v.y == 0.0 {
        return 0.0;
    }
    angle_mod(v.y.atan2(v.x).to_degrees())
}

/// Pitch of a direction (positive looks up)
pub fn vec_to_pitch(v: Vec3) -> f32 {
    let horizontal = (v.x * v.x + v.y * v.y).sqrt();
    if horizontal == 0.0 && v.z == 0.0 {
        return 0.0;
    }
    v.z.atan2(horizontal).to_degrees()
}

/// `(pitch, yaw, 0)` for a direction
pub fn vec_to_angles(v: Vec3) -> Vec3 {
    Vec3::new(vec_to_pitch(v), vec_to_yaw(v), 0.0)
}

/// Unit horizontal direction for a yaw
pub fn yaw_to_dir(yaw: f32) -> Vec3 {
    let (sin, cos) = yaw.to_radians().sin_cos();
    Vec3::new(cos, sin, 0.0)
}

/// Unit direction for a pitch and yaw
pub fn angles_to_dir(pitch: f32, yaw: f32) -> Vec3 {
    let (sp, cp) = pitch.to_radians().sin_cos();
    let (sy, cy) = yaw.to_radians().sin_cos();
    Vec3::new(cp * cy, cp * sy, sp)
}

/// Forward, right and up basis vectors for an angle vector (roll ignored)
pub fn angles_to_vectors(angles: Vec3) -> (Vec3, Vec3, Vec3) {
    let forward = angles_to_dir(angles.x, angles.y);
    let (sy, cy) = angles.y.to_radians().sin_cos();
    let right = Vec3::new(sy, -cy, 0.0);
    let up = right.cross(forward);
    (forward, right, up)
}

/// Squared horizontal length of a vector
pub fn horizontal_length_sq(v: Vec3) -> f32 {
    v.x * v.x + v.y * v.y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_angle_wrapping() {
        assert!(close(angle_mod(-90.0), 270.0));
        assert!(close(angle_mod(720.0), 0.0));
        assert!(close(angle_normalize_180(270.0), -90.0));
        assert!(close(angle_normalize_180(180.0), 180.0));
        assert!(close(angle_delta(10.0, 350.0), 20.0));
        assert!(close(angle_delta(350.0, 10.0), -20.0));
    }

    #[test]
    fn test_vec_to_angles() {
        assert!(close(vec_to_yaw(Vec3::Y), 90.0));
        assert!(close(vec_to_yaw(-Vec3::X), 180.0));
        assert!(close(vec_to_pitch(Vec3::new(1.0, 0.0, 1.0)), 45.0));
        assert_eq!(vec_to_yaw(Vec3::Z), 0.0);
    }

    #[test]
    fn test_basis_vectors() {
        let (forward, right, up) = angles_to_vectors(Vec3::ZERO);
        assert!(forward.abs_diff_eq(Vec3::X, 1e-5));
        assert!(right.abs_diff_eq(-Vec3::Y, 1e-5));
        assert!(up.abs_diff_eq(Vec3::Z, 1e-5));

        let (forward, right, _) = angles_to_vectors(Vec3::new(0.0, 90.0, 0.0));
        assert!(forward.abs_diff_eq(Vec3::Y, 1e-5));
        assert!(right.abs_diff_eq(Vec3::X, 1e-5));
    }
}
