//! Math helpers shared by the simulation crates.
//!
//! Thin wrappers over [`glam`] covering the handful of operations the motor
//! and combat code lean on everywhere: bounded stepping toward a target,
//! magnitude clamping, and plane projections against ground normals.

use glam::Vec3;

/// Moves a scalar toward a target by at most `max_delta`, without overshoot.
#[must_use]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(delta)
    }
}

/// Moves a vector toward a target by at most `max_delta`, without overshoot.
#[must_use]
pub fn move_towards_vec3(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let to_target = target - current;
    let distance = to_target.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + to_target / distance * max_delta
    }
}

/// Clamps a vector's magnitude to `max_length`, preserving direction.
#[must_use]
pub fn clamp_magnitude(v: Vec3, max_length: f32) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq > max_length * max_length {
        v / len_sq.sqrt() * max_length
    } else {
        v
    }
}

/// Projects a vector onto the plane defined by a unit normal.
#[must_use]
pub fn project_on_plane(v: Vec3, plane_normal: Vec3) -> Vec3 {
    v - plane_normal * v.dot(plane_normal)
}

/// Strips the vertical component of a vector.
#[must_use]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Unsigned angle between two vectors in degrees. Zero-length inputs give 0.
#[must_use]
pub fn angle_between_deg(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    let cos = (a.dot(b) / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Angle in degrees between a surface normal and world up.
#[must_use]
pub fn slope_angle_deg(normal: Vec3) -> f32 {
    angle_between_deg(normal, Vec3::Y)
}
