//! Closed-form ballistic aiming.
//!
//! This module provides:
//! - The inverse trajectory solve: launch velocity of fixed speed that lands
//!   a gravity-driven projectile on a target point
//! - A best-effort fallback for targets beyond the reachable envelope
//!
//! The problem is reduced to the vertical plane through shooter and target
//! (horizontal axis toward the target, vertical axis world up) and solved
//! with the standard projectile-angle equation. Of the two angle roots the
//! flatter one is always taken; lobbed shots read badly in play.

use glam::{Vec2, Vec3};
use tracing::debug;

use skyreach_common::math::horizontal;

/// Minimum horizontal distance used in the angle equation. Guards the
/// division when the target is (nearly) straight above or below.
pub const MIN_HORIZONTAL_DISTANCE: f32 = 1e-3;

/// Margin the fallback solves for instead of a zero discriminant, keeping
/// the corrected point clear of the degenerate root.
const DISCRIMINANT_MARGIN: f64 = 1.0;

/// Computes the launch velocity that lands a projectile on `target`.
///
/// `speed` is the fixed launch speed (must be positive), `gravity` the
/// downward acceleration magnitude. The returned vector always has magnitude
/// `speed`.
///
/// When the target is out of reach at this speed the aim point is pulled to
/// the closest reachable point along the same vertical-plane line by solving
/// a depressed cubic for the corrected horizontal distance. That solve keeps
/// only one of the cubic's roots, which is not the right one for every
/// geometry; the shot stays plausible but can land short of the true
/// nearest point. Known approximation, kept for its stability.
#[must_use]
pub fn solve_launch_velocity(origin: Vec3, target: Vec3, speed: f32, gravity: f32) -> Vec3 {
    debug_assert!(speed > 0.0, "caller must not fire at zero speed");
    debug_assert!(gravity > 0.0, "gravity magnitude must be positive");

    // Reduce to 2D: x along the horizontal direction to the target, y up.
    let to_target = target - origin;
    let flat = horizontal(to_target);
    let flat_len = flat.length();
    let x_axis = if flat_len > MIN_HORIZONTAL_DISTANCE {
        flat / flat_len
    } else {
        Vec3::X
    };
    let mut x = flat_len.max(MIN_HORIZONTAL_DISTANCE);
    let mut y = to_target.y;

    let v2 = speed * speed;
    let v4 = v2 * v2;
    let g2 = gravity * gravity;

    let mut disc = v4 - gravity * (gravity * x * x + 2.0 * y * v2);
    if disc < 0.0 {
        // Target unreachable at this speed: pull the aim point back along
        // the same line to where the discriminant equals the margin. The
        // corrected x solves x^3 + 3p*x + 2q = 0.
        let q = -f64::from(x) * f64::from(v4) / f64::from(g2);
        let p = (2.0 * f64::from(y) * f64::from(gravity) * f64::from(v2)
            + f64::from(v4)
            + DISCRIMINANT_MARGIN)
            / (3.0 * f64::from(g2));

        let cubic_disc = q * q + p * p * p;
        let new_x = if cubic_disc >= 0.0 {
            // One real root: Cardano.
            let s = cubic_disc.sqrt();
            -(q + s).cbrt() - (q - s).cbrt()
        } else {
            // Three real roots: trigonometric form, principal root only.
            let r = (-p).sqrt();
            let phi = (-q / (r * r * r)).clamp(-1.0, 1.0).acos();
            2.0 * r * (phi / 3.0).cos()
        };
        let new_y = ((f64::from(v4) - DISCRIMINANT_MARGIN) / f64::from(gravity)
            - f64::from(gravity) * new_x * new_x)
            / (2.0 * f64::from(v2));

        debug!(
            x,
            y,
            new_x,
            new_y,
            "aim target unreachable, pulled to closest reachable point"
        );
        x = new_x as f32;
        y = new_y as f32;
        disc = v4 - gravity * (gravity * x * x + 2.0 * y * v2);
    }

    // Low-angle root; the high-angle option (v2 + sqrt) is never wanted.
    let tan_angle = (v2 - disc.max(0.0).sqrt()) / (gravity * x);
    let plane_velocity = Vec2::new(1.0, tan_angle).normalize() * speed;

    Vec3::Y * plane_velocity.y + x_axis * plane_velocity.x
}
