//! Per-contact collision response for the character motor.
//!
//! Contacts arrive synchronously from the displacement step. Dynamic
//! counterparts get a one-dimensional impulse exchange along the contact
//! normal; static and kinematic geometry cancels the inbound part of the
//! input velocity so the character slides instead of catching. Contacts that
//! look like walkable ground arm the motor's ground magnet ahead of the next
//! ground scan.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use skyreach_common::math::angle_between_deg;
use skyreach_common::SurfaceId;

use crate::motor::MovementState;
use crate::world::{Contact, LayerMask};

/// Tunables for contact response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Minimum inbound velocity before the input velocity is corrected
    pub min_collision_velocity: f32,
    /// Character mass used for rigid-body impulse exchange
    pub mass: f32,
    /// Restitution coefficient for rigid-body impulses (0 = no bounce)
    pub restitution: f32,
    /// Layers whose contacts never modify velocity
    pub ignored_layers: LayerMask,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            min_collision_velocity: 0.1,
            mass: 1.0,
            restitution: 0.0,
            ignored_layers: LayerMask::NONE,
        }
    }
}

/// Character-side context for a contact, fixed for the duration of a tick.
#[derive(Debug, Clone, Copy)]
pub struct ContactContext {
    /// Movement state at the time of the contact
    pub state: MovementState,
    /// Character center position
    pub position: Vec3,
    /// Capsule radius; contacts below this height classify as ground
    pub capsule_radius: f32,
    /// Maximum walkable slope in degrees
    pub slope_limit_deg: f32,
}

/// Outcome of responding to one contact.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactResponse {
    /// Impulse to hand to the host world: (body surface, impulse, point)
    pub impulse: Option<(SurfaceId, Vec3, Vec3)>,
    /// Whether this contact classifies as walkable ground
    pub ground_like: bool,
}

/// Applies collision response for a single contact, correcting the velocity
/// decomposition in place.
pub fn respond(
    contact: &Contact,
    ctx: &ContactContext,
    config: &CollisionConfig,
    input_velocity: &mut Vec3,
    forces_velocity: &mut Vec3,
) -> ContactResponse {
    let normal = contact.normal;
    let mut response = ContactResponse::default();

    if !contact.layers.intersects(config.ignored_layers) {
        match contact.body {
            Some(body) if !body.kinematic => {
                // Impulse exchange with a dynamic rigid body.
                let relative = *input_velocity - body.point_velocity;
                let inbound = relative.dot(normal);
                if inbound < 0.0 {
                    let impulse_mag = ((1.0 + config.restitution) * inbound)
                        / (1.0 / config.mass + 1.0 / body.mass);
                    *input_velocity -= impulse_mag * normal / config.mass;
                    response.impulse =
                        Some((contact.surface, impulse_mag * normal, contact.point));
                }
            }
            _ => {
                // Static or kinematic: cancel the inbound input velocity
                // beyond the minimum threshold.
                let inbound = normal.dot(*input_velocity);
                if inbound < -config.min_collision_velocity {
                    *input_velocity -= (1.0 - config.min_collision_velocity) * inbound * normal;
                }
            }
        }
    }

    // Forces velocity stops at surfaces while falling, so landings do not
    // accumulate downward force.
    if ctx.state == MovementState::Falling {
        let inbound = normal.dot(*forces_velocity);
        if inbound < 0.0 {
            *forces_velocity -= inbound * normal;
        }
    }

    // A contact low on the capsule and under the slope limit counts as
    // ground; the magnet can engage before the next scan confirms it.
    // Suppressed while jumping.
    response.ground_like = ctx.state != MovementState::Jumping
        && angle_between_deg(normal, Vec3::Y) < ctx.slope_limit_deg
        && contact.point.y - ctx.position.y < ctx.capsule_radius;

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ContactBody;

    fn context(state: MovementState) -> ContactContext {
        ContactContext {
            state,
            position: Vec3::ZERO,
            capsule_radius: 0.5,
            slope_limit_deg: 45.0,
        }
    }

    fn wall_contact() -> Contact {
        Contact {
            point: Vec3::new(0.5, 0.0, 0.0),
            normal: Vec3::NEG_X,
            surface: SurfaceId::new(1),
            layers: LayerMask::layer(0),
            body: None,
        }
    }

    #[test]
    fn test_static_contact_cancels_inbound_input() {
        let config = CollisionConfig::default();
        let ctx = context(MovementState::Grounded);
        let mut input = Vec3::new(5.0, 0.0, 0.0);
        let mut forces = Vec3::ZERO;

        respond(&wall_contact(), &ctx, &config, &mut input, &mut forces);

        // Reduced toward zero, never reversed past the threshold.
        assert!(input.x >= 0.0);
        assert!(input.x <= config.min_collision_velocity * 5.0 + 1e-6);
    }

    #[test]
    fn test_slow_contact_below_threshold_untouched() {
        let config = CollisionConfig::default();
        let ctx = context(MovementState::Grounded);
        let mut input = Vec3::new(0.05, 0.0, 0.0);
        let mut forces = Vec3::ZERO;

        respond(&wall_contact(), &ctx, &config, &mut input, &mut forces);
        assert_eq!(input, Vec3::new(0.05, 0.0, 0.0));
    }

    #[test]
    fn test_ignored_layer_skips_velocity_but_classifies_ground() {
        let config = CollisionConfig {
            ignored_layers: LayerMask::layer(0),
            ..Default::default()
        };
        let ctx = context(MovementState::Falling);
        let mut contact = wall_contact();
        contact.normal = Vec3::Y;
        contact.point = Vec3::new(0.0, -0.4, 0.0);
        let mut input = Vec3::new(0.0, -3.0, 0.0);
        let mut forces = Vec3::ZERO;

        let response = respond(&contact, &ctx, &config, &mut input, &mut forces);
        assert_eq!(input, Vec3::new(0.0, -3.0, 0.0));
        assert!(response.ground_like);
    }

    #[test]
    fn test_dynamic_body_impulse_exchange() {
        let config = CollisionConfig::default();
        let ctx = context(MovementState::Grounded);
        let contact = Contact {
            point: Vec3::new(0.5, 0.0, 0.0),
            normal: Vec3::NEG_X,
            surface: SurfaceId::new(2),
            layers: LayerMask::layer(0),
            body: Some(ContactBody {
                mass: 1.0,
                kinematic: false,
                point_velocity: Vec3::ZERO,
            }),
        };
        let mut input = Vec3::new(4.0, 0.0, 0.0);
        let mut forces = Vec3::ZERO;

        let response = respond(&contact, &ctx, &config, &mut input, &mut forces);

        // Equal masses, no restitution: half the closing speed each.
        assert!((input.x - 2.0).abs() < 1e-6);
        let (surface, impulse, _) = response.impulse.expect("impulse for dynamic body");
        assert_eq!(surface, SurfaceId::new(2));
        assert!((impulse.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_kinematic_body_treated_as_static() {
        let config = CollisionConfig::default();
        let ctx = context(MovementState::Grounded);
        let contact = Contact {
            body: Some(ContactBody {
                mass: 100.0,
                kinematic: true,
                point_velocity: Vec3::ZERO,
            }),
            ..wall_contact()
        };
        let mut input = Vec3::new(5.0, 0.0, 0.0);
        let mut forces = Vec3::ZERO;

        let response = respond(&contact, &ctx, &config, &mut input, &mut forces);
        assert!(response.impulse.is_none());
        assert!(input.x < 5.0);
    }

    #[test]
    fn test_falling_cancels_forces_into_surface() {
        let config = CollisionConfig::default();
        let ctx = context(MovementState::Falling);
        let mut contact = wall_contact();
        contact.normal = Vec3::Y;
        contact.point = Vec3::new(0.0, -0.4, 0.0);
        let mut input = Vec3::ZERO;
        let mut forces = Vec3::new(0.0, -9.0, 0.0);

        let response = respond(&contact, &ctx, &config, &mut input, &mut forces);
        assert_eq!(forces, Vec3::ZERO);
        assert!(response.ground_like);
    }

    #[test]
    fn test_jumping_never_classifies_ground() {
        let config = CollisionConfig::default();
        let ctx = context(MovementState::Jumping);
        let mut contact = wall_contact();
        contact.normal = Vec3::Y;
        contact.point = Vec3::new(0.0, -0.4, 0.0);
        let mut input = Vec3::ZERO;
        let mut forces = Vec3::ZERO;

        let response = respond(&contact, &ctx, &config, &mut input, &mut forces);
        assert!(!response.ground_like);
    }

    #[test]
    fn test_steep_contact_not_ground() {
        let config = CollisionConfig::default();
        let ctx = context(MovementState::Falling);
        let mut contact = wall_contact();
        contact.normal = Vec3::new(1.0, 0.2, 0.0).normalize();
        contact.point = Vec3::new(-0.4, -0.3, 0.0);
        let mut input = Vec3::ZERO;
        let mut forces = Vec3::ZERO;

        let response = respond(&contact, &ctx, &config, &mut input, &mut forces);
        assert!(!response.ground_like);
    }
}
