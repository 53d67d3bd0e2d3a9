//! World-query contracts between the simulation and the host engine.
//!
//! This module provides:
//! - Layer masks for filtering casts and overlaps
//! - Query result types (sphere-cast, ray-cast, contacts)
//! - The [`World`] trait the motor and combat controller run against
//! - [`MockWorld`] for testing
//!
//! The host owns all collision geometry. The simulation only issues queries
//! and displacement requests; contacts produced by a displacement are
//! returned synchronously so the caller can resolve them before its tick
//! finishes.

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use skyreach_common::SurfaceId;

/// Bit mask of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Mask matching no layers.
    pub const NONE: Self = Self(0);

    /// Mask matching every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Mask with a single layer bit set.
    #[must_use]
    pub const fn layer(index: u32) -> Self {
        Self(1 << index)
    }

    /// Raw bits of the mask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether the two masks share any layer.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Mask matching every layer this one does not.
    #[must_use]
    pub const fn inverted(self) -> Self {
        Self(!self.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Result of a sphere-cast query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereCastHit {
    /// Contact point on the hit surface
    pub point: Vec3,
    /// Surface normal at the contact point
    pub normal: Vec3,
    /// Distance travelled by the sphere center before touching
    pub distance: f32,
    /// Handle of the hit surface
    pub surface: SurfaceId,
}

/// Result of a ray-cast query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayCastHit {
    /// Contact point on the hit surface
    pub point: Vec3,
    /// Surface normal at the contact point
    pub normal: Vec3,
    /// Handle of the hit surface
    pub surface: SurfaceId,
}

/// Dynamic-body properties carried on a contact with a rigid counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactBody {
    /// Body mass in kilograms
    pub mass: f32,
    /// Kinematic bodies ignore impulses
    pub kinematic: bool,
    /// Body velocity at the contact point
    pub point_velocity: Vec3,
}

/// A single contact produced while displacing the character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// World-space contact point
    pub point: Vec3,
    /// Contact normal, pointing away from the hit surface
    pub normal: Vec3,
    /// Handle of the hit surface
    pub surface: SurfaceId,
    /// Layers the hit surface belongs to
    pub layers: LayerMask,
    /// Rigid-body properties when the counterpart is dynamic
    pub body: Option<ContactBody>,
}

/// Result of a character displacement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Resolved position after sliding against solid geometry
    pub position: Vec3,
    /// Contacts generated during the move, in order of occurrence
    pub contacts: Vec<Contact>,
}

/// Spatial-query and displacement service supplied by the host world.
pub trait World {
    /// Casts a sphere and returns the first hit within `max_distance`.
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SphereCastHit>;

    /// Returns all surfaces overlapping a sphere.
    fn sphere_overlap(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<SurfaceId>;

    /// Casts a ray and returns the first hit within `max_distance`.
    fn ray_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayCastHit>;

    /// Moves the character by `delta` from `from`, sliding against solid
    /// geometry. Contacts are reported in the outcome, not deferred.
    fn move_character(&mut self, from: Vec3, delta: Vec3) -> MoveOutcome;

    /// Per-tick offset of a moving platform since the previous query, or
    /// `None` if the surface has no moving-platform capability.
    fn platform_offset(&mut self, surface: SurfaceId) -> Option<Vec3>;

    /// Applies an impulse to a dynamic body at a world-space point.
    fn apply_impulse(&mut self, surface: SurfaceId, impulse: Vec3, point: Vec3);
}

/// Flat-ground plane used by [`MockWorld`].
#[derive(Debug, Clone, Copy)]
struct GroundPlane {
    height: f32,
    normal: Vec3,
    surface: SurfaceId,
    layers: LayerMask,
}

/// Overlap target registered with [`MockWorld`].
#[derive(Debug, Clone, Copy)]
struct OverlapTarget {
    position: Vec3,
    layers: LayerMask,
}

/// Mock world for testing.
///
/// Supports a configurable flat ground plane (with an overridable reported
/// normal for slope scenarios), registered overlap targets, scripted ray
/// hits, queued contacts delivered on the next displacement, and
/// moving-platform offsets. Applied impulses are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockWorld {
    ground: Option<GroundPlane>,
    /// Minimum height of the character center above the ground plane;
    /// displacement clamps to it when set.
    floor_clearance: Option<f32>,
    overlap_targets: AHashMap<SurfaceId, OverlapTarget>,
    ray_hit: Option<RayCastHit>,
    queued_contacts: Vec<Contact>,
    platforms: AHashMap<SurfaceId, Vec3>,
    /// Impulses applied through [`World::apply_impulse`]: (surface, impulse, point).
    pub applied_impulses: Vec<(SurfaceId, Vec3, Vec3)>,
}

impl MockWorld {
    /// Creates an empty mock world with no ground.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a flat ground plane at `height` with the given surface handle.
    pub fn set_ground(&mut self, height: f32, surface: SurfaceId) {
        self.ground = Some(GroundPlane {
            height,
            normal: Vec3::Y,
            surface,
            layers: LayerMask::ALL,
        });
    }

    /// Overrides the normal reported by ground hits (slope scenarios).
    pub fn set_ground_normal(&mut self, normal: Vec3) {
        if let Some(ground) = &mut self.ground {
            ground.normal = normal.normalize();
        }
    }

    /// Assigns the ground surface to specific layers.
    pub fn set_ground_layers(&mut self, layers: LayerMask) {
        if let Some(ground) = &mut self.ground {
            ground.layers = layers;
        }
    }

    /// Removes the ground plane.
    pub fn clear_ground(&mut self) {
        self.ground = None;
    }

    /// Clamps displaced positions to `ground height + clearance`.
    pub fn set_floor_clearance(&mut self, clearance: f32) {
        self.floor_clearance = Some(clearance);
    }

    /// Registers a surface found by sphere overlaps.
    pub fn add_overlap_target(&mut self, surface: SurfaceId, position: Vec3, layers: LayerMask) {
        self.overlap_targets
            .insert(surface, OverlapTarget { position, layers });
    }

    /// Scripts the result of the next ray casts.
    pub fn set_ray_hit(&mut self, hit: Option<RayCastHit>) {
        self.ray_hit = hit;
    }

    /// Queues a contact to be delivered by the next displacement.
    pub fn queue_contact(&mut self, contact: Contact) {
        self.queued_contacts.push(contact);
    }

    /// Marks a surface as a moving platform and sets its pending offset.
    ///
    /// The offset is reported once by the next [`World::platform_offset`]
    /// query and then reset to zero, matching the once-per-tick contract.
    pub fn set_platform_offset(&mut self, surface: SurfaceId, offset: Vec3) {
        self.platforms.insert(surface, offset);
    }
}

impl World for MockWorld {
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        _direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SphereCastHit> {
        // Downward casts against the flat plane only; that is all the motor
        // issues.
        let ground = self.ground?;
        if !mask.intersects(ground.layers) {
            return None;
        }
        let travelled = (origin.y - ground.height - radius).max(0.0);
        if travelled > max_distance {
            return None;
        }
        Some(SphereCastHit {
            point: Vec3::new(origin.x, ground.height, origin.z),
            normal: ground.normal,
            distance: travelled,
            surface: ground.surface,
        })
    }

    fn sphere_overlap(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<SurfaceId> {
        let mut hits: Vec<SurfaceId> = self
            .overlap_targets
            .iter()
            .filter(|(_, target)| {
                mask.intersects(target.layers)
                    && target.position.distance_squared(center) <= radius * radius
            })
            .map(|(surface, _)| *surface)
            .collect();
        hits.sort_by_key(|surface| surface.raw());
        hits
    }

    fn ray_cast(
        &self,
        _origin: Vec3,
        _direction: Vec3,
        _max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayCastHit> {
        self.ray_hit.filter(|_| mask != LayerMask::NONE)
    }

    fn move_character(&mut self, from: Vec3, delta: Vec3) -> MoveOutcome {
        let mut position = from + delta;
        if let (Some(ground), Some(clearance)) = (self.ground, self.floor_clearance) {
            let floor = ground.height + clearance;
            if position.y < floor {
                position.y = floor;
            }
        }
        MoveOutcome {
            position,
            contacts: std::mem::take(&mut self.queued_contacts),
        }
    }

    fn platform_offset(&mut self, surface: SurfaceId) -> Option<Vec3> {
        let offset = self.platforms.get_mut(&surface)?;
        Some(std::mem::replace(offset, Vec3::ZERO))
    }

    fn apply_impulse(&mut self, surface: SurfaceId, impulse: Vec3, point: Vec3) {
        self.applied_impulses.push((surface, impulse, point));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_ops() {
        let a = LayerMask::layer(0);
        let b = LayerMask::layer(3);
        assert!(!a.intersects(b));
        assert!(a.union(b).intersects(b));
        assert!(a.inverted().intersects(b));
        assert!(!a.inverted().intersects(a));
    }

    #[test]
    fn test_mock_sphere_cast_hits_ground() {
        let mut world = MockWorld::new();
        world.set_ground(0.0, SurfaceId::new(1));

        let hit = world
            .sphere_cast(Vec3::new(0.0, 1.0, 0.0), 0.4, Vec3::NEG_Y, 1.0, LayerMask::ALL)
            .expect("ground under the cast");
        assert!((hit.distance - 0.6).abs() < 1e-6);
        assert_eq!(hit.surface, SurfaceId::new(1));
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn test_mock_sphere_cast_misses_when_too_high() {
        let mut world = MockWorld::new();
        world.set_ground(0.0, SurfaceId::new(1));
        let hit = world.sphere_cast(
            Vec3::new(0.0, 10.0, 0.0),
            0.4,
            Vec3::NEG_Y,
            1.0,
            LayerMask::ALL,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_mock_overlap_filters_by_mask_and_radius() {
        let mut world = MockWorld::new();
        world.add_overlap_target(SurfaceId::new(2), Vec3::new(1.0, 0.0, 0.0), LayerMask::layer(1));
        world.add_overlap_target(SurfaceId::new(3), Vec3::new(9.0, 0.0, 0.0), LayerMask::layer(1));
        world.add_overlap_target(SurfaceId::new(4), Vec3::new(1.0, 0.0, 0.0), LayerMask::layer(2));

        let hits = world.sphere_overlap(Vec3::ZERO, 2.0, LayerMask::layer(1));
        assert_eq!(hits, vec![SurfaceId::new(2)]);
    }

    #[test]
    fn test_mock_move_drains_queued_contacts() {
        let mut world = MockWorld::new();
        world.queue_contact(Contact {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            surface: SurfaceId::new(5),
            layers: LayerMask::ALL,
            body: None,
        });

        let outcome = world.move_character(Vec3::ZERO, Vec3::X);
        assert_eq!(outcome.contacts.len(), 1);
        let outcome = world.move_character(outcome.position, Vec3::X);
        assert!(outcome.contacts.is_empty());
    }

    #[test]
    fn test_mock_platform_offset_consumed() {
        let mut world = MockWorld::new();
        let platform = SurfaceId::new(8);
        world.set_platform_offset(platform, Vec3::new(0.5, 0.0, 0.0));

        assert_eq!(world.platform_offset(platform), Some(Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(world.platform_offset(platform), Some(Vec3::ZERO));
        assert_eq!(world.platform_offset(SurfaceId::new(9)), None);
    }
}
