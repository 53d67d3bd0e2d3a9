//! Pooled-projectile contract between combat and the host.
//!
//! The pool is an opaque allocator: combat borrows one projectile while
//! charging, and either launches it (ownership passes to the world) or
//! releases it back. At most one projectile is borrowed per character at a
//! time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use skyreach_common::ProjectileId;

use crate::world::LayerMask;

/// Flight tunables handed to a projectile at launch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectileTuning {
    /// Downward acceleration during flight
    pub gravity: f32,
    /// Launch speed at full charge
    pub max_initial_speed: f32,
    /// Layers the projectile flies through; also excluded from aim ray-casts
    pub ignored_layers: LayerMask,
    /// Aim distance assumed when the aim ray hits nothing
    pub far_aim_distance: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            max_initial_speed: 20.0,
            ignored_layers: LayerMask::NONE,
            far_aim_distance: 100.0,
        }
    }
}

/// Projectile pool supplied by the host.
pub trait ProjectilePool {
    /// Borrows a pooled projectile, spawned at `position`. Returns `None`
    /// when the pool is exhausted.
    fn acquire(&mut self, position: Vec3) -> Option<ProjectileId>;

    /// Returns a borrowed, unfired projectile to the pool.
    fn release(&mut self, id: ProjectileId);

    /// Launches a borrowed projectile; the handle is spent afterwards.
    fn launch(&mut self, id: ProjectileId, velocity: Vec3, tuning: &ProjectileTuning);
}

/// Mock projectile pool for testing.
///
/// Records every launch and release so tests can assert the borrow
/// lifecycle.
#[derive(Debug, Default)]
pub struct MockProjectilePool {
    next_id: u32,
    /// Currently borrowed handles
    pub borrowed: Vec<ProjectileId>,
    /// Launched projectiles: (handle, velocity)
    pub launched: Vec<(ProjectileId, Vec3)>,
    /// Handles returned unfired
    pub released: Vec<ProjectileId>,
    /// When true, `acquire` reports exhaustion
    pub exhausted: bool,
}

impl MockProjectilePool {
    /// Creates an empty mock pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectilePool for MockProjectilePool {
    fn acquire(&mut self, _position: Vec3) -> Option<ProjectileId> {
        if self.exhausted {
            return None;
        }
        self.next_id += 1;
        let id = ProjectileId::new(self.next_id);
        self.borrowed.push(id);
        Some(id)
    }

    fn release(&mut self, id: ProjectileId) {
        self.borrowed.retain(|b| *b != id);
        self.released.push(id);
    }

    fn launch(&mut self, id: ProjectileId, velocity: Vec3, _tuning: &ProjectileTuning) {
        self.borrowed.retain(|b| *b != id);
        self.launched.push((id, velocity));
    }
}
