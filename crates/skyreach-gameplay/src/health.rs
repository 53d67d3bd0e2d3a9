//! Health, damage, and knockback for combat targets.
//!
//! This module provides:
//! - The [`DamageTarget`] contract combat applies hits through
//! - The [`TargetRegistry`] lookup the melee swing resolves surfaces with
//! - A [`Health`] component with a death latch and revive semantics
//! - [`MockTargetRegistry`] for testing

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use skyreach_common::SurfaceId;

/// Something that can take damage and be shoved.
pub trait DamageTarget {
    /// Applies damage.
    fn apply_damage(&mut self, amount: f32);

    /// Applies a knockback impulse.
    fn apply_knockback(&mut self, impulse: Vec3);
}

/// Host-side lookup from overlap surfaces to damageable targets.
pub trait TargetRegistry {
    /// World position of a target, if the surface belongs to one.
    fn position(&self, surface: SurfaceId) -> Option<Vec3>;

    /// Routes damage to the target behind a surface. Returns `true` when
    /// this hit killed the target.
    fn damage(&mut self, surface: SurfaceId, amount: f32) -> bool;

    /// Routes a knockback impulse to the target behind a surface.
    fn knockback(&mut self, surface: SurfaceId, impulse: Vec3);
}

/// Hit points with a death latch.
///
/// Damage past zero marks the target dead; it stays dead until revived
/// through [`Health::reset_to`]. Knockback accumulates until the host
/// integrator drains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    max: f32,
    current: f32,
    dead: bool,
    pending_knockback: Vec3,
}

impl Health {
    /// Creates a health component at full hit points.
    #[must_use]
    pub fn new(max: f32) -> Self {
        Self {
            max,
            current: max,
            dead: false,
            pending_knockback: Vec3::ZERO,
        }
    }

    /// Current hit points.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Whether the target has died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Heals without exceeding the maximum; no effect on the dead.
    pub fn heal(&mut self, amount: f32) {
        if self.dead {
            return;
        }
        self.current = (self.current + amount).min(self.max);
    }

    /// Resets to a specific value, reviving if it is positive.
    pub fn reset_to(&mut self, value: f32) {
        self.current = value.clamp(0.0, self.max);
        self.dead = self.current <= 0.0;
        self.pending_knockback = Vec3::ZERO;
    }

    /// Drains the accumulated knockback for the host to integrate.
    pub fn take_knockback(&mut self) -> Vec3 {
        std::mem::take(&mut self.pending_knockback)
    }
}

impl DamageTarget for Health {
    fn apply_damage(&mut self, amount: f32) {
        if self.dead {
            return;
        }
        self.current -= amount;
        if self.current <= 0.0 {
            self.current = 0.0;
            self.dead = true;
        }
    }

    fn apply_knockback(&mut self, impulse: Vec3) {
        if self.dead {
            return;
        }
        self.pending_knockback += impulse;
    }
}

/// Mock target registry for testing.
#[derive(Debug, Default)]
pub struct MockTargetRegistry {
    targets: AHashMap<SurfaceId, (Vec3, Health)>,
}

impl MockTargetRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a target at a position.
    pub fn add(&mut self, surface: SurfaceId, position: Vec3, health: Health) {
        self.targets.insert(surface, (position, health));
    }

    /// Health of a registered target.
    #[must_use]
    pub fn health(&self, surface: SurfaceId) -> Option<&Health> {
        self.targets.get(&surface).map(|(_, health)| health)
    }
}

impl TargetRegistry for MockTargetRegistry {
    fn position(&self, surface: SurfaceId) -> Option<Vec3> {
        self.targets.get(&surface).map(|(position, _)| *position)
    }

    fn damage(&mut self, surface: SurfaceId, amount: f32) -> bool {
        if let Some((_, health)) = self.targets.get_mut(&surface) {
            let was_alive = !health.is_dead();
            health.apply_damage(amount);
            return was_alive && health.is_dead();
        }
        false
    }

    fn knockback(&mut self, surface: SurfaceId, impulse: Vec3) {
        if let Some((_, health)) = self.targets.get_mut(&surface) {
            health.apply_knockback(impulse);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_and_death_latch() {
        let mut health = Health::new(20.0);
        health.apply_damage(15.0);
        assert_eq!(health.current(), 5.0);
        assert!(!health.is_dead());

        health.apply_damage(10.0);
        assert_eq!(health.current(), 0.0);
        assert!(health.is_dead());

        // Dead targets ignore further damage and healing.
        health.apply_damage(5.0);
        health.heal(10.0);
        assert_eq!(health.current(), 0.0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_reset_revives() {
        let mut health = Health::new(20.0);
        health.apply_damage(25.0);
        assert!(health.is_dead());

        health.reset_to(20.0);
        assert!(!health.is_dead());
        assert_eq!(health.current(), 20.0);

        health.reset_to(0.0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_knockback_accumulates_and_drains() {
        let mut health = Health::new(20.0);
        health.apply_knockback(Vec3::X);
        health.apply_knockback(Vec3::X);
        assert_eq!(health.take_knockback(), Vec3::X * 2.0);
        assert_eq!(health.take_knockback(), Vec3::ZERO);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut health = Health::new(20.0);
        health.apply_damage(5.0);
        health.heal(50.0);
        assert_eq!(health.current(), 20.0);
    }

    #[test]
    fn test_registry_routes_damage() {
        let mut registry = MockTargetRegistry::new();
        let surface = SurfaceId::new(3);
        registry.add(surface, Vec3::new(1.0, 0.0, 0.0), Health::new(10.0));

        assert_eq!(registry.position(surface), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert!(!registry.damage(surface, 4.0));
        assert_eq!(registry.health(surface).map(Health::current), Some(6.0));

        // The killing blow reports the death exactly once.
        assert!(registry.damage(surface, 10.0));
        assert!(!registry.damage(surface, 10.0));
    }
}
