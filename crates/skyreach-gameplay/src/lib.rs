//! # Skyreach Gameplay
//!
//! Gameplay systems for Skyreach.
//!
//! This crate provides the character-motor and combat core:
//! - Character motor with grounded/falling/rising/jumping states, rolling
//!   and dashing sub-modes, ground magnet, and moving-platform attachment
//! - Per-contact collision response (impulse exchange and slide correction)
//! - Closed-form ballistic aiming for the bow
//! - Combat controller with charge-up ranged shots and melee swings
//! - Input abstraction with consume-on-read action polling
//! - World-query contracts the host engine implements
//! - Health/damage targets and the pooled-projectile contract
//! - Event bus for presentation-layer notifications
//!
//! Per fixed tick, run the motor pass first and the combat pass second; the
//! combat pass reads the motor events of the same tick and writes the next
//! tick's aim-slow and facing lock.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ballistics;
pub mod collision_response;
pub mod combat;
pub mod events;
pub mod health;
pub mod input;
pub mod motor;
pub mod projectile;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ballistics::*;
    pub use crate::collision_response::*;
    pub use crate::combat::*;
    pub use crate::events::*;
    pub use crate::health::*;
    pub use crate::input::*;
    pub use crate::motor::*;
    pub use crate::projectile::*;
    pub use crate::world::*;
}

pub use prelude::*;
