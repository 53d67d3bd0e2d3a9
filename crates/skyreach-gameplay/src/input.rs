//! Input handling for the character motor and combat controller.
//!
//! This module provides:
//! - A per-tick input snapshot with move vector and camera forward
//! - Edge-triggered action presses buffered until consumed
//! - Consume-on-read polls so a press is never double-processed
//!
//! Actions are polled with `take_*` methods that clear the buffered press.
//! Systems that are temporarily unable to act (cooldowns, sub-modes) still
//! poll, so a press made during the blocked window is drained rather than
//! queued and fired late.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the input system.
#[derive(Debug, Clone, Error)]
pub enum InputError {
    /// Camera forward must not be vertical (its horizontal projection
    /// steers the character).
    #[error("camera forward {0:?} has no horizontal component")]
    DegenerateCameraForward(Vec3),
}

/// Buffered action triggers recognized by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Jump (space, gamepad south)
    Jump,
    /// Roll toggle (crouch input)
    Roll,
    /// Dash (sprint input)
    Dash,
    /// Attack trigger (fires melee, or looses a charged shot)
    Attack,
}

/// Per-tick input state consumed by the motor and combat controller.
///
/// The host writes into this each frame (`press`/`release`/`set_move_vector`
/// /`set_camera_forward`); the simulation reads held state directly and
/// consumes edge triggers through the `take_*` polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputState {
    /// Camera-relative movement input, each axis in [-1, 1].
    move_vector: Vec2,
    /// World-space camera forward, used to derive the steering basis.
    camera_forward: Vec3,
    /// World-space camera position, origin for aim ray-casts.
    camera_position: Vec3,
    jump_pressed: bool,
    jump_held: bool,
    roll_pressed: bool,
    dash_pressed: bool,
    attack_pressed: bool,
    charge_held: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            move_vector: Vec2::ZERO,
            camera_forward: Vec3::NEG_Z,
            camera_position: Vec3::ZERO,
            jump_pressed: false,
            jump_held: false,
            roll_pressed: false,
            dash_pressed: false,
            attack_pressed: false,
            charge_held: false,
        }
    }
}

impl InputState {
    /// Creates a new input state with no buffered presses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press of an action; the press stays buffered until a
    /// `take_*` poll consumes it.
    pub fn press(&mut self, action: Action) {
        match action {
            Action::Jump => {
                self.jump_pressed = true;
                self.jump_held = true;
            }
            Action::Roll => self.roll_pressed = true,
            Action::Dash => self.dash_pressed = true,
            Action::Attack => self.attack_pressed = true,
        }
    }

    /// Records a release of an action.
    pub fn release(&mut self, action: Action) {
        if action == Action::Jump {
            self.jump_held = false;
        }
    }

    /// Sets the movement input, clamped to the unit square.
    pub fn set_move_vector(&mut self, v: Vec2) {
        self.move_vector = v.clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
    }

    /// Movement input, each axis in [-1, 1].
    #[must_use]
    pub fn move_vector(&self) -> Vec2 {
        self.move_vector
    }

    /// Sets the camera pose used for steering and aiming.
    ///
    /// Returns an error if `forward` is vertical; the previous pose is kept
    /// in that case.
    pub fn set_camera(&mut self, position: Vec3, forward: Vec3) -> Result<(), InputError> {
        if skyreach_common::math::horizontal(forward).length_squared() <= f32::EPSILON {
            return Err(InputError::DegenerateCameraForward(forward));
        }
        self.camera_position = position;
        self.camera_forward = forward.normalize();
        Ok(())
    }

    /// World-space camera forward.
    #[must_use]
    pub fn camera_forward(&self) -> Vec3 {
        self.camera_forward
    }

    /// World-space camera position.
    #[must_use]
    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    /// Starts or stops holding the ranged charge.
    pub fn set_charge_held(&mut self, held: bool) {
        self.charge_held = held;
    }

    /// Whether the ranged charge input is held.
    #[must_use]
    pub fn charge_held(&self) -> bool {
        self.charge_held
    }

    /// Consumes a buffered jump press.
    pub fn take_jump_pressed(&mut self) -> bool {
        std::mem::take(&mut self.jump_pressed)
    }

    /// Polls whether the jump has been let go; clears any buffered press.
    ///
    /// Used both to cancel a jump mid-ascent and to drain stale presses
    /// while grounded.
    pub fn take_jump_cancelled(&mut self) -> bool {
        self.jump_pressed = false;
        !self.jump_held
    }

    /// Consumes a buffered roll-toggle press.
    pub fn take_roll_pressed(&mut self) -> bool {
        std::mem::take(&mut self.roll_pressed)
    }

    /// Consumes a buffered dash press.
    pub fn take_dash_pressed(&mut self) -> bool {
        std::mem::take(&mut self.dash_pressed)
    }

    /// Consumes a buffered attack press.
    pub fn take_attack_pressed(&mut self) -> bool {
        std::mem::take(&mut self.attack_pressed)
    }
}
