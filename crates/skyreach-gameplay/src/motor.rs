//! Character motor: the fixed-tick movement state machine.
//!
//! This module provides:
//! - The `Grounded`/`Falling`/`Rising`/`Jumping` state machine with roll and
//!   dash sub-modes
//! - Sphere-cast ground detection with a ground magnet for uneven terrain
//! - Jump buffering, coyote time, and air jumps
//! - Moving-platform attachment with momentum hand-off on detach
//! - Velocity decomposition: player-intent steering (`input_velocity`)
//!   separate from gravity/jump/impulse forces (`forces_velocity`)
//! - Synchronous contact resolution through [`collision_response`]
//!
//! Each fixed tick runs, in order: platform offset query, ground scan, state
//! transition, jump/roll/dash evaluation, input-velocity steering,
//! force-velocity integration, displacement with contact draining, timer
//! decrement. Later steps read state decided earlier in the same tick, so
//! the order is load-bearing.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use skyreach_common::math::{
    clamp_magnitude, horizontal, move_towards, move_towards_vec3, project_on_plane,
    slope_angle_deg,
};
use skyreach_common::{ConfigError, EntityId, SurfaceId};

use crate::collision_response::{self, CollisionConfig, ContactContext};
use crate::events::{EventSender, GameEvent};
use crate::input::InputState;
use crate::world::{LayerMask, World};

/// Errors that can occur constructing a motor.
#[derive(Debug, Clone, Error)]
pub enum MotorError {
    /// A tunable failed validation
    #[error("invalid motor config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Vertical force threshold separating ascent from descent.
const RISING_EPSILON: f32 = 1e-4;

/// Movement state of the character. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementState {
    /// Standing or moving on walkable ground
    Grounded,
    /// Airborne, moving down (or level)
    #[default]
    Falling,
    /// Airborne, moving up
    Rising,
    /// Timed ascent driven by a held jump; separate from `Rising` so a
    /// released button can cut the jump short
    Jumping,
}

impl MovementState {
    /// Check if the character stands on walkable ground.
    #[must_use]
    pub fn is_grounded(self) -> bool {
        self == Self::Grounded
    }

    /// Check if the character is in the air.
    #[must_use]
    pub fn is_airborne(self) -> bool {
        !self.is_grounded()
    }
}

/// Events recorded by the motor during a tick, in order of occurrence.
///
/// The combat controller reads these in the same fixed tick; presentation
/// sinks receive the equivalent [`GameEvent`]s through the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorEvent {
    /// Left the grounded state
    LeftGround,
    /// Landed on walkable ground
    Landed,
    /// Entered or left a roll
    RollChanged {
        /// Whether the character is now rolling
        rolling: bool,
    },
    /// Started a dash (player dash or external lunge)
    DashStarted,
    /// Started a jump
    Jumped,
}

/// Designer tunables for the character motor.
///
/// Immutable once handed to [`Motor::new`]; every field is validated there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Acceleration applied to the player's steering input
    pub acceleration: f32,
    /// Target speed of the player's steering input
    pub target_speed: f32,
    /// Downward gravity magnitude
    pub gravity: f32,
    /// Maximum magnitude of the force velocity
    pub max_velocity: f32,
    /// Velocity magnitude removed per second while airborne
    pub air_friction: f32,
    /// Velocity magnitude removed per second while grounded
    pub ground_friction: f32,
    /// Fraction of acceleration available to steering while airborne
    pub air_control: f32,

    /// Upward velocity applied while a jump is held
    pub jump_speed: f32,
    /// Maximum time the jump speed keeps being applied
    pub jump_duration: f32,
    /// Number of jumps available in the air
    pub air_jumps: u32,
    /// Window before landing in which an early jump press is honored
    pub jump_buffer_time: f32,
    /// Window after leaving ground in which a jump still registers
    pub jump_coyote_time: f32,

    /// Dash target speed
    pub dash_speed: f32,
    /// Acceleration toward the dash target speed
    pub dash_acceleration: f32,
    /// Dash duration
    pub dash_duration: f32,
    /// Cooldown between dashes, independent of the duration
    pub dash_cooldown: f32,

    /// Capsule radius of the character controller
    pub capsule_radius: f32,
    /// Half the capsule height, center to cap
    pub capsule_half_height: f32,
    /// Contact-offset skin around the capsule
    pub skin_width: f32,
    /// Maximum walkable slope in degrees
    pub slope_limit_deg: f32,
    /// Fraction of the capsule radius used by ground-check sphere casts
    pub ground_detection_radius: f32,
    /// Extra fraction added to the ground-check cast length
    pub ground_detection_offset: f32,
    /// Cast-length scale applied while the ground magnet is active
    pub ground_magnet_distance: f32,
    /// Layers excluded from ground detection
    pub ignored_ground: LayerMask,

    /// Fraction of the target speed available while rolling
    pub roll_speed_factor: f32,
    /// Fraction of the acceleration available while rolling
    pub roll_acceleration_factor: f32,
    /// Cooldown after toggling a roll
    pub roll_cooldown: f32,
    /// Upward velocity applied when leaving a roll (0 disables the hop)
    pub leave_roll_hop_speed: f32,
    /// Proportional velocity decay per second while rolling
    pub roll_friction: f32,
    /// Rolling speed above which the ground magnet lets go
    pub ignore_ground_magnet_speed: f32,
    /// Rolling-ball radius used to convert travel distance into rotation
    pub roll_radius: f32,

    /// Facing turn speed while grounded
    pub turn_speed: f32,
    /// Facing turn speed while airborne
    pub air_turn_speed: f32,
    /// Facing turn speed while dashing
    pub dash_turn_speed: f32,
    /// Minimum planar speed before the facing target updates
    pub min_rotation_speed: f32,

    /// Contact-response tunables
    pub collision: CollisionConfig,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            acceleration: 10.0,
            target_speed: 10.0,
            gravity: 10.0,
            max_velocity: 1000.0,
            air_friction: 0.5,
            ground_friction: 0.5,
            air_control: 0.5,
            jump_speed: 4.0,
            jump_duration: 0.3,
            air_jumps: 0,
            jump_buffer_time: 0.1,
            jump_coyote_time: 0.1,
            dash_speed: 14.0,
            dash_acceleration: 100.0,
            dash_duration: 0.2,
            dash_cooldown: 2.0,
            capsule_radius: 0.4,
            capsule_half_height: 0.9,
            skin_width: 0.08,
            slope_limit_deg: 45.0,
            ground_detection_radius: 0.8,
            ground_detection_offset: 0.01,
            ground_magnet_distance: 0.5,
            ignored_ground: LayerMask::NONE,
            roll_speed_factor: 1.0,
            roll_acceleration_factor: 1.0,
            roll_cooldown: 0.0,
            leave_roll_hop_speed: 0.0,
            roll_friction: 0.5,
            ignore_ground_magnet_speed: 9.0,
            roll_radius: 0.4,
            turn_speed: 2.0,
            air_turn_speed: 2.0,
            dash_turn_speed: 40.0,
            min_rotation_speed: 0.3,
            collision: CollisionConfig::default(),
        }
    }
}

impl MotorConfig {
    /// Validates every tunable, returning the config on success.
    pub fn validate(self) -> Result<Self, ConfigError> {
        ConfigError::require_non_negative("acceleration", self.acceleration)?;
        ConfigError::require_non_negative("target_speed", self.target_speed)?;
        ConfigError::require_non_negative("gravity", self.gravity)?;
        ConfigError::require_non_negative("max_velocity", self.max_velocity)?;
        ConfigError::require_non_negative("air_friction", self.air_friction)?;
        ConfigError::require_non_negative("ground_friction", self.ground_friction)?;
        ConfigError::require_in_range("air_control", self.air_control, 0.0, 1.0)?;
        ConfigError::require_non_negative("jump_speed", self.jump_speed)?;
        ConfigError::require_non_negative("jump_duration", self.jump_duration)?;
        ConfigError::require_non_negative("jump_buffer_time", self.jump_buffer_time)?;
        ConfigError::require_non_negative("jump_coyote_time", self.jump_coyote_time)?;
        ConfigError::require_non_negative("dash_speed", self.dash_speed)?;
        ConfigError::require_non_negative("dash_acceleration", self.dash_acceleration)?;
        ConfigError::require_non_negative("dash_duration", self.dash_duration)?;
        ConfigError::require_non_negative("dash_cooldown", self.dash_cooldown)?;
        ConfigError::require_non_negative("capsule_radius", self.capsule_radius)?;
        ConfigError::require_non_negative("capsule_half_height", self.capsule_half_height)?;
        ConfigError::require_non_negative("skin_width", self.skin_width)?;
        ConfigError::require_in_range("slope_limit_deg", self.slope_limit_deg, 0.0, 90.0)?;
        ConfigError::require_in_range(
            "ground_detection_radius",
            self.ground_detection_radius,
            0.0,
            1.0,
        )?;
        ConfigError::require_in_range(
            "ground_detection_offset",
            self.ground_detection_offset,
            0.0,
            0.1,
        )?;
        ConfigError::require_in_range(
            "ground_magnet_distance",
            self.ground_magnet_distance,
            0.0,
            1.0,
        )?;
        ConfigError::require_non_negative("roll_speed_factor", self.roll_speed_factor)?;
        ConfigError::require_non_negative(
            "roll_acceleration_factor",
            self.roll_acceleration_factor,
        )?;
        ConfigError::require_non_negative("roll_cooldown", self.roll_cooldown)?;
        ConfigError::require_non_negative("leave_roll_hop_speed", self.leave_roll_hop_speed)?;
        ConfigError::require_in_range("roll_friction", self.roll_friction, 0.0, 3.0)?;
        ConfigError::require_non_negative(
            "ignore_ground_magnet_speed",
            self.ignore_ground_magnet_speed,
        )?;
        ConfigError::require_non_negative("roll_radius", self.roll_radius)?;
        ConfigError::require_non_negative("turn_speed", self.turn_speed)?;
        ConfigError::require_non_negative("air_turn_speed", self.air_turn_speed)?;
        ConfigError::require_non_negative("dash_turn_speed", self.dash_turn_speed)?;
        ConfigError::require_non_negative("min_rotation_speed", self.min_rotation_speed)?;
        ConfigError::require_in_range("restitution", self.collision.restitution, 0.0, 1.0)?;
        ConfigError::require_non_negative(
            "min_collision_velocity",
            self.collision.min_collision_velocity,
        )?;
        ConfigError::require_non_negative("mass", self.collision.mass)?;
        Ok(self)
    }
}

/// Ground-detection sample, recomputed every tick; stale beyond one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundSample {
    /// Contact point of the ground cast
    pub point: Vec3,
    /// Ground normal at the contact
    pub normal: Vec3,
    /// Distance from the capsule center down to the contact
    pub distance: f32,
    /// Surface that owns the contact
    pub surface: Option<SurfaceId>,
    /// Whether the cast hit anything
    pub valid: bool,
}

impl Default for GroundSample {
    fn default() -> Self {
        Self {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            distance: 0.0,
            surface: None,
            valid: false,
        }
    }
}

/// Caller-supplied dash parameters for the melee lunge.
#[derive(Debug, Clone, Copy)]
struct DashOverride {
    speed: f32,
    direction: Vec3,
}

/// The character motor. Owns position, velocity decomposition, movement
/// state, and every timer; collaborators read state and write only through
/// the explicit channels (`scale_target_speed`, `set_look_away`,
/// `start_external_dash`).
#[derive(Debug)]
pub struct Motor {
    config: MotorConfig,
    entity_id: EntityId,

    position: Vec3,
    input_velocity: Vec3,
    forces_velocity: Vec3,
    total_velocity: Vec3,
    target_velocity: Vec3,
    last_nonzero_input_velocity: Vec3,

    state: MovementState,
    ground: GroundSample,
    ground_surface: Option<SurfaceId>,
    ground_magnet_enabled: bool,
    ground_magnet_offset: f32,
    collision_ground_detected: bool,

    jump_timer: f32,
    jump_buffer_timer: f32,
    jump_coyote_timer: f32,
    air_jumps_left: u32,

    dashing: bool,
    dash_timer: f32,
    dash_cooldown_timer: f32,
    dashed_in_air: bool,
    dash_override: Option<DashOverride>,

    rolling: bool,
    roll_cooldown_timer: f32,

    platform: Option<SurfaceId>,
    platform_offset: Vec3,
    interpolate_visuals: bool,

    speed_multiplier: f32,
    look_away: bool,
    orientation: Quat,
    orientation_target: Quat,
    roll_orientation: Quat,

    events: Vec<MotorEvent>,
    event_sender: Option<EventSender>,
}

impl Motor {
    /// Creates a motor at a starting position. The initial state is
    /// `Falling` until the first ground scan says otherwise.
    pub fn new(config: MotorConfig, entity_id: EntityId, position: Vec3) -> Result<Self, MotorError> {
        let config = config.validate()?;
        Ok(Self {
            config,
            entity_id,
            position,
            input_velocity: Vec3::ZERO,
            forces_velocity: Vec3::ZERO,
            total_velocity: Vec3::ZERO,
            target_velocity: Vec3::ZERO,
            last_nonzero_input_velocity: Vec3::NEG_Z,
            state: MovementState::Falling,
            ground: GroundSample::default(),
            ground_surface: None,
            ground_magnet_enabled: false,
            ground_magnet_offset: 0.0,
            collision_ground_detected: false,
            jump_timer: 0.0,
            jump_buffer_timer: 0.0,
            jump_coyote_timer: 0.0,
            air_jumps_left: 0,
            dashing: false,
            dash_timer: 0.0,
            dash_cooldown_timer: 0.0,
            dashed_in_air: false,
            dash_override: None,
            rolling: false,
            roll_cooldown_timer: 0.0,
            platform: None,
            platform_offset: Vec3::ZERO,
            interpolate_visuals: true,
            speed_multiplier: 1.0,
            look_away: false,
            orientation: Quat::IDENTITY,
            orientation_target: Quat::IDENTITY,
            roll_orientation: Quat::IDENTITY,
            events: Vec::new(),
            event_sender: None,
        })
    }

    /// Attaches a bus sender; motor transitions publish [`GameEvent`]s
    /// through it.
    pub fn set_event_sender(&mut self, sender: EventSender) {
        self.event_sender = Some(sender);
    }

    /// Runs one fixed simulation tick.
    pub fn tick<W: World>(&mut self, world: &mut W, input: &mut InputState, dt: f32) {
        self.events.clear();

        self.platform_offset = match self.platform {
            Some(surface) => world.platform_offset(surface).unwrap_or(Vec3::ZERO),
            None => Vec3::ZERO,
        };

        self.scan_for_ground(world, dt);
        self.set_state(input, dt);
        self.evaluate_jump(input, dt);
        self.evaluate_roll(input, dt);
        self.evaluate_dash(input);
        self.update_movement_vector(input, dt);
        self.update_forces_vector(dt);

        self.ground_magnet_enabled =
            self.state == MovementState::Grounded || self.collision_ground_detected;

        self.total_velocity = self.input_velocity + self.forces_velocity;

        let delta = self.total_velocity * dt
            + Vec3::Y * self.ground_magnet_offset
            + self.platform_offset;
        let outcome = world.move_character(self.position, delta);
        self.position = outcome.position;

        // Contacts are resolved now, inside the tick, so the corrections land
        // before the timers advance.
        let ctx = ContactContext {
            state: self.state,
            position: self.position,
            capsule_radius: self.config.capsule_radius,
            slope_limit_deg: self.config.slope_limit_deg,
        };
        for contact in &outcome.contacts {
            let response = collision_response::respond(
                contact,
                &ctx,
                &self.config.collision,
                &mut self.input_velocity,
                &mut self.forces_velocity,
            );
            if let Some((surface, impulse, point)) = response.impulse {
                world.apply_impulse(surface, impulse, point);
            }
            self.collision_ground_detected = response.ground_like;
        }

        self.jump_timer -= dt;
        self.jump_coyote_timer -= dt;
        self.jump_buffer_timer -= dt;
        self.roll_cooldown_timer -= dt;
        self.dash_cooldown_timer -= dt;
        self.dash_timer -= dt;

        // The aim-slow channel lasts a single tick; combat rewrites it after
        // this tick if it still applies.
        self.speed_multiplier = 1.0;
    }

    fn scan_for_ground<W: World>(&mut self, world: &mut W, dt: f32) {
        let origin = self.position;
        let mut length = self.config.capsule_half_height + self.config.skin_width;
        if self.ground_magnet_enabled {
            length *= 1.0 + self.config.ground_magnet_distance;
        } else {
            self.ground_magnet_offset = 0.0;
        }
        let radius = self.config.capsule_radius * self.config.ground_detection_radius;
        let cast_distance = length * (1.0 + self.config.ground_detection_offset) - radius;

        let hit = world.sphere_cast(
            origin,
            radius,
            Vec3::NEG_Y,
            cast_distance,
            self.config.ignored_ground.inverted(),
        );

        match hit {
            Some(hit) => {
                self.ground = GroundSample {
                    point: hit.point,
                    normal: hit.normal,
                    distance: (hit.point - origin).dot(Vec3::NEG_Y).abs(),
                    surface: Some(hit.surface),
                    valid: true,
                };
                if self.ground_surface != Some(hit.surface) {
                    self.on_changed_surface(world, Some(hit.surface), dt);
                }

                let offset = self.config.capsule_half_height + self.config.skin_width
                    - self.ground.distance;
                if self.ground_magnet_enabled
                    && (offset < 0.0 || self.platform_offset != Vec3::ZERO)
                {
                    self.ground_magnet_offset = offset;
                }
            }
            None => {
                if self.ground_surface.is_some() {
                    self.on_changed_surface(world, None, dt);
                }
                self.ground = GroundSample::default();
            }
        }
    }

    /// Handles the ground surface changing between scans: moving-platform
    /// attachment follows the surface capability, not the movement state.
    fn on_changed_surface<W: World>(
        &mut self,
        world: &mut W,
        new_surface: Option<SurfaceId>,
        dt: f32,
    ) {
        match new_surface {
            None => self.detach_platform(dt, false),
            Some(surface) => match world.platform_offset(surface) {
                Some(offset) => {
                    debug!(surface = surface.raw(), "attached to moving platform");
                    self.platform = Some(surface);
                    self.platform_offset = offset;
                    self.interpolate_visuals = false;
                }
                None => self.detach_platform(dt, true),
            },
        }
        self.ground_surface = new_surface;
    }

    /// Detaches from the current platform, imparting the velocity implied by
    /// its last offset. Stepping across onto another surface drops the
    /// vertical part entirely; losing ground contact keeps upward motion but
    /// never lets a rising platform slam the character down.
    fn detach_platform(&mut self, dt: f32, zero_vertical: bool) {
        if self.platform.is_none() {
            return;
        }
        if dt > 0.0 {
            let velocity = self.platform_offset / dt;
            let vertical = if zero_vertical {
                0.0
            } else {
                velocity.y.max(0.0)
            };
            self.forces_velocity += Vec3::new(velocity.x, vertical, velocity.z);
        }
        debug!("detached from moving platform");
        self.platform = None;
        self.platform_offset = Vec3::ZERO;
        self.interpolate_visuals = true;
    }

    /// Evaluates the transition table. `Jumping` exits are handled by the
    /// jump evaluation, not here.
    fn set_state(&mut self, input: &mut InputState, dt: f32) {
        let moving_up = self.forces_velocity.dot(Vec3::Y) > RISING_EPSILON;
        let ground_too_steep =
            slope_angle_deg(self.ground.normal) > self.config.slope_limit_deg;

        match self.state {
            MovementState::Grounded => {
                if moving_up {
                    self.state = MovementState::Rising;
                    self.on_leave_ground(dt);
                } else if !self.ground.valid || ground_too_steep {
                    self.state = MovementState::Falling;
                    self.on_leave_ground(dt);
                }
            }
            MovementState::Rising => {
                if !moving_up {
                    if self.ground.valid {
                        if ground_too_steep {
                            self.state = MovementState::Falling;
                        } else {
                            self.state = MovementState::Grounded;
                            self.on_land(input, dt);
                        }
                    } else {
                        self.state = MovementState::Falling;
                    }
                }
            }
            MovementState::Falling => {
                if moving_up {
                    self.state = MovementState::Rising;
                } else if self.ground.valid {
                    if !ground_too_steep {
                        self.state = MovementState::Grounded;
                        self.on_land(input, dt);
                    }
                }
            }
            MovementState::Jumping => {}
        }
    }

    fn evaluate_jump(&mut self, input: &mut InputState, dt: f32) {
        if input.take_jump_pressed() {
            if self.rolling {
                if self.roll_cooldown_timer <= 0.0 {
                    self.leave_roll(true, dt);
                } else {
                    return;
                }
            }

            if self.state == MovementState::Grounded {
                self.on_jump(input);
                self.on_leave_ground(dt);
            } else if self.air_jumps_left > 0 {
                self.air_jumps_left -= 1;
                self.on_jump(input);
            } else if self.jump_coyote_timer > 0.0 {
                self.jump_coyote_timer = 0.0;
                self.on_jump(input);
            } else {
                let _ = input.take_jump_cancelled();
                self.jump_buffer_timer = self.config.jump_buffer_time;
            }
        }

        if self.state == MovementState::Jumping {
            // Keep feeding the jump while it is held.
            self.forces_velocity =
                horizontal(self.forces_velocity) + Vec3::Y * self.config.jump_speed;

            if input.take_jump_cancelled() || self.jump_timer <= 0.0 {
                self.state = MovementState::Rising;
            }
        } else if self.state == MovementState::Grounded {
            let _ = input.take_jump_cancelled();
        }
    }

    fn evaluate_roll(&mut self, input: &mut InputState, dt: f32) {
        if input.take_roll_pressed()
            && !self.dashing
            && self.roll_cooldown_timer <= 0.0
            && self.state == MovementState::Grounded
        {
            if self.rolling {
                self.leave_roll(false, dt);
            } else {
                self.start_roll();
            }
        }
    }

    fn evaluate_dash(&mut self, input: &mut InputState) {
        if input.take_dash_pressed()
            && !self.rolling
            && self.dash_cooldown_timer <= 0.0
            && !self.dashing
        {
            self.start_dash();
        }
    }

    fn start_roll(&mut self) {
        self.roll_cooldown_timer = self.config.roll_cooldown;
        self.rolling = true;
        self.push_event(MotorEvent::RollChanged { rolling: true });
    }

    fn leave_roll(&mut self, from_jump: bool, dt: f32) {
        self.roll_cooldown_timer = self.config.roll_cooldown;
        self.rolling = false;
        self.push_event(MotorEvent::RollChanged { rolling: false });

        if self.config.leave_roll_hop_speed > 0.0
            && !from_jump
            && self.state == MovementState::Grounded
        {
            self.state = MovementState::Rising;
            self.forces_velocity += Vec3::Y * self.config.leave_roll_hop_speed;
            self.on_leave_ground(dt);
        }

        // Come out of the ball facing the way we were moving.
        let facing = horizontal(self.last_nonzero_input_velocity);
        if facing.length_squared() > f32::EPSILON {
            self.orientation_target = Quat::from_rotation_arc(Vec3::NEG_Z, facing.normalize());
        }
    }

    fn on_jump(&mut self, input: &mut InputState) {
        self.state = MovementState::Jumping;
        self.ground_magnet_offset = 0.0;
        self.jump_timer = self.config.jump_duration;
        self.forces_velocity =
            horizontal(self.forces_velocity) + Vec3::Y * self.config.jump_speed;

        // Upward input velocity would stack on the jump.
        let up_velocity = self.input_velocity.dot(Vec3::Y);
        if up_velocity > 0.0 {
            self.input_velocity -= Vec3::Y * up_velocity;
        }

        self.push_event(MotorEvent::Jumped);

        if input.take_jump_cancelled() {
            self.state = MovementState::Rising;
        }
    }

    fn start_dash(&mut self) {
        if self.state != MovementState::Grounded {
            if self.dashed_in_air {
                return;
            }
            self.dashed_in_air = true;
            self.state = MovementState::Rising;
        }
        self.dashing = true;
        self.dash_override = None;
        self.dash_cooldown_timer = self.config.dash_cooldown;
        self.dash_timer = self.config.dash_duration;
        self.push_event(MotorEvent::DashStarted);
    }

    /// Starts a dash with caller-supplied parameters: the melee lunge.
    ///
    /// Blocked while a dash is already running; does not touch the player
    /// dash cooldown or the air-dash allowance.
    pub fn start_external_dash(&mut self, speed: f32, duration: f32, direction: Vec3) {
        if self.dashing {
            return;
        }
        self.dashing = true;
        self.dash_timer = duration;
        self.dash_override = Some(DashOverride {
            speed,
            direction: direction.normalize_or_zero(),
        });
        self.push_event(MotorEvent::DashStarted);
    }

    fn on_land(&mut self, input: &mut InputState, dt: f32) {
        trace!("landed");
        self.push_event(MotorEvent::Landed);
        self.air_jumps_left = self.config.air_jumps;
        self.dashed_in_air = false;

        if self.rolling {
            // Roll momentum carries through the landing.
            self.input_velocity += horizontal(self.forces_velocity);
            self.forces_velocity = Vec3::ZERO;
        }

        if self.jump_buffer_timer > 0.0 {
            self.jump_buffer_timer = 0.0;
            self.on_jump(input);
            self.on_leave_ground(dt);
            if input.take_jump_cancelled() {
                self.state = MovementState::Rising;
            }
        }
    }

    fn on_leave_ground(&mut self, dt: f32) {
        self.push_event(MotorEvent::LeftGround);
        self.jump_coyote_timer = self.config.jump_coyote_time;
        self.collision_ground_detected = false;
        self.ground_magnet_offset = 0.0;
        self.detach_platform(dt, false);
        self.ground_surface = None;
    }

    /// Steering basis: camera forward projected on the horizontal plane and
    /// then onto the ground slope.
    fn slope_aligned_forward(&self, input: &InputState) -> Vec3 {
        let mut forward = horizontal(input.camera_forward()).normalize_or_zero();
        let normal = self.ground.normal;
        if normal.y != 0.0 {
            forward += Vec3::Y * (-(normal.x * forward.x + normal.z * forward.z) / normal.y);
            forward = forward.normalize_or_zero();
        }
        forward
    }

    /// Camera-relative steering target on the ground plane, magnitude <= 1.
    fn target_direction(&self, input: &InputState) -> Vec3 {
        let forward = self.slope_aligned_forward(input);
        let right = forward.cross(self.ground.normal);
        let mv = input.move_vector();
        clamp_magnitude(right * mv.x + forward * mv.y, 1.0)
    }

    fn update_movement_vector(&mut self, input: &InputState, dt: f32) {
        if self.input_velocity != Vec3::ZERO {
            self.last_nonzero_input_velocity = self.input_velocity;
        }

        let effective_target_speed = self.config.target_speed * self.speed_multiplier;

        if self.dashing {
            self.target_velocity = if let Some(dash) = self.dash_override {
                dash.direction * dash.speed
            } else if input.move_vector() == glam::Vec2::ZERO {
                self.slope_aligned_forward(input) * self.config.dash_speed
            } else {
                self.target_direction(input).normalize_or_zero() * self.config.dash_speed
            };
            self.input_velocity = move_towards_vec3(
                self.input_velocity,
                self.target_velocity,
                self.config.dash_acceleration * dt,
            );

            if self.dash_timer <= 0.0 {
                self.dashing = false;
                self.dash_override = None;
            }
        } else if self.rolling {
            if self.state == MovementState::Grounded {
                self.target_velocity = self.target_direction(input) * self.config.roll_speed_factor;
                if input.move_vector() != glam::Vec2::ZERO {
                    self.input_velocity += clamp_magnitude(
                        self.target_velocity,
                        self.config.acceleration * self.config.roll_acceleration_factor * dt,
                    );
                }
                // Proportional friction, unlike the linear ground friction.
                self.input_velocity -=
                    (dt * self.config.roll_friction).clamp(0.0, 1.0) * self.input_velocity;

                // Bleed off the component along the ground normal so slope
                // pumping cannot accumulate.
                let normal = self.ground.normal;
                let vertical = normal.dot(self.input_velocity);
                self.input_velocity = project_on_plane(self.input_velocity, normal)
                    + normal * move_towards(vertical, 0.0, self.config.acceleration * dt);

                self.input_velocity = clamp_magnitude(
                    self.input_velocity,
                    self.config.target_speed * self.config.roll_speed_factor,
                );

                // A fast ball rolling off a downward step leaves the ground
                // instead of being magneted onto it.
                let plane_speed_sq =
                    project_on_plane(self.input_velocity, normal).length_squared();
                let magnet_pulling_down = self.ground_magnet_offset * normal.y < 0.0;
                if magnet_pulling_down
                    && plane_speed_sq
                        > self.config.ignore_ground_magnet_speed
                            * self.config.ignore_ground_magnet_speed
                {
                    self.ground_magnet_offset = 0.0;
                    self.state = if self.total_velocity.y > 0.0 {
                        MovementState::Rising
                    } else {
                        MovementState::Falling
                    };
                }
            } else {
                self.target_velocity = Vec3::ZERO;
                self.input_velocity =
                    move_towards_vec3(self.input_velocity, Vec3::ZERO, self.config.air_friction * dt);
            }
        } else if self.state == MovementState::Grounded {
            self.target_velocity = self.target_direction(input) * effective_target_speed;

            let mut acceleration = self.config.acceleration;
            // Reversals bite twice as hard.
            if self.target_velocity.dot(self.input_velocity) < 0.0 {
                acceleration *= 2.0;
            }
            self.input_velocity =
                move_towards_vec3(self.input_velocity, self.target_velocity, acceleration * dt);
        } else {
            if input.move_vector() != glam::Vec2::ZERO {
                self.target_velocity = self.target_direction(input) * effective_target_speed;
                self.input_velocity = move_towards_vec3(
                    self.input_velocity,
                    self.target_velocity,
                    self.config.air_control * self.config.acceleration * dt,
                );
            }
            self.input_velocity =
                move_towards_vec3(self.input_velocity, Vec3::ZERO, self.config.air_friction * dt);
        }
    }

    fn update_forces_vector(&mut self, dt: f32) {
        if self.dashing {
            self.forces_velocity = Vec3::ZERO;
            return;
        }

        let mut plane = horizontal(self.forces_velocity);

        if self.state == MovementState::Grounded {
            // Downward force is spent once on the ground.
            if self.forces_velocity.dot(Vec3::Y) < 0.0 {
                self.forces_velocity = plane;
            }
            plane = move_towards_vec3(plane, Vec3::ZERO, self.config.ground_friction * dt);
        } else {
            self.forces_velocity -= Vec3::Y * (self.config.gravity * dt);
            plane = move_towards_vec3(plane, Vec3::ZERO, self.config.air_friction * dt);
        }

        let up_component = self.forces_velocity.dot(Vec3::Y);
        self.forces_velocity =
            clamp_magnitude(plane + Vec3::Y * up_component, self.config.max_velocity);
    }

    /// Variable-rate orientation update for the presentation layer.
    ///
    /// Rolling turns travel distance into ball rotation about the axis
    /// perpendicular to the velocity on the ground plane; otherwise the
    /// facing eases toward the steering target (or away from the camera
    /// while aiming).
    pub fn update_orientation(&mut self, input: &InputState, dt: f32) {
        if self.rolling {
            let distance = self.total_velocity.length() * dt;
            if distance < 1e-3 {
                return;
            }
            let axis = self.ground.normal.cross(self.total_velocity).normalize_or_zero();
            if axis != Vec3::ZERO {
                let angle = distance / self.config.roll_radius;
                self.roll_orientation = Quat::from_axis_angle(axis, angle) * self.roll_orientation;
            }
            return;
        }

        let turn_speed = if self.dashing {
            self.config.dash_turn_speed
        } else if self.state == MovementState::Grounded {
            self.config.turn_speed
        } else {
            self.config.air_turn_speed
        };
        let facing = if self.look_away {
            horizontal(input.camera_forward())
        } else if self.dashing || self.state == MovementState::Grounded {
            horizontal(self.target_velocity)
        } else {
            horizontal(self.total_velocity)
        };

        if facing.length() >= self.config.min_rotation_speed {
            self.orientation_target = Quat::from_rotation_arc(Vec3::NEG_Z, facing.normalize());
        }
        self.orientation = self
            .orientation
            .slerp(self.orientation_target, (turn_speed * dt).clamp(0.0, 1.0));
    }

    fn push_event(&mut self, event: MotorEvent) {
        trace!(?event, "motor event");
        self.events.push(event);
        if let Some(sender) = &self.event_sender {
            let entity_id = self.entity_id;
            sender.publish(match event {
                MotorEvent::LeftGround => GameEvent::LeftGround { entity_id },
                MotorEvent::Landed => GameEvent::Landed { entity_id },
                MotorEvent::RollChanged { rolling } => {
                    GameEvent::RollChanged { entity_id, rolling }
                }
                MotorEvent::DashStarted => GameEvent::DashStarted { entity_id },
                MotorEvent::Jumped => GameEvent::Jumped { entity_id },
            });
        }
    }

    // --- accessors ---

    /// Current movement state.
    #[must_use]
    pub fn state(&self) -> MovementState {
        self.state
    }

    /// Events recorded by the most recent tick, in order.
    #[must_use]
    pub fn events(&self) -> &[MotorEvent] {
        &self.events
    }

    /// Character center position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Sum of input and force velocity for the current tick.
    #[must_use]
    pub fn total_velocity(&self) -> Vec3 {
        self.total_velocity
    }

    /// Player-intent velocity component.
    #[must_use]
    pub fn input_velocity(&self) -> Vec3 {
        self.input_velocity
    }

    /// Gravity/jump/impulse velocity component.
    #[must_use]
    pub fn forces_velocity(&self) -> Vec3 {
        self.forces_velocity
    }

    /// Steering target of the current tick.
    #[must_use]
    pub fn target_velocity(&self) -> Vec3 {
        self.target_velocity
    }

    /// Most recent ground sample.
    #[must_use]
    pub fn ground(&self) -> &GroundSample {
        &self.ground
    }

    /// Ground normal, world up when airborne.
    #[must_use]
    pub fn ground_normal(&self) -> Vec3 {
        self.ground.normal
    }

    /// Whether the character is rolling.
    #[must_use]
    pub fn is_rolling(&self) -> bool {
        self.rolling
    }

    /// Whether the character is dashing.
    #[must_use]
    pub fn is_dashing(&self) -> bool {
        self.dashing
    }

    /// Whether the ground magnet is armed for the next scan.
    #[must_use]
    pub fn ground_magnet_enabled(&self) -> bool {
        self.ground_magnet_enabled
    }

    /// Surface currently ridden as a moving platform.
    #[must_use]
    pub fn platform(&self) -> Option<SurfaceId> {
        self.platform
    }

    /// Whether the presentation layer should interpolate between ticks.
    /// Suspended while riding a platform to avoid jitter against it.
    #[must_use]
    pub fn interpolate_visuals(&self) -> bool {
        self.interpolate_visuals
    }

    /// Facing orientation for the presentation layer.
    #[must_use]
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Accumulated ball rotation while rolling.
    #[must_use]
    pub fn roll_orientation(&self) -> Quat {
        self.roll_orientation
    }

    /// Entity this motor drives.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Motor configuration.
    #[must_use]
    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Scales the steering target speed for the next tick only.
    pub fn scale_target_speed(&mut self, factor: f32) {
        self.speed_multiplier *= factor;
    }

    /// Locks the facing to the camera forward (aiming).
    pub fn set_look_away(&mut self, look_away: bool) {
        self.look_away = look_away;
    }
}
