//! Event bus for simulation-to-presentation notifications.
//!
//! Motor and combat transitions publish fire-and-forget events (animation
//! triggers, audio cues, UI) through a bounded channel; the host drains the
//! bus once per frame. Publishing never blocks and never fails the
//! simulation: when the bus is full the event is dropped.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use skyreach_common::{EntityId, SurfaceId};

use crate::combat::WeaponKind;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Character left the grounded state
    LeftGround {
        /// Character entity
        entity_id: EntityId,
    },
    /// Character landed on walkable ground
    Landed {
        /// Character entity
        entity_id: EntityId,
    },
    /// Character entered or left a roll
    RollChanged {
        /// Character entity
        entity_id: EntityId,
        /// Whether the character is now rolling
        rolling: bool,
    },
    /// Character started a dash (player-triggered or melee lunge)
    DashStarted {
        /// Character entity
        entity_id: EntityId,
    },
    /// Character started a jump
    Jumped {
        /// Character entity
        entity_id: EntityId,
    },
    /// Character switched weapons
    Equipped {
        /// Character entity
        entity_id: EntityId,
        /// Weapon now held
        weapon: WeaponKind,
    },
    /// Character performed an attack (melee swing or ranged shot)
    Attacked {
        /// Character entity
        entity_id: EntityId,
        /// Weapon used
        weapon: WeaponKind,
    },
    /// A damage target was hit
    TargetDamaged {
        /// Surface handle of the target
        surface: SurfaceId,
        /// Damage amount
        amount: f32,
    },
    /// A damage target was destroyed
    TargetDied {
        /// Surface handle of the target
        surface: SurfaceId,
    },
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: GameEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }
}

/// Cloneable publishing handle held by the motor and combat controller.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Publishes an event; drops it if the bus is full.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.sender.try_send(event);
    }
}
