//! # Skyreach Common
//!
//! Common types, utilities, and shared abstractions for Skyreach.
//!
//! This crate provides foundational types used across all Skyreach
//! subsystems:
//! - ID types (`EntityId`, `SurfaceId`, `ProjectileId`)
//! - Math helpers over `glam` (bounded stepping, plane projection)
//! - Configuration validation errors
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod math;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::math::*;
}

pub use prelude::*;
