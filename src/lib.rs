//! UFO Harvest - a tiny-planet abduction arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (world streaming, beam interaction, scoring)
//! - `machine`: Generic phase state machine driving load/game
//! - `physics`: 2D rigid-body collaborator (rapier2d)
//! - `scene`, `assets`, `input`, `audio`: capability seams for the renderer,
//!   asset pipeline, input wiring and audio playback

pub mod assets;
pub mod audio;
pub mod input;
pub mod machine;
pub mod phases;
pub mod physics;
pub mod scene;
pub mod sim;
pub mod tuning;

pub use machine::{Phase, StateMachine};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz logical steps)
    pub const TICK_DT: f32 = 1.0 / 60.0;
    /// Maximum catch-up steps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 5;

    /// Planet dimensions
    pub const PLANET_RADIUS: f32 = 1000.0;
    /// Planet rotation per tick (radians)
    pub const PLANET_SPEED: f32 = 0.002;
    /// Entities are placed this far above the planet surface
    pub const SURFACE_MARGIN: f32 = 10.0;
    /// Central pull applied to tracked bodies, proportional to distance
    /// (1/s²; ~2000 units/s² of acceleration at the surface)
    pub const PLANET_PULL: f32 = 2.0;

    /// Viewport
    pub const VIEW_WIDTH: f32 = 800.0;
    pub const VIEW_HEIGHT: f32 = 600.0;
    /// Camera sits this far above the planet surface
    pub const CAMERA_VERTICAL_OFFSET: f32 = 200.0;

    /// Ship movement bounds in the camera frame
    pub const SHIP_BOUNDS_X: f32 = 350.0;
    pub const SHIP_BOUNDS_Y_MIN: f32 = -180.0;
    pub const SHIP_BOUNDS_Y_MAX: f32 = 280.0;

    /// Entities past this camera-space x coordinate are culled
    pub const DESPAWN_NDC_X: f32 = -1.2;
    /// Half-extent of the dead zone around the planet origin; the
    /// angle-to-position mapping degenerates there and nothing may linger
    pub const POLAR_DEAD_ZONE: f32 = 100.0;

    /// Streaming lookahead ahead of the current planet rotation (cycles)
    pub const SPAWN_MARGIN: f32 = 0.08;
    /// Track coordinate generation restarts from on a fresh run
    pub const TRACK_START: f32 = -0.05;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Angle of a vector counter-clockwise from +X, in [0, 2π)
#[inline]
pub fn vec_angle(v: Vec2) -> f32 {
    let a = v.y.atan2(v.x);
    if a < 0.0 { a + std::f32::consts::TAU } else { a }
}

/// Rotate a vector around the origin
#[inline]
pub fn rotate_vec(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Track coordinate (fractions of a revolution) to radians
#[inline]
pub fn cycles_to_angle(cycles: f32) -> f32 {
    cycles * std::f32::consts::TAU
}

/// World-space placement point for a surface angle: a fixed radial offset
/// rotated by `-angle` around the planet center. The negative rotation keeps
/// increasing track coordinates moving with the planet's spin direction.
pub fn angle_to_world_space(angle: f32, planet_radius: f32) -> Vec2 {
    rotate_vec(
        Vec2::new(0.0, planet_radius + consts::SURFACE_MARGIN),
        -angle,
    )
}
