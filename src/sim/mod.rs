//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order for entities, id order for the
//!   attraction set)
//! - No rendering or platform dependencies beyond the capability seams

pub mod entity;
pub mod state;
pub mod tick;
pub mod world;

pub use entity::{Behavior, Entity, EntityId, HumanMode, LifeState};
pub use state::{GameState, LogScore, PlayState, ScoreBoard, ScoreReport, ScoreSink};
pub use tick::{aim_beam, tick};
pub use world::{EntityDesc, EntityTag, World, weighted_pick};
