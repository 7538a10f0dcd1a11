//! Authoritative per-match simulation state
//!
//! Everything the tick loop reads and writes lives here: ship kinematics,
//! beam state, the attraction set, life and score bookkeeping, the staged
//! play-state progression, and the owned collaborators (world, physics,
//! scene, camera).

use std::collections::{BTreeSet, HashMap};
use std::f32::consts::TAU;

use glam::Vec2;
use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::world::World;
use crate::consts;
use crate::physics::PhysicsWorld;
use crate::scene::{Camera, Scene};
use crate::tuning::{CatchCategory, CatchTable, Tuning};

/// Staged progression within one match, distinct from the coarser
/// load/game machine. Evaluated once per tick as a single switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// First tick: kick off the timed reveal, simulation paused
    IntroEnter,
    /// Reveal growing toward its threshold
    Intro,
    /// Hand over to gameplay
    IntroExit,
    /// Simulation live
    Playing,
    /// Life hit zero: freeze and silence the beam
    DeathEnter,
    /// Fade running; score finalizes when it completes
    DeathFade,
    /// Results up, waiting for a click
    WaitingForReset,
    /// Transition back into a fresh run
    ResetExit,
}

/// Per-category caught counters
#[derive(Debug, Clone, Default)]
pub struct ScoreBoard {
    counts: HashMap<CatchCategory, u32>,
}

impl ScoreBoard {
    pub fn record(&mut self, category: CatchCategory) {
        *self.counts.entry(category).or_default() += 1;
    }

    pub fn count(&self, category: CatchCategory) -> u32 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self, table: &CatchTable) -> u32 {
        CatchCategory::ALL
            .iter()
            .map(|&c| self.count(c) * table.multiplier(c))
            .sum()
    }

    pub fn report(&self, table: &CatchTable) -> ScoreReport {
        ScoreReport {
            lines: CatchCategory::ALL
                .iter()
                .map(|&category| CategoryLine {
                    category,
                    count: self.count(category),
                    multiplier: table.multiplier(category),
                })
                .collect(),
            total: self.total(table),
        }
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryLine {
    pub category: CatchCategory,
    pub count: u32,
    pub multiplier: u32,
}

/// Final tally handed to the results screen at the death transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub lines: Vec<CategoryLine>,
    pub total: u32,
}

/// Receives the final tally; rendering it is someone else's job
pub trait ScoreSink {
    fn report(&mut self, report: &ScoreReport);
}

/// Logs the tally
#[derive(Debug, Default)]
pub struct LogScore;

impl ScoreSink for LogScore {
    fn report(&mut self, report: &ScoreReport) {
        for line in &report.lines {
            if line.count > 0 {
                log::info!(
                    "{}: {} x {}",
                    line.category.as_str(),
                    line.count,
                    line.multiplier
                );
            }
        }
        log::info!("final score: {}", report.total);
    }
}

/// Collects reports for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingScore {
    pub reports: Vec<ScoreReport>,
}

#[cfg(test)]
impl ScoreSink for RecordingScore {
    fn report(&mut self, report: &ScoreReport) {
        self.reports.push(report.clone());
    }
}

pub struct GameState {
    pub tuning: Tuning,

    pub play_state: PlayState,
    pub paused: bool,
    pub tick_count: u64,

    /// Monotonic while unpaused
    pub planet_rotation: f32,

    // Ship, in the camera frame
    pub ship_position: Vec2,
    pub ship_velocity: Vec2,
    /// Cosmetic tilt (z from horizontal velocity, x from vertical)
    pub ship_tilt: Vec2,
    pub ship_life: f32,
    pub life_bar_scale: f32,
    pub life_bar_offset: f32,

    // Tractor beam
    pub ship_is_grabbing: bool,
    /// Beam holder rotation; idles at one full turn (straight down)
    pub beam_rotation: f32,
    /// Animated width scale between idle and fully open
    pub beam_scale: f32,
    /// Entities currently overlapping the beam sensor, in id order
    pub attracted: BTreeSet<EntityId>,

    // Staged transitions
    pub circle_mask_radius: f32,
    pub fade_timer: f32,
    pub reset_timer: f32,
    /// Set while waiting for reset when the player backs out to the menu
    pub quit_requested: bool,

    pub score: ScoreBoard,

    pub world: World,
    pub physics: PhysicsWorld,
    pub scene: Scene,
    pub camera: Camera,

    pub planet_collider: ColliderHandle,
    pub ship_body: RigidBodyHandle,
    pub ship_collider: ColliderHandle,
    pub beam_body: RigidBodyHandle,
    pub beam_collider: ColliderHandle,
}

impl GameState {
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let mut physics = PhysicsWorld::new();
        let (_planet_body, planet_collider) = physics.add_planet(consts::PLANET_RADIUS);
        let (ship_body, ship_collider) = physics.add_ship_sensor(Vec2::new(80.0, 30.0));
        let (beam_body, beam_collider) = physics.add_beam_sensor(180.0, 1000.0);

        let beam_scale = tuning.beam.attract_ray_off_scale;
        Self {
            tuning,
            play_state: PlayState::IntroEnter,
            paused: true,
            tick_count: 0,
            planet_rotation: 0.0,
            ship_position: Vec2::ZERO,
            ship_velocity: Vec2::ZERO,
            ship_tilt: Vec2::ZERO,
            ship_life: 100.0,
            life_bar_scale: 1.0,
            life_bar_offset: 0.0,
            ship_is_grabbing: false,
            beam_rotation: TAU,
            beam_scale,
            attracted: BTreeSet::new(),
            circle_mask_radius: 80.0,
            fade_timer: 0.0,
            reset_timer: 0.0,
            quit_requested: false,
            score: ScoreBoard::default(),
            world: World::new(seed),
            physics,
            scene: Scene::new(),
            camera: Camera::new(consts::PLANET_RADIUS),
            planet_collider,
            ship_body,
            ship_collider,
            beam_body,
            beam_collider,
        }
    }

    /// Ship world position for the current camera pose
    pub fn ship_world(&self) -> Vec2 {
        self.camera.camera_to_world(self.ship_position)
    }

    /// Put the ship and planet back to their run-start pose. The world is
    /// reset separately.
    pub fn reset_ship(&mut self) {
        self.ship_position = Vec2::ZERO;
        self.ship_velocity = Vec2::ZERO;
        self.ship_tilt = Vec2::ZERO;
        self.ship_life = 100.0;
        self.life_bar_scale = 1.0;
        self.life_bar_offset = 0.0;
        self.ship_is_grabbing = false;
        self.beam_rotation = TAU;
        self.beam_scale = self.tuning.beam.attract_ray_off_scale;
        self.attracted.clear();
        self.planet_rotation = 0.0;
        self.camera.pivot_rotation = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_totals() {
        let table = CatchTable::default();
        let mut board = ScoreBoard::default();
        board.record(CatchCategory::Cow);
        board.record(CatchCategory::Cow);
        board.record(CatchCategory::Human);

        assert_eq!(board.count(CatchCategory::Cow), 2);
        assert_eq!(board.total(&table), 2 * 50 + 100);

        let report = board.report(&table);
        assert_eq!(report.total, 200);
        assert_eq!(report.lines.len(), CatchCategory::ALL.len());
    }

    #[test]
    fn test_new_state_starts_paused_in_intro() {
        let state = GameState::new(Tuning::default(), 1);
        assert_eq!(state.play_state, PlayState::IntroEnter);
        assert!(state.paused);
        assert_eq!(state.ship_life, 100.0);
        assert!(state.attracted.is_empty());
    }
}
