//! Data-driven game balance
//!
//! Defaults carry the shipped values; every table is serde-loadable so
//! balance passes edit JSON instead of code.

use serde::{Deserialize, Serialize};

/// Ship handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipTuning {
    /// Acceleration added per tick while a direction is held
    pub accel_factor: f32,
    /// Per-axis velocity clamp
    pub max_speed: f32,
    /// Velocity damping per tick
    pub friction: f32,
    /// Cosmetic tilt per unit of horizontal velocity
    pub slant_factor_x: f32,
    /// Cosmetic tilt per unit of vertical velocity
    pub slant_factor_y: f32,
}

impl Default for ShipTuning {
    fn default() -> Self {
        Self {
            accel_factor: 1.22,
            max_speed: 14.0,
            friction: 0.9,
            slant_factor_x: 0.028,
            slant_factor_y: 0.031,
        }
    }
}

/// Tractor beam geometry and forces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamTuning {
    /// Half-cone (fraction of π) the beam may deviate from straight down
    pub ray_max_angle: f32,
    /// Maximum beam rotation per tick toward the cursor
    pub ray_angle_speed_factor: f32,
    /// Beam width scale while idle
    pub attract_ray_off_scale: f32,
    /// Seconds for the beam to open to full width
    pub open_time: f32,
    /// Seconds for the beam to close back down
    pub close_time: f32,
    /// Pull applied to each held body, per tick
    pub beam_force: f32,
    /// Inside this distance a held entity shrinks toward the ship
    pub slurp_distance: f32,
    /// Inside this distance absorption finalizes
    pub despawn_distance: f32,
}

impl Default for BeamTuning {
    fn default() -> Self {
        Self {
            ray_max_angle: 0.2,
            ray_angle_speed_factor: 0.3,
            attract_ray_off_scale: 0.1,
            open_time: 0.32,
            close_time: 0.16,
            beam_force: 0.016,
            slurp_distance: 40.0,
            despawn_distance: 20.0,
        }
    }
}

/// Match rules and staged-transition timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesTuning {
    /// Life lost per tick while playing; 0 disables the drain
    pub life_drain: f32,
    /// Life lost per bullet hit
    pub bullet_damage: f32,
    /// Intro reveal growth per second (mask radius units)
    pub intro_reveal_rate: f32,
    /// Mask radius at which the intro hands over to gameplay
    pub intro_reveal_threshold: f32,
    /// Seconds for the death fade
    pub death_fade_time: f32,
    /// Seconds for the reset transition back into play
    pub reset_time: f32,
}

impl Default for RulesTuning {
    fn default() -> Self {
        Self {
            life_drain: 0.1,
            bullet_damage: 10.0,
            intro_reveal_rate: 160.0,
            intro_reveal_threshold: 400.0,
            death_fade_time: 2.0,
            reset_time: 1.0,
        }
    }
}

/// What catching one entity of a category does
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CatchRule {
    /// Applied to ship life on absorption
    pub life_delta: f32,
    /// Points per caught entity of this category at final scoring
    pub score_multiplier: u32,
}

/// Scoring categories for caught entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatchCategory {
    Cow,
    Tree,
    Rock,
    Human,
    Tank,
}

impl CatchCategory {
    pub const ALL: [CatchCategory; 5] = [
        CatchCategory::Cow,
        CatchCategory::Tree,
        CatchCategory::Rock,
        CatchCategory::Human,
        CatchCategory::Tank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatchCategory::Cow => "cows",
            CatchCategory::Tree => "trees",
            CatchCategory::Rock => "rocks",
            CatchCategory::Human => "humans",
            CatchCategory::Tank => "tanks",
        }
    }
}

/// Per-category catch effects. Rocks split into two tiers by size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchTable {
    pub cow: CatchRule,
    pub tree: CatchRule,
    pub small_rock: CatchRule,
    pub big_rock: CatchRule,
    /// Rocks at least this big use the big tier
    pub big_rock_size: f32,
    pub human: CatchRule,
    pub tank: CatchRule,
}

impl Default for CatchTable {
    fn default() -> Self {
        Self {
            cow: CatchRule {
                life_delta: 10.0,
                score_multiplier: 50,
            },
            tree: CatchRule {
                life_delta: 1.0,
                score_multiplier: 10,
            },
            small_rock: CatchRule {
                life_delta: -5.0,
                score_multiplier: 0,
            },
            big_rock: CatchRule {
                life_delta: -10.0,
                score_multiplier: 0,
            },
            big_rock_size: 20.0,
            human: CatchRule {
                life_delta: 0.0,
                score_multiplier: 100,
            },
            tank: CatchRule {
                life_delta: -8.0,
                score_multiplier: 25,
            },
        }
    }
}

impl CatchTable {
    /// Rule for a category; rocks pick their tier from `size`
    pub fn rule(&self, category: CatchCategory, size: f32) -> CatchRule {
        match category {
            CatchCategory::Cow => self.cow,
            CatchCategory::Tree => self.tree,
            CatchCategory::Rock => {
                if size >= self.big_rock_size {
                    self.big_rock
                } else {
                    self.small_rock
                }
            }
            CatchCategory::Human => self.human,
            CatchCategory::Tank => self.tank,
        }
    }

    pub fn multiplier(&self, category: CatchCategory) -> u32 {
        match category {
            CatchCategory::Rock => self.small_rock.score_multiplier,
            _ => self.rule(category, 0.0).score_multiplier,
        }
    }
}

/// All balance tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tuning {
    pub ship: ShipTuning,
    pub beam: BeamTuning,
    pub rules: RulesTuning,
    pub catch: CatchTable,
}

impl Tuning {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
