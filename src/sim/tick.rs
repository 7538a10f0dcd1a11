//! Per-tick simulation step
//!
//! One fixed-timestep pass over the whole match: the play-state switch,
//! ship kinematics, beam targeting and the grab toggle, attraction forces
//! and absorption, life and score bookkeeping, the physics step, the
//! collision event feed, and the world streaming update, in that order.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use rapier2d::prelude::ColliderHandle;

use super::entity::LifeState;
use super::state::{GameState, PlayState, ScoreSink};
use super::world::WorldCtx;
use crate::assets::Assets;
use crate::audio::AudioSink;
use crate::input::{Inputs, Key};
use crate::physics::{ContactEvent, REST_DAMPING};
use crate::{consts, vec_angle};

/// Damping applied to a held body so it tracks the beam instead of
/// drifting free
const HELD_DAMPING: f32 = 60.0;
/// Tuning forces are expressed in per-step units; the engine integrates
/// newtons over seconds
const FORCE_SCALE: f32 = 1.0e6;

/// Resolve a raw cursor angle into a beam target. Only aims when the
/// cursor is in the lower half, and never past the allowed cone either
/// side of straight down.
pub fn aim_beam(raw_angle: f32, max_angle: f32) -> Option<f32> {
    if raw_angle > PI {
        Some(raw_angle.clamp(PI * (1.0 + max_angle), PI * (2.0 - max_angle)))
    } else {
        None
    }
}

fn other_of(
    target: ColliderHandle,
    a: ColliderHandle,
    b: ColliderHandle,
) -> Option<ColliderHandle> {
    if a == target {
        Some(b)
    } else if b == target {
        Some(a)
    } else {
        None
    }
}

/// Advance the match by one fixed timestep
pub fn tick(
    state: &mut GameState,
    inputs: &Inputs,
    assets: &Assets,
    audio: &mut dyn AudioSink,
    score_sink: &mut dyn ScoreSink,
    dt: f32,
) {
    // Staged play-state progression, one switch per tick
    match state.play_state {
        PlayState::IntroEnter => {
            state.paused = true;
            state.play_state = PlayState::Intro;
        }
        PlayState::Intro => {
            state.circle_mask_radius += state.tuning.rules.intro_reveal_rate * dt;
            if state.circle_mask_radius >= state.tuning.rules.intro_reveal_threshold {
                state.play_state = PlayState::IntroExit;
            }
        }
        PlayState::IntroExit => {
            state.paused = false;
            state.play_state = PlayState::Playing;
        }
        PlayState::Playing => {}
        PlayState::DeathEnter => {
            state.paused = true;
            state.ship_is_grabbing = false;
            audio.stop("beam");
            state.fade_timer = state.tuning.rules.death_fade_time;
            state.play_state = PlayState::DeathFade;
        }
        PlayState::DeathFade => {
            state.fade_timer -= dt;
            if state.fade_timer <= 0.0 {
                score_sink.report(&state.score.report(&state.tuning.catch));
                state.score.clear();
                state.world.reset(&mut state.physics, &mut state.scene);
                state.reset_ship();
                state.play_state = PlayState::WaitingForReset;
            }
        }
        PlayState::WaitingForReset => {
            if inputs.is_button_clicked(0) {
                state.reset_timer = state.tuning.rules.reset_time;
                state.play_state = PlayState::ResetExit;
            } else if inputs.is_key_released(Key::Back) {
                state.quit_requested = true;
            }
        }
        PlayState::ResetExit => {
            state.reset_timer -= dt;
            if state.reset_timer <= 0.0 {
                state.circle_mask_radius = 80.0;
                state.paused = false;
                state.play_state = PlayState::Playing;
            }
        }
    }

    // Planet spin; the camera pivot counter-rotates to follow
    if !state.paused {
        state.planet_rotation += consts::PLANET_SPEED;
        state.camera.pivot_rotation = -state.planet_rotation;
    }

    // Ship kinematics
    let ship = state.tuning.ship.clone();
    if !state.paused {
        let mut accel = Vec2::ZERO;
        if inputs.is_key_down(Key::Left) {
            accel.x -= 1.0;
        }
        if inputs.is_key_down(Key::Right) {
            accel.x += 1.0;
        }
        if inputs.is_key_down(Key::Up) {
            accel.y += 1.0;
        }
        if inputs.is_key_down(Key::Down) {
            accel.y -= 1.0;
        }
        accel = accel.normalize_or_zero() * ship.accel_factor;

        state.ship_velocity += accel;
        state.ship_velocity *= ship.friction;
        if state.ship_velocity.length() < 0.001 {
            state.ship_velocity = Vec2::ZERO;
        }
        state.ship_velocity.x = state.ship_velocity.x.clamp(-ship.max_speed, ship.max_speed);
        state.ship_velocity.y = state.ship_velocity.y.clamp(-ship.max_speed, ship.max_speed);

        state.ship_position += state.ship_velocity;
    }

    state.ship_position.x = state
        .ship_position
        .x
        .clamp(-consts::SHIP_BOUNDS_X, consts::SHIP_BOUNDS_X);
    state.ship_position.y = state
        .ship_position
        .y
        .clamp(consts::SHIP_BOUNDS_Y_MIN, consts::SHIP_BOUNDS_Y_MAX);

    state.ship_tilt = Vec2::new(
        state.ship_velocity.x * -ship.slant_factor_x,
        state.ship_velocity.y * -ship.slant_factor_y,
    );

    // Grab toggle: widen or collapse the beam, start or stop its hum
    let beam = state.tuning.beam.clone();
    if !state.paused && inputs.is_button_clicked(0) {
        state.ship_is_grabbing = !state.ship_is_grabbing;
        if state.ship_is_grabbing {
            audio.play_loop("beam", 0.09, Some((0.8, 8.0)));
        } else {
            audio.stop("beam");
        }
    }

    let scale_target = if state.ship_is_grabbing {
        1.0
    } else {
        beam.attract_ray_off_scale
    };
    let scale_range = 1.0 - beam.attract_ray_off_scale;
    let scale_rate = if state.beam_scale < scale_target {
        scale_range / beam.open_time
    } else {
        scale_range / beam.close_time
    };
    let scale_step = (scale_target - state.beam_scale).clamp(-scale_rate * dt, scale_rate * dt);
    state.beam_scale += scale_step;

    // Beam targeting runs even while paused so the beam stays settled
    let ship_world = state.ship_world();
    let view_cursor = inputs.view_cursor(consts::VIEW_WIDTH, consts::VIEW_HEIGHT);
    let ship_ndc = state.camera.project(ship_world);
    let to_cursor = (view_cursor - ship_ndc).normalize_or_zero();
    if let Some(clamped) = aim_beam(vec_angle(to_cursor), beam.ray_max_angle) {
        // Offset for the holder's resting pose and the ship's tilt
        let target = clamped + FRAC_PI_2 - state.ship_tilt.x;
        let step = (target - state.beam_rotation)
            .clamp(-beam.ray_angle_speed_factor, beam.ray_angle_speed_factor);
        state.beam_rotation += step;
    }

    // The sensor shadows the ship every tick regardless of pause
    state
        .physics
        .set_position(state.beam_body, Vec2::new(ship_world.x, -ship_world.y));
    state
        .physics
        .set_angle(state.beam_body, state.planet_rotation - state.beam_rotation);

    // Attraction forces and absorption for everything inside the beam
    let catch = state.tuning.catch.clone();
    let attracted: Vec<_> = state.attracted.iter().copied().collect();
    for id in attracted {
        let Some(entity) = state.world.entity_mut(id) else {
            state.attracted.remove(&id);
            continue;
        };
        let body = entity.body;
        let p = state.physics.body_position(body);
        let body_visual = Vec2::new(p.x, -p.y);
        let to_ship = ship_world - body_visual;
        let distance = to_ship.length();
        let pull = to_ship.normalize_or_zero() * beam.beam_force;

        // Once absorption has begun it finishes even if the beam lets go
        if state.ship_is_grabbing || entity.state >= LifeState::BeingAbsorbed {
            state.physics.set_damping(body, HELD_DAMPING);
            state
                .physics
                .apply_force(body, Vec2::new(pull.x, -pull.y) * FORCE_SCALE);

            if distance < beam.despawn_distance {
                entity.state = LifeState::Absorbed;
                let category = entity.category();
                let size = entity.size();

                if let Some(category) = category {
                    let rule = catch.rule(category, size);
                    state.ship_life = (state.ship_life + rule.life_delta).clamp(0.0, 100.0);
                    state.score.record(category);
                }
                state.world.despawn(id, &mut state.physics, &mut state.scene);
                state.attracted.remove(&id);
                audio.play_once("score", 0.2);
            } else if distance < beam.slurp_distance {
                entity.state = LifeState::BeingAbsorbed;
                let node = entity.node;
                if let Some(node) = state.scene.get_mut(node) {
                    node.scale = distance / beam.slurp_distance;
                }
            }
        } else {
            state.physics.set_damping(body, REST_DAMPING);
        }
    }

    // Life drain and the bar it drives
    if !state.paused {
        state.ship_life = (state.ship_life - state.tuning.rules.life_drain).clamp(0.0, 100.0);
        state.life_bar_scale = state.ship_life / 100.0;
        state.life_bar_offset = -60.0 + 60.0 * state.life_bar_scale;

        if state.ship_life <= 0.0 && state.play_state == PlayState::Playing {
            state.play_state = PlayState::DeathEnter;
        }
    }

    // The hull sensor shadows the ship too (shell hits)
    state
        .physics
        .set_position(state.ship_body, Vec2::new(ship_world.x, -ship_world.y));
    state.physics.set_angle(state.ship_body, state.planet_rotation);

    // Advance the engine, then handle the overlap feed it produced
    state.physics.step(dt);

    for event in state.physics.drain_events() {
        match event {
            ContactEvent::Started(a, b) => {
                if let Some(other) = other_of(state.beam_collider, a, b) {
                    if let Some(id) = state.world.lookup_by_collider(other) {
                        state.attracted.insert(id);
                        if let Some(entity) = state.world.entity_mut(id) {
                            entity.grab(&mut state.physics);
                        }
                    }
                } else if let Some(other) = other_of(state.ship_collider, a, b) {
                    state.ship_life =
                        (state.ship_life - state.tuning.rules.bullet_damage).clamp(0.0, 100.0);
                    audio.play_once("hit", 0.2);
                    if let Some(id) = state.world.lookup_by_collider(other) {
                        state.world.despawn(id, &mut state.physics, &mut state.scene);
                        state.attracted.remove(&id);
                    }
                }
            }
            ContactEvent::Stopped(a, b) => {
                if let Some(other) = other_of(state.beam_collider, a, b) {
                    // Bodies can outlive their entity record; always put
                    // the resting damping back on whatever is left
                    if let Some(body) = state.physics.collider_parent(other) {
                        state.physics.set_damping(body, REST_DAMPING);
                    }
                    if let Some(id) = state.world.lookup_by_collider(other) {
                        state.attracted.remove(&id);
                        if let Some(entity) = state.world.entity_mut(id) {
                            entity.release(&mut state.physics);
                        }
                    }
                }
            }
        }
    }

    // Stream the world: spawn window, visual sync, culling, behaviors
    {
        let GameState {
            world,
            physics,
            scene,
            camera,
            planet_rotation,
            planet_collider,
            paused,
            ..
        } = state;
        let mut ctx = WorldCtx {
            physics,
            scene,
            assets,
            camera,
            planet_rotation: *planet_rotation,
            planet_collider: *planet_collider,
            ship_world,
            paused: *paused,
            dt,
        };
        world.update(&mut ctx);
    }

    state.tick_count += 1;
}
