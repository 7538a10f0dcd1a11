//! UFO Harvest entry point
//!
//! Headless driver: runs the load/game machine at the fixed logical step
//! with scripted input, standing in for the browser shell that would feed
//! real events. Useful for soak-testing the simulation and eyeballing the
//! score log.

use glam::Vec2;

use ufo_harvest::assets::{Assets, declare_game_assets};
use ufo_harvest::audio::NullAudio;
use ufo_harvest::input::{Inputs, Key};
use ufo_harvest::phases::{GameContext, build_machine};
use ufo_harvest::sim::LogScore;
use ufo_harvest::tuning::Tuning;

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    log::info!("starting with seed {seed}");

    let mut assets = Assets::new();
    declare_game_assets(&mut assets).expect("asset catalog is well-formed");

    let mut context = GameContext {
        assets,
        inputs: Inputs::new(),
        audio: Box::new(NullAudio),
        score_sink: Box::new(LogScore),
        tuning: Tuning::default(),
        seed,
    };
    let mut machine = build_machine(&mut context);

    // No real loader here: everything resolves before the first frame
    context.assets.finish_all();

    // Park the cursor below the ship, sweep it across the screen, and poke
    // the beam every few seconds. Clicks double as the reset confirm once
    // a run ends, so the loop plays through several matches.
    let ticks = 3 * 60 * 60;
    for i in 0u32..ticks {
        let sweep = (i as f32 / 600.0).sin();
        context
            .inputs
            .cursor_moved(Vec2::new(400.0 + 200.0 * sweep, 520.0));

        if i % 240 == 120 {
            context.inputs.button_pressed(0);
            context.inputs.button_released(0);
        }
        if i % 360 < 90 {
            context.inputs.key_pressed(Key::Right);
        } else {
            context.inputs.key_released(Key::Right);
        }

        machine.update(&mut context);
        context.inputs.end_tick();
    }

    log::info!("done after {ticks} ticks in {:?}", machine.current());
}
