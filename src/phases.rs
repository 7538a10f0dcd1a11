//! Top-level load/game phases
//!
//! Wires the generic machine to the actual game: a load phase that waits
//! for the asset catalog, and a game phase that owns one `GameState` per
//! run. Backing out from the results screen cycles game -> load -> game
//! with a fresh state.

use crate::assets::Assets;
use crate::audio::AudioSink;
use crate::input::Inputs;
use crate::machine::{EventSink, Phase, PhaseDesc, StateMachine, Transition};
use crate::sim::state::ScoreSink;
use crate::sim::{GameState, tick};
use crate::tuning::Tuning;
use crate::consts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Load,
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventId {
    GameStarted,
    GameEnded,
}

/// Shared environment every phase sees
pub struct GameContext {
    pub assets: Assets,
    pub inputs: Inputs,
    pub audio: Box<dyn AudioSink>,
    pub score_sink: Box<dyn ScoreSink>,
    pub tuning: Tuning,
    pub seed: u64,
}

/// Waits for the asset catalog to resolve
#[derive(Default)]
pub struct LoadPhase;

impl Phase<GameContext, EventId> for LoadPhase {
    fn enter(&mut self, context: &mut GameContext) {
        context.assets.begin_load();
    }

    fn update(&mut self, context: &mut GameContext, events: &mut EventSink<EventId>) {
        if context.assets.is_ready() {
            events.raise(EventId::GameStarted);
        }
    }
}

/// Owns the match; a fresh `GameState` per entry
#[derive(Default)]
pub struct PlayPhase {
    state: Option<GameState>,
}

impl PlayPhase {
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }
}

impl Phase<GameContext, EventId> for PlayPhase {
    fn enter(&mut self, context: &mut GameContext) {
        self.state = Some(GameState::new(context.tuning.clone(), context.seed));
        context.audio.play_loop("bg", 0.5, None);
    }

    fn exit(&mut self, context: &mut GameContext) {
        context.audio.stop("beam");
        context.audio.stop("bg");
        self.state = None;
    }

    fn update(&mut self, context: &mut GameContext, events: &mut EventSink<EventId>) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        // Late asset arrival: attach models to placeholder nodes
        if context.assets.poll_just_ready() {
            state.world.attach_models(&mut state.scene, &context.assets);
        }

        tick(
            state,
            &context.inputs,
            &context.assets,
            context.audio.as_mut(),
            context.score_sink.as_mut(),
            consts::TICK_DT,
        );

        if state.quit_requested {
            state.quit_requested = false;
            events.raise(EventId::GameEnded);
        }
    }
}

/// The standard machine: load -> game, with a way back to the menu
pub fn build_machine(
    context: &mut GameContext,
) -> StateMachine<GameContext, StateId, EventId> {
    StateMachine::new(
        context,
        StateId::Load,
        vec![
            PhaseDesc {
                id: StateId::Load,
                phase: Box::new(LoadPhase),
                transitions: vec![Transition {
                    event: EventId::GameStarted,
                    target: StateId::Game,
                }],
            },
            PhaseDesc {
                id: StateId::Game,
                phase: Box::new(PlayPhase::default()),
                transitions: vec![Transition {
                    event: EventId::GameEnded,
                    target: StateId::Load,
                }],
            },
        ],
    )
}
