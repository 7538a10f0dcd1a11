//! Generic phase state machine
//!
//! Drives the top-level game phases (load, game) from discrete events.
//! Each phase gets the shared context and may raise events during its
//! update; the machine resolves at most one transition per update, calling
//! `exit` on the old phase and `enter` on the new one.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Behavior hooks for one phase. All hooks default to no-ops so a phase
/// only implements what it needs.
pub trait Phase<C, E> {
    fn enter(&mut self, _context: &mut C) {}
    fn exit(&mut self, _context: &mut C) {}
    fn update(&mut self, _context: &mut C, _events: &mut EventSink<E>) {}
}

/// Collects events raised by a phase during one update. Only the first
/// raised event can fire a transition; later raises in the same update are
/// dropped with a warning so enter/exit never run twice per tick.
#[derive(Debug)]
pub struct EventSink<E> {
    raised: Option<E>,
}

impl<E: Debug> EventSink<E> {
    fn new() -> Self {
        Self { raised: None }
    }

    pub fn raise(&mut self, event: E) {
        match &self.raised {
            Some(first) => {
                log::warn!("event {event:?} raised after {first:?} in the same update, dropped");
            }
            None => self.raised = Some(event),
        }
    }

    fn take(&mut self) -> Option<E> {
        self.raised.take()
    }
}

/// An (event, target phase) pair
#[derive(Debug, Clone)]
pub struct Transition<S, E> {
    pub event: E,
    pub target: S,
}

/// One row of the phase table: the phase implementation plus its outgoing
/// transitions
pub struct PhaseDesc<C, S, E> {
    pub id: S,
    pub phase: Box<dyn Phase<C, E>>,
    pub transitions: Vec<Transition<S, E>>,
}

struct PhaseEntry<C, S, E> {
    phase: Box<dyn Phase<C, E>>,
    transitions: Vec<Transition<S, E>>,
}

pub struct StateMachine<C, S, E> {
    phases: HashMap<S, PhaseEntry<C, S, E>>,
    current: S,
}

impl<C, S, E> StateMachine<C, S, E>
where
    S: Copy + Eq + Hash + Debug,
    E: PartialEq + Debug,
{
    /// Build the machine and enter the initial phase. A table that does not
    /// contain the initial phase is a programming error.
    pub fn new(context: &mut C, initial: S, table: Vec<PhaseDesc<C, S, E>>) -> Self {
        let mut phases = HashMap::with_capacity(table.len());
        for desc in table {
            phases.insert(
                desc.id,
                PhaseEntry {
                    phase: desc.phase,
                    transitions: desc.transitions,
                },
            );
        }

        let mut machine = Self {
            phases,
            current: initial,
        };
        machine
            .phases
            .get_mut(&initial)
            .unwrap_or_else(|| panic!("initial phase {initial:?} missing from table"))
            .phase
            .enter(context);
        machine
    }

    pub fn current(&self) -> S {
        self.current
    }

    /// Run the current phase's update, then resolve a raised event if any.
    /// An event with no matching transition leaves the machine in place.
    pub fn update(&mut self, context: &mut C) {
        let mut sink = EventSink::new();
        self.entry_mut().phase.update(context, &mut sink);

        let Some(event) = sink.take() else { return };

        let target = self
            .phases
            .get(&self.current)
            .and_then(|e| e.transitions.iter().find(|t| t.event == event))
            .map(|t| t.target);

        match target {
            Some(target) => {
                log::debug!("phase transition {:?} -> {target:?}", self.current);
                self.entry_mut().phase.exit(context);
                self.current = target;
                self.entry_mut().phase.enter(context);
            }
            None => {
                log::warn!(
                    "phase {:?}: no transition for event {event:?}",
                    self.current
                );
            }
        }
    }

    fn entry_mut(&mut self) -> &mut PhaseEntry<C, S, E> {
        let current = self.current;
        self.phases
            .get_mut(&current)
            .unwrap_or_else(|| panic!("phase {current:?} missing from table"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        calls: Vec<String>,
    }

    struct Recording {
        name: &'static str,
        raise_on_update: Option<&'static str>,
    }

    impl Phase<Trace, &'static str> for Recording {
        fn enter(&mut self, context: &mut Trace) {
            context.calls.push(format!("enter {}", self.name));
        }

        fn exit(&mut self, context: &mut Trace) {
            context.calls.push(format!("exit {}", self.name));
        }

        fn update(&mut self, _context: &mut Trace, events: &mut EventSink<&'static str>) {
            if let Some(event) = self.raise_on_update {
                events.raise(event);
            }
        }
    }

    fn machine(
        raise: Option<&'static str>,
        trace: &mut Trace,
    ) -> StateMachine<Trace, &'static str, &'static str> {
        StateMachine::new(
            trace,
            "load",
            vec![
                PhaseDesc {
                    id: "load",
                    phase: Box::new(Recording {
                        name: "load",
                        raise_on_update: raise,
                    }),
                    transitions: vec![Transition {
                        event: "game_started",
                        target: "game",
                    }],
                },
                PhaseDesc {
                    id: "game",
                    phase: Box::new(Recording {
                        name: "game",
                        raise_on_update: None,
                    }),
                    transitions: vec![Transition {
                        event: "game_ended",
                        target: "load",
                    }],
                },
            ],
        )
    }

    #[test]
    fn test_initial_enter_runs_once() {
        let mut trace = Trace::default();
        let machine = machine(None, &mut trace);
        assert_eq!(machine.current(), "load");
        assert_eq!(trace.calls, vec!["enter load"]);
    }

    #[test]
    fn test_transition_runs_exit_then_enter() {
        let mut trace = Trace::default();
        let mut machine = machine(Some("game_started"), &mut trace);
        machine.update(&mut trace);
        assert_eq!(machine.current(), "game");
        assert_eq!(trace.calls, vec!["enter load", "exit load", "enter game"]);
    }

    #[test]
    fn test_unknown_event_is_a_no_op() {
        let mut trace = Trace::default();
        let mut machine = machine(Some("game_ended"), &mut trace);
        machine.update(&mut trace);
        assert_eq!(machine.current(), "load");
        assert_eq!(trace.calls, vec!["enter load"]);
    }

    #[test]
    fn test_second_raise_in_one_update_is_dropped() {
        struct DoubleRaise;
        impl Phase<Trace, &'static str> for DoubleRaise {
            fn update(&mut self, _context: &mut Trace, events: &mut EventSink<&'static str>) {
                events.raise("game_started");
                events.raise("game_ended");
            }
        }

        let mut trace = Trace::default();
        let mut machine = StateMachine::new(
            &mut trace,
            "load",
            vec![
                PhaseDesc {
                    id: "load",
                    phase: Box::new(DoubleRaise),
                    transitions: vec![
                        Transition {
                            event: "game_started",
                            target: "game",
                        },
                        Transition {
                            event: "game_ended",
                            target: "load",
                        },
                    ],
                },
                PhaseDesc {
                    id: "game",
                    phase: Box::new(Recording {
                        name: "game",
                        raise_on_update: None,
                    }),
                    transitions: vec![],
                },
            ],
        );
        machine.update(&mut trace);
        assert_eq!(machine.current(), "game");
    }
}
