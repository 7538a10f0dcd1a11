//! Audio sink capability interface
//!
//! The simulation triggers cues by symbolic id; decoding and playback live
//! with the platform layer. Looping cues carry an optional loop window in
//! seconds within the source buffer (the beam hum loops its sustained
//! middle section).

/// Loop window (start, end) in seconds within the source buffer
pub type LoopWindow = (f32, f32);

pub trait AudioSink {
    /// Start a looping cue; restarting an already-playing loop restarts it
    fn play_loop(&mut self, id: &str, volume: f32, window: Option<LoopWindow>);
    fn stop(&mut self, id: &str);
    fn play_once(&mut self, id: &str, volume: f32);
}

/// Discards every cue; used by tests and headless runs
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_loop(&mut self, id: &str, volume: f32, _window: Option<LoopWindow>) {
        log::trace!("audio loop {id} at {volume}");
    }

    fn stop(&mut self, id: &str) {
        log::trace!("audio stop {id}");
    }

    fn play_once(&mut self, id: &str, volume: f32) {
        log::trace!("audio cue {id} at {volume}");
    }
}

/// Records cues for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub calls: Vec<String>,
}

#[cfg(test)]
impl AudioSink for RecordingAudio {
    fn play_loop(&mut self, id: &str, _volume: f32, _window: Option<LoopWindow>) {
        self.calls.push(format!("loop {id}"));
    }

    fn stop(&mut self, id: &str) {
        self.calls.push(format!("stop {id}"));
    }

    fn play_once(&mut self, id: &str, _volume: f32) {
        self.calls.push(format!("once {id}"));
    }
}
