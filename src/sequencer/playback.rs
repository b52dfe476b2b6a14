/// Playback controller - coordinates clock, state and triggers
use std::time::Instant;

use super::clock::Clock;
use super::command::Command;
use super::dispatch::{self, TriggerRequest, TriggerSink};
use super::Sequencer;
use crate::config::SequencerConfig;
use crate::error::SequencerError;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StepAdvanced(usize),
    Trigger(TriggerRequest),
}

/// Host signals that must silence playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    FocusLost,
    Minimized,
}

/// What the renderer needs after each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackView {
    pub playing: bool,
    pub current_step: usize,
    pub playhead_fraction: f64,
    pub bpm: f32,
}

pub struct PlaybackController {
    sequencer: Sequencer,
    clock: Clock,
}

impl PlaybackController {
    pub fn new(sequencer: Sequencer) -> Self {
        let clock = Clock::new(sequencer.total_steps());
        Self { sequencer, clock }
    }

    pub fn from_config(config: &SequencerConfig) -> Result<Self, SequencerError> {
        let sequencer = Sequencer::from_config(config)?;
        let clock = Clock::new(sequencer.total_steps())
            .with_policy(config.missed_steps, config.carry_remainder);
        Ok(Self { sequencer, clock })
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_running()
    }

    pub fn current_step(&self) -> usize {
        self.clock.current_step()
    }

    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }
        self.clock.start(self.sequencer.ms_per_step());
        log::info!(
            "playback started at step {} ({} bpm)",
            self.clock.current_step(),
            self.sequencer.bpm()
        );
    }

    pub fn stop(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.clock.stop();
        log::info!("playback stopped at step {}", self.clock.current_step());
    }

    pub fn toggle_playback(&mut self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Stop on a host interruption. Pattern, volumes and position survive.
    pub fn interrupt(&mut self, reason: Interruption) {
        if self.is_playing() {
            log::info!("playback interrupted: {:?}", reason);
        }
        self.stop();
    }

    /// Rewind to step 0 without changing play state.
    pub fn rewind(&mut self) {
        self.clock.reset(self.sequencer.ms_per_step());
    }

    /// Advance one host frame and collect what happened.
    pub fn advance(&mut self, delta_ms: f64) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        for step in self.clock.advance(delta_ms, self.sequencer.ms_per_step()) {
            events.push(PlaybackEvent::StepAdvanced(step));
            events.extend(
                dispatch::triggers_for_step(&self.sequencer, step).map(PlaybackEvent::Trigger),
            );
        }
        events
    }

    /// Advance one host frame, sending triggers straight to `sink`.
    /// Returns the last step entered, if any.
    pub fn advance_into<S: TriggerSink + ?Sized>(
        &mut self,
        delta_ms: f64,
        sink: &mut S,
    ) -> Option<usize> {
        let steps = self.clock.advance(delta_ms, self.sequencer.ms_per_step());
        for &step in &steps {
            dispatch::dispatch(&self.sequencer, step, sink);
        }
        steps.last().copied()
    }

    pub fn handle(&mut self, command: Command) -> Result<(), SequencerError> {
        let result = match command {
            Command::ToggleStep { track, step } => {
                self.sequencer.toggle_step(track, step).map(|_| ())
            }
            Command::SetVolume { track, volume } => {
                self.sequencer.set_volume(track, volume).map(|_| ())
            }
            Command::SetTempo(bpm) => self.sequencer.set_tempo(bpm),
            Command::TogglePlayback => {
                self.toggle_playback();
                Ok(())
            }
            Command::Start => {
                self.start();
                Ok(())
            }
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Clear => {
                self.sequencer.clear();
                Ok(())
            }
            Command::Fill => {
                self.sequencer.fill();
                Ok(())
            }
        };
        if let Err(e) = &result {
            log::warn!("rejected {:?}: {}", command, e);
        }
        result
    }

    pub fn view(&self) -> PlaybackView {
        PlaybackView {
            playing: self.is_playing(),
            current_step: self.clock.current_step(),
            playhead_fraction: self.clock.playhead_fraction(self.sequencer.ms_per_step()),
            bpm: self.sequencer.bpm(),
        }
    }
}

/// Measures the time between host frames.
#[derive(Debug, Default)]
pub struct FrameTimer {
    last_frame: Option<Instant>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds since the previous tick; 0 on the first tick after a reset.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let delta = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        delta
    }

    /// Forget the last frame so a paused interval is never fed to the clock.
    pub fn reset(&mut self) {
        self.last_frame = None;
    }
}
