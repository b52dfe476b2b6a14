/// BEATGRID - A step sequencer drum machine library
///
/// This library provides the core components for building a drum machine:
/// - Per-track step grids with volume
/// - A frame-driven clock that turns elapsed time into step events
/// - Trigger dispatch to audio (sample playback) and MIDI outputs
/// - A playback controller for start/stop/interrupt lifecycle

pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types
pub use audio::{AudioError, AudioOutput, SampleBank};
pub use config::{MissedStepPolicy, SequencerConfig, TrackConfig};
pub use error::SequencerError;
pub use midi::{midi_note_name, MidiOutputDevice};
pub use sequencer::clock::{Clock, ClockState};
pub use sequencer::command::Command;
pub use sequencer::dispatch::{TriggerRequest, TriggerSink};
pub use sequencer::playback::{
    FrameTimer, Interruption, PlaybackController, PlaybackEvent, PlaybackView,
};
pub use sequencer::{Sequencer, Step, Track};
