/// Sequencer configuration - kit, grid size and timing policy
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What the clock does when a single frame spans more than one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissedStepPolicy {
    /// Fire at most one step per frame; later boundaries in the same frame are lost.
    #[default]
    Drop,
    /// Fire every crossed step, carrying the leftover time forward.
    CatchUp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub sample_id: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// WAV file for the audio output. Missing files fall back to a synthesized hit.
    #[serde(default)]
    pub sample_path: Option<PathBuf>,
    #[serde(default)]
    pub midi_note: Option<u8>,
}

impl TrackConfig {
    pub fn new(sample_id: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            volume: default_volume(),
            sample_path: None,
            midi_note: None,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_sample_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sample_path = Some(path.into());
        self
    }

    pub fn with_midi_note(mut self, note: u8) -> Self {
        self.midi_note = Some(note);
        self
    }
}

fn default_volume() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub total_steps: usize,
    pub bpm: f32,
    /// 1 means one step per beat; 4 gives sixteenth-note steps.
    pub steps_per_beat: u32,
    pub missed_steps: MissedStepPolicy,
    pub carry_remainder: bool,
    pub tracks: Vec<TrackConfig>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            total_steps: 8,
            bpm: 200.0,
            steps_per_beat: 1,
            missed_steps: MissedStepPolicy::Drop,
            carry_remainder: false,
            tracks: vec![
                TrackConfig::new("kick")
                    .with_sample_path("samples/kick.wav")
                    .with_midi_note(36),
                TrackConfig::new("hat")
                    .with_sample_path("samples/hat.wav")
                    .with_midi_note(42),
                TrackConfig::new("snare")
                    .with_sample_path("samples/snare.wav")
                    .with_midi_note(38),
                TrackConfig::new("shake")
                    .with_sample_path("samples/shake.wav")
                    .with_midi_note(70),
            ],
        }
    }
}

impl SequencerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&data)?;
        log::info!(
            "loaded config from {}: {} tracks, {} steps at {} bpm",
            path.display(),
            config.tracks.len(),
            config.total_steps,
            config.bpm
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_steps == 0 {
            return Err(ConfigError::Invalid("total_steps must be > 0".into()));
        }
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(ConfigError::Invalid(format!("bpm must be > 0, got {}", self.bpm)));
        }
        if self.steps_per_beat == 0 {
            return Err(ConfigError::Invalid("steps_per_beat must be > 0".into()));
        }
        if self.tracks.is_empty() {
            return Err(ConfigError::Invalid("at least one track is required".into()));
        }
        for (i, track) in self.tracks.iter().enumerate() {
            if track.sample_id.is_empty() {
                return Err(ConfigError::Invalid(format!("track {i} has an empty sample_id")));
            }
            if self.tracks[..i].iter().any(|t| t.sample_id == track.sample_id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate sample_id {:?}",
                    track.sample_id
                )));
            }
            if track.midi_note.is_some_and(|n| n > 127) {
                return Err(ConfigError::Invalid(format!(
                    "track {:?} midi_note must be 0-127",
                    track.sample_id
                )));
            }
        }
        Ok(())
    }

    /// Catch-up without carrying the remainder would never converge.
    pub fn carries_remainder(&self) -> bool {
        self.carry_remainder || self.missed_steps == MissedStepPolicy::CatchUp
    }
}
