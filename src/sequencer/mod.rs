/// Core sequencer logic - track grids, volumes and tempo
/// The clock, dispatcher and playback controller build on this state
pub mod clock;
pub mod command;
pub mod dispatch;
pub mod playback;

use crate::config::SequencerConfig;
use crate::error::SequencerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub index: usize,
    pub toggled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    sample_id: String,
    steps: Vec<Step>,
    volume: f32,
    midi_note: Option<u8>,
}

impl Track {
    pub fn new(sample_id: impl Into<String>, total_steps: usize) -> Self {
        Self {
            sample_id: sample_id.into(),
            steps: (0..total_steps)
                .map(|index| Step { index, toggled: false })
                .collect(),
            volume: 0.5,
            midi_note: None,
        }
    }

    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn midi_note(&self) -> Option<u8> {
        self.midi_note
    }

    pub fn is_toggled(&self, step: usize) -> bool {
        self.steps.get(step).is_some_and(|s| s.toggled)
    }
}

/// The shared sequencer state: a fixed set of equally long tracks plus tempo.
#[derive(Debug, Clone)]
pub struct Sequencer {
    tracks: Vec<Track>,
    total_steps: usize,
    bpm: f32,
    steps_per_beat: u32,
}

impl Sequencer {
    /// Build from a validated config. Invalid volumes are clamped.
    pub fn from_config(config: &SequencerConfig) -> Result<Self, SequencerError> {
        config
            .validate()
            .map_err(|e| SequencerError::InvalidArgument(e.to_string()))?;

        let tracks = config
            .tracks
            .iter()
            .map(|tc| {
                let mut track = Track::new(tc.sample_id.clone(), config.total_steps);
                track.volume = clamp_volume(tc.volume).unwrap_or(0.5);
                track.midi_note = tc.midi_note;
                track
            })
            .collect();

        Ok(Self {
            tracks,
            total_steps: config.total_steps,
            bpm: config.bpm,
            steps_per_beat: config.steps_per_beat,
        })
    }

    pub fn new<S: Into<String>>(
        sample_ids: impl IntoIterator<Item = S>,
        total_steps: usize,
        bpm: f32,
    ) -> Result<Self, SequencerError> {
        if total_steps == 0 {
            return Err(SequencerError::InvalidArgument(
                "total_steps must be > 0".into(),
            ));
        }
        validate_bpm(bpm)?;

        Ok(Self {
            tracks: sample_ids
                .into_iter()
                .map(|id| Track::new(id, total_steps))
                .collect(),
            total_steps,
            bpm,
            steps_per_beat: 1,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track: usize) -> Option<&Track> {
        self.tracks.get(track)
    }

    pub fn track_index(&self, sample_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.sample_id == sample_id)
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat
    }

    pub fn is_toggled(&self, track: usize, step: usize) -> bool {
        self.tracks.get(track).is_some_and(|t| t.is_toggled(step))
    }

    pub fn toggle_step(&mut self, track: usize, step: usize) -> Result<bool, SequencerError> {
        let cell = self.step_mut(track, step)?;
        cell.toggled = !cell.toggled;
        Ok(cell.toggled)
    }

    /// Store a clamped volume and return it. Only NaN is rejected.
    pub fn set_volume(&mut self, track: usize, value: f32) -> Result<f32, SequencerError> {
        let tracks = self.tracks.len();
        let volume = clamp_volume(value)?;
        let t = self
            .tracks
            .get_mut(track)
            .ok_or(SequencerError::TrackOutOfRange { track, tracks })?;
        t.volume = volume;
        Ok(volume)
    }

    pub fn set_tempo(&mut self, bpm: f32) -> Result<(), SequencerError> {
        validate_bpm(bpm)?;
        if bpm != self.bpm {
            log::debug!("tempo {} -> {} bpm", self.bpm, bpm);
        }
        self.bpm = bpm;
        Ok(())
    }

    pub fn set_steps_per_beat(&mut self, steps_per_beat: u32) -> Result<(), SequencerError> {
        if steps_per_beat == 0 {
            return Err(SequencerError::InvalidArgument(
                "steps_per_beat must be > 0".into(),
            ));
        }
        self.steps_per_beat = steps_per_beat;
        Ok(())
    }

    pub fn clear(&mut self) {
        for step in self.tracks.iter_mut().flat_map(|t| t.steps.iter_mut()) {
            step.toggled = false;
        }
    }

    pub fn fill(&mut self) {
        for step in self.tracks.iter_mut().flat_map(|t| t.steps.iter_mut()) {
            step.toggled = true;
        }
    }

    /// Step duration in milliseconds at the current tempo
    pub fn ms_per_step(&self) -> f64 {
        60_000.0 / self.bpm as f64 / self.steps_per_beat as f64
    }

    pub fn cycle_ms(&self) -> f64 {
        self.ms_per_step() * self.total_steps as f64
    }

    fn step_mut(&mut self, track: usize, step: usize) -> Result<&mut Step, SequencerError> {
        let tracks = self.tracks.len();
        let steps = self.total_steps;
        self.tracks
            .get_mut(track)
            .ok_or(SequencerError::TrackOutOfRange { track, tracks })?
            .steps
            .get_mut(step)
            .ok_or(SequencerError::StepOutOfRange { step, steps })
    }
}

fn validate_bpm(bpm: f32) -> Result<(), SequencerError> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(SequencerError::InvalidArgument(format!(
            "bpm must be > 0, got {bpm}"
        )));
    }
    Ok(())
}

fn clamp_volume(value: f32) -> Result<f32, SequencerError> {
    if value.is_nan() {
        return Err(SequencerError::InvalidArgument("volume is NaN".into()));
    }
    Ok(value.clamp(0.0, 1.0))
}
