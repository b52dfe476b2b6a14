/// Audio output using cpal
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

mod sample;
mod voice;

pub use sample::{load_wav, resample_linear, synthesize, SampleBank};
pub use voice::{Mixer, MAX_VOICES};

use crate::config::SequencerConfig;
use crate::sequencer::dispatch::{TriggerRequest, TriggerSink};

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format {0:?} (only f32 output is supported)")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to read sample: {0}")]
    Wav(#[from] hound::Error),
}

pub struct AudioOutput {
    _stream: Option<cpal::Stream>,
    mixer: Arc<Mutex<Mixer>>,
    bank: SampleBank,
}

impl AudioOutput {
    /// Open the default output device and load the kit described by `config`.
    pub fn new(config: &SequencerConfig) -> Result<Self, AudioError> {
        let mixer = Arc::new(Mutex::new(Mixer::new()));
        let (stream, sample_rate) = Self::setup_audio_stream(Arc::clone(&mixer))?;
        let bank = SampleBank::from_tracks(&config.tracks, sample_rate);
        log::info!(
            "audio output running at {} Hz with {} samples",
            sample_rate,
            bank.len()
        );

        Ok(Self {
            _stream: Some(stream),
            mixer,
            bank,
        })
    }

    /// An output that accepts triggers and plays nothing.
    pub fn silent() -> Self {
        Self {
            _stream: None,
            mixer: Arc::new(Mutex::new(Mixer::new())),
            bank: SampleBank::default(),
        }
    }

    fn setup_audio_stream(mixer: Arc<Mutex<Mixer>>) -> Result<(cpal::Stream, u32), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device.default_output_config()?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match mixer.lock() {
                    Ok(mut mixer) => mixer.render(data, channels),
                    Err(_) => data.fill(0.0),
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )?,
            other => return Err(AudioError::UnsupportedFormat(other)),
        };

        stream.play()?;
        Ok((stream, sample_rate))
    }

    pub fn is_active(&self) -> bool {
        self._stream.is_some()
    }

    pub fn bank(&self) -> &SampleBank {
        &self.bank
    }

    /// Fire-and-forget playback of a loaded sample.
    pub fn play(&mut self, sample_id: &str, volume: f32) {
        let Some(data) = self.bank.get(sample_id) else {
            log::debug!("no sample loaded for {}", sample_id);
            return;
        };
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.trigger(data, volume.clamp(0.0, 1.0));
        }
    }

    /// Cut every sounding voice.
    pub fn stop_all(&mut self) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.silence();
        }
    }
}

impl TriggerSink for AudioOutput {
    fn play(&mut self, request: &TriggerRequest) {
        AudioOutput::play(self, &request.sample_id, request.volume);
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new(&SequencerConfig::default()).unwrap_or_else(|e| {
            log::warn!("audio disabled: {}", e);
            Self::silent()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_output_accepts_triggers() {
        let mut out = AudioOutput::silent();
        assert!(!out.is_active());
        out.play("kick", 0.5);
        TriggerSink::play(
            &mut out,
            &TriggerRequest {
                sample_id: "snare".into(),
                volume: 1.0,
                midi_note: None,
            },
        );
        out.stop_all();
        assert!(out.bank().is_empty());
    }

    #[test]
    fn test_play_queues_voice_for_known_sample() {
        let mut out = AudioOutput::silent();
        out.bank.insert("kick", vec![0.5; 64]);
        out.play("kick", 2.0);
        out.play("missing", 1.0);
        assert_eq!(out.mixer.lock().unwrap().active_voices(), 1);
        out.stop_all();
        assert_eq!(out.mixer.lock().unwrap().active_voices(), 0);
    }
}
