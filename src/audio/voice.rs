/// Voice mixing for the audio callback
use std::sync::Arc;

/// Hard cap so a dense pattern can't grow the voice list without bound.
pub const MAX_VOICES: usize = 32;

#[derive(Debug, Clone)]
struct Voice {
    data: Arc<[f32]>,
    position: usize,
    gain: f32,
}

#[derive(Debug)]
pub struct Mixer {
    voices: Vec<Voice>,
    master_gain: f32,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            master_gain: 0.8,
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Start a one-shot. The oldest voice is stolen when the pool is full.
    pub fn trigger(&mut self, data: Arc<[f32]>, gain: f32) {
        if data.is_empty() || gain <= 0.0 {
            return;
        }
        if self.voices.len() >= MAX_VOICES {
            self.voices.remove(0);
        }
        self.voices.push(Voice {
            data,
            position: 0,
            gain,
        });
    }

    pub fn silence(&mut self) {
        self.voices.clear();
    }

    /// Mix all voices into an interleaved buffer, writing the same mono signal to every channel.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let mut sample = 0.0f32;
            for voice in &mut self.voices {
                if let Some(&s) = voice.data.get(voice.position) {
                    sample += s * voice.gain;
                    voice.position += 1;
                }
            }
            let sample = (sample * self.master_gain).clamp(-1.0, 1.0);
            for out_sample in frame.iter_mut() {
                *out_sample = sample;
            }
        }
        self.voices.retain(|v| v.position < v.data.len());
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_shot(len: usize, value: f32) -> Arc<[f32]> {
        vec![value; len].into()
    }

    #[test]
    fn test_render_mixes_and_retires_voices() {
        let mut mixer = Mixer::new();
        mixer.trigger(one_shot(2, 0.5), 1.0);
        mixer.trigger(one_shot(4, 0.25), 0.5);
        assert_eq!(mixer.active_voices(), 2);

        let mut out = [0.0f32; 8];
        mixer.render(&mut out, 2);
        let expected_first = (0.5 + 0.125) * 0.8;
        assert!((out[0] - expected_first).abs() < 1e-6);
        assert_eq!(out[0], out[1]);
        assert!((out[6] - 0.125 * 0.8).abs() < 1e-6);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_silent_triggers_are_skipped() {
        let mut mixer = Mixer::new();
        mixer.trigger(one_shot(4, 1.0), 0.0);
        mixer.trigger(one_shot(0, 1.0), 1.0);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_voice_stealing() {
        let mut mixer = Mixer::new();
        for _ in 0..MAX_VOICES + 5 {
            mixer.trigger(one_shot(100, 0.1), 1.0);
        }
        assert_eq!(mixer.active_voices(), MAX_VOICES);
        mixer.silence();
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_output_is_clipped() {
        let mut mixer = Mixer::new();
        for _ in 0..8 {
            mixer.trigger(one_shot(1, 1.0), 1.0);
        }
        let mut out = [0.0f32; 1];
        mixer.render(&mut out, 1);
        assert_eq!(out[0], 1.0);
    }
}
