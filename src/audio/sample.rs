/// Sample bank - decoded one-shots keyed by sample id
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::AudioError;
use crate::config::TrackConfig;

#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    samples: HashMap<String, Arc<[f32]>>,
    sample_rate: u32,
}

impl SampleBank {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: HashMap::new(),
            sample_rate,
        }
    }

    /// Load every track's WAV, synthesizing a stand-in for any that can't be read.
    pub fn from_tracks(tracks: &[TrackConfig], sample_rate: u32) -> Self {
        let mut bank = Self::new(sample_rate);
        for track in tracks {
            let loaded = match &track.sample_path {
                Some(path) => match load_wav(path, sample_rate) {
                    Ok(data) => {
                        log::info!("loaded {} from {}", track.sample_id, path.display());
                        Some(data)
                    }
                    Err(e) => {
                        log::warn!("{}: {}; using synthesized sound", track.sample_id, e);
                        None
                    }
                },
                None => None,
            };
            let data = loaded.unwrap_or_else(|| synthesize(&track.sample_id, sample_rate));
            bank.insert(track.sample_id.clone(), data);
        }
        bank
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn insert(&mut self, sample_id: impl Into<String>, data: Vec<f32>) {
        self.samples.insert(sample_id.into(), data.into());
    }

    pub fn get(&self, sample_id: &str) -> Option<Arc<[f32]>> {
        self.samples.get(sample_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode a WAV to mono f32 at `target_rate`.
pub fn load_wav(path: &Path, target_rate: u32) -> Result<Vec<f32>, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|x| x as f32 / max))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono: Vec<f32> = samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(resample_linear(&mono, spec.sample_rate, target_rate))
}

pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 || input.is_empty() {
        return input.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (input.len() as f64 * ratio).ceil() as usize;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 / ratio;
            let idx = pos.floor() as usize;
            if idx >= last {
                return input[last];
            }
            let frac = (pos - idx as f64) as f32;
            input[idx] + (input[idx + 1] - input[idx]) * frac
        })
        .collect()
}

/// A short percussive hit shaped by the sample id.
pub fn synthesize(sample_id: &str, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate.max(1) as f32;
    let mut noise = Noise::new(sample_id);

    match sample_id {
        "kick" => render(0.35, rate, |t, _| {
            // integrated sweep from 150Hz down towards 50Hz
            let sweep = 100.0 * (1.0 - (-t * 30.0).exp()) / 30.0;
            let phase = std::f32::consts::TAU * (50.0 * t + sweep);
            phase.sin() * (-t * 8.0).exp()
        }),
        "snare" => render(0.2, rate, |t, _| {
            let tone = (std::f32::consts::TAU * 190.0 * t).sin() * (-t * 30.0).exp();
            let hiss = noise.next() * (-t * 18.0).exp();
            0.4 * tone + 0.6 * hiss
        }),
        "hat" | "hihat" => render(0.06, rate, |t, _| noise.next() * (-t * 70.0).exp() * 0.6),
        "shake" | "shaker" => render(0.12, rate, |t, len| {
            let swell = (t / len * std::f32::consts::PI).sin();
            noise.next() * swell * 0.4
        }),
        other => {
            let semis = (other.bytes().map(u32::from).sum::<u32>() % 24) as f32;
            let freq = 220.0 * 2.0_f32.powf(semis / 12.0);
            render(0.15, rate, |t, _| {
                (std::f32::consts::TAU * freq * t).sin() * (-t * 20.0).exp() * 0.5
            })
        }
    }
}

fn render(seconds: f32, rate: f32, mut f: impl FnMut(f32, f32) -> f32) -> Vec<f32> {
    let len = (seconds * rate) as usize;
    (0..len).map(|i| f(i as f32 / rate, seconds)).collect()
}

/// xorshift noise, seeded per sample so synthesized kits are reproducible
struct Noise(u32);

impl Noise {
    fn new(seed: &str) -> Self {
        let seed = seed
            .bytes()
            .fold(0x9E37_79B9u32, |acc, b| acc.rotate_left(5) ^ u32::from(b));
        Self(seed.max(1))
    }

    fn next(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_kit() {
        for id in ["kick", "hat", "snare", "shake", "cowbell"] {
            let data = synthesize(id, 44_100);
            assert!(!data.is_empty(), "{id}");
            assert!(data.iter().all(|s| s.is_finite() && s.abs() <= 1.0), "{id}");
            assert!(data.iter().any(|s| s.abs() > 0.01), "{id} is silent");
        }
        assert_eq!(synthesize("hat", 44_100), synthesize("hat", 44_100));
    }

    #[test]
    fn test_bank_falls_back_when_file_missing() {
        let tracks = vec![
            TrackConfig::new("kick").with_sample_path("/nonexistent/kick.wav"),
            TrackConfig::new("clap"),
        ];
        let bank = SampleBank::from_tracks(&tracks, 48_000);
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.sample_rate(), 48_000);
        assert!(bank.get("kick").is_some());
        assert!(bank.get("clap").is_some());
        assert!(bank.get("snare").is_none());
    }

    #[test]
    fn test_resample_linear() {
        let input = [0.0, 1.0, 0.0, -1.0];
        assert_eq!(resample_linear(&input, 44_100, 44_100), input.to_vec());

        let up = resample_linear(&input, 1, 2);
        assert_eq!(up.len(), 8);
        assert_eq!(up[0], 0.0);
        assert_eq!(up[1], 0.5);
        assert_eq!(up[2], 1.0);

        let down = resample_linear(&input, 2, 1);
        assert_eq!(down, vec![0.0, 0.0]);
    }

    #[test]
    fn test_load_wav_folds_to_mono() {
        let path = std::env::temp_dir().join(format!("beatgrid-test-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        {
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..4 {
                writer.write_sample(16_384i16).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let data = load_wav(&path, 8_000).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(data.len(), 4);
        assert!(data.iter().all(|s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_load_wav_missing_file() {
        assert!(load_wav(Path::new("/nonexistent/x.wav"), 44_100).is_err());
    }
}
