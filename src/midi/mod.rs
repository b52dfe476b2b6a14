/// MIDI output using midir
use midir::{MidiOutput, MidiOutputConnection};

use crate::sequencer::dispatch::{TriggerRequest, TriggerSink};

/// General MIDI percussion lives on channel 10.
const DRUM_CHANNEL: u8 = 9;
const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("failed to create MIDI output: {0}")]
    Init(#[from] midir::InitError),

    #[error("invalid port index {0}")]
    InvalidPort(usize),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("failed to send: {0}")]
    Send(#[from] midir::SendError),
}

pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
    pending_off: Vec<u8>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self {
            connection: None,
            pending_off: Vec::new(),
        }
    }

    pub fn available_ports() -> Vec<String> {
        match MidiOutput::new("BEATGRID MIDI Output") {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(e) => {
                log::warn!("MIDI unavailable: {}", e);
                vec![]
            }
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<(), MidiError> {
        let midi_out = MidiOutput::new("BEATGRID MIDI Output")?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or(MidiError::InvalidPort(port_index))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "beatgrid")
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        log::info!("connected MIDI output {}", name);
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn send_note_on(&mut self, note: u8, velocity: u8) -> Result<(), MidiError> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&[NOTE_ON | DRUM_CHANNEL, note & 0x7f, velocity & 0x7f])?;
        }
        Ok(())
    }

    pub fn send_note_off(&mut self, note: u8) -> Result<(), MidiError> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&[NOTE_OFF | DRUM_CHANNEL, note & 0x7f, 0])?;
        }
        Ok(())
    }

    /// Notes still waiting for their note-off.
    pub fn pending_notes(&self) -> &[u8] {
        &self.pending_off
    }

    /// Send note-offs for everything triggered since the last call.
    /// Hosts call this once per frame and on stop.
    pub fn release_notes(&mut self) {
        for note in std::mem::take(&mut self.pending_off) {
            self.close_note(note);
        }
    }

    fn close_note(&mut self, note: u8) {
        if let Err(e) = self.send_note_off(note) {
            log::warn!("note off {} failed: {}", midi_note_name(note), e);
        }
    }

    pub fn disconnect(&mut self) {
        self.release_notes();
        self.connection = None;
    }
}

impl TriggerSink for MidiOutputDevice {
    fn play(&mut self, request: &TriggerRequest) {
        let Some(note) = request.midi_note else {
            return;
        };
        let velocity = volume_to_velocity(request.volume);
        if velocity == 0 {
            return;
        }
        if self.pending_off.contains(&note) {
            // retrigger: close the previous hit first
            self.close_note(note);
        } else {
            self.pending_off.push(note);
        }
        if let Err(e) = self.send_note_on(note, velocity) {
            log::warn!("note on {} failed: {}", midi_note_name(note), e);
        }
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

pub fn volume_to_velocity(volume: f32) -> u8 {
    (volume.clamp(0.0, 1.0) * 127.0).round() as u8
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}
