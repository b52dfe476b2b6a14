/// Commands from the input layer (UI -> sequencer)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    ToggleStep { track: usize, step: usize },
    SetVolume { track: usize, volume: f32 },
    SetTempo(f32),
    TogglePlayback,
    Start,
    Stop,
    Clear,
    Fill,
}
