/// Trigger dispatch - one sample trigger per toggled track on each step
use super::Sequencer;

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRequest {
    pub sample_id: String,
    pub volume: f32,
    pub midi_note: Option<u8>,
}

/// Anything that can play a triggered sample. Calls are fire-and-forget.
pub trait TriggerSink {
    fn play(&mut self, request: &TriggerRequest);
}

impl TriggerSink for Vec<TriggerRequest> {
    fn play(&mut self, request: &TriggerRequest) {
        self.push(request.clone());
    }
}

impl<T: TriggerSink + ?Sized> TriggerSink for &mut T {
    fn play(&mut self, request: &TriggerRequest) {
        (**self).play(request);
    }
}

/// Requests for `step`, in track order. Empty for an out-of-range step.
pub fn triggers_for_step(
    sequencer: &Sequencer,
    step: usize,
) -> impl Iterator<Item = TriggerRequest> + '_ {
    sequencer
        .tracks()
        .iter()
        .filter(move |track| track.is_toggled(step))
        .map(|track| TriggerRequest {
            sample_id: track.sample_id().to_string(),
            volume: track.volume(),
            midi_note: track.midi_note(),
        })
}

/// Send every trigger for `step` to `sink`; returns how many were sent.
pub fn dispatch<S: TriggerSink + ?Sized>(
    sequencer: &Sequencer,
    step: usize,
    sink: &mut S,
) -> usize {
    let mut sent = 0;
    for request in triggers_for_step(sequencer, step) {
        log::trace!("step {}: trigger {} @ {:.2}", step, request.sample_id, request.volume);
        sink.play(&request);
        sent += 1;
    }
    sent
}
