/// Step clock - turns frame deltas into tempo-locked step events
use crate::config::MissedStepPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    Running,
}

/// Largest playhead fraction the clock reports; the playhead never touches 1.0.
const PLAYHEAD_MAX: f64 = 1.0 - f64::EPSILON;

/// Remaining time at or below this counts as a crossed boundary. Frame deltas
/// that sum to a whole step can leave a rounding residue of ~1e-13ms.
const STEP_EPSILON_MS: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Clock {
    total_steps: usize,
    current_step: usize,
    ms_until_next_step: f64,
    elapsed_ms_in_cycle: f64,
    state: ClockState,
    missed_steps: MissedStepPolicy,
    carry_remainder: bool,
}

impl Clock {
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps: total_steps.max(1),
            current_step: 0,
            ms_until_next_step: 0.0,
            elapsed_ms_in_cycle: 0.0,
            state: ClockState::Stopped,
            missed_steps: MissedStepPolicy::Drop,
            carry_remainder: false,
        }
    }

    pub fn with_policy(mut self, missed_steps: MissedStepPolicy, carry_remainder: bool) -> Self {
        self.missed_steps = missed_steps;
        self.carry_remainder = carry_remainder || missed_steps == MissedStepPolicy::CatchUp;
        self
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn ms_until_next_step(&self) -> f64 {
        self.ms_until_next_step
    }

    pub fn elapsed_ms_in_cycle(&self) -> f64 {
        self.elapsed_ms_in_cycle
    }

    pub fn missed_steps(&self) -> MissedStepPolicy {
        self.missed_steps
    }

    /// Stopped -> Running. The step position is kept; the phase restarts at a full step.
    pub fn start(&mut self, ms_per_step: f64) {
        if self.is_running() {
            return;
        }
        self.ms_until_next_step = sanitize_step(ms_per_step);
        self.state = ClockState::Running;
    }

    /// Running -> Stopped, freezing step and phase. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
    }

    /// Return to step 0 with an empty cycle without touching the run state.
    pub fn reset(&mut self, ms_per_step: f64) {
        self.current_step = 0;
        self.elapsed_ms_in_cycle = 0.0;
        self.ms_until_next_step = sanitize_step(ms_per_step);
    }

    /// Advance by one frame. `ms_per_step` is recomputed by the caller from the
    /// live tempo on every call. Returns the steps entered during this frame:
    /// at most one under `Drop`, up to `total_steps` under `CatchUp`.
    pub fn advance(&mut self, delta_ms: f64, ms_per_step: f64) -> Vec<usize> {
        let mut entered = Vec::new();
        if !self.is_running() {
            return entered;
        }

        let ms_per_step = sanitize_step(ms_per_step);
        let delta_ms = if delta_ms.is_finite() && delta_ms > 0.0 {
            delta_ms
        } else {
            0.0
        };

        // a tempo increase must not leave us waiting out the old, longer step
        if self.ms_until_next_step > ms_per_step {
            self.ms_until_next_step = ms_per_step;
        }

        self.ms_until_next_step -= delta_ms;
        self.elapsed_ms_in_cycle += delta_ms;

        while self.ms_until_next_step <= STEP_EPSILON_MS {
            let overshoot = (-self.ms_until_next_step).max(0.0);
            let carried = match (self.carry_remainder, self.missed_steps) {
                (false, _) => 0.0,
                (true, MissedStepPolicy::CatchUp) => overshoot,
                (true, MissedStepPolicy::Drop) => overshoot % ms_per_step,
            };
            self.ms_until_next_step = ms_per_step - carried;

            if self.current_step + 1 >= self.total_steps {
                self.current_step = 0;
                self.elapsed_ms_in_cycle = carried;
            } else {
                self.current_step += 1;
            }
            entered.push(self.current_step);

            if self.missed_steps == MissedStepPolicy::Drop {
                break;
            }
            if entered.len() >= self.total_steps && self.ms_until_next_step <= STEP_EPSILON_MS {
                // stalled for more than a whole cycle; resync rather than replay it
                log::warn!(
                    "clock stalled for {:.1}ms, dropping remaining steps",
                    delta_ms
                );
                self.ms_until_next_step = ms_per_step;
                self.elapsed_ms_in_cycle = self.current_step as f64 * ms_per_step;
                break;
            }
        }

        if self.ms_until_next_step <= STEP_EPSILON_MS {
            self.ms_until_next_step = ms_per_step;
        }

        entered
    }

    /// Fractional progress through the cycle, in [0, 1).
    pub fn playhead_fraction(&self, ms_per_step: f64) -> f64 {
        let cycle_ms = sanitize_step(ms_per_step) * self.total_steps as f64;
        (self.elapsed_ms_in_cycle / cycle_ms).clamp(0.0, PLAYHEAD_MAX)
    }
}

fn sanitize_step(ms_per_step: f64) -> f64 {
    if ms_per_step.is_finite() && ms_per_step > 0.0 {
        ms_per_step
    } else {
        f64::MIN_POSITIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f64 = 200.0;

    fn running(total_steps: usize) -> Clock {
        let mut clock = Clock::new(total_steps);
        clock.start(STEP);
        clock
    }

    #[test]
    fn test_initial_state() {
        let clock = Clock::new(8);
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.current_step(), 0);
        assert_eq!(clock.playhead_fraction(STEP), 0.0);
    }

    #[test]
    fn test_stopped_clock_ignores_advance() {
        let mut clock = Clock::new(8);
        assert!(clock.advance(1000.0, STEP).is_empty());
        assert_eq!(clock.current_step(), 0);
        assert_eq!(clock.elapsed_ms_in_cycle(), 0.0);
    }

    #[test]
    fn test_single_step_boundary() {
        let mut clock = running(8);
        assert!(clock.advance(150.0, STEP).is_empty());
        assert_eq!(clock.ms_until_next_step(), 50.0);
        assert_eq!(clock.advance(50.0, STEP), vec![1]);
        assert_eq!(clock.current_step(), 1);
        assert_eq!(clock.ms_until_next_step(), STEP);
    }

    #[test]
    fn test_cycle_wraps_and_resets_elapsed() {
        let mut clock = running(4);
        let mut events = Vec::new();
        for _ in 0..4 {
            events.extend(clock.advance(STEP, STEP));
        }
        assert_eq!(events, vec![1, 2, 3, 0]);
        assert_eq!(clock.current_step(), 0);
        assert_eq!(clock.elapsed_ms_in_cycle(), 0.0);
    }

    #[test]
    fn test_drop_policy_fires_once_per_call() {
        let mut clock = running(8);
        assert_eq!(clock.advance(1000.0, STEP), vec![1]);
        assert_eq!(clock.ms_until_next_step(), STEP);
    }

    #[test]
    fn test_catch_up_fires_every_crossed_step() {
        let mut clock = Clock::new(8).with_policy(MissedStepPolicy::CatchUp, false);
        clock.start(STEP);
        assert_eq!(clock.advance(650.0, STEP), vec![1, 2, 3]);
        assert_eq!(clock.ms_until_next_step(), 150.0);
    }

    #[test]
    fn test_catch_up_is_bounded_to_one_cycle() {
        let mut clock = Clock::new(4).with_policy(MissedStepPolicy::CatchUp, true);
        clock.start(STEP);
        let events = clock.advance(10_000.0, STEP);
        assert_eq!(events, vec![1, 2, 3, 0]);
        assert_eq!(clock.ms_until_next_step(), STEP);
    }

    #[test]
    fn test_carry_remainder_keeps_phase() {
        let mut clock = Clock::new(8).with_policy(MissedStepPolicy::Drop, true);
        clock.start(STEP);
        assert_eq!(clock.advance(230.0, STEP), vec![1]);
        assert_eq!(clock.ms_until_next_step(), 170.0);

        // overshoot of more than a step drops the beat but stays on the grid
        assert_eq!(clock.advance(420.0, STEP), vec![2]);
        assert_eq!(clock.ms_until_next_step(), 150.0);
    }

    #[test]
    fn test_stop_start_resumes_from_same_step() {
        let mut clock = running(8);
        clock.advance(STEP, STEP);
        clock.advance(STEP, STEP);
        clock.advance(120.0, STEP);
        clock.stop();
        clock.stop();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert!(clock.advance(STEP, STEP).is_empty());
        assert_eq!(clock.current_step(), 2);

        clock.start(STEP);
        assert_eq!(clock.current_step(), 2);
        assert_eq!(clock.ms_until_next_step(), STEP);
        assert_eq!(clock.advance(STEP, STEP), vec![3]);
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let mut clock = running(8);
        clock.advance(150.0, STEP);
        clock.start(STEP);
        assert_eq!(clock.ms_until_next_step(), 50.0);
    }

    #[test]
    fn test_tempo_increase_shortens_pending_step() {
        let mut clock = running(8);
        clock.advance(10.0, STEP);
        assert_eq!(clock.ms_until_next_step(), 190.0);
        // 600 bpm -> 100ms steps
        assert!(clock.advance(10.0, 100.0).is_empty());
        assert_eq!(clock.ms_until_next_step(), 90.0);
        assert_eq!(clock.advance(90.0, 100.0), vec![1]);
        assert_eq!(clock.ms_until_next_step(), 100.0);
    }

    #[test]
    fn test_bad_delta_is_ignored() {
        let mut clock = running(8);
        assert!(clock.advance(-50.0, STEP).is_empty());
        assert!(clock.advance(f64::NAN, STEP).is_empty());
        assert_eq!(clock.ms_until_next_step(), STEP);
        assert_eq!(clock.elapsed_ms_in_cycle(), 0.0);
    }

    #[test]
    fn test_playhead_fraction() {
        let mut clock = running(8);
        clock.advance(STEP, STEP);
        clock.advance(STEP, STEP);
        assert_eq!(clock.playhead_fraction(STEP), 0.25);
        clock.advance(100.0, STEP);
        assert_eq!(clock.playhead_fraction(STEP), 500.0 / 1600.0);
        // a tempo change can overrun the cycle length; the playhead stays below 1
        assert!(clock.playhead_fraction(10.0) < 1.0);
    }

    #[test]
    fn test_cycle_closes_with_inexact_step_lengths() {
        for bpm in [70.0, 97.0, 133.0, 140.0, 175.0, 7.0] {
            let ms_per_step = 60_000.0 / bpm;
            for split in [3, 6, 7, 10] {
                let mut clock = Clock::new(8);
                clock.start(ms_per_step);
                let frame = ms_per_step / split as f64;

                let mut events = Vec::new();
                for _ in 0..8 * split {
                    events.extend(clock.advance(frame, ms_per_step));
                }
                assert_eq!(events, vec![1, 2, 3, 4, 5, 6, 7, 0], "{bpm} bpm / {split}");
                assert_eq!(clock.current_step(), 0);
                assert!(clock.ms_until_next_step() > 0.0);
            }
        }
    }

    #[test]
    fn test_catch_up_exact_cycle_keeps_phase() {
        let mut clock = Clock::new(4).with_policy(MissedStepPolicy::CatchUp, false);
        clock.start(STEP);
        assert_eq!(clock.advance(4.0 * STEP, STEP), vec![1, 2, 3, 0]);
        assert_eq!(clock.ms_until_next_step(), STEP);
        assert_eq!(clock.elapsed_ms_in_cycle(), 0.0);

        // a partial step past a full cycle is carried rather than resynced away
        let mut clock = Clock::new(4).with_policy(MissedStepPolicy::CatchUp, false);
        clock.start(STEP);
        assert_eq!(clock.advance(4.0 * STEP + 50.0, STEP), vec![1, 2, 3, 0]);
        assert_eq!(clock.ms_until_next_step(), 150.0);
        assert_eq!(clock.elapsed_ms_in_cycle(), 50.0);
    }

    #[test]
    fn test_reset() {
        let mut clock = running(8);
        clock.advance(STEP, STEP);
        clock.reset(STEP);
        assert_eq!(clock.current_step(), 0);
        assert_eq!(clock.elapsed_ms_in_cycle(), 0.0);
        assert!(clock.is_running());
    }
}
