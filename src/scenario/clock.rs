use crate::config::TimeParams;

// Steps landing within this fraction of a step of `end_time` snap onto it.
const END_SNAP: f64 = 1e-9;

/// Simulation clock owned by the driver. The core only ever reads it.
///
/// `delta_time` is the length of the step just taken. It equals the configured
/// step except for a final step clamped to `end_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    pub time: f64,
    pub previous_time: f64,
    pub end_time: f64,
    pub delta_time: f64,
    pub step: u64,
    start_time: f64,
    nominal_delta: f64,
}

impl SimClock {
    pub fn new(params: &TimeParams) -> Self {
        Self {
            time: params.start_time,
            previous_time: params.start_time,
            end_time: params.end_time,
            delta_time: params.delta_time,
            step: 0,
            start_time: params.start_time,
            nominal_delta: params.delta_time,
        }
    }

    fn snap_tolerance(&self) -> f64 {
        END_SNAP * self.nominal_delta
    }

    pub fn keep_advancing(&self) -> bool {
        // A non-positive step would never reach the end.
        self.nominal_delta > 0.0 && self.time < self.end_time - self.snap_tolerance()
    }

    /// Moves to the next step. Time is recomputed from the step index so it
    /// does not drift over long runs; the last step is clamped to `end_time`.
    pub fn advance(&mut self) -> bool {
        if !self.keep_advancing() {
            return false;
        }
        self.previous_time = self.time;
        self.step += 1;
        let nominal = self.start_time + self.step as f64 * self.nominal_delta;
        self.time = if nominal >= self.end_time - self.snap_tolerance() {
            self.end_time
        } else {
            nominal
        };
        self.delta_time = self.time - self.previous_time;
        true
    }

    /// Burn-in gate: true once `time >= fraction * end_time`.
    pub fn is_past_burnin(&self, burnin_fraction: f64) -> bool {
        self.time >= burnin_fraction * self.end_time
    }
}
