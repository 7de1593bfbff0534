use crate::error::{QoiError, QoiResult};
use serde::{Deserialize, Serialize};

/// Highest power tracked by every accumulator.
pub const POWER_SUM_ORDER: usize = 10;

/// Running sums of the first ten powers of a sample stream.
///
/// `sums[k - 1]` holds the sum of `x^k` over every sample seen so far. Memory
/// is constant in the stream length. Samples are folded in stream order, so
/// two accumulators agree bit-for-bit only when fed the same sequence.
///
/// Non-finite samples are not filtered: a single NaN or infinity poisons the
/// affected sums, and it is up to the collaborator never to hand one over.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerSums {
    sums: [f64; POWER_SUM_ORDER],
}

impl PowerSums {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn update(&mut self, value: f64) {
        // Repeated multiplication, not powi: keeps x^k consistent across orders.
        let mut power = value;
        for sum in self.sums.iter_mut() {
            *sum += power;
            power *= value;
        }
    }

    /// Sum of `x^order` for `order` in `1..=POWER_SUM_ORDER`.
    pub fn power_sum(&self, order: usize) -> Option<f64> {
        if order == 0 {
            return None;
        }
        self.sums.get(order - 1).copied()
    }

    pub fn sums(&self) -> &[f64; POWER_SUM_ORDER] {
        &self.sums
    }

    pub fn mean(&self, sample_count: u64) -> QoiResult<f64> {
        if sample_count == 0 {
            return Err(QoiError::ZeroSamples);
        }
        Ok(self.sums[0] / sample_count as f64)
    }

    pub fn snapshot(&self, sample_count: u64) -> PowerSumSnapshot {
        PowerSumSnapshot {
            power_sums: self.sums,
            count: sample_count,
        }
    }
}

/// Frozen power sums plus the number of contributions, as handed to the
/// multilevel estimator. Serializes as a flat 11-number array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "[f64; 11]")]
pub struct PowerSumSnapshot {
    pub power_sums: [f64; POWER_SUM_ORDER],
    pub count: u64,
}

impl PowerSumSnapshot {
    pub fn to_array(&self) -> [f64; POWER_SUM_ORDER + 1] {
        let mut out = [0.0; POWER_SUM_ORDER + 1];
        out[..POWER_SUM_ORDER].copy_from_slice(&self.power_sums);
        out[POWER_SUM_ORDER] = self.count as f64;
        out
    }
}

impl From<PowerSumSnapshot> for [f64; POWER_SUM_ORDER + 1] {
    fn from(snapshot: PowerSumSnapshot) -> Self {
        snapshot.to_array()
    }
}
