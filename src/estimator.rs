use crate::accumulator::PowerSums;
use crate::error::{QoiError, QoiResult};

/// Named scalar accumulators that advance in lock step.
///
/// Every accumulator in the array has been updated exactly `sample_count`
/// times. The array knows nothing about simulation time: whether a step counts
/// is decided by the caller before `record_step` is invoked.
#[derive(Debug, Clone)]
pub struct MomentEstimatorArray {
    names: Vec<String>,
    accumulators: Vec<PowerSums>,
    sample_count: u64,
}

impl MomentEstimatorArray {
    pub fn new<I, S>(names: I) -> QoiResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(QoiError::Validation(
                "Moment estimator array needs at least one quantity".to_string(),
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(QoiError::Validation(format!(
                    "Quantity #{} has an empty name",
                    i
                )));
            }
            if names[..i].contains(name) {
                return Err(QoiError::Validation(format!(
                    "Quantity '{}' is declared twice",
                    name
                )));
            }
        }

        let accumulators = vec![PowerSums::new(); names.len()];
        Ok(Self {
            names,
            accumulators,
            sample_count: 0,
        })
    }

    /// Feeds one accepted step. The whole step is rejected, leaving every
    /// accumulator untouched, unless each tracked name appears exactly once.
    pub fn record_step<I, K>(&mut self, values_by_name: I) -> QoiResult<()>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut staged: Vec<Option<f64>> = vec![None; self.names.len()];

        for (name, value) in values_by_name {
            let name = name.as_ref();
            let idx = self.index_of(name).ok_or_else(|| {
                QoiError::InconsistentUpdate(format!("'{}' is not a tracked quantity", name))
            })?;
            if staged[idx].replace(value).is_some() {
                return Err(QoiError::InconsistentUpdate(format!(
                    "'{}' supplied more than once in a single step",
                    name
                )));
            }
        }

        let missing: Vec<&str> = self
            .names
            .iter()
            .zip(&staged)
            .filter(|(_, v)| v.is_none())
            .map(|(n, _)| n.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(QoiError::InconsistentUpdate(format!(
                "missing value(s) for {}",
                missing.join(", ")
            )));
        }

        for (acc, value) in self.accumulators.iter_mut().zip(staged) {
            if let Some(v) = value {
                acc.update(v);
            }
        }
        self.sample_count += 1;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.sample_count > 0
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&PowerSums> {
        self.index_of(name).map(|i| &self.accumulators[i])
    }

    /// Accumulators in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PowerSums)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.accumulators.iter())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
