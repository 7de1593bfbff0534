use crate::accumulator::PowerSums;
use crate::error::{QoiError, QoiResult};
use crate::region::{NodeId, Region};
use rayon::prelude::*;

/// Lookup of per-node accumulators, consumed by the record builder.
pub trait NodalLookup {
    fn power_sums(&self, node: NodeId) -> Option<&PowerSums>;
    /// Number of updates every accumulator in the lookup has received.
    fn sample_count(&self) -> u64;
}

/// Per-node power sums of one nodal field over a fixed region.
///
/// Accumulators are stored in the region's node order. An update fans out over
/// rayon workers with `par_iter_mut`, so every accumulator is mutably borrowed
/// by exactly one worker and no merge step is needed.
#[derive(Debug, Clone)]
pub struct NodalPowerSums {
    field: String,
    region: String,
    node_ids: Vec<NodeId>,
    accumulators: Vec<PowerSums>,
    sample_count: u64,
}

impl NodalPowerSums {
    pub fn new(region: &Region, field: impl Into<String>) -> Self {
        let node_ids: Vec<NodeId> = region.node_ids().collect();
        Self {
            field: field.into(),
            region: region.name().to_string(),
            accumulators: vec![PowerSums::new(); node_ids.len()],
            node_ids,
            sample_count: 0,
        }
    }

    /// Folds the current value of the tracked field at every node.
    pub fn update(&mut self, region: &Region) -> QoiResult<()> {
        if region.name() != self.region || region.node_count() != self.node_ids.len() {
            return Err(QoiError::Validation(format!(
                "Nodal power sums for '{}' ({} nodes) fed from '{}' ({} nodes)",
                self.region,
                self.node_ids.len(),
                region.name(),
                region.node_count()
            )));
        }
        let values = region.field(&self.field)?;

        self.accumulators
            .par_iter_mut()
            .zip(values.par_iter())
            .for_each(|(acc, &v)| acc.update(v));

        self.sample_count += 1;
        Ok(())
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }
}

impl NodalLookup for NodalPowerSums {
    fn power_sums(&self, node: NodeId) -> Option<&PowerSums> {
        self.node_ids
            .binary_search(&node)
            .ok()
            .map(|i| &self.accumulators[i])
    }

    fn sample_count(&self) -> u64 {
        self.sample_count
    }
}
