use crate::accumulator::{PowerSumSnapshot, PowerSums};
use crate::error::{QoiError, QoiResult};
use crate::nodal::NodalLookup;
use crate::region::Region;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QoiEntry {
    Mean(f64),
    PowerSums(PowerSumSnapshot),
}

/// Flat record handed to the multilevel estimator.
///
/// With `K` scalar quantities and `M` nodes the layout is:
/// `[0, K)` scalar means, `[K, K+M)` nodal weighted means,
/// `[K+M, 2K+M)` scalar power sums, `[2K+M, 2K+2M)` nodal power sums.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QoiRecord {
    entries: Vec<QoiEntry>,
    #[serde(skip)]
    scalar_count: usize,
    #[serde(skip)]
    node_count: usize,
}

impl QoiRecord {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QoiEntry] {
        &self.entries
    }

    pub fn scalar_count(&self) -> usize {
        self.scalar_count
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn scalar_means(&self) -> Vec<f64> {
        Self::means(&self.entries[..self.scalar_count])
    }

    pub fn node_means(&self) -> Vec<f64> {
        let k = self.scalar_count;
        Self::means(&self.entries[k..k + self.node_count])
    }

    pub fn scalar_power_sums(&self) -> Vec<PowerSumSnapshot> {
        let start = self.scalar_count + self.node_count;
        Self::snapshots(&self.entries[start..start + self.scalar_count])
    }

    pub fn node_power_sums(&self) -> Vec<PowerSumSnapshot> {
        let start = 2 * self.scalar_count + self.node_count;
        Self::snapshots(&self.entries[start..])
    }

    fn means(entries: &[QoiEntry]) -> Vec<f64> {
        entries
            .iter()
            .filter_map(|e| match e {
                QoiEntry::Mean(m) => Some(*m),
                QoiEntry::PowerSums(_) => None,
            })
            .collect()
    }

    fn snapshots(entries: &[QoiEntry]) -> Vec<PowerSumSnapshot> {
        entries
            .iter()
            .filter_map(|e| match e {
                QoiEntry::PowerSums(s) => Some(*s),
                QoiEntry::Mean(_) => None,
            })
            .collect()
    }
}

/// Outcome of a QoI evaluation. `NoData` means nothing has been accumulated on
/// this level; it is never a record of zeros.
#[derive(Debug, Clone, PartialEq)]
pub enum QoiOutcome {
    Record(QoiRecord),
    NoData,
}

impl QoiOutcome {
    pub fn is_no_data(&self) -> bool {
        matches!(self, QoiOutcome::NoData)
    }

    pub fn record(&self) -> Option<&QoiRecord> {
        match self {
            QoiOutcome::Record(r) => Some(r),
            QoiOutcome::NoData => None,
        }
    }

    pub fn into_record(self) -> Option<QoiRecord> {
        match self {
            QoiOutcome::Record(r) => Some(r),
            QoiOutcome::NoData => None,
        }
    }
}

pub struct QoiRecordBuilder<'a> {
    region: &'a Region,
    weighted_field: &'a str,
}

impl<'a> QoiRecordBuilder<'a> {
    pub fn new(region: &'a Region, weighted_field: &'a str) -> Self {
        Self {
            region,
            weighted_field,
        }
    }

    pub fn build<'s, I>(
        &self,
        scalars: I,
        nodal: &dyn NodalLookup,
        sample_count: u64,
    ) -> QoiResult<QoiOutcome>
    where
        I: IntoIterator<Item = (&'s str, &'s PowerSums)>,
    {
        if nodal.sample_count() != sample_count {
            return Err(QoiError::Validation(format!(
                "Nodal accumulators on '{}' hold {} samples, scalars hold {}",
                self.region.name(),
                nodal.sample_count(),
                sample_count
            )));
        }
        if sample_count == 0 {
            return Ok(QoiOutcome::NoData);
        }

        let scalars: Vec<&PowerSums> = scalars.into_iter().map(|(_, acc)| acc).collect();
        let node_count = self.region.node_count();
        let mut entries = Vec::with_capacity(2 * (scalars.len() + node_count));

        for acc in &scalars {
            entries.push(QoiEntry::Mean(acc.mean(sample_count)?));
        }

        let weighted = self.region.field(self.weighted_field)?;
        entries.extend(weighted.iter().map(|&w| QoiEntry::Mean(w)));

        for acc in &scalars {
            entries.push(QoiEntry::PowerSums(acc.snapshot(sample_count)));
        }

        for node in self.region.node_ids() {
            let acc = nodal
                .power_sums(node)
                .ok_or_else(|| QoiError::UnknownNode {
                    node: node.0,
                    region: self.region.name().to_string(),
                })?;
            entries.push(QoiEntry::PowerSums(acc.snapshot(sample_count)));
        }

        assert_eq!(
            entries.len(),
            2 * (node_count + scalars.len()),
            "QoI record layout violated"
        );

        Ok(QoiOutcome::Record(QoiRecord {
            entries,
            scalar_count: scalars.len(),
            node_count,
        }))
    }
}
