use super::{FieldMapper, MapperKind};
use crate::error::{QoiError, QoiResult};
use crate::region::Region;
use rayon::prelude::*;
use tracing::debug;

// Relative slack on bounding-box overlap, scaled by the larger diagonal.
const OVERLAP_TOLERANCE: f64 = 1e-6;

fn empty_region_failure(source: &Region, destination: &Region) -> QoiError {
    QoiError::MappingFailure(format!(
        "Cannot map between '{}' ({} nodes) and '{}' ({} nodes)",
        source.name(),
        source.node_count(),
        destination.name(),
        destination.node_count()
    ))
}

/// Copies each destination node's value from the closest source node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNodeMapper {
    echo_level: u8,
}

impl NearestNodeMapper {
    pub fn new(echo_level: u8) -> Self {
        Self { echo_level }
    }
}

impl FieldMapper for NearestNodeMapper {
    fn map(
        &self,
        source_field: &str,
        destination_field: &str,
        source: &Region,
        destination: &mut Region,
    ) -> QoiResult<()> {
        let (Some(src_bb), Some(dst_bb)) = (source.bounding_box(), destination.bounding_box())
        else {
            return Err(empty_region_failure(source, destination));
        };
        let tolerance = OVERLAP_TOLERANCE * src_bb.diagonal().max(dst_bb.diagonal()).max(1.0);
        if !src_bb.overlaps(&dst_bb, tolerance) {
            return Err(QoiError::MappingFailure(format!(
                "Regions '{}' and '{}' do not overlap",
                source.name(),
                destination.name()
            )));
        }

        let values = source.field(source_field)?;
        let src_nodes = source.nodes();

        let mapped: Vec<f64> = destination
            .nodes()
            .par_iter()
            .map(|dst| {
                let mut best = 0;
                let mut best_d = f64::INFINITY;
                for (i, src) in src_nodes.iter().enumerate() {
                    let d = dst.distance_sq(src);
                    if d < best_d {
                        best_d = d;
                        best = i;
                    }
                }
                values[best]
            })
            .collect();

        if self.echo_level > 1 {
            debug!(
                "Mapped '{}' -> '{}' onto {} nodes of '{}'",
                source_field,
                destination_field,
                mapped.len(),
                destination.name()
            );
        }

        destination
            .ensure_field(destination_field)
            .copy_from_slice(&mapped);
        Ok(())
    }

    fn kind(&self) -> MapperKind {
        MapperKind::NearestNode
    }
}

/// Transfers values node-by-node between regions sharing one node set.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl FieldMapper for IdentityMapper {
    fn map(
        &self,
        source_field: &str,
        destination_field: &str,
        source: &Region,
        destination: &mut Region,
    ) -> QoiResult<()> {
        if source.is_empty() || destination.is_empty() {
            return Err(empty_region_failure(source, destination));
        }

        let same_nodes = source.node_count() == destination.node_count()
            && source.node_ids().eq(destination.node_ids());
        if !same_nodes {
            return Err(QoiError::MappingFailure(format!(
                "Identity mapping requires identical node sets ('{}' vs '{}')",
                source.name(),
                destination.name()
            )));
        }

        let values = source.field(source_field)?.to_vec();
        destination
            .ensure_field(destination_field)
            .copy_from_slice(&values);
        Ok(())
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Identity
    }
}
