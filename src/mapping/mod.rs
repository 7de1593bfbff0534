pub mod kernels;

use crate::error::{QoiError, QoiResult};
use crate::region::Region;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

pub use self::kernels::{IdentityMapper, NearestNodeMapper};

/// Transfers a nodal scalar field from one region onto another.
///
/// Implementations must be idempotent for unchanged source data and regions,
/// and must report incompatible regions as `QoiError::MappingFailure` rather
/// than writing partial results.
pub trait FieldMapper: Send + Sync {
    fn map(
        &self,
        source_field: &str,
        destination_field: &str,
        source: &Region,
        destination: &mut Region,
    ) -> QoiResult<()>;

    fn kind(&self) -> MapperKind;
}

#[derive(Debug, Clone, Copy, EnumIter, EnumString, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum MapperKind {
    NearestNode,
    Identity,
}

impl MapperKind {
    pub fn available() -> Vec<String> {
        MapperKind::iter().map(|k| k.to_string()).collect()
    }
}

/// Builds the kernel named by the (otherwise opaque) `mapper_type` setting.
pub fn create_mapper(mapper_type: &str, echo_level: u8) -> QoiResult<Box<dyn FieldMapper>> {
    let kind = MapperKind::from_str(mapper_type.trim()).map_err(|_| {
        QoiError::Config(format!(
            "Unknown mapper type '{}' (available: {})",
            mapper_type,
            MapperKind::available().join(", ")
        ))
    })?;

    if echo_level > 0 {
        debug!("Creating '{}' mapper", kind);
    }

    Ok(match kind {
        MapperKind::NearestNode => Box::new(NearestNodeMapper::new(echo_level)),
        MapperKind::Identity => Box::new(IdentityMapper),
    })
}
