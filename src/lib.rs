pub mod accumulator;
pub mod config;
pub mod error;
pub mod estimator;
pub mod mapping;
pub mod nodal;
pub mod qoi;
pub mod region;
pub mod scenario;
pub mod synthetic;
// cmd and reports belong to the binary (see main.rs).

pub use accumulator::{PowerSumSnapshot, PowerSums, POWER_SUM_ORDER};
pub use error::{QoiError, QoiResult};
pub use estimator::MomentEstimatorArray;
pub use qoi::{QoiOutcome, QoiRecord, QoiRecordBuilder};
