pub mod clock;
pub mod driver;

pub use self::clock::SimClock;
pub use self::driver::{Driver, PhysicsSolver, StepSample};

use crate::config::ScenarioConfig;
use crate::error::{QoiError, QoiResult};
use crate::estimator::MomentEstimatorArray;
use crate::mapping::{self, FieldMapper};
use crate::nodal::NodalPowerSums;
use crate::qoi::{QoiOutcome, QoiRecordBuilder};
use crate::region::Region;
use tracing::{debug, info};

/// Lifecycle hooks invoked by an external driver, in this order:
/// `initialize`, then `finalize_step` once per solved step, then `evaluate_qoi`.
pub trait Stage {
    fn initialize(&mut self) -> QoiResult<()>;
    fn finalize_step(&mut self, clock: &SimClock, sample: &StepSample) -> QoiResult<()>;
    fn evaluate_qoi(&mut self) -> QoiResult<QoiOutcome>;
}

/// Native interest region the solver writes nodal fields into.
pub trait InterestRegion {
    fn interest_region_mut(&mut self) -> &mut Region;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Uninitialized,
    Accumulating,
    RecordAvailable,
    NoData,
}

struct ReferenceTarget {
    region: Region,
    mapper: Box<dyn FieldMapper>,
}

/// One MLMC sample run on one resolution level.
pub struct SimulationScenario<'c> {
    config: &'c ScenarioConfig,
    is_reference_level: bool,
    model: Region,
    reference_region: Option<Region>,
    reference: Option<ReferenceTarget>,
    scalars: Option<MomentEstimatorArray>,
    nodal: Option<NodalPowerSums>,
    initialized: bool,
    burnin_reached: bool,
    state: ScenarioState,
}

impl<'c> SimulationScenario<'c> {
    /// `reference_region` is required when `config.mapping` is set and
    /// ignored otherwise.
    pub fn new(
        config: &'c ScenarioConfig,
        model: Region,
        reference_region: Option<Region>,
        is_reference_level: bool,
    ) -> QoiResult<Self> {
        config.validate()?;
        if config.mapping && reference_region.is_none() {
            return Err(QoiError::Config(
                "mapping is enabled but no reference region was supplied".to_string(),
            ));
        }
        Ok(Self {
            config,
            is_reference_level,
            model,
            reference_region: if config.mapping {
                reference_region
            } else {
                None
            },
            reference: None,
            scalars: None,
            nodal: None,
            initialized: false,
            burnin_reached: false,
            state: ScenarioState::Uninitialized,
        })
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn is_reference_level(&self) -> bool {
        self.is_reference_level
    }

    pub fn model_region(&self) -> &Region {
        &self.model
    }

    pub fn reference_region(&self) -> Option<&Region> {
        self.reference
            .as_ref()
            .map(|r| &r.region)
            .or(self.reference_region.as_ref())
    }

    pub fn scalars(&self) -> Option<&MomentEstimatorArray> {
        self.scalars.as_ref()
    }

    pub fn nodal(&self) -> Option<&NodalPowerSums> {
        self.nodal.as_ref()
    }

    pub fn sample_count(&self) -> u64 {
        self.scalars.as_ref().map_or(0, |s| s.sample_count())
    }

    /// Region whose nodes are accumulated and reported.
    fn accumulation_region(&self) -> &Region {
        match &self.reference {
            Some(r) => &r.region,
            None => &self.model,
        }
    }

    /// Single call site for every transfer onto the reference region.
    fn map_onto_reference(&mut self, field: &str) -> QoiResult<()> {
        if let Some(target) = self.reference.as_mut() {
            target
                .mapper
                .map(field, field, &self.model, &mut target.region)?;
        }
        Ok(())
    }
}

impl Stage for SimulationScenario<'_> {
    fn initialize(&mut self) -> QoiResult<()> {
        if self.initialized {
            return Err(QoiError::Validation(
                "scenario initialized twice".to_string(),
            ));
        }

        let scalars = MomentEstimatorArray::new(self.config.get_tracked_scalars())?;

        if let Some(region) = self.reference_region.take() {
            let mapper =
                mapping::create_mapper(&self.config.mapper_type, self.config.mapper_echo_level)?;
            info!(
                "Mapping '{}' onto reference region with '{}' kernel",
                self.config.interest_region,
                mapper.kind()
            );
            self.reference = Some(ReferenceTarget { region, mapper });
        }

        let nodal = NodalPowerSums::new(self.accumulation_region(), &self.config.tracked_field);
        info!(
            "Tracking {} nodes + {} scalars (mapping: {})",
            nodal.node_count(),
            scalars.len(),
            self.config.mapping
        );
        self.nodal = Some(nodal);
        self.scalars = Some(scalars);
        self.initialized = true;
        Ok(())
    }

    fn finalize_step(&mut self, clock: &SimClock, sample: &StepSample) -> QoiResult<()> {
        if !self.initialized {
            return Err(QoiError::Validation(
                "finalize_step called before initialize".to_string(),
            ));
        }
        if !self.is_reference_level {
            return Ok(());
        }
        if !clock.is_past_burnin(self.config.burnin_fraction) {
            return Ok(());
        }
        if !self.burnin_reached {
            self.burnin_reached = true;
            debug!("Burn-in passed at t = {} (step {})", clock.time, clock.step);
        }

        // Map first: a mapping failure must not leave scalars one step ahead.
        let tracked = self.config.tracked_field.clone();
        self.map_onto_reference(&tracked)?;

        let region = match &self.reference {
            Some(r) => &r.region,
            None => &self.model,
        };
        let nodal = self.nodal.as_mut().ok_or_else(|| {
            QoiError::Validation("nodal power sums missing after initialize".to_string())
        })?;
        let scalars = self.scalars.as_mut().ok_or_else(|| {
            QoiError::Validation("scalar estimators missing after initialize".to_string())
        })?;
        // Both updates land or neither does.
        region.field(&tracked)?;
        scalars.record_step(sample.values())?;
        nodal.update(region)?;
        debug_assert_eq!(scalars.sample_count(), nodal.sample_count());

        self.state = ScenarioState::Accumulating;
        Ok(())
    }

    fn evaluate_qoi(&mut self) -> QoiResult<QoiOutcome> {
        if !self.initialized {
            return Err(QoiError::Validation(
                "evaluate_qoi called before initialize".to_string(),
            ));
        }
        if !self.is_reference_level {
            debug!("Not the reference level: no QoI");
            self.state = ScenarioState::NoData;
            return Ok(QoiOutcome::NoData);
        }

        let sample_count = self.sample_count();
        if sample_count == 0 {
            info!("No post burn-in samples: no QoI");
            self.state = ScenarioState::NoData;
            return Ok(QoiOutcome::NoData);
        }

        let weighted = self.config.weighted_field.clone();
        self.map_onto_reference(&weighted)?;

        let (Some(scalars), Some(nodal)) = (self.scalars.as_ref(), self.nodal.as_ref()) else {
            return Err(QoiError::Validation(
                "accumulators missing after initialize".to_string(),
            ));
        };
        let outcome = QoiRecordBuilder::new(self.accumulation_region(), &weighted).build(
            scalars.iter(),
            nodal,
            sample_count,
        )?;

        if let QoiOutcome::Record(record) = &outcome {
            info!(
                "QoI record: {} entries from {} samples",
                record.len(),
                sample_count
            );
            self.state = ScenarioState::RecordAvailable;
        }
        Ok(outcome)
    }
}

impl InterestRegion for SimulationScenario<'_> {
    fn interest_region_mut(&mut self) -> &mut Region {
        &mut self.model
    }
}
