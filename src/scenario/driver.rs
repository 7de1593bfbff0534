use super::clock::SimClock;
use super::{InterestRegion, Stage};
use crate::config::TimeParams;
use crate::error::QoiResult;
use crate::qoi::QoiOutcome;
use crate::region::Region;

/// Scalar samples produced by the solver for one time step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepSample {
    pub scalars: Vec<(String, f64)>,
}

impl StepSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.scalars.push((name.into(), value));
        self
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scalars.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

/// The physics side of the scenario: advances the flow by one step, writes
/// nodal fields into the interest region and reports the tracked scalars.
pub trait PhysicsSolver {
    fn solve_step(&mut self, clock: &SimClock, region: &mut Region) -> QoiResult<StepSample>;
}

/// Calls the stage hooks in their fixed order.
pub struct Driver<P: PhysicsSolver> {
    clock: SimClock,
    solver: P,
}

impl<P: PhysicsSolver> Driver<P> {
    pub fn new(time: &TimeParams, solver: P) -> QoiResult<Self> {
        time.validate()?;
        Ok(Self {
            clock: SimClock::new(time),
            solver,
        })
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn solver(&self) -> &P {
        &self.solver
    }

    pub fn run<S: Stage + InterestRegion>(&mut self, stage: &mut S) -> QoiResult<QoiOutcome> {
        stage.initialize()?;
        while self.clock.advance() {
            let sample = self.solver.solve_step(&self.clock, stage.interest_region_mut())?;
            stage.finalize_step(&self.clock, &sample)?;
        }
        stage.evaluate_qoi()
    }
}
