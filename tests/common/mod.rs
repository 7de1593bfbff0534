#![allow(dead_code)]

use mlmc_qoi::config::{Config, ScenarioConfig, TimeParams};
use mlmc_qoi::error::QoiResult;
use mlmc_qoi::region::{Node, Region};
use mlmc_qoi::scenario::{PhysicsSolver, SimClock, StepSample};

pub const REGION: &str = "FluidModelPart.NoSlip3D_structure";

/// Replays fixed per-step values instead of solving anything.
pub struct ScriptedSolver {
    pub names: Vec<String>,
    pub scalars: Vec<Vec<f64>>,
    pub pressures: Vec<Vec<f64>>,
    pub weighted: Vec<f64>,
    pub step: usize,
}

impl ScriptedSolver {
    pub fn new(names: &[&str], scalars: Vec<Vec<f64>>, pressures: Vec<Vec<f64>>) -> Self {
        let weighted = pressures
            .first()
            .map(|p| vec![0.0; p.len()])
            .unwrap_or_default();
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
            scalars,
            pressures,
            weighted,
            step: 0,
        }
    }

    pub fn with_weighted(mut self, weighted: Vec<f64>) -> Self {
        self.weighted = weighted;
        self
    }
}

impl PhysicsSolver for ScriptedSolver {
    fn solve_step(&mut self, _clock: &SimClock, region: &mut Region) -> QoiResult<StepSample> {
        let i = self.step;
        self.step += 1;
        region
            .ensure_field("PRESSURE")
            .copy_from_slice(&self.pressures[i]);
        region
            .ensure_field("PRESSURE_WEIGHTED")
            .copy_from_slice(&self.weighted);

        let mut sample = StepSample::new();
        for (name, value) in self.names.iter().zip(&self.scalars[i]) {
            sample = sample.with(name.clone(), *value);
        }
        Ok(sample)
    }
}

pub fn scenario_config(names: &str, burnin_fraction: f64) -> ScenarioConfig {
    ScenarioConfig {
        burnin_fraction,
        tracked_scalars: names.to_string(),
        interest_region: REGION.to_string(),
        ..Default::default()
    }
}

/// `steps` unit time steps starting at t = 0.
pub fn unit_steps(steps: usize) -> TimeParams {
    TimeParams {
        start_time: 0.0,
        end_time: steps as f64,
        delta_time: 1.0,
    }
}

pub fn full_config(names: &str, burnin_fraction: f64, steps: usize) -> Config {
    Config {
        scenario: scenario_config(names, burnin_fraction),
        time: unit_steps(steps),
    }
}

pub fn line_region(name: &str, ids: &[u64]) -> Region {
    let nodes = ids
        .iter()
        .map(|&id| Node::new(id, id as f64, 0.0, 0.0))
        .collect();
    Region::new(name, nodes).unwrap()
}

pub fn assert_close(a: f64, b: f64) {
    let tol = 1e-9 * a.abs().max(b.abs()).max(1.0);
    assert!((a - b).abs() <= tol, "{} != {}", a, b);
}
