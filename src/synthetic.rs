//! Seeded stand-in for the flow solver.
//!
//! Produces oscillating, noisy drag/moment signals and a nodal pressure field
//! so that scenarios can be driven end to end without a CFD engine. The
//! weighted field is the time average of pressure from the burn-in time on.

use crate::config::Config;
use crate::error::{QoiError, QoiResult};
use crate::region::Region;
use crate::scenario::{PhysicsSolver, SimClock, StepSample};
use std::f64::consts::TAU;
use tracing::info;

const BASE_PRESSURE: f64 = 100.0;
const PRESSURE_AMPLITUDE: f64 = 0.2;
const SCALAR_AMPLITUDE: f64 = 0.1;
const NOISE_LEVEL: f64 = 0.05;
const SHEDDING_FREQUENCY: f64 = 1.5;

pub struct SyntheticFlow {
    rng: fastrand::Rng,
    scalar_names: Vec<String>,
    tracked_field: String,
    weighted_field: String,
    burnin_time: f64,
    perturbation_intensity: f64,

    // Per-node state, drawn on the first step.
    phases: Vec<f64>,
    offsets: Vec<f64>,
    perturbed: bool,
    averaged_time: f64,
}

impl SyntheticFlow {
    /// `seed` plays the role of the MLMC sample id: equal seeds give equal
    /// streams.
    pub fn new(config: &Config, seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            scalar_names: config.scenario.get_tracked_scalars(),
            tracked_field: config.scenario.tracked_field.clone(),
            weighted_field: config.scenario.weighted_field.clone(),
            burnin_time: config.scenario.burnin_time(config.time.end_time),
            perturbation_intensity: 0.0,
            phases: Vec::new(),
            offsets: Vec::new(),
            perturbed: false,
            averaged_time: 0.0,
        }
    }

    /// Uniform perturbation in `[-intensity, intensity]`, relative to the base
    /// pressure, applied once per node.
    pub fn with_perturbation(mut self, intensity: f64) -> Self {
        self.perturbation_intensity = intensity;
        self
    }

    fn perturb(&mut self, node_count: usize) {
        let intensity = self.perturbation_intensity;
        info!(
            "Perturbing the domain: {}",
            if intensity > 0.0 { "Yes" } else { "No" }
        );
        self.phases = (0..node_count).map(|_| self.rng.f64() * TAU).collect();
        self.offsets = (0..node_count)
            .map(|_| (2.0 * self.rng.f64() - 1.0) * intensity * BASE_PRESSURE)
            .collect();
        self.perturbed = true;
    }

    fn noise(&mut self, scale: f64) -> f64 {
        (self.rng.f64() - 0.5) * NOISE_LEVEL * scale
    }
}

impl PhysicsSolver for SyntheticFlow {
    fn solve_step(&mut self, clock: &SimClock, region: &mut Region) -> QoiResult<StepSample> {
        let n = region.node_count();
        if !self.perturbed {
            self.perturb(n);
        } else if self.phases.len() != n {
            return Err(QoiError::Validation(format!(
                "Region '{}' changed from {} to {} nodes mid-run",
                region.name(),
                self.phases.len(),
                n
            )));
        }

        let t = clock.time;
        let mut pressure = Vec::with_capacity(n);
        for i in 0..n {
            let wave = (TAU * SHEDDING_FREQUENCY * t + self.phases[i]).sin();
            let p = BASE_PRESSURE * (1.0 + PRESSURE_AMPLITUDE * wave)
                + self.offsets[i]
                + self.noise(BASE_PRESSURE);
            pressure.push(p);
        }
        region
            .ensure_field(&self.tracked_field)
            .copy_from_slice(&pressure);

        let weighted = region.ensure_field(&self.weighted_field);
        if t >= self.burnin_time {
            let dt = clock.delta_time;
            let total = self.averaged_time + dt;
            for (w, p) in weighted.iter_mut().zip(&pressure) {
                *w = (*w * self.averaged_time + p * dt) / total;
            }
            self.averaged_time = total;
        }

        let mut sample = StepSample::new();
        for i in 0..self.scalar_names.len() {
            let base = (i + 1) as f64;
            let wave = (TAU * SHEDDING_FREQUENCY * (i + 1) as f64 * t).sin();
            let value = base * (1.0 + SCALAR_AMPLITUDE * wave) + self.noise(base);
            sample = sample.with(self.scalar_names[i].clone(), value);
        }
        Ok(sample)
    }
}
