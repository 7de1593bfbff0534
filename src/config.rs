use crate::error::{QoiError, QoiResult};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Immutable per-scenario settings. Built once, then only ever borrowed.
#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[command(flatten)]
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[command(flatten)]
    #[serde(default)]
    pub time: TimeParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Fraction of the end time discarded as burn-in.
    #[arg(long, default_value_t = 0.3)]
    pub burnin_fraction: f64,

    /// Accumulate nodal statistics on the reference region instead.
    #[arg(long, default_value_t = false)]
    pub mapping: bool,

    #[arg(long, default_value = "drag_force_x,base_moment_z")]
    pub tracked_scalars: String,

    #[arg(long, default_value = "FluidModelPart.NoSlip3D_structure")]
    pub interest_region: String,

    #[arg(long, default_value = "PRESSURE")]
    pub tracked_field: String,

    #[arg(long, default_value = "PRESSURE_WEIGHTED")]
    pub weighted_field: String,

    #[arg(long, default_value = "nearest_node")]
    pub mapper_type: String,

    #[arg(long, default_value_t = 0)]
    pub mapper_echo_level: u8,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            burnin_fraction: 0.3,
            mapping: false,
            tracked_scalars: "drag_force_x,base_moment_z".to_string(),
            interest_region: "FluidModelPart.NoSlip3D_structure".to_string(),
            tracked_field: "PRESSURE".to_string(),
            weighted_field: "PRESSURE_WEIGHTED".to_string(),
            mapper_type: "nearest_node".to_string(),
            mapper_echo_level: 0,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeParams {
    #[arg(long, default_value_t = 0.0)]
    pub start_time: f64,
    #[arg(long, default_value_t = 1.0)]
    pub end_time: f64,
    #[arg(long, default_value_t = 0.01)]
    pub delta_time: f64,
}

impl Default for TimeParams {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 1.0,
            delta_time: 0.01,
        }
    }
}

impl ScenarioConfig {
    pub fn get_tracked_scalars(&self) -> Vec<String> {
        self.tracked_scalars
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Simulated time from which samples are accepted.
    pub fn burnin_time(&self, end_time: f64) -> f64 {
        self.burnin_fraction * end_time
    }

    pub fn validate(&self) -> QoiResult<()> {
        if !(0.0..1.0).contains(&self.burnin_fraction) {
            return Err(QoiError::Config(format!(
                "burnin_fraction must lie in [0, 1), got {}",
                self.burnin_fraction
            )));
        }

        let names = self.get_tracked_scalars();
        if names.is_empty() {
            return Err(QoiError::Config(
                "tracked_scalars must name at least one quantity".to_string(),
            ));
        }
        for (i, n) in names.iter().enumerate() {
            if names[..i].contains(n) {
                return Err(QoiError::Config(format!(
                    "tracked_scalars lists '{}' twice",
                    n
                )));
            }
        }

        for (label, value) in [
            ("interest_region", &self.interest_region),
            ("tracked_field", &self.tracked_field),
            ("weighted_field", &self.weighted_field),
        ] {
            if value.trim().is_empty() {
                return Err(QoiError::Config(format!("{} must not be empty", label)));
            }
        }
        if self.tracked_field == self.weighted_field {
            return Err(QoiError::Config(
                "tracked_field and weighted_field must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn merge_from_cli(&mut self, cli: &ScenarioConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident, $arg_name:expr) => {
                if matches.value_source($arg_name) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(burnin_fraction, "burnin_fraction");
        update_if_present!(mapping, "mapping");
        update_if_present!(tracked_scalars, "tracked_scalars");
        update_if_present!(interest_region, "interest_region");
        update_if_present!(tracked_field, "tracked_field");
        update_if_present!(weighted_field, "weighted_field");
        update_if_present!(mapper_type, "mapper_type");
        update_if_present!(mapper_echo_level, "mapper_echo_level");
    }
}

impl TimeParams {
    pub fn validate(&self) -> QoiResult<()> {
        if !(self.delta_time > 0.0) {
            return Err(QoiError::Config(format!(
                "delta_time must be positive, got {}",
                self.delta_time
            )));
        }
        if !(self.end_time > self.start_time) {
            return Err(QoiError::Config(format!(
                "end_time ({}) must exceed start_time ({})",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }

    pub fn merge_from_cli(&mut self, cli: &TimeParams, matches: &ArgMatches) {
        for (arg, target, value) in [
            ("start_time", &mut self.start_time, cli.start_time),
            ("end_time", &mut self.end_time, cli.end_time),
            ("delta_time", &mut self.delta_time, cli.delta_time),
        ] {
            if matches.value_source(arg) == Some(ValueSource::CommandLine) {
                *target = value;
            }
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> QoiResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn validate(&self) -> QoiResult<()> {
        self.scenario.validate()?;
        self.time.validate()
    }

    /// Explicit command-line flags win over file values.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        self.scenario.merge_from_cli(&cli.scenario, matches);
        self.time.merge_from_cli(&cli.time, matches);
    }
}
