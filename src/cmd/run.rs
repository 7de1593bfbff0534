use crate::reports;
use clap::{ArgAction, Args};
use mlmc_qoi::config::Config;
use mlmc_qoi::error::QoiResult;
use mlmc_qoi::qoi::QoiOutcome;
use mlmc_qoi::region::Region;
use mlmc_qoi::scenario::{Driver, SimulationScenario};
use mlmc_qoi::synthetic::SyntheticFlow;
use std::fs;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: Config,

    /// Sample id; seeds the synthetic flow.
    #[arg(short = 'S', long, default_value_t = 1)]
    pub seed: u64,

    /// Relative intensity of the one-off uniform perturbation.
    #[arg(long, default_value_t = 0.0)]
    pub perturbation: f64,

    /// Whether this run is the finest (reference) level.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub reference_level: bool,

    /// Write the QoI record as a JSON array to this path.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Nodes shown in the report table.
    #[arg(long, default_value_t = 8)]
    pub show_nodes: usize,
}

pub fn run(
    args: &RunArgs,
    config: &Config,
    model: Region,
    reference: Option<Region>,
) -> QoiResult<()> {
    let solver = SyntheticFlow::new(config, args.seed).with_perturbation(args.perturbation);
    let mut scenario =
        SimulationScenario::new(&config.scenario, model, reference, args.reference_level)?;
    let mut driver = Driver::new(&config.time, solver)?;

    info!(
        "⏱️  Running t = {} .. {} (dt = {}, burn-in from t = {})",
        config.time.start_time,
        config.time.end_time,
        config.time.delta_time,
        config.scenario.burnin_time(config.time.end_time)
    );
    let outcome = driver.run(&mut scenario)?;

    let record = match outcome {
        QoiOutcome::NoData => {
            println!("NO DATA: no QoI record on this level");
            return Ok(());
        }
        QoiOutcome::Record(record) => record,
    };

    let names = config.scenario.get_tracked_scalars();
    let region = scenario
        .reference_region()
        .unwrap_or_else(|| scenario.model_region());
    reports::print_record_report(&names, region, &record, args.show_nodes);

    if let Some(path) = &args.output {
        fs::write(path, serde_json::to_string_pretty(&record)?)?;
        info!("💾 Wrote QoI record to {}", path);
    }
    Ok(())
}
