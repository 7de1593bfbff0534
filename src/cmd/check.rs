use crate::reports;
use clap::Args;
use mlmc_qoi::config::Config;
use mlmc_qoi::error::QoiResult;
use mlmc_qoi::mapping;
use mlmc_qoi::region::Region;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: Config,
}

/// Validates configuration and regions, and dry-runs the mapper on node
/// coordinates so incompatible regions are caught before a long run.
pub fn run(config: &Config, model: &Region, reference: Option<&Region>) -> QoiResult<()> {
    let names = config.scenario.get_tracked_scalars();

    let node_count = match reference {
        Some(reference) => {
            let mapper = mapping::create_mapper(
                &config.scenario.mapper_type,
                config.scenario.mapper_echo_level,
            )?;
            let mut source = model.clone();
            let xs: Vec<f64> = model.nodes().iter().map(|n| n.x).collect();
            source.ensure_field("X").copy_from_slice(&xs);
            let mut target = reference.clone();
            mapper.map("X", "X", &source, &mut target)?;
            info!(
                "✅ '{}' mapper accepts {} -> {} nodes",
                mapper.kind(),
                model.node_count(),
                reference.node_count()
            );
            reference.node_count()
        }
        None => model.node_count(),
    };

    reports::print_layout_report(&names, node_count);
    println!("Configuration OK");
    Ok(())
}
