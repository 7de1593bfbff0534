use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use mlmc_qoi::config::Config;
use mlmc_qoi::error::QoiResult;
use mlmc_qoi::region::Region;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON scenario configuration; explicit flags override its values.
    #[arg(global = true, long = "config")]
    config_file: Option<String>,

    /// Interest region nodes as `id,x,y,z` CSV. Defaults to a generated patch.
    #[arg(global = true, long)]
    nodes: Option<String>,

    /// Reference region nodes (only read when mapping is enabled).
    #[arg(global = true, long)]
    reference_nodes: Option<String>,

    /// Side length of the generated patch when no node file is given.
    #[arg(global = true, long, default_value_t = 4)]
    grid_size: usize,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run(cmd::run::RunArgs),
    Check(cmd::check::CheckArgs),
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli, cli_config: &Config, sub_matches: &ArgMatches) -> QoiResult<Config> {
    let config = match &cli.config_file {
        Some(path) => {
            info!("⚙️  Loading configuration from: {}", path);
            let mut file_config = Config::load_from_file(path)?;
            file_config.merge_from_cli(cli_config, sub_matches);
            file_config
        }
        None => cli_config.clone(),
    };
    config.validate()?;
    Ok(config)
}

fn load_regions(cli: &Cli, config: &Config) -> QoiResult<(Region, Option<Region>)> {
    let name = &config.scenario.interest_region;
    let model = match &cli.nodes {
        Some(path) => {
            info!("📂 Loading interest region: {}", path);
            Region::load_from_csv(name, path)?
        }
        None => Region::grid(name, cli.grid_size, cli.grid_size, 1.0)?,
    };

    if !config.scenario.mapping {
        if cli.reference_nodes.is_some() {
            warn!("⚠️  --reference-nodes ignored: mapping is disabled");
        }
        return Ok((model, None));
    }

    let reference = match &cli.reference_nodes {
        Some(path) => {
            info!("📂 Loading reference region: {}", path);
            Region::load_from_csv(name, path)?
        }
        None => {
            // Twice as fine over the same extent.
            let n = 2 * cli.grid_size.max(1) - 1;
            Region::grid(name, n, n, 0.5)?
        }
    };
    Ok((model, Some(reference)))
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    init_tracing(cli.debug);
    info!("🚀 Initializing MLMC QoI accumulator...");

    let (cli_config, sub_matches) = match &cli.command {
        Commands::Run(args) => (&args.config, matches.subcommand_matches("run")),
        Commands::Check(args) => (&args.config, matches.subcommand_matches("check")),
    };
    let sub_matches = sub_matches.unwrap_or(&matches);

    let config = resolve_config(&cli, cli_config, sub_matches).unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(1);
    });

    let (model, reference) = load_regions(&cli, &config).unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(1);
    });

    let result = match &cli.command {
        Commands::Run(args) => cmd::run::run(args, &config, model, reference),
        Commands::Check(_) => cmd::check::run(&config, &model, reference.as_ref()),
    };

    if let Err(e) = result {
        error!("❌ {}", e);
        process::exit(1);
    }
}
