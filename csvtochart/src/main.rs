use std::{fs::create_dir_all, io, path::PathBuf};

use clap::{Parser, ValueEnum};
use common::{
    chart::{write_group_charts, write_pivot_charts},
    config::ChartConfig,
    group::{PlotGroups, RowFilter},
};
use eyre::{Context, Result};
use itertools::Itertools;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One chart per distinct set of dimension values
    Groups,
    /// Group charts, plus one chart per held out dimension
    Pivot,
}

/// Reads benchmark CSV from stdin and writes gnuplot and HTML charts.
#[derive(Parser)]
struct Cli {
    /// Directory to write plots and data files
    #[arg(short, long)]
    output_dir: PathBuf,
    #[arg(short, long, value_enum, default_value_t = Mode::Pivot)]
    mode: Mode,
    /// YAML file with x_axis, y_axis and dimensions
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only plot rows where column=value, can be repeated
    #[arg(short, long)]
    filter: Vec<String>,
    /// Extra tracing filter directives, ie. common=debug
    #[arg(short, long)]
    log: Vec<String>,
}

fn init_tracing(directives: &[String]) -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("info".to_owned());
    let mut env_filter = EnvFilter::new(format!("csvtochart={log_level}"))
        .add_directive(format!("common={log_level}").parse()?);
    for directive in directives {
        env_filter = env_filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_writer(io::stderr)
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .init();
    Ok(())
}

fn run(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => ChartConfig::load(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => ChartConfig::default(),
    };
    let filters = args
        .filter
        .iter()
        .map(|filter| filter.parse::<RowFilter>())
        .collect::<Result<Vec<_>, _>>()?;

    create_dir_all(&args.output_dir)
        .with_context(|| format!("Creating {}", args.output_dir.display()))?;

    info!("reading csv from stdin...");
    let groups = PlotGroups::from_csv(io::stdin().lock(), &config, &filters)
        .context("Reading CSV from stdin")?;
    info!("{} distinct data sets", groups.len());
    for (name, values) in groups.dictionaries() {
        info!("  {name}: {}", values.iter().join(", "));
    }

    write_group_charts(&groups, &config, &args.output_dir)?;
    if args.mode == Mode::Pivot {
        for excluded in 0..groups.dimensions().len() {
            write_pivot_charts(&groups, &config, &args.output_dir, excluded)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log)?;

    if let Err(err) = run(args) {
        error!("{err:#}");
        return Err(err);
    }
    Ok(())
}
