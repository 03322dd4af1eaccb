use std::io;

use clap::Parser;
use common::parse::LogParser;
use eyre::{Context, Result};
use tracing::info;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Reads read buffer benchmark output from stdin and writes CSV to stdout.
#[derive(Parser)]
struct Cli {
    /// Value of the machine_configuration column for every row
    machine_configuration: String,
    /// Extra tracing filter directives, ie. common=debug
    #[arg(short, long)]
    log: Vec<String>,
}

fn init_tracing(directives: &[String]) -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let mut env_filter = EnvFilter::new(format!("parsetocsv={log_level}"))
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

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log)?;

    let parser = LogParser::new(args.machine_configuration)?;
    let summary = parser
        .parse_log(io::stdin().lock(), io::stdout().lock())
        .context("Parsing benchmark log")?;
    info!(
        "{} lines, {} context changes, {} records",
        summary.lines, summary.context_changes, summary.records
    );
    Ok(())
}
