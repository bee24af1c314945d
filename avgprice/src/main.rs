use std::process::exit;

use anyhow::Context;
use avgprice::{Args, Config, JobReport};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: usize) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 2)
        .init();
}

async fn run(args: &Args) -> anyhow::Result<JobReport> {
    let config = Config::from_args(args).context("couldn't build job configuration")?;
    debug!(?config, "configuration resolved");
    avgprice::run(&config)
        .await
        .with_context(|| format!("job over {:?} failed", config.input_path))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args).await {
        Ok(report) => {
            info!(
                "wrote {} groups from {} records to {:?}",
                report.groups, report.records, report.output_path
            );
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            exit(1);
        }
    }
}
