use std::path::PathBuf;

use clap::Parser;

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod job;

pub use config::{Config, MalformedPolicy};
pub use error::{Error, Result};
pub use job::{run, JobReport};

/// Command line arguments. Anything left unset falls back to the config
/// file, then to the built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
#[clap(about = "Average price per make and model of a vehicle CSV dataset")]
pub struct Args {
    /// TOML file with job settings
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Input CSV (first line is a header)
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output CSV
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of parallel map units [default: cores - 1]
    #[clap(short = 'j', long, takes_value = true)]
    pub parallelism: Option<usize>,

    /// What to do with unparsable records: abort or skip
    #[clap(long, takes_value = true, value_name = "POLICY")]
    pub on_malformed: Option<MalformedPolicy>,

    /// -v for debug, -vv for trace
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: usize,
}
