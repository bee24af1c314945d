use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    Args,
};

pub const DEFAULT_INPUT_PATH: &str = "./input_data.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "./output_data.csv";

/// What a map unit does with a line it can't parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail the job, naming the offending line.
    #[default]
    Abort,
    /// Leave the line out and count it.
    Skip,
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(MalformedPolicy::Abort),
            "skip" => Ok(MalformedPolicy::Skip),
            other => Err(format!("unknown policy {other:?}, expected abort or skip")),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Abort => write!(f, "abort"),
            MalformedPolicy::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Number of map units; unset means one less than the core count.
    pub parallelism: Option<usize>,
    pub on_malformed: MalformedPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            parallelism: None,
            on_malformed: MalformedPolicy::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_err = |reason: String| Error::Config {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        toml::from_str(&contents).map_err(|e| config_err(e.to_string()))
    }

    /// Defaults, then the config file named by `--config`, then CLI flags.
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.overridden_by(args))
    }

    pub fn overridden_by(mut self, args: &Args) -> Self {
        if let Some(input) = &args.input {
            self.input_path = input.clone();
        }
        if let Some(output) = &args.output {
            self.output_path = output.clone();
        }
        if args.parallelism.is_some() {
            self.parallelism = args.parallelism;
        }
        if let Some(policy) = args.on_malformed {
            self.on_malformed = policy;
        }
        self
    }

    /// Effective number of map units, never below one.
    pub fn parallelism(&self) -> usize {
        self.parallelism
            .unwrap_or_else(default_parallelism)
            .max(1)
    }
}

/// One less than the logical core count, keeping a core for the orchestrator.
pub fn default_parallelism() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}
