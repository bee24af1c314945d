use std::path::{Path, PathBuf};

use avgprice::{Config, JobReport, MalformedPolicy};

/// A directory holding `input.csv` and the `expected.csv` a job must produce.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub dir: PathBuf,
}

impl Fixture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn input(&self) -> PathBuf {
        self.dir.join("input.csv")
    }

    pub fn expected(&self) -> PathBuf {
        self.dir.join("expected.csv")
    }

    pub fn config(
        &self,
        output: &Path,
        parallelism: usize,
        on_malformed: MalformedPolicy,
    ) -> Config {
        Config {
            input_path: self.input(),
            output_path: output.to_path_buf(),
            parallelism: Some(parallelism),
            on_malformed,
        }
    }
}

/// Runs a job and returns its report along with the produced and expected
/// file contents.
pub async fn run_and_read(
    config: &Config,
    expected: &Path,
) -> anyhow::Result<(JobReport, String, String)> {
    let report = avgprice::run(config).await?;
    let output = std::fs::read_to_string(&config.output_path)?;
    let expected = std::fs::read_to_string(expected)?;
    Ok((report, output, expected))
}
