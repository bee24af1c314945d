//! End-to-end sequencing of one aggregation job.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::{
    config::{Config, MalformedPolicy},
    core::{
        aggregate::AveragePriceAggregator,
        executor::Executor,
        partition::split_even,
        reducer::{averages, reduce, AveragePrice},
    },
    error::Result,
    io,
};

/// Result of the map and reduce phases, before anything is written.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregation {
    pub rows: Vec<AveragePrice>,
    pub chunks: usize,
    pub records: u64,
    pub blank_lines: usize,
    pub skipped_lines: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JobReport {
    pub data_lines: usize,
    pub chunks: usize,
    pub records: u64,
    pub groups: usize,
    pub skipped_lines: usize,
    pub output_path: PathBuf,
}

/// Splits `lines` into `parallelism` chunks, maps them in parallel and
/// merges the partial aggregates into sorted per-group averages.
pub async fn aggregate<L>(
    lines: Vec<L>,
    parallelism: usize,
    on_malformed: MalformedPolicy,
) -> Result<Aggregation>
where
    L: AsRef<[u8]> + Send + 'static,
{
    let executor = Executor::new(parallelism);
    let chunks = split_even(lines, executor.parallelism());
    let num_chunks = chunks.len();

    let outputs = executor
        .map_all(AveragePriceAggregator, chunks, on_malformed)
        .await?;

    let records = outputs.iter().map(|o| o.records).sum();
    let blank_lines = outputs.iter().map(|o| o.blank_lines).sum();
    let skipped_lines = outputs.iter().map(|o| o.skipped_lines).sum();

    let merged = reduce(
        &AveragePriceAggregator,
        outputs.into_iter().map(|o| o.aggregates),
    )?;
    let rows = averages(merged)?;

    Ok(Aggregation {
        rows,
        chunks: num_chunks,
        records,
        blank_lines,
        skipped_lines,
    })
}

/// Reads the input, aggregates it and writes the output file.
///
/// Any failure aborts before the output path is touched.
pub async fn run(config: &Config) -> Result<JobReport> {
    let lines = io::read_lines(&config.input_path)?;
    let data_lines = lines.len();
    let parallelism = config.parallelism();
    info!(
        input = %config.input_path.display(),
        lines = data_lines,
        parallelism,
        on_malformed = %config.on_malformed,
        "starting job"
    );

    let aggregation = aggregate(lines, parallelism, config.on_malformed).await?;
    if aggregation.skipped_lines > 0 {
        warn!(
            skipped = aggregation.skipped_lines,
            "malformed records were left out of the averages"
        );
    }

    io::write_averages(&config.output_path, &aggregation.rows)?;

    let report = JobReport {
        data_lines,
        chunks: aggregation.chunks,
        records: aggregation.records,
        groups: aggregation.rows.len(),
        skipped_lines: aggregation.skipped_lines,
        output_path: config.output_path.clone(),
    };
    info!(
        output = %report.output_path.display(),
        records = report.records,
        groups = report.groups,
        skipped = report.skipped_lines,
        "job finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::{core::record::tests::line, error::Error};

    const MAKES: [&str; 4] = ["Audi", "BMW", "Kia", "Fiat"];
    const MODELS: [&str; 3] = ["A", "B", "C"];

    fn synthetic_lines(n: usize) -> Vec<String> {
        let mut rng = StdRng::seed_from_u64(7);
        (0..n)
            .map(|_| {
                let make = MAKES[rng.gen_range(0..MAKES.len())];
                let model = MODELS[rng.gen_range(0..MODELS.len())];
                let price: f64 = rng.gen_range(1_000.0..90_000.0);
                line(make, model, &format!("{price:.3}"))
            })
            .collect()
    }

    fn by_key(rows: &[AveragePrice]) -> HashMap<(String, String), f64> {
        rows.iter()
            .map(|r| ((r.make.clone(), r.model.clone()), r.avg_price))
            .collect()
    }

    #[tokio::test]
    async fn chunking_does_not_change_averages() {
        let lines = synthetic_lines(100);
        let single = aggregate(lines.clone(), 1, MalformedPolicy::Abort).await.unwrap();
        assert_eq!(single.records, 100);
        let expected = by_key(&single.rows);

        for parallelism in [4, 37] {
            let split = aggregate(lines.clone(), parallelism, MalformedPolicy::Abort)
                .await
                .unwrap();
            assert_eq!(split.chunks, parallelism);
            assert_eq!(split.records, 100);

            let actual = by_key(&split.rows);
            assert_eq!(actual.len(), expected.len());
            for (key, avg) in &expected {
                let got = actual[key];
                assert!((got - avg).abs() < 1e-6, "{key:?}: {got} vs {avg}");
            }
        }
    }

    #[tokio::test]
    async fn same_key_across_chunks_folds_together() {
        let lines = vec![
            line("Audi", "A4", "10.00"),
            line("Audi", "A4", "20.00"),
            line("Audi", "A4", "30.00"),
            line("Audi", "A5", "1.00"),
            line("Audia", "4", "2.00"),
        ];
        // one line per chunk
        let result = aggregate(lines, 5, MalformedPolicy::Abort).await.unwrap();
        assert_eq!(
            result.rows,
            vec![
                AveragePrice {
                    make: "Audi".into(),
                    model: "A4".into(),
                    avg_price: 20.0
                },
                AveragePrice {
                    make: "Audi".into(),
                    model: "A5".into(),
                    avg_price: 1.0
                },
                AveragePrice {
                    make: "Audia".into(),
                    model: "4".into(),
                    avg_price: 2.0
                },
            ]
        );
    }

    #[tokio::test]
    async fn bad_line_in_fifty_aborts_with_line_number() {
        let mut lines = synthetic_lines(50);
        lines[31] = line("Kia", "Rio", "twelve");
        let err = aggregate(lines, 4, MalformedPolicy::Abort).await.unwrap_err();
        match err {
            Error::MalformedRecord { line, chunk, .. } => {
                // data index 31 is file line 33; chunks are 13,13,12,12
                assert_eq!(line, 33);
                assert_eq!(chunk, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_line_in_fifty_is_skipped_and_counted() {
        let clean = synthetic_lines(50);
        let mut lines = clean.clone();
        lines[31] = line("Kia", "Rio", "twelve");

        let result = aggregate(lines, 4, MalformedPolicy::Skip).await.unwrap();
        assert_eq!(result.skipped_lines, 1);
        assert_eq!(result.records, 49);

        let mut without_bad = clean;
        without_bad.remove(31);
        let expected = aggregate(without_bad, 1, MalformedPolicy::Abort).await.unwrap();
        let (got, want) = (by_key(&result.rows), by_key(&expected.rows));
        assert_eq!(got.len(), want.len());
        for (key, avg) in &want {
            assert!((got[key] - avg).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn run_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        let body = [
            "make,model,...".to_string(),
            line("Kia", "Rio", "10"),
            String::new(),
            line("Audi", "A4", "10"),
            "  ".to_string(),
            line("Kia", "Rio", "15"),
        ]
        .join("\n");
        fs::write(&input, body).unwrap();

        let config = Config {
            input_path: input,
            output_path: output.clone(),
            parallelism: Some(2),
            on_malformed: MalformedPolicy::Abort,
        };
        let report = run(&config).await.unwrap();
        assert_eq!(report.data_lines, 5);
        assert_eq!(report.records, 3);
        assert_eq!(report.groups, 2);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "make,model,avg_price\nAudi,A4,10.00\nKia,Rio,12.50\n"
        );
    }

    #[tokio::test]
    async fn header_only_input_writes_header_only_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        fs::write(&input, "make,model,price\n").unwrap();

        let config = Config {
            input_path: input,
            output_path: output.clone(),
            parallelism: Some(3),
            ..Config::default()
        };
        let report = run(&config).await.unwrap();
        assert_eq!(report.groups, 0);
        assert_eq!(fs::read_to_string(&output).unwrap(), "make,model,avg_price\n");
    }

    #[tokio::test]
    async fn failed_job_leaves_previous_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        fs::write(&input, format!("header\n{}\n", line("Kia", "Rio", "x"))).unwrap();
        fs::write(&output, "previous").unwrap();

        let config = Config {
            input_path: input,
            output_path: output.clone(),
            parallelism: Some(1),
            ..Config::default()
        };
        assert!(matches!(
            run(&config).await,
            Err(Error::MalformedRecord { line: 2, .. })
        ));
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
    }

    fn input_with_latin1_line(dir: &std::path::Path) -> std::path::PathBuf {
        let input = dir.join("input.csv");
        let mut body = b"make,model,...\n".to_vec();
        body.extend(line("Kia", "Rio", "10").into_bytes());
        body.extend(b"\nCitro\xebn,C3,x,x,x,x,x,x,x,x,x,x,x,x,x,9\n");
        body.extend(line("Kia", "Rio", "20").into_bytes());
        body.push(b'\n');
        fs::write(&input, body).unwrap();
        input
    }

    #[tokio::test]
    async fn undecodable_line_aborts_with_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output.csv");
        let config = Config {
            input_path: input_with_latin1_line(dir.path()),
            output_path: output.clone(),
            parallelism: Some(2),
            on_malformed: MalformedPolicy::Abort,
        };
        assert!(matches!(
            run(&config).await,
            Err(Error::MalformedRecord { line: 3, .. })
        ));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn undecodable_line_is_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output.csv");
        let config = Config {
            input_path: input_with_latin1_line(dir.path()),
            output_path: output.clone(),
            parallelism: Some(2),
            on_malformed: MalformedPolicy::Skip,
        };
        let report = run(&config).await.unwrap();
        assert_eq!(report.skipped_lines, 1);
        assert_eq!(report.records, 2);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "make,model,avg_price\nKia,Rio,15.00\n"
        );
    }

    #[tokio::test]
    async fn missing_input_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output.csv");
        let config = Config {
            input_path: dir.path().join("missing.csv"),
            output_path: output.clone(),
            ..Config::default()
        };
        assert!(matches!(run(&config).await, Err(Error::InputNotFound { .. })));
        assert!(!output.exists());
    }
}
