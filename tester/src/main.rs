use std::{path::PathBuf, process::exit};

use avgprice::MalformedPolicy;
use clap::Parser;
use tester::Fixture;

#[derive(Parser, Debug)]
#[clap(about = "Runs one fixture directory and diffs the result")]
struct Args {
    #[clap(short, long, parse(from_os_str), default_value = "./fixtures/basic")]
    fixture: PathBuf,

    #[clap(short, long, parse(from_os_str), default_value = "./fixtures/basic/output.csv")]
    output_path: PathBuf,

    #[clap(short = 'j', long, default_value_t = 4)]
    parallelism: usize,

    #[clap(long, default_value = "abort")]
    on_malformed: MalformedPolicy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let fixture = Fixture::new(args.fixture);
    let config = fixture.config(&args.output_path, args.parallelism, args.on_malformed);

    let (report, output, expected) = tester::run_and_read(&config, &fixture.expected()).await?;
    println!("{report:?}");
    if output != expected {
        println!("--- expected\n{expected}--- got\n{output}");
        exit(1);
    }
    println!("ok");
    Ok(())
}
