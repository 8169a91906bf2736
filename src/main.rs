//! `membership`: filter JSON datasets into cluster-membership probabilities.
//!
//! ```text
//! membership -i train.json -o out.json -- -W gmm -I 2 -- -N 3 -S 42
//! membership --list-options
//! membership -b -i train.json -o train_out.json -r test.json -s test_out.json -- -W kmeans
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use membership::options::Configurable;
use membership::{filter_batch, filter_incremental, ClusterMembership, Clusterer, Dataset};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input dataset (JSON); stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output dataset (JSON); stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Batch mode: filter a second dataset with the model fitted on the first
    #[arg(short, long)]
    batch: bool,

    /// Second input dataset (batch mode)
    #[arg(short = 'r', long, requires = "batch")]
    second_input: Option<PathBuf>,

    /// Second output dataset (batch mode); stdout when omitted
    #[arg(short = 's', long, requires = "batch")]
    second_output: Option<PathBuf>,

    /// Print the filter's options and exit
    #[arg(long)]
    list_options: bool,

    /// Filter options: -W <clusterer> [-I <range>] [-- <clusterer options>].
    /// -W is required unless only --list-options is given.
    #[arg(last = true, allow_hyphen_values = true)]
    filter_options: Vec<String>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();
}

fn read_dataset(path: Option<&Path>) -> anyhow::Result<Dataset> {
    match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("opening {}", p.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing {}", p.display()))
        }
        None => serde_json::from_reader(io::stdin().lock()).context("parsing stdin"),
    }
}

fn write_dataset(path: Option<&Path>, data: &Dataset) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating {}", p.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut writer, data)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn print_options(filter: &ClusterMembership) {
    println!("{}\n", filter.describe());
    println!("Filter options:");
    for opt in filter.describe_options() {
        println!("{opt}");
    }
    println!("\nOptions specific to clusterer {}:", filter.clusterer().name());
    for opt in filter.clusterer().describe_options() {
        println!("{opt}");
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut filter = ClusterMembership::default();
    if args.list_options && args.filter_options.is_empty() {
        print_options(&filter);
        return Ok(());
    }

    let mut options = args.filter_options.clone();
    filter.set_options(&mut options)?;

    if args.list_options {
        print_options(&filter);
        return Ok(());
    }

    info!(options = ?filter.options(), "configured filter");

    if args.batch {
        let Some(second_input) = args.second_input.as_deref() else {
            bail!("batch mode needs a second input dataset (-r)");
        };
        let first = read_dataset(args.input.as_deref())?;
        let second = read_dataset(Some(second_input))?;
        let (first_out, second_out) = filter_batch(&mut filter, &first, &second)?;
        write_dataset(args.output.as_deref(), &first_out)?;
        write_dataset(args.second_output.as_deref(), &second_out)?;
        info!(
            first = first_out.len(),
            second = second_out.len(),
            "batch filtering finished"
        );
    } else {
        let data = read_dataset(args.input.as_deref())?;
        let out = filter_incremental(&mut filter, &data)?;
        write_dataset(args.output.as_deref(), &out)?;
        info!(records = out.len(), "filtering finished");
    }

    Ok(())
}
