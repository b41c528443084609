use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ola::anonymity::{check_k_anonymity, generalize_rows, min_class_size};
use ola::histogram::{build_histogram, rerun_with_histogram};
use ola::io::{derive_quasi_identifiers, read_csv, write_csv, CsvData};
use ola::lattice::{find_smallest_passing_ri, Lattice};
use ola::OlaConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file
    #[arg(short, long)]
    input: String,
    /// Output file
    #[arg(short, long)]
    output: String,
    /// Quasi-identifier columns to generalize (comma-separated)
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    columns: Vec<String>,
    /// Minimum number of records in every equivalence class
    #[arg(short, long)]
    k: u64,
    /// Cap on the number of distinct equivalence classes
    #[arg(long, default_value = "1000000")]
    max_classes: u64,
    /// Bucket width multiplier between lattice levels
    #[arg(long, default_value = "2")]
    growth_factor: i64,
    /// Records per aggregation chunk (performance knob, never changes output)
    #[arg(long, default_value = "100000")]
    chunk_size: usize,
    /// Delimiter for input/output files
    #[arg(short, long, default_value = ",")]
    delimiter: char,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let config = OlaConfig {
        k: args.k,
        max_equivalence_classes: args.max_classes,
        growth_factor: args.growth_factor,
        chunk_size: args.chunk_size,
    };
    config.validate()?;

    let data = read_csv(&args.input, args.delimiter).context("Could not read input file")?;
    let (quasi_identifiers, qi_values) = derive_quasi_identifiers(&data, &args.columns)
        .context("Could not derive quasi-identifier domains")?;
    for qi in &quasi_identifiers {
        info!(
            "Quasi-identifier {}: observed range [{}, {}]",
            qi.name, qi.min, qi.max
        );
    }

    let range_sizes: Vec<i64> = quasi_identifiers
        .iter()
        .map(|qi| qi.range_size())
        .collect();
    let lattice = Lattice::build(range_sizes, config.growth_factor);
    info!(
        "Lattice: {} nodes over {} levels",
        lattice.len(),
        lattice.levels().len()
    );

    let candidate = find_smallest_passing_ri(&lattice, config.max_equivalence_classes)?;
    info!("Smallest bin widths within the class cap: {:?}", candidate);

    let histogram = build_histogram(&qi_values, &candidate, config.chunk_size);
    info!(
        "Histogram: {} equivalence classes, smallest holds {:?} records",
        histogram.len(),
        min_class_size(&histogram)
    );

    let final_ri = if check_k_anonymity(&histogram, config.k) {
        info!("Candidate widths already satisfy {}-anonymity", config.k);
        candidate
    } else {
        info!(
            "Candidate widths fail {}-anonymity, re-searching from the histogram",
            config.k
        );
        let coarser = rerun_with_histogram(
            &candidate,
            &histogram,
            config.k,
            lattice.range_sizes(),
            lattice.growth_factor(),
        )?;
        info!("Final bin widths: {:?}", coarser);
        coarser
    };

    let qi_indices: Vec<usize> = quasi_identifiers.iter().map(|qi| qi.index).collect();
    let generalized = CsvData {
        header: data.header.clone(),
        rows: generalize_rows(&data.rows, &qi_values, &qi_indices, &final_ri),
    };
    write_csv(&args.output, &generalized, args.delimiter).context("Could not write output file")?;
    info!("Generalized data written to {}", args.output);
    Ok(())
}
