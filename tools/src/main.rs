//! healthsim: headless runner for the health-survey bias simulator.
//!
//! Usage:
//!   healthsim '<bias_config>' '<groups_config>' '<disease_config>'
//!   healthsim '<bias>' '<groups>' '<disease>' --seed 7 --samples 5000 --db run.db
//!   healthsim '<bias>' '<groups>' '<disease>' --correlated '{"BMI": {"mean": 0, "std": 1, "correlation": 0.4}}'
//!   healthsim --config survey.json --out-dir out/

use anyhow::Result;
use healthsim_core::{
    config::{parse_section, CorrelatedConfig, SimConfig},
    export::write_csv_file,
    pipeline::SimulationPipeline,
    store::SimStore,
    summary::{describe, liability_histograms, GroupHistogram},
    table::Table,
};
use std::env;
use std::path::Path;

const USAGE: &str = "Usage: healthsim ('<bias_config>' '<groups_config>' '<disease_config>' | --config PATH) \
[--seed N] [--samples N] [--correlated '<json>'] [--out-dir DIR] [--db PATH] [--no-summary]";

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 6] = ["--config", "--seed", "--samples", "--correlated", "--out-dir", "--db"];

const FULL_CSV: &str = "generated_data_with_bias.csv";
const CENSORED_CSV: &str = "generated_data_with_bias_censored.csv";
const HISTOGRAM_BINS: usize = 30;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let positional = positional_args(&args);
    let config_path = flag_value(&args, "--config");
    if config_path.is_none() && positional.len() < 3 {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }

    let out_dir = flag_value(&args, "--out-dir").unwrap_or(".");
    let db = flag_value(&args, "--db");
    let show_summary = !args.iter().any(|a| a == "--no-summary");

    // Decode every input before anything runs. Flags override the document.
    let mut config = match config_path {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::from_cli_args(positional[0], positional[1], positional[2])?,
    };
    if let Some(raw) = flag_value(&args, "--correlated") {
        config.correlated_config = parse_section::<CorrelatedConfig>(raw, "correlated_config")?;
    }
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.num_samples = parse_arg(&args, "--samples", config.num_samples);
    let (seed, samples) = (config.seed, config.num_samples);

    let run_id = format!("run-{seed}-{}", uuid::Uuid::new_v4().simple());
    println!("Health survey simulator — healthsim");
    println!("  run_id:   {run_id}");
    println!("  seed:     {seed}");
    println!("  samples:  {samples}");
    println!("  groups:   {}", config.groups_config.len());
    println!("  out_dir:  {out_dir}");
    println!();

    let run = SimulationPipeline::build(run_id.clone(), &config).run()?;
    log::info!(
        "run={run_id} complete: {} full rows, {} censored rows",
        run.full_table().row_count(),
        run.censored_table().row_count()
    );

    let out = Path::new(out_dir);
    std::fs::create_dir_all(out)?;
    write_csv_file(run.full_table(), out.join(FULL_CSV))?;
    write_csv_file(run.censored_table(), out.join(CENSORED_CSV))?;

    if let Some(db) = db {
        let store = SimStore::open(db)?;
        store.migrate()?;
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
        run.persist(&store)?;
        println!("  persisted run to {db}");
    }

    if show_summary {
        print_summary("FULL TABLE", run.full_table());
        print_summary("CENSORED TABLE", run.censored_table());
        print_histograms(&liability_histograms(run.censored_table(), HISTOGRAM_BINS)?);
    }
    Ok(())
}

fn print_summary(title: &str, table: &Table) {
    println!("=== {title} ({} rows, {} columns) ===", table.row_count(), table.column_count());
    for summary in describe(table) {
        println!("  {summary}");
    }
    println!();
}

fn print_histograms(histograms: &[GroupHistogram]) {
    const BAR_WIDTH: usize = 50;
    for h in histograms {
        println!("=== DiseaseLiability — {} ===", h.group);
        let peak = h.counts.iter().copied().max().unwrap_or(0).max(1);
        for (i, count) in h.counts.iter().enumerate() {
            let start = h.lower + h.bin_width() * i as f64;
            let bar = "#".repeat(count * BAR_WIDTH / peak);
            println!("  {start:>8.3} | {count:>6} {bar}");
        }
        println!();
    }
}

/// Arguments that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            out.push(arg.as_str());
        }
    }
    out
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
