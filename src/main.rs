//! Loan performance pipeline CLI
//!
//! Processes one vintage of acquisition/performance files, or prints the
//! amortization schedule of a single loan.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loan_performance::amortization::{
    compute_amortization, monthly_payment, MonthlyRates, MATURED_SENTINEL,
};
use loan_performance::loan::{load_loans, load_performance};
use loan_performance::output::write_outputs;
use loan_performance::{ExecutionMode, Pipeline, PipelineConfig, SeriesOrdering};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "loan-pipeline")]
#[command(
    about = "Scheduled balances and lifecycle features for mortgage loan-level data",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one batch and write the loan-month and loan-level tables
    Process {
        /// Pipe-delimited performance file
        #[arg(long)]
        performance: PathBuf,
        /// Pipe-delimited acquisition file (enables balance back-filling)
        #[arg(long)]
        acquisition: Option<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,
        /// JSON pipeline config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Months of schedule used for back-filling
        #[arg(long)]
        horizon: Option<u32>,
        /// Release label, e.g. 2008Q1
        #[arg(long)]
        vintage: Option<String>,
        /// Derive features across loans in parallel
        #[arg(long)]
        parallel: bool,
        /// Sort out-of-order loan histories instead of rejecting them
        #[arg(long)]
        sort: bool,
    },
    /// Print the amortization schedule of one loan
    Schedule {
        /// Original principal
        #[arg(long)]
        principal: f64,
        /// Annual note rate in percent (4.5 means 4.5%)
        #[arg(long)]
        rate: f64,
        /// Term in months
        #[arg(long)]
        term: u32,
        /// First loan age to print
        #[arg(long, default_value_t = 0)]
        start: u32,
        /// Loan age to stop before (defaults to the term)
        #[arg(long)]
        end: Option<u32>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Process {
            performance,
            acquisition,
            out_dir,
            config,
            horizon,
            vintage,
            parallel,
            sort,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(horizon) = horizon {
                config.schedule_horizon = horizon;
            }
            if vintage.is_some() {
                config.vintage = vintage;
            }
            if parallel {
                config.execution = ExecutionMode::Parallel;
            }
            if sort {
                config.ordering = SeriesOrdering::Sort;
            }
            process(config, &performance, acquisition.as_deref(), &out_dir)
        }
        Commands::Schedule {
            principal,
            rate,
            term,
            start,
            end,
        } => schedule(principal, rate, term, start, end.unwrap_or(term)),
    }
}

fn process(
    config: PipelineConfig,
    performance: &Path,
    acquisition: Option<&Path>,
    out_dir: &Path,
) -> Result<()> {
    let start = Instant::now();

    let loans = match acquisition {
        Some(path) => Some(load_loans(path).with_context(|| {
            format!("Failed to load acquisition file: {}", path.display())
        })?),
        None => None,
    };
    let records = load_performance(performance)
        .with_context(|| format!("Failed to load performance file: {}", performance.display()))?;
    log::info!("loaded inputs in {:?}", start.elapsed());

    let output = Pipeline::new(config).run(loans, records).context("Pipeline run failed")?;
    let paths = write_outputs(out_dir, &output)
        .with_context(|| format!("Failed to write outputs to {}", out_dir.display()))?;

    for path in &paths {
        println!("{}", path.display());
    }
    log::info!("done in {:?}", start.elapsed());
    Ok(())
}

fn schedule(principal: f64, annual_rate: f64, term: u32, start: u32, end: u32) -> Result<()> {
    let monthly_rate = annual_rate / 1200.0;
    let rates = [monthly_rate];
    let matrix =
        compute_amortization(&[principal], MonthlyRates::Fixed(&rates), &[term], start, end)
            .context("Failed to compute schedule")?;

    println!("Principal: ${:.2}", principal);
    println!("Rate:      {:.3}%", annual_rate);
    println!("Term:      {} months", term);
    println!("Payment:   ${:.2}", monthly_payment(principal, monthly_rate, term));
    println!();
    println!("{:>5} {:>14}", "Age", "Sched UPB");
    println!("{}", "-".repeat(20));

    for (k, &upb) in matrix.row(0).iter().enumerate() {
        if upb == MATURED_SENTINEL {
            println!("{:>5} {:>14}", matrix.age_at(k), "matured");
        } else {
            println!("{:>5} {:>14.2}", matrix.age_at(k), upb);
        }
    }
    Ok(())
}
