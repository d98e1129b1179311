#![forbid(unsafe_code)]

use error_iter::ErrorIter as _;
use fifocount::imports::{read_records, wallet::DefaultWallets};
use fifocount::model::worksheets::{self, Worksheet};
use fifocount::model::{group_records, merge_chronologically, normalize};
use fifocount::model::{NormalizedTransaction, ReportFilter, State, Stats};
use fifocount::util::year_ext::CheckYearsExt as _;
use is_terminal::IsTerminal as _;
use onlyargs::CliError;
use onlyargs_derive::OnlyArgs;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::{env, process::ExitCode};
use thiserror::Error;
use tracing::{debug, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

#[derive(Debug, OnlyArgs)]
#[footer = "Lists given to --wallet, --commodity and --default-wallet may also be comma-separated."]
#[footer = ""]
#[footer = "Additional environment variables:"]
#[footer = "  - RUST_LOG overrides the log level, e.g. `RUST_LOG=trace`"]
#[footer = "  - TERM_COLOR accepts \"always\" to override automatic terminal sensing"]
struct Args {
    /// Only report gains and income realized in this tax year.
    #[short('y')]
    year: Option<i32>,

    /// Only report these wallets.
    #[long]
    wallet: Vec<String>,

    /// Only report these commodities.
    #[long]
    commodity: Vec<String>,

    /// Wallet for rows that do not name one.
    ///   Defaults to the input file name.
    ///
    #[long]
    default_wallet: Vec<String>,

    /// Write worksheet CSVs to this output directory.
    #[short('o')]
    worksheet_path: Option<PathBuf>,

    /// Worksheet CSVs written to an output directory will be given
    ///   this prefix.
    #[short('p')]
    #[default("")]
    worksheet_prefix: String,

    /// Enable verbose output.
    /// Prints transactions and details CSV tables to stdout when not written to a file.
    verbose: bool,

    /// Ledger CSV files, Kraken exports or generic.
    #[positional]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Error)]
enum Error {
    #[error("Failed to import {0:?}")]
    Import(PathBuf, #[source] fifocount::errors::ImportError),

    #[error("No input files given")]
    NoInputs,

    #[error("Failed to write worksheet {0:?}")]
    Worksheet(PathBuf, #[source] fifocount::errors::WorksheetError),

    #[error("Unable to print worksheet")]
    PrintWorksheet(#[source] fifocount::errors::WorksheetError),

    #[error("CLI argument error")]
    Args(#[from] CliError),

    #[error("I/O error")]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let args = onlyargs::parse::<Args>();

    // Initialize the tracing subscriber for instrumentation.
    // Uses the `RUST_LOG` environment var for configuration. E.g. `RUST_LOG=debug cargo run`
    //
    // See: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/struct.EnvFilter.html#directives
    let default_level = match &args {
        Ok(args) if args.verbose => LevelFilter::DEBUG,
        _ => LevelFilter::INFO,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    let term_color = env::var("TERM_COLOR")
        .map(|color| color == "always")
        .unwrap_or_else(|_| io::stdout().is_terminal());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(term_color))
        .with(env_filter)
        .init();

    match run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            for source in err.sources().skip(1) {
                eprintln!("  Caused by: {source}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run(args: Result<Args, CliError>) -> Result<(), Error> {
    let args = args?;
    if args.inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    let filter = ReportFilter::new(
        args.year,
        split_lists(&args.wallet),
        split_lists(&args.commodity),
    );
    let lookup = DefaultWallets::new(split_lists(&args.default_wallet));

    let mut stats = Stats::default();
    let mut state = State::new();

    // Each input is grouped and normalized on its own; group keys are only unique per input.
    let mut inputs = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let records =
            read_records(&mut stats, path).map_err(|err| Error::Import(path.clone(), err))?;
        let groups = group_records(records);
        stats.add_event_groups(groups.len());

        let transactions = normalize(&groups, &lookup, &mut state.warnings);
        stats.add_transactions(transactions.len());
        debug!(path = ?path, transactions = transactions.len(), "Normalized input");

        inputs.push(transactions);
    }
    let transactions = merge_chronologically(inputs);

    if let Some(year) = filter.year() {
        if let Err(years) = transactions.check_year(year) {
            warn!(year, found = ?years, "No transactions fall in the requested year");
        }
    }

    if args.verbose {
        let mut stdout = io::stdout().lock();
        ignore_broken_pipe(write_transactions(&mut stdout, &transactions, &filter))?;
    }

    state.resolve(&transactions);

    let summary = state.gains.select(&filter);
    println!("Capital Gains Summary");
    println!("======= ===== =======");
    println!();
    if summary.is_empty() {
        println!("No gains or income recorded.");
    } else {
        let totals = summary.totals();
        print!("{summary}");
        println!(
            "Total: short={} long={} income={}",
            totals.short_term, totals.long_term, totals.income
        );
    }
    println!();

    emit(&args, "Gains", &worksheets::gains(&summary))?;
    emit(
        &args,
        "Cap Gains Trade Details",
        &worksheets::trade_details(&state.disposals, &filter),
    )?;
    emit(
        &args,
        "Income Details",
        &worksheets::income_details(&state.income, &filter),
    )?;
    emit(
        &args,
        "Open Lots",
        &worksheets::open_lots(&state.ledger, &filter),
    )?;

    println!("{}", state.warnings);
    stats.pretty_print();

    Ok(())
}

/// Flatten repeated flags, splitting each value on commas.
fn split_lists(values: &[String]) -> Vec<&str> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect()
}

fn underline(title: &str) -> String {
    title
        .split(' ')
        .map(|word| "=".repeat(word.chars().count()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write a worksheet into the output directory, or print it in verbose mode.
fn emit<R: Serialize>(args: &Args, title: &str, worksheet: &Worksheet<R>) -> Result<(), Error> {
    if let Some(root) = &args.worksheet_path {
        let path = root.join(format!("{}{}.csv", args.worksheet_prefix, worksheet.name()));
        let file = File::create(&path)?;
        worksheet
            .write_csv(BufWriter::new(file))
            .map_err(|err| Error::Worksheet(path.clone(), err))?;

        let header = format!("{title} written to {}", path.display());
        println!("{header}");
        println!("{}", underline(&header));
        println!();
    } else if args.verbose && !worksheet.is_empty() {
        println!("{title}");
        println!("{}", underline(title));
        println!();
        worksheet
            .write_csv(io::stdout().lock())
            .map_err(Error::PrintWorksheet)?;
        println!();
    }

    Ok(())
}

/// The listing is often piped into `head`, so a closed pipe ends it quietly.
fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        result => result,
    }
}

fn write_transactions<W: io::Write>(
    out: &mut W,
    transactions: &[NormalizedTransaction],
    filter: &ReportFilter,
) -> io::Result<()> {
    writeln!(out, "Transactions")?;
    writeln!(out, "============")?;
    writeln!(out)?;

    for tx in transactions
        .iter()
        .filter(|tx| filter.matches_wallet(&tx.wallet) && filter.matches_commodity(&tx.commodity))
    {
        let from = tx
            .source_wallet()
            .map(|wallet| format!(" from={wallet}"))
            .unwrap_or_default();
        let currency = tx.currency.as_deref().unwrap_or("-");

        writeln!(
            out,
            "{} {} {} {:?}{from} quantity={} consideration={} {currency} fee={} unit={} id={}",
            tx.time,
            tx.wallet,
            tx.commodity,
            tx.kind,
            tx.quantity,
            tx.consideration,
            tx.fee,
            tx.unit_consideration(),
            tx.correlation_id,
        )?;
    }
    writeln!(out)
}
