//! Command-line entry point for decapsulation analysis.
//!
//! # Responsibility
//! - Wire history sources, the analysis service and reporters together.
//! - Keep all analysis semantics inside `decapscan_core`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use decapscan_core::db::{open_db, open_db_in_memory, open_existing_db};
use decapscan_core::{
    default_log_level, init_logging, read_history_file, write_history_file, AnalysisOptions,
    AnalysisService, ConsoleReporter, JsonReporter, Reporter, SqliteHistoryRepository,
};
use log::info;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Reports fields that gained accessors after they were introduced.
#[derive(Parser, Debug)]
#[command(name = "decapscan", author, version, about, long_about = None)]
struct Cli {
    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for log files; logging stays off when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a JSON history document into a history database
    Import {
        #[arg(long)]
        history: PathBuf,
        #[arg(long)]
        db: PathBuf,
        /// Drop previously stored transactions first
        #[arg(long)]
        replace: bool,
    },
    /// Write a stored history back out as a JSON document
    Export {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        history: PathBuf,
    },
    /// Replay a history and report decapsulated fields
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Previously persisted history database
    #[arg(long, conflicts_with = "history", required_unless_present = "history")]
    db: Option<PathBuf>,

    /// JSON history document
    #[arg(long)]
    history: Option<PathBuf>,

    /// Stop after this transaction id
    #[arg(long)]
    until: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Console)]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Console,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("decapscan: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
        init_logging(level, log_dir)?;
    }

    match cli.command {
        Command::Import {
            history,
            db,
            replace,
        } => {
            let transactions = read_history_file(&history)?;
            let conn = open_db(&db)?;
            let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn)?);
            let total = if replace {
                service.replace_history(&transactions)?
            } else {
                service.import(&transactions)?
            };
            println!(
                "imported {} transactions into {} ({} stored)",
                transactions.len(),
                db.display(),
                total
            );
        }
        Command::Export { db, history } => {
            let conn = open_existing_db(&db)?;
            let service = AnalysisService::new(SqliteHistoryRepository::try_new(&conn)?);
            let transactions = service.history()?;
            write_history_file(&history, &transactions)?;
            println!(
                "exported {} transactions to {}",
                transactions.len(),
                history.display()
            );
        }
        Command::Analyze(args) => analyze(args)?,
    }
    Ok(())
}

fn analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let options = AnalysisOptions { until: args.until };

    let conn = match (&args.db, &args.history) {
        (Some(db), _) => open_existing_db(db)?,
        (None, Some(history)) => {
            let transactions = read_history_file(history)?;
            let conn = open_db_in_memory()?;
            AnalysisService::new(SqliteHistoryRepository::try_new(&conn)?).import(&transactions)?;
            conn
        }
        (None, None) => return Err("either --db or --history is required".into()),
    };

    let report = AnalysisService::new(SqliteHistoryRepository::try_new(&conn)?).run(&options)?;
    info!(
        "event=cli_analyze module=cli status=ok transactions={} last_tx={}",
        report.transactions_processed,
        report.last_transaction_id.as_deref().unwrap_or("-")
    );

    let reporter: Box<dyn Reporter> = match args.format {
        Format::Console => Box::new(ConsoleReporter),
        Format::Json => Box::new(JsonReporter { pretty: true }),
    };
    let stdout = io::stdout();
    reporter.report(&report.decapsulated(), &mut stdout.lock())?;
    Ok(())
}
