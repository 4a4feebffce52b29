use crate::demo::{
    run_demo, run_duplicates_report, run_receivables, DuplicatesArgs, ReceivablesArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use facility_ops::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Facility Ops Reconciliation",
    about = "Reconcile duplicate work items and report receivables from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Report duplicate work items found in a CSV export
    Duplicates(DuplicatesArgs),
    /// Compute receivables for every business in a JSON financials file
    Receivables(ReceivablesArgs),
    /// Run an end-to-end demo against seeded in-memory data
    Demo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory store from a work-item CSV export
    #[arg(long)]
    pub(crate) work_items: Option<PathBuf>,
    /// Seed business financials from a JSON array
    #[arg(long)]
    pub(crate) financials: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Duplicates(args) => run_duplicates_report(args),
        Command::Receivables(args) => run_receivables(args),
        Command::Demo => run_demo(),
    }
}
