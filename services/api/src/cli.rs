use crate::demo::{run_demo, run_import, run_report, DemoArgs, ImportArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use dataverse::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Dataverse",
    about = "Serve and inspect contracts, accruals and education threads",
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
    /// Print derived statuses and outstanding balances of a data file
    Report(ReportArgs),
    /// Load an accounting ledger CSV into a data file
    ImportAccruals(ImportArgs),
    /// Seed a sample dataset in memory and print its derived statuses
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args),
        Command::ImportAccruals(args) => run_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
