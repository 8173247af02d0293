use crate::demo::{run_cite, run_demo, run_score, CiteArgs, DemoArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use diligence_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Diligence Engine",
    about = "Score target companies against an investment thesis and cite report claims",
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
    /// Score an evidence export against a thesis
    Score(ScoreArgs),
    /// Match report claims to evidence excerpts
    Cite(CiteArgs),
    /// Run an end-to-end demo on a bundled evidence set
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
        Command::Score(args) => run_score(args).await,
        Command::Cite(args) => run_cite(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
