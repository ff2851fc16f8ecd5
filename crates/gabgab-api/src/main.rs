//! GabGab CLI entry point.
//!
//! Binary name: `gabgab`
//!
//! Parses CLI arguments, initializes logging and the recording service,
//! then dispatches to the matching command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use gabgab_observe::{init_tracing, shutdown_tracing, LogFormat, TracingOptions};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        default_level: cli::log_level(cli.verbose, cli.quiet).to_string(),
        format: if cli.log_json { LogFormat::Json } else { LogFormat::Pretty },
        enable_otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "gabgab", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.data_dir.clone(), cli.quiet || cli.json).await?;
    let json = cli.json;
    tracing::debug!(data_dir = %state.data_dir.display(), "Dispatching command");

    let result = match cli.command {
        Commands::Init => cli::table::init(&state, json).await,
        Commands::Reset { yes } => cli::table::reset(&state, yes, json).await,
        Commands::Insert(args) => cli::recording::insert(&state, args, json).await,
        Commands::Search {
            query,
            limit,
            speaker,
            prefilter,
        } => cli::recording::search(&state, &query, limit, speaker, prefilter, json).await,
        Commands::Evolve { columns } => cli::schema::evolve(&state, &columns, json).await,
        Commands::Update {
            predicate,
            assignments,
        } => cli::schema::update(&state, &predicate, assignments, json).await,
        Commands::Stats => cli::table::stats(&state, json).await,
        Commands::Restore { version } => cli::table::restore(&state, version, json).await,
        Commands::Completions { .. } => Ok(()),
    };

    state.close();
    result
}
