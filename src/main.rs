use std::path::PathBuf;
use std::sync::Arc;

use airquality::api::ApiState;
use airquality::config::{AirQualityConfig, RuntimeEnvironment};
use airquality::{
    CycleOutcome, IqAirClient, ObservationProvider, ObservationRepository,
    Pipeline, QueryService, Scheduler, SqliteObservationRepository, telemetry, web,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;

/// Air quality ingestion service
#[derive(Debug, Parser)]
#[command(name = "airquality", version, about)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the ingestion scheduler and the HTTP API (default)
    Serve,
    /// Run a single ingestion cycle for the configured target
    Fetch,
    /// Print the most polluted observation recorded for a city
    MostPolluted {
        /// City to rank; defaults to the configured target city
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AirQualityConfig::load_from_path(cli.config.clone())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    telemetry::init(&config.logging)?;

    let provider: Arc<dyn ObservationProvider> =
        Arc::new(IqAirClient::new(&config.provider, config.environment)?);
    let repository: Arc<dyn ObservationRepository> = Arc::new(
        SqliteObservationRepository::open(&config.storage.database_path).with_context(|| {
            format!("Failed to open observation store at {}", config.storage.database_path)
        })?,
    );
    let target = config.schedule.target.to_target()?;
    let quiet = config.environment == RuntimeEnvironment::Test;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let (shutdown_tx, shutdown_rx) = watch::channel(());

            let pipeline = Pipeline::new(provider.clone(), repository.clone()).quiet(quiet);
            let scheduler = Scheduler::new(pipeline, target.clone(), config.schedule.period())
                .spawn(shutdown_rx.clone());

            let state = ApiState {
                service: QueryService::new(provider, repository),
                city: target.city,
            };
            let mut server = tokio::spawn({
                let server_config = config.server.clone();
                async move { web::run(&server_config, state, shutdown_rx).await }
            });

            // the server exiting early (e.g. bind failure) also ends the process
            let finished = tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for shutdown signal")?;
                    tracing::info!("Shutting down");
                    None
                }
                result = &mut server => Some(result),
            };
            let _ = shutdown_tx.send(());

            scheduler.await.context("Scheduler task panicked")?;
            let result = match finished {
                Some(result) => result,
                None => server.await,
            };
            result.context("Web server task panicked")??;
        }
        Command::Fetch => {
            let pipeline = Pipeline::new(provider, repository).quiet(quiet);
            match pipeline.run(&target).await {
                CycleOutcome::Persisted(id) => {
                    println!("Stored observation {id} for {}", target.city);
                }
                outcome => {
                    anyhow::bail!("Ingestion cycle for {} did not complete: {outcome:?}", target.city);
                }
            }
        }
        Command::MostPolluted { city } => {
            let city = city.unwrap_or(target.city);
            let service = QueryService::new(provider, repository);
            match service.most_polluted(&city).await {
                Ok(Some(result)) => println!("{}", serde_json::to_string_pretty(&result)?),
                Ok(None) => println!("No observations recorded for {city}"),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Err(anyhow::Error::new(e).context("Query failed"));
                }
            }
        }
    }

    Ok(())
}
