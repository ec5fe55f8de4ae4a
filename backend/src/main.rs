mod api;
mod config;
mod errors;
mod logging;
mod models;
mod setup;
mod state;

use crate::config::Settings;
use crate::errors::ApiError;
use crate::state::AppState;
use claim_proofs::artifacts::ArtifactStore;
use claim_proofs::HashBackend;
use clap::{Parser, Subcommand};

/// Claim attestation and Groth16 proof service.
#[derive(Parser, Debug)]
#[command(name = "attestation-backend", version)]
struct Cli {
    /// Defaults to `serve`.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Generate proving and verifying keys into the artifact directory.
    Setup {
        /// Replace artifacts that already exist.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let cli = Cli::parse();
    let settings = Settings::from_env();
    logging::init_logging("info", settings.log_format);
    for var in &settings.rejected {
        tracing::warn!(%var, "ignoring invalid setting, using default");
    }

    // Poseidon parameters are built once; a failure here is fatal.
    let hasher = tokio::task::spawn_blocking(HashBackend::warm_up)
        .await
        .map_err(|_| ApiError::Internal)??;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings, hasher).await,
        Command::Setup { force } => {
            let store = ArtifactStore::new(settings.artifact_dir.clone());
            let depth = settings.merkle_depth;
            let manifest = tokio::task::spawn_blocking(move || {
                setup::write_artifacts(&store, &hasher, depth, force)
            })
            .await
            .map_err(|_| ApiError::Internal)??;
            tracing::info!(
                dir = %settings.artifact_dir.display(),
                depth = manifest.merkle_depth,
                circuits = manifest.circuits.len(),
                "setup finished"
            );
            Ok(())
        }
    }
}

async fn serve(settings: Settings, hasher: std::sync::Arc<HashBackend>) -> Result<(), ApiError> {
    let addr = settings.addr.clone();
    tracing::info!(
        artifact_dir = %settings.artifact_dir.display(),
        merkle_depth = settings.merkle_depth,
        proving_concurrency = settings.proving_concurrency,
        proof_timeout_ms = settings.proof_timeout.as_millis() as u64,
        "starting backend"
    );

    let state = AppState::new(settings, hasher);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(%addr, "backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn setup_accepts_force() {
        let cli = Cli::try_parse_from(["attestation-backend", "setup", "--force"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Setup { force: true })));
        let cli = Cli::try_parse_from(["attestation-backend"]).unwrap();
        assert!(cli.command.is_none());
    }
}
