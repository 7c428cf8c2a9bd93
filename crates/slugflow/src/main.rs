//! Per-push build engine entry point.
//!
//! The git receive hook runs this once per accepted push. Stdout is what the
//! pusher sees in their terminal; operator diagnostics go to stderr. The
//! process exit code classifies the failure for the hook.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use slugflow_build::{BuildError, BuildRequest, Builder, Config};
use slugflow_controller::ControllerClient;
use slugflow_storage::FilesystemStorage;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "slugflow")]
#[command(about = "Build engine for git-push deploys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one pushed revision and publish it as a release
    Build {
        /// Application name
        #[arg(long)]
        app: String,
        /// Account name of the pushing user
        #[arg(long)]
        user: String,
        /// Full 40-hex revision to build
        #[arg(long)]
        sha: String,
        /// Path to the bare repository on disk
        #[arg(long)]
        repo_dir: PathBuf,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => {}
        Err(err) => {
            // The pusher sees the classified failure in their push output.
            println!("{}", err.to_string().red());
            std::process::exit(err.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), BuildError> {
    match cli.command {
        Commands::Version => {
            println!("slugflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Build {
            app,
            user,
            sha,
            repo_dir,
        } => {
            let config = Config::from_env()?;

            let storage = Arc::new(FilesystemStorage::new(&config.storage_root));
            let controller = ControllerClient::new(
                &config.controller_host,
                config.controller_port,
                config.builder_key.clone(),
            );
            let kube = kube::Client::try_default()
                .await
                .map_err(|e| BuildError::Kubernetes(e.into()))?;

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_cancel.cancel();
                }
            });

            let request = BuildRequest {
                app,
                user,
                sha,
                repo_dir,
            };
            let builder = Builder::new(config, storage, controller, kube);
            builder.build(&request, &cancel).await.map(|_| ())
        }
    }
}
