//! Command handlers -- one module per subcommand

pub mod collect;
pub mod config;
pub mod matching;
pub mod reclaim;
pub mod summary;
pub mod truncate;

use std::sync::Arc;

use kubetriage_core::config::{ArtifactConfig, TimeoutConfig};
use kubetriage_kubectl::KubectlClient;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

/// Build the kubectl client from the global `--kubeconfig` / `--context` flags.
pub fn kubectl_client(cli: &Cli) -> KubectlClient {
    let mut client = KubectlClient::new();
    if let Some(path) = &cli.kubeconfig {
        client = client.with_kubeconfig(path.display().to_string());
    }
    if let Some(context) = &cli.context {
        client = client.with_context(context.as_str());
    }
    client
}

/// Route a parsed command line to its handler.
pub async fn dispatch(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    let cluster = Arc::new(kubectl_client(&cli));
    let timeouts = TimeoutConfig::from_env();

    match cli.command {
        Commands::Reclaim(args) => reclaim::execute(args, cluster, &timeouts, writer).await,
        Commands::Collect(args) => {
            collect::execute(args, cluster, ArtifactConfig::from_env(), &timeouts, writer).await
        }
        Commands::Summary(args) => summary::execute(args, writer).await,
        Commands::Truncate(args) => truncate::execute(args, writer).await,
        Commands::Config(args) => config::execute(args, writer).await,
        Commands::Match(args) => matching::execute(args, writer).await,
    }
}
