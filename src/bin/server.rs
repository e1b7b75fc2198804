use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use hkube_mcp::config::Config;
use hkube_mcp::logging::init_server_logging;
use hkube_mcp::mcp::McpServer;
use hkube_mcp::tools::registry_from_config;

#[derive(Parser, Debug)]
#[command(name = "hkube-mcp-server", version)]
#[command(about = "Stdio MCP server exposing HKube tools and resources", long_about = None)]
struct ServerArgs {
    #[arg(long = "config", help = "Path to the YAML config file")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };
    let _guard = init_server_logging(&config.logs_dir, config.debug);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let registry = registry_from_config(&config)?;
    tracing::info!(
        name = %config.assistant_name,
        tools = registry.len(),
        resources = registry.resources().len(),
        "starting MCP server on stdio"
    );

    let server = Arc::new(McpServer::new(Arc::new(registry), config.assistant_name.clone()));
    server.serve_stdio().await.context("stdio transport failed")?;
    tracing::info!("MCP server stopped");
    Ok(())
}
