use anyhow::Result;
use callpath::app::engine::AnalysisEngine;
use callpath::cli::{Cli, Commands, export_dot, print_relations, print_traces, run_shell};
use callpath::server::{http, mcp::TraceMcpServer};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries results (and the MCP protocol), so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("callpath=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let engine = AnalysisEngine::load(&cli.database, &cli.sources)?;

    match cli.command {
        Commands::Trace {
            components,
            direct,
            json,
        } => print_traces(&engine, &components, direct, json, &mut std::io::stdout())?,
        Commands::Dot { output } => export_dot(&engine, output.as_deref())?,
        Commands::Relations { json } => print_relations(&engine, json, &mut std::io::stdout())?,
        Commands::Shell => run_shell(&engine, std::io::stdin().lock(), &mut std::io::stdout())?,
        Commands::Serve { addr } => http::serve(engine, addr).await?,
        Commands::Mcp => TraceMcpServer::new(engine).serve_stdio().await?,
    }

    Ok(())
}
