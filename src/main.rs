use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use mcpki::common::GatewayResult;
use mcpki::config::GatewayConfig;
use mcpki::fetcher::TlsFetcher;
use mcpki::registry::ToolRegistry;
use mcpki::server::{McpServer, DEFAULT_WORKERS};
use mcpki::tools::CaGateway;

/// MCP server exposing CA operations as tools over stdio.
#[derive(Debug, Parser)]
#[command(name = "mcpki-server", version, about)]
struct Args {
    /// Path of the YAML configuration file.
    #[arg(short, long, env = "MCPKI_CONFIG", default_value = "/etc/mcpki/config.yaml")]
    config: String,

    /// Log filter used when RUST_LOG is not set (logs go to stderr).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Maximum number of tool calls served at once.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Print the enabled tools and exit.
    #[arg(long)]
    list_tools: bool,
}

fn run(args: &Args) -> GatewayResult<()> {
    let config = GatewayConfig::load(&args.config)?;
    let fetcher = TlsFetcher::new(&config.backend)?;
    let gateway = CaGateway::new(Arc::new(fetcher), &config);
    let registry = ToolRegistry::new(gateway, &config.tools);

    if args.list_tools {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let server = McpServer::with_workers(registry, args.workers);
    log::info!("Serving MCP requests on stdio");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    server.serve(stdin.lock(), &mut stdout)
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str()))
        .target(env_logger::Target::Stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
