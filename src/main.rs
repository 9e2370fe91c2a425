use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use geocalc_mcp::config::{
    CredentialProvider, EnvCredentials, GeoConfig, StaticCredentials, DEFAULT_GEOCODER_URL,
    DEFAULT_TIMEOUT_SECS,
};
use geocalc_mcp::transport::{self, ServeOptions, Transport};
use geocalc_mcp::{GeoServer, MathServer};

/// MCP servers for arithmetic and geocoding tools
#[derive(Parser)]
#[command(name = "geocalc-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// Transport to serve on
    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value_t = Transport::Stdio, global = true)]
    transport: Transport,

    /// Listen address for the http and sse transports (math: 0.0.0.0:8000, geo: 0.0.0.0:8001)
    #[arg(long, env = "MCP_BIND", global = true)]
    bind: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the add/subtract/multiply/divide tools
    Math,

    /// Serve the geocoding and distance tools
    Geo(GeoArgs),
}

#[derive(Args)]
struct GeoArgs {
    /// API key for geocode.maps.co; read from GEOLOCATION_API_KEY on each call when omitted
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of the geocoding service
    #[arg(long, env = "GEOCODER_BASE_URL", default_value = DEFAULT_GEOCODER_URL)]
    geocoder_url: String,

    /// Timeout for geocoding requests, in seconds
    #[arg(long, env = "GEOCODER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

fn init_tracing() {
    // stdout carries the JSON-RPC stream on stdio
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv_override().ok();
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Math => {
            let options = ServeOptions {
                transport: cli.transport,
                bind: cli.bind.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000))),
                stateful: false,
            };
            transport::serve(MathServer::new, options).await
        }
        Commands::Geo(args) => {
            let credentials: Arc<dyn CredentialProvider> = match args.api_key {
                Some(key) => Arc::new(StaticCredentials::new(key)),
                None => Arc::new(EnvCredentials::default()),
            };
            let config = GeoConfig::default()
                .with_base_url(args.geocoder_url)
                .with_timeout(Duration::from_secs(args.timeout_secs));
            let server = GeoServer::from_config(config, credentials)?;

            let options = ServeOptions {
                transport: cli.transport,
                bind: cli.bind.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8001))),
                stateful: true,
            };
            transport::serve(move || server.clone(), options).await
        }
    }
}
