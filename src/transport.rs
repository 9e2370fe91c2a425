//! Serving a tool server over stdio, MCP streamable HTTP, or legacy SSE.

use std::net::SocketAddr;

use anyhow::Result;
use rmcp::{
    transport::{
        sse_server::{SseServer, SseServerConfig},
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
        },
    },
    ServerHandler, ServiceExt,
};
use tokio_util::sync::CancellationToken;

pub const MCP_PATH: &str = "/mcp";
pub const SSE_PATH: &str = "/sse";
pub const SSE_POST_PATH: &str = "/message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Transport {
    /// JSON-RPC over stdin/stdout
    Stdio,
    /// Streamable HTTP at `/mcp`
    Http,
    /// Event stream at `/sse`, client messages posted to `/message`
    Sse,
}

/// How a server is exposed once the process is up.
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    pub transport: Transport,
    pub bind: SocketAddr,
    /// Keep per-client sessions on the streamable HTTP transport.
    pub stateful: bool,
}

pub async fn serve<S, F>(factory: F, options: ServeOptions) -> Result<()>
where
    S: ServerHandler,
    F: Fn() -> S + Send + Sync + 'static,
{
    match options.transport {
        Transport::Stdio => serve_stdio(factory()).await,
        Transport::Http => {
            let router = http_router(factory, options.stateful);
            serve_router(router, options.bind, MCP_PATH, shutdown_on_ctrl_c()).await
        }
        Transport::Sse => {
            let shutdown = shutdown_on_ctrl_c();
            let router = sse_router(factory, options.bind, shutdown.clone());
            serve_router(router, options.bind, SSE_PATH, shutdown).await
        }
    }
}

async fn serve_stdio<S: ServerHandler>(server: S) -> Result<()> {
    tracing::info!("serving on stdio");
    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;
    let reason = service.waiting().await?;
    tracing::info!(?reason, "stdio session ended");
    Ok(())
}

/// Streamable HTTP endpoint mounted at [`MCP_PATH`]. Stateless routers answer
/// each POST on its own and never issue an `mcp-session-id`.
pub fn http_router<S, F>(factory: F, stateful: bool) -> axum::Router
where
    S: ServerHandler,
    F: Fn() -> S + Send + Sync + 'static,
{
    let service = StreamableHttpService::new(
        move || Ok(factory()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: stateful,
            ..Default::default()
        },
    );
    axum::Router::new().nest_service(MCP_PATH, service)
}

/// SSE endpoints at [`SSE_PATH`] and [`SSE_POST_PATH`]. Every connected
/// client gets its own server from `factory`; cancelling `shutdown` closes
/// all of them.
pub fn sse_router<S, F>(factory: F, bind: SocketAddr, shutdown: CancellationToken) -> axum::Router
where
    S: ServerHandler,
    F: Fn() -> S + Send + Sync + 'static,
{
    let (sse_server, router) = SseServer::new(SseServerConfig {
        bind,
        sse_path: SSE_PATH.to_string(),
        post_path: SSE_POST_PATH.to_string(),
        ct: shutdown,
        sse_keep_alive: None,
    });
    sse_server.with_service(factory);
    router
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            trigger.cancel();
        }
    });
    shutdown
}

async fn serve_router(
    router: axum::Router,
    bind: SocketAddr,
    path: &str,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, path, "serving on http");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
