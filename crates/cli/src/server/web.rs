use sentry_dns_api::{create_api_routes, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub async fn start_web_server(bind_addr: String, state: AppState) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = bind_addr.parse()?;
    let app = create_api_routes(state);

    info!(bind_address = %socket_addr, "Starting web API server");
    let listener = TcpListener::bind(socket_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
