use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings, Handler};

pub async fn run(cfg: &Config, handler: Arc<dyn Handler>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {}", cfg.listen_addr);

    serve(listener, cfg, handler).await
}

/// Accepts connections forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    cfg: &Config,
    handler: Arc<dyn Handler>,
) -> anyhow::Result<()> {
    let settings = ConnectionSettings::from(cfg);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, handler, settings).with_peer(peer);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
