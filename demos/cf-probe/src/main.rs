//! Connects to a game server, runs the handshake and logs every event.
//!
//! ```text
//! cf-probe [ADDRESS] [--config FILE] [--map-size WxH]
//! ```
//!
//! Set `RUST_LOG=cfclient=debug` to also see the engine's own logging.

use std::sync::Arc;

use cfclient::{ClientConfig, Command, ConnectionState, Event, MapSize, ServerConnection};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cf_probe=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => ClientConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ClientConfig::default(),
    };
    if let Some(address) = args.first().filter(|a| !a.starts_with("--")) {
        config.address = address.clone();
    }
    let resize = flag_value(&args, "--map-size")
        .map(|s| s.parse::<MapSize>())
        .transpose()?;

    let connection = ServerConnection::new(config)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    connection.add_sink(Arc::new(move |event: &Event| {
        let _ = tx.send(event.clone());
    }));

    tracing::info!(address = %connection.config().address, "connecting");
    connection.connect().await?;

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                connection.disconnect("interrupted").await;
                break;
            }
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        log_event(&event);

        match event {
            Event::StateChanged { to: ConnectionState::Connected, .. } => {
                tracing::info!(caps = ?connection.capabilities(), "handshake complete");
                if let Some(size) = resize {
                    connection.set_map_size(size).await?;
                }
            }
            Event::Disconnected { .. } => break,
            _ => {}
        }
    }
    Ok(())
}

fn log_event(event: &Event) {
    match event {
        Event::Command(Command::DrawInfo { text, .. }) => tracing::info!("{text}"),
        Event::Command(Command::DrawExtInfo { message, .. }) => tracing::info!("{message}"),
        Event::Command(Command::Query { text, .. }) => tracing::info!(query = %text, "server asks"),
        Event::Command(command) => tracing::debug!(command = command.keyword(), "{command:?}"),
        Event::MapBegin | Event::Map(_) | Event::MapEnd => tracing::trace!(?event, "map"),
        Event::StateChanged { from, to } => tracing::info!(%from, %to, "state"),
        Event::ProtocolError(err) => tracing::warn!(%err, "bad message"),
        Event::Disconnected { reason, is_error } => {
            tracing::info!(%reason, is_error, "disconnected");
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
