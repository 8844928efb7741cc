//! # cfclient
//!
//! Client-side protocol engine for Crossfire-style game servers.
//!
//! The engine frames the byte stream, decodes each message into a typed
//! [`Command`], drives the connection handshake and encodes outgoing
//! requests. Everything else (rendering, inventory, chat) consumes the
//! [`Event`]s it emits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cfclient::{ClientConfig, Event, ServerConnection};
//!
//! # async fn run() -> Result<(), cfclient::ClientError> {
//! let connection = ServerConnection::new(ClientConfig::new("localhost:13327"))?;
//! connection.add_sink(Arc::new(|event: &Event| println!("{event:?}")));
//! connection.connect().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod event;

pub use config::{ClientConfig, DEFAULT_PORT};
pub use connection::ServerConnection;
pub use error::ClientError;
pub use event::{Event, EventSink, SinkId, SinkRegistry};

pub use cfclient_protocol::{
    Capabilities, Command, MapDelta, MapSize, OutgoingRequest, ProtocolError, RedrawLock,
};
pub use cfclient_session::{ConnectionState, SessionConfig, SessionError};
pub use cfclient_transport::TransportError;

/// Layer crates, for access to their full APIs.
pub use cfclient_protocol as protocol;
pub use cfclient_session as session;
pub use cfclient_transport as transport;
