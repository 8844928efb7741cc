//! Session layer for the cfclient engine.
//!
//! Takes a fresh connection through the handshake: version exchange,
//! setup negotiation, the initial `requestinfo` queries and `addme`.
//!
//! - **State** ([`ConnectionState`]): strictly forward, one step at a
//!   time, reset to `Connecting` on disconnect.
//! - **Negotiation** ([`Handshake`]): turns server replies into
//!   [`Action`]s and keeps the [`Capabilities`] the decoder relies on.
//! - **Configuration** ([`SessionConfig`]): what the client asks for.
//!
//! The layer does no I/O. The connection in `cfclient` owns the socket
//! and executes the actions.

mod config;
mod error;
mod handshake;
pub mod setup;
mod state;

pub use cfclient_protocol::{Capabilities, MapSize};
pub use config::SessionConfig;
pub use error::SessionError;
pub use handshake::{Action, Handshake, SIMPLE_WEAPON_SPEED_VERSION};
pub use state::ConnectionState;
