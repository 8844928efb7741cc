//! Framed byte transport for the cfclient protocol engine.
//!
//! The server speaks a message-oriented protocol over a plain TCP stream:
//! every message is a 2-byte big-endian length followed by that many bytes.
//! This crate turns the stream into whole messages and back.
//!
//! # Structure
//!
//! - [`FrameBuffer`]: pure, synchronous reassembly of frames from arbitrary
//!   read boundaries.
//! - [`FrameReader`]: drives a `FrameBuffer` from an `AsyncRead`.
//! - [`FrameWriter`]: serializes whole frames onto an `AsyncWrite` under a
//!   single lock, so concurrent senders never interleave.
//! - [`LinkMonitor`]: reports the loss of a link exactly once, whichever
//!   half notices first.
//! - [`connect`]: opens a TCP connection and returns both halves.

mod error;
mod frame;
mod link;
mod reader;
mod tcp;
mod writer;

pub use error::TransportError;
pub use frame::{FrameBuffer, HEADER_LEN, MAX_PAYLOAD_LEN, build_frame, encode_frame};
pub use link::{LinkId, LinkLoss, LinkMonitor};
pub use reader::{DEFAULT_READ_CHUNK, FrameReader};
pub use tcp::{TcpFrameReader, TcpFrameWriter, connect};
pub use writer::FrameWriter;
