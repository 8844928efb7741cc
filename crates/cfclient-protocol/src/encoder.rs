//! Outgoing requests.
//!
//! Each [`OutgoingRequest`] becomes one message: an ASCII keyword, a space,
//! and the arguments in the same encodings the decoder understands. ASCII
//! decimals are used where the server expects text, big-endian integers
//! where it expects binary.

use std::sync::atomic::{AtomicU8, Ordering};

use bytes::{BufMut, BytesMut};

/// A typed client-to-server request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingRequest {
    /// Ask to join the game once the handshake is done.
    AddMe,
    Apply { tag: u32 },
    /// Request the image for a face number.
    AskFace { face: u32 },
    Examine { tag: u32 },
    Lock { locked: bool, tag: u32 },
    LookAt { dx: i32, dy: i32 },
    Mark { tag: u32 },
    Move { to: u32, tag: u32, nrof: u32 },
    /// A player command with acknowledgement. The sequence id is assigned
    /// by [`CommandEncoder`] at encode time.
    Ncom { repeat: u32, command: String },
    Reply { text: String },
    RequestInfo { kind: String },
    /// `(option, value)` pairs.
    Setup { options: Vec<(String, String)> },
    ToggleExtendedText { types: Vec<u8> },
    Version { client: u32, server: u32, info: String },
}

impl OutgoingRequest {
    /// The wire keyword of this request.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::AddMe => "addme",
            Self::Apply { .. } => "apply",
            Self::AskFace { .. } => "askface",
            Self::Examine { .. } => "examine",
            Self::Lock { .. } => "lock",
            Self::LookAt { .. } => "lookat",
            Self::Mark { .. } => "mark",
            Self::Move { .. } => "move",
            Self::Ncom { .. } => "ncom",
            Self::Reply { .. } => "reply",
            Self::RequestInfo { .. } => "requestinfo",
            Self::Setup { .. } => "setup",
            Self::ToggleExtendedText { .. } => "toggleextendedtext",
            Self::Version { .. } => "version",
        }
    }
}

/// Serializes [`OutgoingRequest`]s.
///
/// The encoder owns the `ncom` sequence counter. It is an 8-bit counter
/// starting at 1 that wraps modulo 256; it is sent as a 2-byte field. The
/// encoder itself is stateless otherwise and can be shared freely, but the
/// id it hands out only matches wire order if encoding and writing happen
/// under the same lock (see `FrameWriter::send_with`).
#[derive(Debug)]
pub struct CommandEncoder {
    next_ncom: AtomicU8,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self { next_ncom: AtomicU8::new(1) }
    }
}

impl CommandEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the payload of `request` to `out`.
    ///
    /// Returns the sequence id for an `ncom` request, `None` otherwise.
    pub fn encode(&self, request: &OutgoingRequest, out: &mut BytesMut) -> Option<u8> {
        out.put_slice(request.keyword().as_bytes());
        match request {
            OutgoingRequest::AddMe => {}
            OutgoingRequest::Apply { tag } | OutgoingRequest::Examine { tag } => {
                out.put_u8(b' ');
                put_decimal(out, *tag);
            }
            OutgoingRequest::AskFace { face } => {
                out.put_u8(b' ');
                put_decimal(out, *face);
            }
            OutgoingRequest::Lock { locked, tag } => {
                out.put_u8(b' ');
                out.put_u8(u8::from(*locked));
                out.put_u32(*tag);
            }
            OutgoingRequest::LookAt { dx, dy } => {
                out.put_u8(b' ');
                put_decimal(out, *dx);
                out.put_u8(b' ');
                put_decimal(out, *dy);
            }
            OutgoingRequest::Mark { tag } => {
                out.put_u8(b' ');
                out.put_u32(*tag);
            }
            OutgoingRequest::Move { to, tag, nrof } => {
                out.put_u8(b' ');
                put_decimal(out, *to);
                out.put_u8(b' ');
                put_decimal(out, *tag);
                out.put_u8(b' ');
                put_decimal(out, *nrof);
            }
            OutgoingRequest::Ncom { repeat, command } => {
                let id = self.next_ncom.fetch_add(1, Ordering::Relaxed);
                out.put_u8(b' ');
                out.put_u16(u16::from(id));
                out.put_u32(*repeat);
                out.put_slice(command.as_bytes());
                return Some(id);
            }
            OutgoingRequest::Reply { text } => {
                out.put_u8(b' ');
                out.put_slice(text.as_bytes());
            }
            OutgoingRequest::RequestInfo { kind } => {
                out.put_u8(b' ');
                out.put_slice(kind.as_bytes());
            }
            OutgoingRequest::Setup { options } => {
                if options.is_empty() {
                    out.put_u8(b' ');
                }
                for (option, value) in options {
                    out.put_u8(b' ');
                    out.put_slice(option.as_bytes());
                    out.put_u8(b' ');
                    out.put_slice(value.as_bytes());
                }
            }
            OutgoingRequest::ToggleExtendedText { types } => {
                for kind in types {
                    out.put_u8(b' ');
                    put_decimal(out, *kind);
                }
            }
            OutgoingRequest::Version { client, server, info } => {
                out.put_u8(b' ');
                put_decimal(out, *client);
                out.put_u8(b' ');
                put_decimal(out, *server);
                out.put_u8(b' ');
                out.put_slice(info.as_bytes());
            }
        }
        None
    }

    /// Encodes `request` into a fresh buffer. Convenient in tests and for
    /// one-off sends.
    pub fn encode_to_vec(&self, request: &OutgoingRequest) -> (Vec<u8>, Option<u8>) {
        let mut out = BytesMut::new();
        let id = self.encode(request, &mut out);
        (out.to_vec(), id)
    }
}

fn put_decimal(out: &mut BytesMut, value: impl std::fmt::Display) {
    out.put_slice(value.to_string().as_bytes());
}
