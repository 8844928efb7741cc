//! The wire framing: a 2-byte big-endian length followed by the payload.
//!
//! ```text
//! ┌──────────┬──────────────────────────────┐
//! │ len: u16 │ payload (len bytes)          │
//! └──────────┴──────────────────────────────┘
//! ```
//!
//! The length never includes the prefix itself, so the largest payload is
//! 65535 bytes. TCP delivers a byte stream, not messages: a single read may
//! end in the middle of a prefix or a payload, and may also contain several
//! complete frames at once. [`FrameBuffer`] absorbs both cases.

use bytes::{Buf, BufMut, BytesMut};

use crate::TransportError;

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 2;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

// ---------------------------------------------------------------------------
// FrameBuffer: read side
// ---------------------------------------------------------------------------

/// Accumulates raw stream bytes and splits them into complete frames.
///
/// Bytes are appended with [`extend`](Self::extend) (or read directly into
/// [`spare_mut`](Self::spare_mut)); complete frames are removed from the
/// front with [`next_frame`](Self::next_frame). Whatever remains after the
/// last complete frame is kept for the next read.
///
/// `split_to` hands out the frame as its own `BytesMut` without copying.
/// Once the caller drops it, the allocation is reclaimed by the next
/// `reserve`, which gives the same compact-after-dispatch behaviour as a
/// manual memmove.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
    /// Length of the frame whose prefix has been consumed but whose payload
    /// has not fully arrived yet.
    pending_len: Option<usize>,
}

impl FrameBuffer {
    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            pending_len: None,
        }
    }

    /// Appends bytes received from the stream.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Makes room for at least `additional` more bytes and returns the
    /// buffer so a reader can append into it directly.
    pub fn spare_mut(&mut self, additional: usize) -> &mut BytesMut {
        self.buf.reserve(additional);
        &mut self.buf
    }

    /// Removes and returns the next complete frame payload, if one is
    /// available.
    pub fn next_frame(&mut self) -> Option<BytesMut> {
        let len = match self.pending_len {
            Some(len) => len,
            None => {
                if self.buf.len() < HEADER_LEN {
                    return None;
                }
                let len = self.buf.get_u16() as usize;
                self.pending_len = Some(len);
                len
            }
        };

        if self.buf.len() < len {
            return None;
        }

        self.pending_len = None;
        Some(self.buf.split_to(len))
    }

    /// Number of bytes held that do not yet form a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len() + self.pending_len.map_or(0, |_| HEADER_LEN)
    }

    /// Returns `true` if no partial frame is pending.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && self.pending_len.is_none()
    }

    /// Drops every buffered byte, including a partially received frame.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.pending_len = None;
    }
}

// ---------------------------------------------------------------------------
// Write side
// ---------------------------------------------------------------------------

/// Appends `payload` to `out` as one complete frame.
///
/// # Errors
/// Returns [`TransportError::FrameTooLarge`] if the payload does not fit the
/// 16-bit prefix. Nothing is written in that case.
pub fn encode_frame(payload: &[u8], out: &mut BytesMut) -> Result<(), TransportError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(TransportError::FrameTooLarge { len: payload.len() });
    }
    out.reserve(HEADER_LEN + payload.len());
    out.put_u16(payload.len() as u16);
    out.put_slice(payload);
    Ok(())
}

/// Wraps whatever `build` appends to `out` in a frame.
///
/// Two zero bytes are reserved for the prefix before calling `build`, and
/// patched once the payload length is known. This lets an encoder write
/// straight into the outgoing buffer without an intermediate copy.
///
/// # Errors
/// Returns [`TransportError::FrameTooLarge`] and truncates `out` back to its
/// previous length if the built payload is too long.
pub fn build_frame<T>(
    out: &mut BytesMut,
    build: impl FnOnce(&mut BytesMut) -> T,
) -> Result<T, TransportError> {
    let start = out.len();
    out.put_u16(0);
    let value = build(out);
    let len = out.len() - start - HEADER_LEN;
    if len > MAX_PAYLOAD_LEN {
        out.truncate(start);
        return Err(TransportError::FrameTooLarge { len });
    }
    out[start..start + HEADER_LEN].copy_from_slice(&(len as u16).to_be_bytes());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut out).unwrap();
        }
        out.to_vec()
    }

    #[test]
    fn test_encode_frame_prefixes_big_endian_length() {
        let bytes = framed(&[b"tick \x00\x00\x00\x01"]);
        assert_eq!(&bytes[..2], &[0x00, 0x09]);
        assert_eq!(&bytes[2..], b"tick \x00\x00\x00\x01");
    }

    #[test]
    fn test_encode_frame_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let mut out = BytesMut::new();
        let err = encode_frame(&payload, &mut out).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { len } if len == MAX_PAYLOAD_LEN + 1));
        assert!(out.is_empty());
    }

    #[test]
    fn test_max_payload_round_trips() {
        let payload = vec![0xAB; MAX_PAYLOAD_LEN];
        let mut buffer = FrameBuffer::default();
        buffer.extend(&framed(&[&payload]));
        let frame = buffer.next_frame().expect("complete frame");
        assert_eq!(frame.len(), MAX_PAYLOAD_LEN);
        assert!(frame.iter().all(|b| *b == 0xAB));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_payload_is_a_frame() {
        let mut buffer = FrameBuffer::default();
        buffer.extend(&[0, 0]);
        let frame = buffer.next_frame().expect("empty frame");
        assert!(frame.is_empty());
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn test_several_frames_in_one_read() {
        let mut buffer = FrameBuffer::default();
        buffer.extend(&framed(&[b"addme_success", b"newmap", b"goodbye"]));
        assert_eq!(&buffer.next_frame().unwrap()[..], b"addme_success");
        assert_eq!(&buffer.next_frame().unwrap()[..], b"newmap");
        assert_eq!(&buffer.next_frame().unwrap()[..], b"goodbye");
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn test_split_at_every_offset_yields_same_frames() {
        let payloads: [&[u8]; 3] = [b"drawinfo 3 hello", b"", b"map2 \x00\x00\xff"];
        let stream = framed(&payloads);

        for split in 0..=stream.len() {
            let mut buffer = FrameBuffer::default();
            let mut frames = Vec::new();

            buffer.extend(&stream[..split]);
            while let Some(frame) = buffer.next_frame() {
                frames.push(frame.to_vec());
            }
            buffer.extend(&stream[split..]);
            while let Some(frame) = buffer.next_frame() {
                frames.push(frame.to_vec());
            }

            let expected: Vec<Vec<u8>> = payloads.iter().map(|p| p.to_vec()).collect();
            assert_eq!(frames, expected, "split at offset {split}");
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_byte_at_a_time_delivery() {
        let stream = framed(&[b"version 1023 1029 server", b"query 0 What is your name?"]);
        let mut buffer = FrameBuffer::default();
        let mut frames = Vec::new();
        for byte in &stream {
            buffer.extend(std::slice::from_ref(byte));
            while let Some(frame) = buffer.next_frame() {
                frames.push(frame.to_vec());
            }
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], b"query 0 What is your name?");
    }

    #[test]
    fn test_partial_frame_is_reported_as_buffered() {
        let mut buffer = FrameBuffer::default();
        buffer.extend(&[0x00, 0x05, b'a', b'b']);
        assert!(buffer.next_frame().is_none());
        assert_eq!(buffer.buffered(), 4);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_build_frame_patches_length() {
        let mut out = BytesMut::new();
        let value = build_frame(&mut out, |b| {
            b.put_slice(b"ncom ");
            b.put_u16(7);
            7u8
        })
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(&out[..], b"\x00\x07ncom \x00\x07");
    }

    #[test]
    fn test_build_frame_rolls_back_oversized_payload() {
        let mut out = BytesMut::from(&b"keep"[..]);
        let err = build_frame(&mut out, |b| b.put_bytes(0, MAX_PAYLOAD_LEN + 10)).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { .. }));
        assert_eq!(&out[..], b"keep");
    }
}
