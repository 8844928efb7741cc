//! Bounds-checked field access over one message payload.
//!
//! Every accessor returns a `Result`. Running past the end of the payload
//! becomes [`ProtocolError::Truncated`] and a field that is present but
//! unusable becomes [`ProtocolError::Malformed`], so decoders can use `?`
//! throughout and never index a slice directly.

use crate::ProtocolError;

/// A read cursor over a message payload.
///
/// Multi-byte integers are big-endian. The cursor remembers which command
/// it is decoding so that every error it produces names the command.
#[derive(Debug, Clone)]
pub(crate) struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
    command: &'static str,
}

impl<'a> PacketReader<'a> {
    pub(crate) fn new(command: &'static str, buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, command }
    }

    pub(crate) fn command(&self) -> &'static str {
        self.command
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    pub(crate) fn truncated(&self) -> ProtocolError {
        ProtocolError::Truncated { command: self.command }
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::Malformed {
            command: self.command,
            reason: reason.into(),
        }
    }

    /// Takes the next `n` bytes.
    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self.pos.checked_add(n).ok_or_else(|| self.truncated())?;
        let bytes = self.buf.get(self.pos..end).ok_or_else(|| self.truncated())?;
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Looks at the next byte without consuming it.
    pub(crate) fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn i8(&mut self) -> Result<i8, ProtocolError> {
        Ok(i8::from_be_bytes(self.array()?))
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub(crate) fn i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    /// Everything that is left, consuming it.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }

    /// A string of exactly `len` bytes. Invalid UTF-8 is replaced rather
    /// than rejected; servers occasionally send Latin-1 item names.
    pub(crate) fn string(&mut self, len: usize) -> Result<String, ProtocolError> {
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    /// A string with a 1-byte length prefix.
    pub(crate) fn string8(&mut self) -> Result<String, ProtocolError> {
        let len = self.u8()? as usize;
        self.string(len)
    }

    /// A string with a 2-byte length prefix.
    pub(crate) fn string16(&mut self) -> Result<String, ProtocolError> {
        let len = self.u16()? as usize;
        self.string(len)
    }

    /// The rest of the payload as a string.
    pub(crate) fn rest_string(&mut self) -> String {
        String::from_utf8_lossy(self.rest()).into_owned()
    }

    /// An ASCII decimal terminated by a single space, which is consumed.
    ///
    /// At least one digit is required and the terminating space must be
    /// present: a message that ends inside the number is truncated.
    pub(crate) fn decimal(&mut self) -> Result<u32, ProtocolError> {
        let mut value: u32 = 0;
        loop {
            let b = self.u8()?;
            let digit = match b {
                b'0'..=b'9' => u32::from(b - b'0'),
                _ => return Err(self.malformed(format!("invalid digit {b:#04x}"))),
            };
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| self.malformed("decimal overflows 32 bits"))?;
            match self.peek() {
                Some(b' ') => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some(_) => {}
                None => return Err(self.truncated()),
            }
        }
    }

    /// Like [`decimal`](Self::decimal) but accepts a leading `-`.
    pub(crate) fn signed_decimal(&mut self) -> Result<i32, ProtocolError> {
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let magnitude = self.decimal()?;
        let value = i32::try_from(magnitude)
            .map_err(|_| self.malformed("decimal overflows 32 bits"))?;
        Ok(if negative { -value } else { value })
    }

    /// An ASCII decimal occupying the rest of the payload.
    pub(crate) fn trailing_decimal(&mut self) -> Result<u32, ProtocolError> {
        let digits = self.rest();
        if digits.is_empty() {
            return Err(self.truncated());
        }
        digits.iter().try_fold(0u32, |acc, &b| {
            if !b.is_ascii_digit() {
                return Err(self.malformed(format!("invalid digit {b:#04x}")));
            }
            acc.checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(b - b'0')))
                .ok_or_else(|| self.malformed("decimal overflows 32 bits"))
        })
    }

    /// Fails if any bytes are left over.
    pub(crate) fn finish(&self) -> Result<(), ProtocolError> {
        if self.has_remaining() {
            return Err(self.malformed(format!(
                "{} bytes of excess data",
                self.remaining()
            )));
        }
        Ok(())
    }
}
