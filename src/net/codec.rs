//! Binary wire codec: fixed-width little-endian primitives, LEB128-style
//! variable-length unsigned integers, and length-prefixed byte strings.

use std::fmt;

/// Errors that can occur while decoding a packet
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unexpected end of packet at byte {0}")]
    UnexpectedEof(usize),
    #[error("Varuint longer than 10 bytes")]
    VarintOverflow,
    #[error("Declared length {0} exceeds remaining packet bytes")]
    BadLength(usize),
}

/// Append-only packet writer
#[derive(Default)]
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// LEB128 unsigned: 7 payload bits per byte, high bit marks continuation
    pub fn write_varuint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buffer.push(byte);
                return;
            }
            self.buffer.push(byte | 0x80);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Varuint length followed by the raw bytes
    pub fn write_string(&mut self, s: &str) {
        self.write_varuint(s.len() as u64);
        self.buffer.extend_from_slice(s.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Writer({} bytes)", self.buffer.len())
    }
}

/// Cursor-based packet reader
pub struct Reader<'a> {
    data: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, at: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.at
    }

    pub fn position(&self) -> usize {
        self.at
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof(self.at));
        }
        let slice = &self.data[self.at..self.at + n];
        self.at += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_varuint(&mut self) -> Result<u64, CodecError> {
        let mut value = 0u64;
        for shift in (0..=63).step_by(7) {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(CodecError::VarintOverflow);
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::VarintOverflow)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::BadLength(n));
        }
        self.take(n)
    }

    /// Varuint length followed by the raw bytes, lossily decoded
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_varuint()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_width_round_trip() {
        let mut w = Writer::new();
        w.write_u8(0xab);
        w.write_u16(0x1234);
        w.write_u32(0xdeadbeef);
        w.write_u64(u64::MAX);
        w.write_f32(-1.5);

        let mut r = Reader::new(w.as_slice());
        assert_eq!(r.read_u8().unwrap(), 0xab);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xdeadbeef);
        assert_eq!(r.read_u64().unwrap(), u64::MAX);
        assert_eq!(r.read_f32().unwrap(), -1.5);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_varuint_boundaries() {
        for value in [0u64, 1, 127, 128, 129, 16383, 16384, u32::MAX as u64, u64::MAX] {
            let mut w = Writer::new();
            w.write_varuint(value);
            let mut r = Reader::new(w.as_slice());
            assert_eq!(r.read_varuint().unwrap(), value, "value {value}");
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn test_varuint_encoded_sizes() {
        let mut w = Writer::new();
        w.write_varuint(127);
        assert_eq!(w.len(), 1);
        let mut w = Writer::new();
        w.write_varuint(128);
        assert_eq!(w.len(), 2);
        let mut w = Writer::new();
        w.write_varuint(u64::MAX);
        assert_eq!(w.len(), 10);
    }

    #[test]
    fn test_string_round_trip() {
        let mut w = Writer::new();
        w.write_string("rivet-token-xyz");
        let mut r = Reader::new(w.as_slice());
        assert_eq!(r.read_string().unwrap(), "rivet-token-xyz");
    }

    #[test]
    fn test_short_read_errors() {
        let mut r = Reader::new(&[0x01]);
        assert_eq!(r.read_u32(), Err(CodecError::UnexpectedEof(0)));
    }

    #[test]
    fn test_truncated_varuint_errors() {
        let mut r = Reader::new(&[0x80, 0x80]);
        assert!(r.read_varuint().is_err());
    }

    #[test]
    fn test_overlong_string_length_errors() {
        let mut w = Writer::new();
        w.write_varuint(1000);
        w.write_bytes(b"short");
        let mut r = Reader::new(w.as_slice());
        assert_eq!(r.read_string(), Err(CodecError::BadLength(1000)));
    }

    proptest! {
        #[test]
        fn prop_varuint_round_trips(value: u64) {
            let mut w = Writer::new();
            w.write_varuint(value);
            let mut r = Reader::new(w.as_slice());
            prop_assert_eq!(r.read_varuint().unwrap(), value);
            prop_assert_eq!(r.remaining(), 0);
        }

        #[test]
        fn prop_mixed_sequences_round_trip(a: u8, b: u64, c: u32, d: f32) {
            let mut w = Writer::new();
            w.write_u8(a);
            w.write_varuint(b);
            w.write_u32(c);
            w.write_f32(d);
            let mut r = Reader::new(w.as_slice());
            prop_assert_eq!(r.read_u8().unwrap(), a);
            prop_assert_eq!(r.read_varuint().unwrap(), b);
            prop_assert_eq!(r.read_u32().unwrap(), c);
            let back = r.read_f32().unwrap();
            prop_assert!(back == d || (back.is_nan() && d.is_nan()));
        }
    }
}
