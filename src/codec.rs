//! Byte writer/reader used by the record layer and handshake message
//! builders. Mirrors the operation set of a bounded byte-buffer writer and
//! cursor-based reader: fixed-width integer reads/writes, raw byte
//! runs, and zero-fill, with reads failing closed on truncation instead of
//! panicking.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Result, TlsError};

/// Growable byte buffer writer. All operations are infallible by
/// construction (the buffer grows as needed); callers obtain the finished
/// bytes with `take`.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Writer { buf: Vec::with_capacity(cap) }
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn put_u16_be(&mut self, v: u16) -> &mut Self {
        let mut tmp = [0u8; 2];
        BigEndian::write_u16(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
        self
    }

    pub fn put_u16_le(&mut self, v: u16) -> &mut Self {
        let mut tmp = [0u8; 2];
        LittleEndian::write_u16(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
        self
    }

    pub fn put_u24_be(&mut self, v: u32) -> &mut Self {
        debug_assert!(v <= 0x00FF_FFFF);
        let mut tmp = [0u8; 4];
        BigEndian::write_u32(&mut tmp, v);
        self.buf.extend_from_slice(&tmp[1..]);
        self
    }

    pub fn put_u64_be(&mut self, v: u64) -> &mut Self {
        let mut tmp = [0u8; 8];
        BigEndian::write_u64(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
        self
    }

    pub fn put_data(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub fn fill(&mut self, value: u8, count: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + count, value);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer, returning its accumulated bytes.
    pub fn take(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

/// Cursor-based reader over a borrowed byte slice. Every read checks bounds
/// and returns `TlsError::DecodeError` on truncation rather than panicking,
/// since the bytes being parsed ultimately come from an untrusted peer.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(TlsError::DecodeError("truncated record: not enough bytes"));
        }
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take_slice(1)?[0])
    }

    pub fn get_u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take_slice(2)?))
    }

    pub fn get_u24_be(&mut self) -> Result<u32> {
        let s = self.take_slice(3)?;
        Ok(u32::from(s[0]) << 16 | u32::from(s[1]) << 8 | u32::from(s[2]))
    }

    pub fn get_u64_be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.take_slice(8)?))
    }

    pub fn dup_data(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take_slice(n)?.to_vec())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take_slice(n)?;
        Ok(())
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let s = &self.data[self.pos..];
        self.pos = self.data.len();
        s
    }
}
