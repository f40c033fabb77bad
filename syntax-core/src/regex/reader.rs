//! The byte-reader seam the DFA runtime scans over (spec §6.2).

use std::io;

/// A forward-seekable byte source. The DFA runtime only ever needs to back
/// up to the position of its last accepted match, never arbitrarily far, so
/// this is deliberately narrower than `std::io::{Read, Seek}`.
pub trait TextReader {
    /// Read up to `buf.len()` bytes, returning the number read. `0` means
    /// end of text.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Move the read position back by `k` bytes.
    fn seek_backward(&mut self, k: usize) -> io::Result<()>;
}

/// A `TextReader` over an in-memory byte slice, for tests and for hosts
/// that keep the whole buffer resident.
pub struct SliceReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        SliceReader { bytes, pos: 0 }
    }

    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        SliceReader { bytes, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

impl TextReader for SliceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.bytes[self.pos.min(self.bytes.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn seek_backward(&mut self, k: usize) -> io::Result<()> {
        self.pos = self.pos.checked_sub(k).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of buffer")
        })?;
        Ok(())
    }
}
