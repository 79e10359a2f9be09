//! Byte stream primitives
//!
//! Blocking reads and writes with no timeouts of their own; a read on a dead
//! peer blocks until the underlying reader gives up.

use std::io::{self, BufRead, Read, Write};

use crate::protocol::MAX_LINE_LEN;

/// Transport used by the client
pub trait ByteStream {
    /// Write all of `buf` and flush it
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Read up to and including the next `\n`
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Read exactly `len` bytes
    fn read_exact(&mut self, len: usize) -> io::Result<Vec<u8>>;

    /// Flush pending output and release the stream
    fn close(&mut self) -> io::Result<()>;
}

/// `ByteStream` over a buffered reader and a writer
pub struct BufStream<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> BufStream<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> ByteStream for BufStream<R, W> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)?;
        self.writer.flush()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        let limit = MAX_LINE_LEN as u64;
        let n = (&mut self.reader).take(limit).read_until(b'\n', &mut line)?;

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            ));
        }
        if line.last() != Some(&b'\n') {
            if line.len() >= MAX_LINE_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("reply line longer than {} bytes", MAX_LINE_LEN),
                ));
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed in the middle of a line",
            ));
        }

        Ok(line)
    }

    fn read_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        // Grow with the bytes that actually arrive, not the announced length
        let mut buf = Vec::new();
        let n = (&mut self.reader).take(len as u64).read_to_end(&mut buf)?;
        if n < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed after {} of {} bytes", n, len),
            ));
        }
        Ok(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
