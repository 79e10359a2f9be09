//! TCP Connection
//!
//! Opens and configures the socket a client talks through.

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{BufStream, ByteStream};
use crate::config::ClientConfig;
use crate::error::{McError, Result};

/// A connected, buffered TCP stream to one server
pub struct TcpConnection {
    /// Buffered halves of the same socket
    inner: BufStream<BufReader<TcpStream>, BufWriter<TcpStream>>,

    /// Peer address for logging
    peer_addr: String,
}

impl TcpConnection {
    /// Connect to `config.server_addr`
    ///
    /// Every resolved address is tried in turn; the last failure is returned
    /// when none accepts.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let addrs = config.server_addr.to_socket_addrs().map_err(|e| {
            McError::Config(format!("cannot resolve {}: {}", config.server_addr, e))
        })?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = if config.connect_timeout_ms > 0 {
                TcpStream::connect_timeout(&addr, Duration::from_millis(config.connect_timeout_ms))
            } else {
                TcpStream::connect(addr)
            };

            match attempt {
                Ok(stream) => return Self::from_stream(stream, config),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => McError::Io(e),
            None => McError::Config(format!(
                "{} did not resolve to any address",
                config.server_addr
            )),
        })
    }

    /// Wrap an already connected stream, applying the socket options in
    /// `config`
    pub fn from_stream(stream: TcpStream, config: &ClientConfig) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(config.nodelay)?;

        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;

        tracing::debug!("Connected to {}", peer_addr);

        Ok(Self {
            inner: BufStream::new(BufReader::new(read_stream), BufWriter::new(stream)),
            peer_addr,
        })
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl ByteStream for TcpConnection {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.inner.read_line()
    }

    fn read_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        self.inner.read_exact(len)
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()?;

        match self.inner.writer().get_ref().shutdown(Shutdown::Both) {
            Ok(()) => {}
            // Already torn down by the peer
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => return Err(e),
        }

        tracing::debug!("Closed connection to {}", self.peer_addr);
        Ok(())
    }
}
