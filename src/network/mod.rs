//! Network Module
//!
//! The byte stream the client talks through.
//!
//! ## Layout
//! - `ByteStream`: the four primitives the protocol needs (write, read a
//!   line, read an exact byte count, close)
//! - `BufStream`: `ByteStream` over any buffered reader/writer pair
//! - `TcpConnection`: a configured TCP socket wrapped in a `BufStream`

mod stream;
mod connection;

pub use stream::{BufStream, ByteStream};
pub use connection::TcpConnection;
