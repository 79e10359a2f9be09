//! # memtext
//!
//! A blocking client for the memcached text protocol over one TCP
//! connection:
//! - Storage verbs (`set`, `add`, `replace`, `append`, `prepend`, `cas`)
//! - Single and multi-key retrieval, with or without cas tokens
//! - `delete`, `incr`/`decr`, `stats` and `flush_all`
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Caller                               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  typed results (StoreStatus, Option<Vec<u8>>, ...)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Client                                │
//! │          (one request in flight, &mut self per op)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Encode    │          │   Decode    │
//!   │ (commands)  │          │ line + len  │
//!   └──────┬──────┘          └──────▲──────┘
//!          │                        │
//!          ▼                        │
//!   ┌─────────────────────────────────────┐
//!   │             ByteStream              │
//!   │           (TcpConnection)           │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use memtext::{Client, ClientConfig};
//!
//! let config = ClientConfig::builder().server_addr("127.0.0.1:11211").build();
//! let mut client = Client::connect(&config)?;
//!
//! client.set(b"greeting", b"hello", 0)?;
//! assert_eq!(client.get(b"greeting")?, Some(b"hello".to_vec()));
//! client.close()?;
//! # Ok::<(), memtext::McError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod network;
pub mod protocol;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{McError, Result};
pub use config::ClientConfig;
pub use client::Client;
pub use protocol::{CasStatus, StoreStatus};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of memtext
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
