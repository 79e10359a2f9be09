//! Client Module
//!
//! Request/response operations over one byte stream.
//!
//! ## Usage Model
//! - One client owns one stream for its whole life
//! - Operations are strictly sequential (`&mut self`); the protocol has no
//!   request ids, so interleaving two requests would corrupt both
//! - Callers that share a client across threads wrap it in a mutex, or
//!   open one connection per worker
//! - `close` consumes the client

use std::collections::HashMap;

use crate::config::ClientConfig;
use crate::error::{McError, Result};
use crate::network::{ByteStream, TcpConnection};
use crate::protocol::{
    lossy, read_response, read_value_body, validate_key, write_command, CasStatus, Command,
    Response, StorageVerb, StoreStatus, ValueHeader,
};

/// A memcached text protocol client bound to one stream
pub struct Client<S: ByteStream> {
    /// The transport, exclusively owned
    stream: S,

    /// Message of the error returned by the latest operation, if it failed
    last_error: Option<String>,

    /// Fallback TTL for drivers that have none
    default_ttl: u32,

    max_key_len: usize,

    max_value_size: usize,
}

impl Client<TcpConnection> {
    /// Open a TCP connection to `config.server_addr` and bind a client to it
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let connection = TcpConnection::connect(config)?;
        Self::with_config(connection, config)
    }
}

impl<S: ByteStream> Client<S> {
    /// Bind a client to an open stream using default settings
    pub fn new(stream: S) -> Self {
        let config = ClientConfig::default();
        Self {
            stream,
            last_error: None,
            default_ttl: config.default_ttl,
            max_key_len: config.max_key_len,
            max_value_size: config.max_value_size,
        }
    }

    /// Bind a client to an open stream
    ///
    /// Fails with `McError::Config` if `config` does not validate.
    pub fn with_config(stream: S, config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stream,
            last_error: None,
            default_ttl: config.default_ttl,
            max_key_len: config.max_key_len,
            max_value_size: config.max_value_size,
        })
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Store `value` under `key` unconditionally
    pub fn set(&mut self, key: &[u8], value: &[u8], ttl: u32) -> Result<StoreStatus> {
        self.store(StorageVerb::Set, key, value, ttl)
    }

    /// Store only if `key` holds no value
    pub fn add(&mut self, key: &[u8], value: &[u8], ttl: u32) -> Result<StoreStatus> {
        self.store(StorageVerb::Add, key, value, ttl)
    }

    /// Store only if `key` already holds a value
    pub fn replace(&mut self, key: &[u8], value: &[u8], ttl: u32) -> Result<StoreStatus> {
        self.store(StorageVerb::Replace, key, value, ttl)
    }

    /// Append `value` to the existing value
    pub fn append(&mut self, key: &[u8], value: &[u8], ttl: u32) -> Result<StoreStatus> {
        self.store(StorageVerb::Append, key, value, ttl)
    }

    /// Prepend `value` to the existing value
    pub fn prepend(&mut self, key: &[u8], value: &[u8], ttl: u32) -> Result<StoreStatus> {
        self.store(StorageVerb::Prepend, key, value, ttl)
    }

    /// Issue any storage verb and read its single reply line
    ///
    /// A failed write returns before anything is read.
    pub fn store(
        &mut self,
        verb: StorageVerb,
        key: &[u8],
        value: &[u8],
        ttl: u32,
    ) -> Result<StoreStatus> {
        self.run(|c| {
            c.check_key(key)?;
            c.check_value(value)?;

            write_command(
                &mut c.stream,
                &Command::Store {
                    verb,
                    key,
                    ttl,
                    value,
                },
            )?;

            let status = match read_response(&mut c.stream)? {
                Response::Stored => StoreStatus::Stored,
                Response::NotStored => StoreStatus::NotStored,
                Response::Exists => StoreStatus::Exists,
                Response::NotFound => StoreStatus::NotFound,
                other => return Err(unexpected(verb.as_str(), other)),
            };

            tracing::debug!("{} {:?} -> {:?}", verb.as_str(), lossy(key), status);
            Ok(status)
        })
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    /// Fetch the value stored under `key`
    ///
    /// A missing key is `Ok(None)`, not an error.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.run(|c| {
            c.check_key(key)?;
            write_command(&mut c.stream, &Command::Get { keys: vec![key] })?;

            let value = single_value(key, c.read_values()?)?.map(|(_, data)| data);
            tracing::debug!("get {:?} -> hit={}", lossy(key), value.is_some());
            Ok(value)
        })
    }

    /// Fetch several keys in one round trip
    ///
    /// Keys the server has no value for are absent from the map.
    pub fn get_multi<K: AsRef<[u8]>>(
        &mut self,
        keys: &[K],
    ) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
        self.run(|c| {
            if keys.is_empty() {
                return Ok(HashMap::new());
            }

            let keys: Vec<&[u8]> = keys.iter().map(|k| k.as_ref()).collect();
            for key in &keys {
                c.check_key(key)?;
            }

            let requested = keys.len();
            write_command(&mut c.stream, &Command::Get { keys })?;

            let values: HashMap<Vec<u8>, Vec<u8>> = c
                .read_values()?
                .into_iter()
                .map(|(header, data)| (header.key, data))
                .collect();

            tracing::debug!("get {} keys -> {} hits", requested, values.len());
            Ok(values)
        })
    }

    /// Fetch the value under `key` together with its cas token
    pub fn gets(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, u64)>> {
        self.run(|c| c.gets_inner(key))
    }

    fn gets_inner(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, u64)>> {
        self.check_key(key)?;
        write_command(&mut self.stream, &Command::Gets { keys: vec![key] })?;

        match single_value(key, self.read_values()?)? {
            Some((header, data)) => {
                let cas = header.cas.ok_or_else(|| {
                    McError::Protocol(format!("gets reply for {:?} has no cas token", lossy(key)))
                })?;
                Ok(Some((data, cas)))
            }
            None => Ok(None),
        }
    }

    /// Read `VALUE` blocks until `END`
    fn read_values(&mut self) -> Result<Vec<(ValueHeader, Vec<u8>)>> {
        let mut values = Vec::new();
        loop {
            match read_response(&mut self.stream)? {
                Response::Value(header) => {
                    if header.length > self.max_value_size {
                        return Err(McError::Protocol(format!(
                            "VALUE for {:?} declares {} bytes (max {})",
                            lossy(&header.key),
                            header.length,
                            self.max_value_size
                        )));
                    }
                    let data = read_value_body(&mut self.stream, &header)?;
                    values.push((header, data));
                }
                Response::End => return Ok(values),
                other => return Err(unexpected("get", other)),
            }
        }
    }

    // =========================================================================
    // Check-and-set
    // =========================================================================

    /// Replace the value under `key` if nobody changed it since this call
    /// read its cas token
    ///
    /// Runs `gets` then `cas` as two separate round trips. Another client
    /// may write the key between them, which shows up as
    /// `CasStatus::Conflict`; callers wanting a read-modify-write loop retry
    /// on it, or use `incr`/`decr`/`add` when they fit.
    pub fn cas(&mut self, key: &[u8], value: &[u8], ttl: u32) -> Result<CasStatus> {
        self.run(|c| {
            c.check_key(key)?;
            c.check_value(value)?;

            let token = match c.gets_inner(key)? {
                Some((_, token)) => token,
                None => {
                    tracing::debug!("cas {:?} -> no item to swap", lossy(key));
                    return Ok(CasStatus::NotFound);
                }
            };

            c.cas_inner(key, value, ttl, token)
        })
    }

    /// Issue `cas` with a token obtained earlier from `gets`
    pub fn cas_with_token(
        &mut self,
        key: &[u8],
        value: &[u8],
        ttl: u32,
        token: u64,
    ) -> Result<CasStatus> {
        self.run(|c| {
            c.check_key(key)?;
            c.check_value(value)?;
            c.cas_inner(key, value, ttl, token)
        })
    }

    fn cas_inner(&mut self, key: &[u8], value: &[u8], ttl: u32, token: u64) -> Result<CasStatus> {
        write_command(
            &mut self.stream,
            &Command::Cas {
                key,
                ttl,
                cas: token,
                value,
            },
        )?;

        let status = match read_response(&mut self.stream)? {
            Response::Stored => CasStatus::Stored,
            Response::Exists => CasStatus::Conflict,
            Response::NotFound => CasStatus::NotFound,
            other => return Err(unexpected("cas", other)),
        };

        tracing::debug!("cas {:?} token={} -> {:?}", lossy(key), token, status);
        Ok(status)
    }

    // =========================================================================
    // Deletion and counters
    // =========================================================================

    /// Remove `key`; `Ok(false)` when it did not exist
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        self.delete_with_delay(key, 0)
    }

    /// Remove `key` with the legacy delay argument
    ///
    /// Current servers only accept a delay of 0.
    pub fn delete_with_delay(&mut self, key: &[u8], delay: u32) -> Result<bool> {
        self.run(|c| {
            c.check_key(key)?;
            write_command(&mut c.stream, &Command::Delete { key, delay })?;

            let deleted = match read_response(&mut c.stream)? {
                Response::Deleted => true,
                Response::NotFound => false,
                other => return Err(unexpected("delete", other)),
            };

            tracing::debug!("delete {:?} -> {}", lossy(key), deleted);
            Ok(deleted)
        })
    }

    /// Add `delta` to a numeric value; `Ok(None)` when the key is missing
    pub fn incr(&mut self, key: &[u8], delta: u64) -> Result<Option<u64>> {
        self.run(|c| c.counter(Command::Incr { key, delta }, key))
    }

    /// Subtract `delta` from a numeric value; the server clamps at zero
    pub fn decr(&mut self, key: &[u8], delta: u64) -> Result<Option<u64>> {
        self.run(|c| c.counter(Command::Decr { key, delta }, key))
    }

    fn counter(&mut self, command: Command<'_>, key: &[u8]) -> Result<Option<u64>> {
        self.check_key(key)?;
        write_command(&mut self.stream, &command)?;

        let value = match read_response(&mut self.stream)? {
            Response::Counter(n) => Some(n),
            Response::NotFound => None,
            other => return Err(unexpected(command.verb(), other)),
        };

        tracing::debug!("{} {:?} -> {:?}", command.verb(), lossy(key), value);
        Ok(value)
    }

    // =========================================================================
    // Server-wide commands
    // =========================================================================

    /// General-purpose server statistics
    pub fn stats(&mut self) -> Result<HashMap<String, String>> {
        self.run(|c| c.stats_inner(None))
    }

    /// Statistics of one group, e.g. `items`, `slabs` or `settings`
    pub fn stats_group(&mut self, group: &str) -> Result<HashMap<String, String>> {
        self.run(|c| {
            validate_key(group.as_bytes(), c.max_key_len)
                .map_err(|_| McError::InvalidKey(format!("bad stats group {:?}", group)))?;
            c.stats_inner(Some(group))
        })
    }

    fn stats_inner(&mut self, group: Option<&str>) -> Result<HashMap<String, String>> {
        write_command(&mut self.stream, &Command::Stats { group })?;

        let mut stats = HashMap::new();
        loop {
            match read_response(&mut self.stream)? {
                Response::Stat { name, value } => {
                    stats.insert(name, value);
                }
                Response::End => break,
                other => return Err(unexpected("stats", other)),
            }
        }

        tracing::debug!("stats {:?} -> {} entries", group, stats.len());
        Ok(stats)
    }

    /// Invalidate every item on the server
    pub fn flush_all(&mut self) -> Result<()> {
        self.run(|c| {
            write_command(&mut c.stream, &Command::FlushAll)?;

            match read_response(&mut c.stream)? {
                Response::Ok => {
                    tracing::debug!("flush_all -> OK");
                    Ok(())
                }
                other => Err(unexpected("flush_all", other)),
            }
        })
    }

    // =========================================================================
    // State and lifecycle
    // =========================================================================

    /// Message of the error returned by the most recent operation
    ///
    /// `None` once any later operation succeeds.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// TTL configured for callers that have none of their own
    pub fn default_ttl(&self) -> u32 {
        self.default_ttl
    }

    /// The underlying stream
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Release the stream without closing it
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Close the stream; the client cannot be used afterwards
    pub fn close(mut self) -> Result<()> {
        self.stream.close()?;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Run one operation, recording its error for `last_error`
    fn run<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.last_error = None;
        let result = op(self);
        if let Err(ref e) = result {
            if e.is_fatal() {
                tracing::warn!("Operation failed, connection should be discarded: {}", e);
            } else {
                tracing::debug!("Operation failed: {}", e);
            }
            self.last_error = Some(e.to_string());
        }
        result
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        validate_key(key, self.max_key_len)
    }

    fn check_value(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.max_value_size {
            return Err(McError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_size,
            });
        }
        Ok(())
    }
}

/// Map a reply that does not belong to `verb` onto an error
fn unexpected(verb: &str, response: Response) -> McError {
    match response {
        Response::Error => McError::Server(format!("{} rejected: ERROR", verb)),
        Response::ClientError(msg) => {
            McError::Server(format!("{} rejected: CLIENT_ERROR {}", verb, msg))
        }
        Response::ServerError(msg) => {
            McError::Server(format!("{} failed: SERVER_ERROR {}", verb, msg))
        }
        other => McError::Protocol(format!("unexpected reply to {}: {:?}", verb, other)),
    }
}

/// Pick the one value a single-key retrieval may return
fn single_value(
    key: &[u8],
    mut values: Vec<(ValueHeader, Vec<u8>)>,
) -> Result<Option<(ValueHeader, Vec<u8>)>> {
    if values.len() > 1 {
        return Err(McError::Protocol(format!(
            "{} values returned for single key {:?}",
            values.len(),
            lossy(key)
        )));
    }

    match values.pop() {
        Some((header, _)) if header.key != key => Err(McError::Protocol(format!(
            "asked for {:?}, server returned {:?}",
            lossy(key),
            lossy(&header.key)
        ))),
        other => Ok(other),
    }
}
