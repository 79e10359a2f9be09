//! Response definitions
//!
//! One variant per reply line the client understands, plus the typed
//! outcomes handed back to callers.

/// Header of a `VALUE` block. The payload follows on the wire and is read
/// separately by `length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueHeader {
    pub key: Vec<u8>,
    pub flags: u32,
    pub length: usize,

    /// Only present in replies to `gets`
    pub cas: Option<u64>,
}

/// A single parsed reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Stored,
    NotStored,
    Exists,
    Deleted,
    NotFound,
    Ok,
    End,

    /// Bare `ERROR`: the server did not understand the command
    Error,

    /// `CLIENT_ERROR <msg>`: the request was malformed
    ClientError(String),

    /// `SERVER_ERROR <msg>`: the server failed to serve the request
    ServerError(String),

    Value(ValueHeader),

    /// Reply to `incr`/`decr`
    Counter(u64),

    Stat { name: String, value: String },
}

impl Response {
    /// True for the `ERROR` family of replies
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Response::Error | Response::ClientError(_) | Response::ServerError(_)
        )
    }
}

/// Outcome of `set`, `add`, `replace`, `append` and `prepend`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// `STORED`
    Stored,

    /// `NOT_STORED`: the verb's precondition did not hold
    NotStored,

    /// `EXISTS`
    Exists,

    /// `NOT_FOUND`
    NotFound,
}

impl StoreStatus {
    pub fn is_stored(&self) -> bool {
        *self == StoreStatus::Stored
    }
}

/// Outcome of a check-and-set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasStatus {
    /// The new payload was stored
    Stored,

    /// The item changed since its token was read
    Conflict,

    /// The item does not exist (or vanished between `gets` and `cas`)
    NotFound,
}
