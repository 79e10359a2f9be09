//! Command definitions
//!
//! Outbound requests, borrowing keys and payloads from the caller.

/// Client flags sent with every stored item
pub const FLAGS: u32 = 0;

/// Verbs sharing the `<verb> <key> <flags> <ttl> <bytes>` storage layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageVerb {
    Set,
    Add,
    Replace,
    Append,
    Prepend,
}

impl StorageVerb {
    /// Wire spelling of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageVerb::Set => "set",
            StorageVerb::Add => "add",
            StorageVerb::Replace => "replace",
            StorageVerb::Append => "append",
            StorageVerb::Prepend => "prepend",
        }
    }
}

/// A single request
#[derive(Debug, Clone)]
pub enum Command<'a> {
    /// Store a payload under a key
    Store {
        verb: StorageVerb,
        key: &'a [u8],
        ttl: u32,
        value: &'a [u8],
    },

    /// Store only if the item still carries `cas`
    Cas {
        key: &'a [u8],
        ttl: u32,
        cas: u64,
        value: &'a [u8],
    },

    /// Fetch one or more keys
    Get { keys: Vec<&'a [u8]> },

    /// Fetch one or more keys along with their cas tokens
    Gets { keys: Vec<&'a [u8]> },

    /// Remove a key
    Delete { key: &'a [u8], delay: u32 },

    /// Add to a numeric value
    Incr { key: &'a [u8], delta: u64 },

    /// Subtract from a numeric value (the server clamps at zero)
    Decr { key: &'a [u8], delta: u64 },

    /// Server statistics, optionally restricted to one group
    Stats { group: Option<&'a str> },

    /// Invalidate every item
    FlushAll,
}

impl Command<'_> {
    /// Wire verb of the command
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Store { verb, .. } => verb.as_str(),
            Command::Cas { .. } => "cas",
            Command::Get { .. } => "get",
            Command::Gets { .. } => "gets",
            Command::Delete { .. } => "delete",
            Command::Incr { .. } => "incr",
            Command::Decr { .. } => "decr",
            Command::Stats { .. } => "stats",
            Command::FlushAll => "flush_all",
        }
    }

    /// Payload carried after the command line, if any
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Command::Store { value, .. } | Command::Cas { value, .. } => Some(*value),
            _ => None,
        }
    }
}
