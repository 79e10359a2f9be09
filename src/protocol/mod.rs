//! Protocol Module
//!
//! Encoding of commands and decoding of replies for the memcached text
//! protocol. Every line on the wire ends with `\r\n`.
//!
//! ## Requests
//! ```text
//! <set|add|replace|append|prepend> <key> <flags> <ttl> <bytes>\r\n<payload>\r\n
//! cas <key> <flags> <ttl> <bytes> <cas>\r\n<payload>\r\n
//! get <key> [<key> ...]\r\n
//! gets <key> [<key> ...]\r\n
//! delete <key> <delay>\r\n
//! <incr|decr> <key> <delta>\r\n
//! stats [<group>]\r\n
//! flush_all\r\n
//! ```
//!
//! ## Replies
//! ```text
//! STORED | NOT_STORED | EXISTS | NOT_FOUND | DELETED | OK | END
//! ERROR | CLIENT_ERROR <msg> | SERVER_ERROR <msg>
//! VALUE <key> <flags> <bytes> [<cas>]\r\n<payload>\r\n ... END\r\n
//! STAT <name> <value>\r\n ... END\r\n
//! <decimal>\r\n
//! ```
//!
//! ## Framing
//! Reply headers are read line by line. Payloads are read by the byte count
//! announced in their `VALUE` header and are never scanned for terminators,
//! since they may contain `\r\n` themselves. The `\r\n` after a payload is
//! consumed separately.

mod command;
mod response;
mod codec;

pub use command::{Command, StorageVerb, FLAGS};
pub use response::{CasStatus, Response, StoreStatus, ValueHeader};
pub use codec::{
    encode_command, parse_response, read_response, read_value_body, validate_key,
    write_command, CRLF, MAX_LINE_LEN,
};
pub(crate) use codec::lossy;
