//! Client Tests
//!
//! Drive the client over an in-memory stream: replies are scripted up front
//! and the exact request bytes are checked afterwards.

use std::io::{self, Cursor, Write};

use memtext::network::BufStream;
use memtext::{CasStatus, Client, ClientConfig, McError, StoreStatus};

// =============================================================================
// Helper Functions
// =============================================================================

type ScriptedClient = Client<BufStream<Cursor<Vec<u8>>, Vec<u8>>>;

fn scripted(replies: &[u8]) -> ScriptedClient {
    Client::new(BufStream::new(Cursor::new(replies.to_vec()), Vec::new()))
}

fn sent(client: &ScriptedClient) -> &[u8] {
    client.stream().writer()
}

fn unread(client: &ScriptedClient) -> usize {
    let reader = client.stream().reader();
    reader.get_ref().len() - reader.position() as usize
}

/// Writer whose every write fails
struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Storage Commands
// =============================================================================

#[test]
fn test_set_wire_format() {
    let mut client = scripted(b"STORED\r\n");

    let status = client.set(b"a", b"This is a", 10).unwrap();

    assert_eq!(status, StoreStatus::Stored);
    assert_eq!(sent(&client), b"set a 0 10 9\r\nThis is a\r\n");
}

#[test]
fn test_storage_verbs_on_wire() {
    let mut client = scripted(b"STORED\r\nSTORED\r\nSTORED\r\nSTORED\r\n");

    client.add(b"k", b"v", 0).unwrap();
    client.replace(b"k", b"vv", 5).unwrap();
    client.append(b"k", b"x", 0).unwrap();
    client.prepend(b"k", b"", 0).unwrap();

    assert_eq!(
        sent(&client),
        b"add k 0 0 1\r\nv\r\n\
          replace k 0 5 2\r\nvv\r\n\
          append k 0 0 1\r\nx\r\n\
          prepend k 0 0 0\r\n\r\n"
            .as_slice()
    );
}

#[test]
fn test_payload_length_counts_embedded_crlf() {
    let mut client = scripted(b"STORED\r\n");

    client.set(b"k", b"a\r\nb", 0).unwrap();

    assert_eq!(sent(&client), b"set k 0 0 4\r\na\r\nb\r\n");
}

#[test]
fn test_store_refusals_are_not_errors() {
    let mut client = scripted(b"NOT_STORED\r\nEXISTS\r\nNOT_FOUND\r\n");

    assert_eq!(client.add(b"k", b"v", 0).unwrap(), StoreStatus::NotStored);
    assert_eq!(client.set(b"k", b"v", 0).unwrap(), StoreStatus::Exists);
    assert_eq!(client.replace(b"k", b"v", 0).unwrap(), StoreStatus::NotFound);
    assert!(client.last_error().is_none());
}

#[test]
fn test_store_error_reply() {
    let mut client = scripted(b"SERVER_ERROR out of memory storing object\r\n");

    let err = client.set(b"k", b"v", 0).unwrap_err();

    assert!(matches!(err, McError::Server(_)));
    assert!(err.is_protocol());
    assert!(!err.is_fatal());
    assert!(client.last_error().unwrap().contains("out of memory"));
}

#[test]
fn test_write_failure_skips_read() {
    let stream = BufStream::new(Cursor::new(b"STORED\r\n".to_vec()), BrokenPipe);
    let mut client = Client::new(stream);

    let err = client.set(b"k", b"v", 0).unwrap_err();

    assert!(matches!(err, McError::Io(_)));
    assert!(err.is_fatal());
    assert_eq!(client.stream().reader().position(), 0);
    assert!(client.last_error().unwrap().contains("peer went away"));
}

#[test]
fn test_value_too_large() {
    let config = ClientConfig::builder().max_value_size(4).build();
    let mut client = Client::with_config(
        BufStream::new(Cursor::new(Vec::new()), Vec::new()),
        &config,
    )
    .unwrap();

    let err = client.set(b"k", b"12345", 0).unwrap_err();

    assert!(matches!(err, McError::ValueTooLarge { size: 5, max: 4 }));
    assert!(client.stream().writer().is_empty());
}

// =============================================================================
// Retrieval
// =============================================================================

#[test]
fn test_get_hit() {
    let mut client = scripted(b"VALUE a 0 9\r\nThis is a\r\nEND\r\n");

    assert_eq!(client.get(b"a").unwrap(), Some(b"This is a".to_vec()));
    assert_eq!(sent(&client), b"get a\r\n");
    assert_eq!(unread(&client), 0);
}

#[test]
fn test_get_miss() {
    let mut client = scripted(b"END\r\n");

    assert_eq!(client.get(b"a").unwrap(), None);
    assert_eq!(unread(&client), 0);
}

#[test]
fn test_get_payload_with_terminators_inside() {
    // Payload is "END\r\nVALUE x 0 1\r\n"; only the length frames it
    let mut client =
        scripted(b"VALUE a 0 18\r\nEND\r\nVALUE x 0 1\r\n\r\nEND\r\nVALUE b 0 1\r\nz\r\nEND\r\n");

    assert_eq!(client.get(b"a").unwrap(), Some(b"END\r\nVALUE x 0 1\r\n".to_vec()));
    assert_eq!(client.get(b"b").unwrap(), Some(b"z".to_vec()));
    assert_eq!(unread(&client), 0);
}

#[test]
fn test_get_empty_payload() {
    let mut client = scripted(b"VALUE a 0 0\r\n\r\nEND\r\n");

    assert_eq!(client.get(b"a").unwrap(), Some(Vec::new()));
}

#[test]
fn test_get_missing_trailing_crlf_is_protocol_error() {
    let mut client = scripted(b"VALUE a 0 3\r\nabcXYEND\r\n");

    let err = client.get(b"a").unwrap_err();

    assert!(matches!(err, McError::Protocol(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_get_wrong_key_is_protocol_error() {
    let mut client = scripted(b"VALUE other 0 1\r\nx\r\nEND\r\n");

    assert!(matches!(client.get(b"a"), Err(McError::Protocol(_))));
}

#[test]
fn test_get_truncated_payload_is_transport_error() {
    let mut client = scripted(b"VALUE a 0 10\r\nshort");

    assert!(matches!(client.get(b"a"), Err(McError::Io(_))));
}

#[test]
fn test_get_declared_length_over_limit_is_protocol_error() {
    let mut client = scripted(b"VALUE k 0 18446744073709551615\r\nabc\r\nEND\r\n");

    let err = client.get(b"k").unwrap_err();

    assert!(matches!(err, McError::Protocol(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_get_multi_declared_length_uses_configured_limit() {
    let config = ClientConfig::builder().max_value_size(8).build();
    let replies = b"VALUE a 0 4294967296\r\nxyz\r\nEND\r\n".to_vec();
    let mut client =
        Client::with_config(BufStream::new(Cursor::new(replies), Vec::new()), &config).unwrap();

    assert!(matches!(client.get_multi(&["a"]), Err(McError::Protocol(_))));
    assert!(client.last_error().unwrap().contains("4294967296"));
}

#[test]
fn test_get_on_closed_stream() {
    let mut client = scripted(b"");

    let err = client.get(b"a").unwrap_err();
    match err {
        McError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("Expected transport error, got {:?}", other),
    }
}

#[test]
fn test_get_multi() {
    let mut client = scripted(b"VALUE a 0 1\r\n1\r\nVALUE c 5 2\r\n33\r\nEND\r\n");

    let values = client.get_multi(&["a", "b", "c"]).unwrap();

    assert_eq!(sent(&client), b"get a b c\r\n");
    assert_eq!(values.len(), 2);
    assert_eq!(values[b"a".as_slice()], b"1");
    assert_eq!(values[b"c".as_slice()], b"33");
    assert_eq!(unread(&client), 0);
}

#[test]
fn test_get_multi_no_keys_sends_nothing() {
    let mut client = scripted(b"");

    let values = client.get_multi::<&str>(&[]).unwrap();

    assert!(values.is_empty());
    assert!(sent(&client).is_empty());
}

#[test]
fn test_gets_returns_token() {
    let mut client = scripted(b"VALUE a 0 2 9001\r\nhi\r\nEND\r\n");

    assert_eq!(client.gets(b"a").unwrap(), Some((b"hi".to_vec(), 9001)));
    assert_eq!(sent(&client), b"gets a\r\n");
}

#[test]
fn test_gets_without_token_is_protocol_error() {
    let mut client = scripted(b"VALUE a 0 2\r\nhi\r\nEND\r\n");

    assert!(matches!(client.gets(b"a"), Err(McError::Protocol(_))));
}

// =============================================================================
// Check-and-set
// =============================================================================

#[test]
fn test_cas_two_round_trips() {
    let mut client = scripted(b"VALUE a 0 3 42\r\nold\r\nEND\r\nSTORED\r\n");

    assert_eq!(client.cas(b"a", b"new", 30).unwrap(), CasStatus::Stored);
    assert_eq!(sent(&client), b"gets a\r\ncas a 0 30 3 42\r\nnew\r\n");
    assert_eq!(unread(&client), 0);
}

#[test]
fn test_cas_statuses() {
    let mut client = scripted(b"VALUE a 0 1 7\r\nx\r\nEND\r\nEXISTS\r\n");
    assert_eq!(client.cas(b"a", b"y", 0).unwrap(), CasStatus::Conflict);

    let mut client = scripted(b"VALUE a 0 1 7\r\nx\r\nEND\r\nNOT_FOUND\r\n");
    assert_eq!(client.cas(b"a", b"y", 0).unwrap(), CasStatus::NotFound);

    let mut client = scripted(b"VALUE a 0 1 7\r\nx\r\nEND\r\nERROR\r\n");
    assert!(matches!(client.cas(b"a", b"y", 0), Err(McError::Server(_))));
}

#[test]
fn test_cas_missing_key_skips_second_round_trip() {
    let mut client = scripted(b"END\r\n");

    assert_eq!(client.cas(b"a", b"y", 0).unwrap(), CasStatus::NotFound);
    assert_eq!(sent(&client), b"gets a\r\n");
}

#[test]
fn test_cas_with_token() {
    let mut client = scripted(b"STORED\r\n");

    assert_eq!(
        client.cas_with_token(b"a", b"v", 0, u64::MAX).unwrap(),
        CasStatus::Stored
    );
    assert_eq!(sent(&client), b"cas a 0 0 1 18446744073709551615\r\nv\r\n");
}

// =============================================================================
// Delete, Counters and Server-wide Commands
// =============================================================================

#[test]
fn test_delete() {
    let mut client = scripted(b"DELETED\r\nNOT_FOUND\r\n");

    assert!(client.delete(b"a").unwrap());
    assert!(!client.delete_with_delay(b"a", 5).unwrap());
    assert_eq!(sent(&client), b"delete a 0\r\ndelete a 5\r\n");
}

#[test]
fn test_incr_decr() {
    let mut client = scripted(b"12\r\n0\r\nNOT_FOUND\r\n");

    assert_eq!(client.incr(b"total", 2).unwrap(), Some(12));
    assert_eq!(client.decr(b"total", 100).unwrap(), Some(0));
    assert_eq!(client.incr(b"gone", 1).unwrap(), None);
    assert_eq!(sent(&client), b"incr total 2\r\ndecr total 100\r\nincr gone 1\r\n");
}

#[test]
fn test_counter_with_padding() {
    let mut client = scripted(b"9 \r\n");

    assert_eq!(client.decr(b"n", 1).unwrap(), Some(9));
}

#[test]
fn test_counter_garbage_is_protocol_error() {
    let mut client = scripted(b"STORED\r\n");

    assert!(matches!(client.incr(b"n", 1), Err(McError::Protocol(_))));
}

#[test]
fn test_stats() {
    let mut client = scripted(
        b"STAT pid 4242\r\nSTAT version 1.6.21\r\nSTAT libevent 2.1.12-stable\r\nEND\r\n",
    );

    let stats = client.stats().unwrap();

    assert_eq!(sent(&client), b"stats\r\n");
    assert_eq!(stats.len(), 3);
    assert_eq!(stats["pid"], "4242");
    assert_eq!(stats["libevent"], "2.1.12-stable");
}

#[test]
fn test_stats_group_on_wire() {
    let mut client = scripted(b"STAT maxconns 1024\r\nEND\r\n");

    client.stats_group("settings").unwrap();

    assert_eq!(sent(&client), b"stats settings\r\n");
}

#[test]
fn test_stats_cut_short_discards_partial() {
    let mut client = scripted(b"STAT pid 1\r\nSTAT uptime 5\r\n");

    assert!(matches!(client.stats(), Err(McError::Io(_))));
}

#[test]
fn test_flush_all() {
    let mut client = scripted(b"OK\r\n");

    client.flush_all().unwrap();

    assert_eq!(sent(&client), b"flush_all\r\n");
}

#[test]
fn test_flush_all_surfaces_write_failure() {
    let stream = BufStream::new(Cursor::new(b"OK\r\n".to_vec()), BrokenPipe);
    let mut client = Client::new(stream);

    assert!(matches!(client.flush_all(), Err(McError::Io(_))));
}

// =============================================================================
// Error State
// =============================================================================

#[test]
fn test_last_error_cleared_by_success() {
    let mut client = scripted(b"ERROR\r\nSTORED\r\n");

    assert!(client.set(b"k", b"v", 0).is_err());
    let message = client.last_error().unwrap().to_string();
    assert!(message.contains("ERROR"));

    assert!(client.set(b"k", b"v", 0).unwrap().is_stored());
    assert!(client.last_error().is_none());
}

#[test]
fn test_close_flushes() {
    let client = scripted(b"");

    client.close().unwrap();
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = ClientConfig::default();

    assert_eq!(config.server_addr, "127.0.0.1:11211");
    assert_eq!(config.max_key_len, 250);
    assert_eq!(config.default_ttl, 0);
    assert!(config.nodelay);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation() {
    let empty_addr = ClientConfig::builder().server_addr("  ").build();
    assert!(matches!(empty_addr.validate(), Err(McError::Config(_))));

    let huge_keys = ClientConfig::builder().max_key_len(251).build();
    assert!(matches!(huge_keys.validate(), Err(McError::Config(_))));
}

#[test]
fn test_config_key_limit_applies() {
    let config = ClientConfig::builder().max_key_len(4).default_ttl(30).build();
    let mut client = Client::with_config(
        BufStream::new(Cursor::new(b"END\r\n".to_vec()), Vec::new()),
        &config,
    )
    .unwrap();

    assert_eq!(client.default_ttl(), 30);
    assert!(matches!(client.get(b"toolong"), Err(McError::InvalidKey(_))));
    assert_eq!(client.get(b"ok").unwrap(), None);
}

#[test]
fn test_with_config_rejects_invalid_config() {
    let config = ClientConfig::builder().max_key_len(0).build();
    let stream = BufStream::new(Cursor::new(Vec::new()), Vec::new());

    assert!(matches!(
        Client::with_config(stream, &config),
        Err(McError::Config(_))
    ));
}
