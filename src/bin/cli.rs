//! memtext CLI
//!
//! Command-line driver for a memcached server.

use clap::{Parser, Subcommand};
use memtext::network::TcpConnection;
use memtext::{CasStatus, Client, ClientConfig, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// memtext CLI
#[derive(Parser, Debug)]
#[command(name = "memtext-cli")]
#[command(about = "CLI for the memcached text protocol")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:11211")]
    server: String,

    /// TTL in seconds for storage commands (0 = never expire)
    #[arg(short, long, default_value = "0")]
    ttl: u32,

    /// Read/write timeout in milliseconds (0 = none)
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Get several keys at once
    Mget {
        /// The keys to get
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Store a value unconditionally
    Set { key: String, value: String },

    /// Store a value only if the key is absent
    Add { key: String, value: String },

    /// Store a value only if the key exists
    Replace { key: String, value: String },

    /// Append to an existing value
    Append { key: String, value: String },

    /// Prepend to an existing value
    Prepend { key: String, value: String },

    /// Swap in a value if nobody changed the key meanwhile
    Cas { key: String, value: String },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Increment a counter
    Incr {
        key: String,
        #[arg(default_value = "1")]
        delta: u64,
    },

    /// Decrement a counter
    Decr {
        key: String,
        #[arg(default_value = "1")]
        delta: u64,
    },

    /// Print server statistics
    Stats {
        /// Restrict to one group (items, slabs, settings, ...)
        group: Option<String>,
    },

    /// Invalidate every item
    Flush,

    /// Walk through every command against the server
    Demo,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,memtext=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .server_addr(&args.server)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .connect_timeout_ms(args.timeout_ms)
        .default_ttl(args.ttl)
        .build();

    let mut client = match Client::connect(&config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = execute(&mut client, args.command) {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = client.close() {
        tracing::warn!("Error closing connection: {}", e);
    }
}

fn execute(client: &mut Client<TcpConnection>, command: Commands) -> Result<()> {
    let ttl = client.default_ttl();

    match command {
        Commands::Get { key } => print_value(&key, client.get(key.as_bytes())?),
        Commands::Mget { keys } => {
            let values = client.get_multi(&keys)?;
            for key in &keys {
                print_value(key, values.get(key.as_bytes()).cloned());
            }
        }
        Commands::Set { key, value } => {
            println!("{:?}", client.set(key.as_bytes(), value.as_bytes(), ttl)?)
        }
        Commands::Add { key, value } => {
            println!("{:?}", client.add(key.as_bytes(), value.as_bytes(), ttl)?)
        }
        Commands::Replace { key, value } => {
            println!("{:?}", client.replace(key.as_bytes(), value.as_bytes(), ttl)?)
        }
        Commands::Append { key, value } => {
            println!("{:?}", client.append(key.as_bytes(), value.as_bytes(), ttl)?)
        }
        Commands::Prepend { key, value } => {
            println!("{:?}", client.prepend(key.as_bytes(), value.as_bytes(), ttl)?)
        }
        Commands::Cas { key, value } => {
            println!("{:?}", client.cas(key.as_bytes(), value.as_bytes(), ttl)?)
        }
        Commands::Del { key } => match client.delete(key.as_bytes())? {
            true => println!("DELETED"),
            false => println!("NOT_FOUND"),
        },
        Commands::Incr { key, delta } => print_counter(client.incr(key.as_bytes(), delta)?),
        Commands::Decr { key, delta } => print_counter(client.decr(key.as_bytes(), delta)?),
        Commands::Stats { group } => {
            let stats = match group {
                Some(group) => client.stats_group(&group)?,
                None => client.stats()?,
            };
            let mut names: Vec<_> = stats.keys().collect();
            names.sort();
            for name in names {
                println!("{}: {}", name, stats[name]);
            }
        }
        Commands::Flush => {
            client.flush_all()?;
            println!("OK");
        }
        Commands::Demo => demo(client, ttl)?,
    }

    Ok(())
}

/// Scripted session exercising each command once
fn demo(client: &mut Client<TcpConnection>, ttl: u32) -> Result<()> {
    client.flush_all()?;
    print_value("a", client.get(b"a")?);

    if client.set(b"a", b"This is a", ttl)?.is_stored() {
        print_value("a", client.get(b"a")?);
    } else {
        println!("set a failed");
    }

    client.set(b"total", b"10", 30)?;
    print_value("total", client.get(b"total")?);
    client.incr(b"total", 2)?;
    print_value("total", client.get(b"total")?);
    client.decr(b"total", 1)?;
    print_value("total", client.get(b"total")?);

    if client.delete(b"total")? {
        println!("delete total success!");
        print_value("total", client.get(b"total")?);
    } else {
        println!("delete total failed");
    }

    let stats = client.stats()?;
    let mut names: Vec<_> = stats.keys().collect();
    names.sort();
    for name in names {
        println!("{}: {}", name, stats[name]);
    }

    client.append(b"a", b", appended content", ttl)?;
    print_value("a", client.get(b"a")?);
    client.prepend(b"a", b"Prepended content, ", ttl)?;
    print_value("a", client.get(b"a")?);

    client.set(b"b", b"This is b", ttl)?;
    client.set(b"c", b"This is c", ttl)?;
    let values = client.get_multi(&["a", "b", "c"])?;
    for key in ["a", "b", "c"] {
        print_value(key, values.get(key.as_bytes()).cloned());
    }

    match client.cas(b"a", b"swapped by cas", ttl)? {
        CasStatus::Stored => print_value("a", client.get(b"a")?),
        status => println!("cas a: {:?}", status),
    }

    Ok(())
}

fn print_value(key: &str, value: Option<Vec<u8>>) {
    match value {
        Some(v) => println!("{}: {}", key, String::from_utf8_lossy(&v)),
        None => println!("{}: (not found)", key),
    }
}

fn print_counter(value: Option<u64>) {
    match value {
        Some(n) => println!("{}", n),
        None => println!("NOT_FOUND"),
    }
}
