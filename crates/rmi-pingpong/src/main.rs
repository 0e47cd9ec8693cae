//! # rmi-pingpong
//!
//! Demo services for the `rmi` crate: a ping-pong table and a factory that
//! opens new tables on request and hands back stubs for them.
//!
//! ## Usage
//!
//! ```bash
//! # Serve a table on port 7000
//! rmi-pingpong server -b 0.0.0.0:7000
//!
//! # Ping it
//! rmi-pingpong client -a localhost:7000 -i 123
//!
//! # Serve a factory on port 12333
//! rmi-pingpong factory -b 0.0.0.0:12333
//!
//! # Ask the factory for a table on port 7100 and play four rounds
//! rmi-pingpong factory-client -a localhost:12333 -p 7100
//! ```
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

mod service;

use anyhow::{Context, Result};
use argh::FromArgs;
use rmi::{RemoteAddress, Skeleton, Stub};
use std::net::SocketAddr;
use std::sync::Arc;

use service::{Factory, Pingpong, PingpongError, Table, TableFactory};

#[derive(FromArgs)]
/// rmi-pingpong - remote method invocation demo
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Server(ServerArgs),
    Factory(FactoryArgs),
    Client(ClientArgs),
    FactoryClient(FactoryClientArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "server")]
/// serve a ping-pong table
struct ServerArgs {
    /// address to listen on
    #[argh(option, short = 'b', default = "\"0.0.0.0:7000\".into()")]
    bind: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "factory")]
/// serve a factory of ping-pong tables
struct FactoryArgs {
    /// address to listen on
    #[argh(option, short = 'b', default = "\"0.0.0.0:12333\".into()")]
    bind: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "client")]
/// ping a table once
struct ClientArgs {
    /// address of the table, as host:port
    #[argh(option, short = 'a', default = "\"localhost:7000\".into()")]
    address: String,

    /// id to send with the ping
    #[argh(option, short = 'i', default = "123")]
    id: i32,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "factory-client")]
/// ask a factory for a table and play a few rounds on it
struct FactoryClientArgs {
    /// address of the factory, as host:port
    #[argh(option, short = 'a', default = "\"localhost:12333\".into()")]
    address: String,

    /// port the new table should listen on
    #[argh(option, short = 'p')]
    port: u16,

    /// number of rounds to play
    #[argh(option, short = 'r', default = "4")]
    rounds: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Server(args) => {
            let addr = parse_bind(&args.bind)?;
            let skeleton = Skeleton::<dyn Pingpong>::bind(Arc::new(Table), addr)?;
            serve_until_interrupted(&skeleton).await
        }
        Commands::Factory(args) => {
            let addr = parse_bind(&args.bind)?;
            let skeleton = Skeleton::<dyn Factory>::bind(Arc::new(TableFactory::new()), addr)?;
            serve_until_interrupted(&skeleton).await
        }
        Commands::Client(args) => {
            let stub = Stub::<dyn Pingpong>::new(parse_remote(&args.address)?)?;
            let reply = tokio::task::spawn_blocking(move || stub.ping(args.id)).await??;
            println!("{}", reply);
            Ok(())
        }
        Commands::FactoryClient(args) => {
            let factory = Stub::<dyn Factory>::new(parse_remote(&args.address)?)?;
            let rounds = args.rounds;
            let port = args.port;

            let replies = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
                let table = factory.make_pingpong(port)?;
                tracing::info!("Factory returned {}", table);

                let mut replies = Vec::new();
                for round in 0..rounds {
                    match table.pingpong("ping".to_string(), round) {
                        Ok(reply) => replies.push(reply),
                        Err(PingpongError::WrongInput(word)) => replies.push(format!("input wrong: {}", word)),
                        Err(err) => return Err(err.into()),
                    }
                }
                Ok(replies)
            })
            .await??;

            for reply in replies {
                println!("{}", reply);
            }
            Ok(())
        }
    }
}

async fn serve_until_interrupted<I: ?Sized + rmi::RemoteInterface>(skeleton: &Skeleton<I>) -> Result<()> {
    skeleton.start()?;
    if let Some(addr) = skeleton.address() {
        tracing::info!("Serving on {} (ctrl-c to stop)", addr);
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down");
    skeleton.stop();
    Ok(())
}

fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .with_context(|| format!("Invalid bind address '{}'", bind))
}

fn parse_remote(address: &str) -> Result<RemoteAddress> {
    address
        .parse()
        .with_context(|| format!("Invalid remote address '{}'", address))
}
