use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cdts::{Fingerprint, Startup};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cdts-node", about = "Encryption context validation and agreement node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a configuration and print the derived context
    Check {
        /// Context configuration file
        #[arg(long)]
        config: PathBuf,
    },
    /// Listen for sessions and admit those with an identical context
    Serve {
        #[arg(long)]
        config: PathBuf,

        /// Listen address for QUIC connections
        #[arg(long, default_value = "127.0.0.1:4100")]
        listen: SocketAddr,

        /// Max concurrent sessions
        #[arg(long, default_value = "8")]
        max_sessions: u32,

        /// Negotiation window per session, in milliseconds
        #[arg(long, default_value = "5000")]
        handshake_timeout_ms: u64,
    },
    /// Negotiate with a running node and ping it once agreed
    Connect {
        #[arg(long)]
        config: PathBuf,

        /// Node address
        #[arg(long)]
        addr: SocketAddr,

        #[arg(long, default_value = "5000")]
        handshake_timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Check { config } => {
            let registry = Startup::new().start_from_file(&config)?;
            let ctx = registry.current();
            println!("{}", ctx);
            println!("primes: {:?}", ctx.primes());
            println!("fingerprint: {}", Fingerprint::of(&ctx));
        }
        Command::Serve {
            config,
            listen,
            max_sessions,
            handshake_timeout_ms,
        } => {
            let registry = Arc::new(Startup::new().start_from_file(&config)?);
            let mut node_config = cdts_node::config::NodeConfig::new(listen);
            node_config.max_sessions = max_sessions;
            node_config.handshake_timeout = Duration::from_millis(handshake_timeout_ms);
            let node = cdts_node::node::ContextNode::new(node_config, registry);
            node.run().await?;
        }
        Command::Connect {
            config,
            addr,
            handshake_timeout_ms,
        } => {
            let registry = Startup::new().start_from_file(&config)?;
            let ctx = registry.current();
            let session = cdts_node::node::connect_and_negotiate(
                addr,
                &ctx,
                Duration::from_millis(handshake_timeout_ms),
            )
            .await?;
            session.ping(b"cdts").await?;
            println!(
                "agreed with {} on {}",
                session.remote_address(),
                session.agreed.fingerprint
            );
            session.close().await;
        }
    }
    Ok(())
}
