use dht_crawler::{
    Node,
    NodeOptions,
    NodeOptionsBuilder,
};
use std::{
    net::{
        Ipv4Addr,
        SocketAddr,
    },
    path::PathBuf,
    process,
};
use structopt::StructOpt;

/// Runs a standalone passive DHT crawler node.
#[derive(StructOpt, Debug)]
#[structopt(name = "dht_crawler")]
struct Cli {
    /// Local UDP address to bind to.
    #[structopt(long, default_value = "0.0.0.0:6881")]
    bind_address: SocketAddr,

    /// External IPv4 this node should describe itself as reachable at.
    /// Defaults to none; this binary does not discover its own public IP.
    #[structopt(long)]
    announced_address: Option<Ipv4Addr>,

    /// 40 hex character node id to use instead of a random one.
    #[structopt(long)]
    node_id: Option<String>,

    /// Path to read/write the routing table snapshot.
    #[structopt(long)]
    snapshot_path: Option<PathBuf>,

    /// Overrides the default bootstrap node list; may be passed more than once.
    #[structopt(long)]
    bootstrap_node: Vec<String>,

    /// Log level passed to `RUST_LOG` when the environment variable is unset.
    #[structopt(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::from_args();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &cli.log_level);
    }
    pretty_env_logger::init();

    let mut builder = NodeOptionsBuilder::new().bind_address(cli.bind_address);

    if let Some(ip) = cli.announced_address {
        builder = builder.announced_address(ip);
    }

    if let Some(hex) = &cli.node_id {
        match krpc_encoding::NodeID::from_hex(hex) {
            Some(id) => builder = builder.node_id(id),
            None => {
                log::error!("invalid --node-id: expected 40 hex characters");
                process::exit(1);
            }
        }
    }

    if let Some(path) = cli.snapshot_path {
        builder = builder.snapshot_path(path);
    }

    if !cli.bootstrap_node.is_empty() {
        builder = builder.bootstrap_nodes(cli.bootstrap_node);
    }

    let options: NodeOptions = builder.build();

    let node = match Node::start(options).await {
        Ok(node) => node,
        Err(err) => {
            log::error!("failed to start node: {}", err);
            process::exit(1);
        }
    };

    log::info!("listening on {}", node.local_addr());

    if let Err(err) = node.run_until_ctrl_c().await {
        log::error!("node shut down with an error: {}", err);
        process::exit(1);
    }
}
