use crate::{
    dispatch,
    discovery,
    errors::{
        ErrorKind,
        Result,
    },
    options::NodeOptions,
    peer_event::PeerHandler,
};
use krpc_encoding::{
    NodeID,
    NodeInfo,
};
use routing_table::{
    Contact,
    RoutingTable,
};
use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};
use tokio_krpc::UdpTransport;

/// State shared by the read loop, the discovery loop, and every per-datagram
/// dispatch task. The routing table is the only piece of state mutated
/// concurrently; it is guarded by a plain `std::sync::Mutex` since no lock is
/// ever held across an `.await` point.
pub(crate) struct Shared {
    pub(crate) id: NodeID,
    pub(crate) transport: UdpTransport,
    pub(crate) table: Mutex<RoutingTable>,
    pub(crate) discovery_tx: tokio::sync::mpsc::Sender<NodeInfo>,
    pub(crate) peer_handler: Option<Arc<dyn PeerHandler>>,
    pub(crate) announced_address: Option<std::net::Ipv4Addr>,
}

/// A running DHT node: owns the UDP socket, the routing table, and the
/// background read/discovery tasks started by [`Node::start`].
pub struct Node {
    shared: Arc<Shared>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    read_loop_handle: tokio::task::JoinHandle<()>,
    discovery_handle: tokio::task::JoinHandle<()>,
    snapshot_path: Option<PathBuf>,
    local_addr: SocketAddr,
}

impl Node {
    /// Binds the socket, restores or generates an identity, and starts the
    /// read loop and discovery loop as background tasks.
    pub async fn start(options: NodeOptions) -> Result<Node> {
        let transport = UdpTransport::bind(options.bind_address).await?;
        let local_addr = transport.local_addr().map_err(|_| ErrorKind::BindError)?;

        let (id, table) = resolve_identity(&options);
        log::info!("starting node {} on {}", id, local_addr);
        if let Some(announced) = options.announced_address {
            log::info!("announcing external address {}:{}", announced, local_addr.port());
        }

        let (discovery_tx, discovery_rx) = tokio::sync::mpsc::channel(options.discovery_queue_capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let shared = Arc::new(Shared {
            id,
            transport,
            table: Mutex::new(table),
            discovery_tx,
            peer_handler: options.peer_handler.clone(),
            announced_address: options.announced_address,
        });

        let read_loop_handle = spawn_read_loop(shared.clone(), shutdown_rx.clone());

        let discovery_handle = tokio::spawn(discovery::run(
            shared.clone(),
            options.bootstrap_nodes.clone(),
            options.discovery_interval,
            discovery_rx,
            shutdown_rx,
        ));

        Ok(Node {
            shared,
            shutdown_tx,
            read_loop_handle,
            discovery_handle,
            snapshot_path: options.snapshot_path,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn owner_id(&self) -> NodeID {
        self.shared.id
    }

    /// Up to `k` contacts with smallest XOR distance to `target` currently
    /// resident in the routing table.
    pub fn closest(&self, target: &NodeID, k: usize) -> Vec<Contact> {
        self.shared
            .table
            .lock()
            .expect("routing table lock poisoned")
            .closest(target, k)
    }

    /// Blocks until an interrupt signal arrives, then shuts down gracefully.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        let _ = tokio::signal::ctrl_c().await;
        self.shutdown().await
    }

    /// Stops the read loop and the discovery loop and, if a snapshot path was
    /// configured, persists the routing table before returning.
    pub async fn shutdown(self) -> Result<()> {
        log::info!("shutting down node {}", self.shared.id);
        let _ = self.shutdown_tx.broadcast(true);

        if tokio::time::timeout(Duration::from_secs(2), self.read_loop_handle)
            .await
            .is_err()
        {
            log::warn!("read loop did not stop within the shutdown deadline");
        }

        if tokio::time::timeout(Duration::from_secs(2), self.discovery_handle)
            .await
            .is_err()
        {
            log::warn!("discovery loop did not stop within the shutdown deadline");
        }

        if let Some(path) = &self.snapshot_path {
            let bytes = self
                .shared
                .table
                .lock()
                .expect("routing table lock poisoned")
                .snapshot();
            match std::fs::write(path, bytes) {
                Ok(()) => log::info!("wrote routing table snapshot to {:?}", path),
                Err(err) => log::warn!("failed to write snapshot to {:?}: {}", path, err),
            }
        }

        Ok(())
    }
}

fn spawn_read_loop(shared: Arc<Shared>, shutdown_rx: tokio::sync::watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let dispatch_shared = shared.clone();
        let result = shared
            .transport
            .run_read_loop(
                move |addr, bytes| {
                    let shared = dispatch_shared.clone();
                    async move { dispatch::handle_datagram(shared, addr, bytes).await }
                },
                shutdown_rx,
            )
            .await;

        if let Err(err) = result {
            log::error!("read loop terminated: {}", err);
        }
    })
}

/// Restores the identity and routing table from `options.snapshot_path` when
/// present and valid; otherwise falls back to `options.node_id` or a freshly
/// generated identifier with an empty table.
fn resolve_identity(options: &NodeOptions) -> (NodeID, RoutingTable) {
    if let Some(path) = &options.snapshot_path {
        match std::fs::read(path) {
            Ok(bytes) => match RoutingTable::restore(&bytes) {
                Ok(table) => {
                    log::info!("restored routing table snapshot from {:?}", path);
                    return (table.owner_id(), table);
                }
                Err(err) => log::warn!("failed to restore snapshot from {:?}: {}", path, err),
            },
            Err(_) => log::debug!("no snapshot found at {:?}", path),
        }
    }

    let id = options.node_id.unwrap_or_else(NodeID::random);
    (id, RoutingTable::new(id))
}
