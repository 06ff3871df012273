use crate::node::Shared;
use krpc_encoding::{
    Message,
    MessageType,
    NodeID,
    NodeInfo,
    Query,
};
use std::{
    net::{
        SocketAddr,
        SocketAddrV4,
    },
    sync::Arc,
    time::Duration,
};
use tokio::sync::{
    mpsc,
    watch,
};

/// Emits a fresh `find_node` toward a random target every tick, to (a) every
/// bootstrap endpoint (resolved each tick), (b) contacts pushed onto
/// `discovery_rx` since the last tick, and (c) the closest-K contacts
/// already in the table. Returns once `shutdown_rx` reports true.
pub async fn run(
    shared: Arc<Shared>,
    bootstrap_nodes: Vec<String>,
    interval: Duration,
    mut discovery_rx: mpsc::Receiver<NodeInfo>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tick(&shared, &bootstrap_nodes, &mut discovery_rx).await;
            }
            shutdown = shutdown_rx.recv() => {
                match shutdown {
                    Some(false) => {}
                    Some(true) | None => {
                        log::info!("discovery loop for {} stopping", shared.id);
                        return;
                    }
                }
            }
        }
    }
}

async fn tick(shared: &Arc<Shared>, bootstrap_nodes: &[String], discovery_rx: &mut mpsc::Receiver<NodeInfo>) {
    let target = NodeID::random();
    log::debug!("discovery tick, target {}", target);

    for host in bootstrap_nodes {
        match tokio::net::lookup_host(host.as_str()).await {
            Ok(addrs) => {
                for addr in addrs {
                    if let SocketAddr::V4(addr) = addr {
                        send_find_node(shared, addr, target).await;
                    }
                }
            }
            Err(err) => log::debug!("failed to resolve bootstrap node {}: {}", host, err),
        }
    }

    while let Ok(node) = discovery_rx.try_recv() {
        send_find_node(shared, node.addr.socket_addr(), target).await;
    }

    let closest = {
        let table = shared.table.lock().expect("routing table lock poisoned");
        table.closest(&target, routing_table::K)
    };
    for contact in closest {
        send_find_node(shared, contact.addr, target).await;
    }
}

async fn send_find_node(shared: &Arc<Shared>, addr: SocketAddrV4, target: NodeID) {
    let message = Message {
        ip: None,
        transaction_id: tokio_krpc::TransactionId::generate().to_vec(),
        version: None,
        message_type: MessageType::Query {
            query: Query::FindNode {
                id: shared.id,
                target,
            },
        },
        read_only: false,
    };

    let encoded = match message.encode() {
        Ok(bytes) => bytes,
        Err(err) => {
            log::debug!("failed to encode outbound find_node: {}", err);
            return;
        }
    };

    log::trace!("sending find_node to {}", addr);
    if let Err(err) = shared.transport.send(SocketAddr::V4(addr), &encoded).await {
        log::warn!("find_node send to {} failed: {}", addr, err);
    }
}
