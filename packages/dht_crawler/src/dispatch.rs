use crate::{
    errors::{
        Error,
        ErrorKind,
    },
    node::Shared,
    token_manager,
};
use krpc_encoding::{
    Message,
    MessageType,
    NodeID,
    NodeInfo,
    Query,
    Response,
};
use std::{
    net::{
        Ipv4Addr,
        SocketAddr,
        SocketAddrV4,
    },
    sync::Arc,
};

/// Parses and dispatches one inbound datagram. Never propagates an error:
/// malformed input is dropped and logged at debug level, per the "no error
/// from a single datagram may bring down the node" policy.
pub async fn handle_datagram(shared: Arc<Shared>, source: SocketAddr, bytes: Vec<u8>) {
    let source_v4 = match source {
        SocketAddr::V4(addr) => addr,
        SocketAddr::V6(_) => {
            log::debug!("dropping datagram from unsupported ipv6 source {}", source);
            return;
        }
    };

    let message = match Message::decode(&bytes) {
        Ok(message) => message,
        Err(err) => {
            log::debug!("dropping malformed datagram from {}: {}", source, err);
            return;
        }
    };

    match message.message_type {
        MessageType::Query { query } => {
            handle_query(&shared, source_v4, &message.transaction_id, query).await;
        }
        MessageType::Response { response } => {
            handle_response(&shared, source_v4, response).await;
        }
        MessageType::Error { error } => {
            log::debug!("peer {} reported an error: {}", source, error);
        }
    }
}

async fn handle_query(shared: &Arc<Shared>, source: SocketAddrV4, transaction_id: &[u8], query: Query) {
    {
        let mut table = shared.table.lock().expect("routing table lock poisoned");
        table.update_no_probe(*query.querying_id(), source);
    }

    let response = match query {
        Query::Ping { .. } => Response::OnlyID { id: shared.id },

        Query::FindNode { target, .. } => {
            let nodes = closest_node_infos(shared, &target);
            Response::NextHop {
                id: shared.id,
                token: None,
                nodes,
            }
        }

        Query::GetPeers { info_hash, .. } => {
            let queried_id = NodeID::neighbor(&shared.id, info_hash.as_bytes());
            let token = token_manager::token_for(&info_hash);
            let nodes = closest_node_infos(shared, &info_hash);
            Response::NextHop {
                id: queried_id,
                token: Some(token),
                nodes,
            }
        }

        Query::AnnouncePeer {
            id,
            implied_port,
            info_hash,
            port,
            ..
        } => {
            let effective_port = if implied_port { source.port() } else { port.unwrap_or(0) };
            invoke_peer_handler(shared, *source.ip(), effective_port, info_hash, id);
            Response::OnlyID { id: shared.id }
        }
    };

    reply(shared, SocketAddr::V4(source), transaction_id, response).await;
}

fn closest_node_infos(shared: &Arc<Shared>, target: &NodeID) -> Vec<NodeInfo> {
    let table = shared.table.lock().expect("routing table lock poisoned");
    table
        .closest(target, routing_table::K)
        .into_iter()
        .map(|contact| NodeInfo::new(contact.id, contact.addr))
        .collect()
}

fn invoke_peer_handler(shared: &Arc<Shared>, ip: Ipv4Addr, port: u16, info_hash: NodeID, peer_id: NodeID) {
    let handler = match &shared.peer_handler {
        Some(handler) => handler.clone(),
        None => return,
    };

    let info_hash_hex = info_hash.to_hex();
    let peer_id_hex = peer_id.to_hex();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        handler.on_peer(ip, port, info_hash_hex.clone(), peer_id_hex.clone());
    }));

    if outcome.is_err() {
        log::warn!(
            "{}",
            Error::from(ErrorKind::CallbackPanic)
        );
    }
}

async fn handle_response(shared: &Arc<Shared>, source: SocketAddrV4, response: Response) {
    let (id, nodes) = match response {
        Response::NextHop { id, nodes, .. } => (id, nodes),
        Response::GetPeers { id, .. } => (id, Vec::new()),
        Response::OnlyID { id } => (id, Vec::new()),
    };

    {
        let mut table = shared.table.lock().expect("routing table lock poisoned");
        table.update_no_probe(id, source);
    }

    for node in nodes {
        if shared.discovery_tx.clone().try_send(node).is_err() {
            log::debug!("discovery queue full, dropping discovered contact");
        }
    }
}

async fn reply(shared: &Arc<Shared>, to: SocketAddr, transaction_id: &[u8], response: Response) {
    if let SocketAddr::V6(_) = to {
        return;
    }

    let message = Message {
        ip: None,
        transaction_id: transaction_id.to_vec(),
        version: None,
        message_type: MessageType::Response { response },
        read_only: false,
    };

    match message.encode() {
        Ok(bytes) => {
            if let Err(err) = shared.transport.send(to, &bytes).await {
                log::warn!("failed to reply to {}: {}", to, err);
            }
        }
        Err(err) => log::debug!("failed to encode reply to {}: {}", to, err),
    }
}
