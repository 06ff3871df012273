//! End-to-end scenarios driving two in-process nodes (and raw probe sockets)
//! over loopback UDP.

use dht_crawler::{
    Node,
    NodeOptionsBuilder,
    PeerHandler,
};
use krpc_encoding::{
    Message,
    MessageType,
    NodeID,
    Query,
    Response,
};
use std::{
    net::{
        Ipv4Addr,
        SocketAddr,
    },
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};
use tokio::net::UdpSocket;

async fn start_test_node() -> Node {
    let options = NodeOptionsBuilder::new()
        .bind_address("127.0.0.1:0".parse().unwrap())
        .discovery_interval(Duration::from_millis(100))
        .build();
    Node::start(options).await.expect("node should bind and start")
}

async fn raw_query(socket: &UdpSocket, to: SocketAddr, transaction_id: &[u8], query: Query) -> Message {
    let message = Message {
        ip: None,
        transaction_id: transaction_id.to_vec(),
        version: None,
        message_type: MessageType::Query { query },
        read_only: false,
    };
    let encoded = message.encode().unwrap();
    socket.send_to(&encoded, to).await.unwrap();

    let mut buf = [0u8; 2048];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("expected a reply within 2s")
        .unwrap();
    Message::decode(&buf[..n]).expect("reply should be well-formed bencode")
}

#[tokio::test]
async fn ping_round_trip() {
    let node = start_test_node().await;
    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let reply = raw_query(
        &probe,
        node.local_addr(),
        b"aa",
        Query::Ping { id: NodeID::new([0x41; 20]) },
    )
    .await;

    assert_eq!(reply.transaction_id, b"aa".to_vec());
    assert!(reply.ip.is_none(), "replies must not carry a BEP-42 ip echo");
    match reply.message_type {
        MessageType::Response { response: Response::OnlyID { id } } => assert_eq!(id, node.owner_id()),
        other => panic!("expected an OnlyID response, got {:?}", other),
    }
}

#[tokio::test]
async fn get_peers_responds_with_a_spoofed_neighbor_id_and_a_token() {
    let node = start_test_node().await;
    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let info_hash = NodeID::random();

    let reply = raw_query(
        &probe,
        node.local_addr(),
        b"bb",
        Query::GetPeers { id: NodeID::random(), info_hash },
    )
    .await;

    match reply.message_type {
        MessageType::Response { response: Response::NextHop { id, token, .. } } => {
            let expected = NodeID::neighbor(&node.owner_id(), info_hash.as_bytes());
            assert_eq!(id, expected);
            let token = token.expect("get_peers response must carry a token");
            assert!(!token.is_empty());
        }
        other => panic!("expected a NextHop response, got {:?}", other),
    }
}

struct RecordingHandler {
    calls: Arc<Mutex<Vec<(Ipv4Addr, u16, String, String)>>>,
}

impl PeerHandler for RecordingHandler {
    fn on_peer(&self, ip: Ipv4Addr, port: u16, info_hash_hex: String, peer_id_hex: String) {
        self.calls.lock().unwrap().push((ip, port, info_hash_hex, peer_id_hex));
    }
}

#[tokio::test]
async fn announce_peer_with_implied_port_uses_the_datagram_source_port() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(RecordingHandler { calls: calls.clone() });

    let options = NodeOptionsBuilder::new()
        .bind_address("127.0.0.1:0".parse().unwrap())
        .peer_handler(handler)
        .build();
    let node = Node::start(options).await.unwrap();

    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let probe_port = probe.local_addr().unwrap().port();
    let info_hash = NodeID::random();
    let peer_id = NodeID::random();

    raw_query(
        &probe,
        node.local_addr(),
        b"cc",
        Query::AnnouncePeer {
            id: peer_id,
            implied_port: true,
            info_hash,
            port: Some(0),
            token: b"xy".to_vec(),
        },
    )
    .await;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (ip, port, info_hash_hex, peer_id_hex) = &calls[0];
    assert_eq!(*ip, Ipv4Addr::new(127, 0, 0, 1));
    assert_eq!(*port, probe_port);
    assert_eq!(*info_hash_hex, info_hash.to_hex());
    assert_eq!(*peer_id_hex, peer_id.to_hex());
}

#[tokio::test]
async fn find_node_response_feeds_the_discovery_loop() {
    let node = start_test_node().await;
    let bridge = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let discovered = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let discovered_addr = match discovered.local_addr().unwrap() {
        SocketAddr::V4(addr) => addr,
        _ => panic!("expected an ipv4 loopback address"),
    };

    let node_info = krpc_encoding::NodeInfo::new(NodeID::random(), discovered_addr);
    let response = Message {
        ip: None,
        transaction_id: b"dd".to_vec(),
        version: None,
        message_type: MessageType::Response {
            response: Response::NextHop {
                id: NodeID::random(),
                token: None,
                nodes: vec![node_info],
            },
        },
        read_only: false,
    };
    bridge
        .send_to(&response.encode().unwrap(), node.local_addr())
        .await
        .unwrap();

    let mut buf = [0u8; 2048];
    let (n, _) = tokio::time::timeout(Duration::from_secs(2), discovered.recv_from(&mut buf))
        .await
        .expect("the discovery loop should find_node the newly-discovered contact within a couple of ticks")
        .unwrap();
    let decoded = Message::decode(&buf[..n]).unwrap();
    match decoded.message_type {
        MessageType::Query { query: Query::FindNode { .. } } => {}
        other => panic!("expected a find_node query, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_datagram_is_dropped_and_the_node_stays_live() {
    let node = start_test_node().await;
    let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    probe.send_to(b"not bencode", node.local_addr()).await.unwrap();

    // Give the dispatch task a moment to (not) do anything, then confirm the
    // node still answers a well-formed ping.
    tokio::time::delay_for(Duration::from_millis(100)).await;

    let reply = raw_query(
        &probe,
        node.local_addr(),
        b"ee",
        Query::Ping { id: NodeID::new([0x41; 20]) },
    )
    .await;

    match reply.message_type {
        MessageType::Response { response: Response::OnlyID { .. } } => {}
        other => panic!("expected an OnlyID response, got {:?}", other),
    }
}

#[tokio::test]
async fn shutdown_completes_promptly_and_writes_a_snapshot() {
    let dir = std::env::temp_dir();
    let snapshot_path = dir.join(format!("dht_crawler_test_snapshot_{}", std::process::id()));

    let options = NodeOptionsBuilder::new()
        .bind_address("127.0.0.1:0".parse().unwrap())
        .snapshot_path(snapshot_path.clone())
        .build();
    let node = Node::start(options).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), node.shutdown())
        .await
        .expect("shutdown should complete within 2s")
        .unwrap();

    assert!(snapshot_path.exists());
    let _ = std::fs::remove_file(&snapshot_path);
}
