//! Compact encoding of `(NodeID, IPv4, port)` contacts, and the `serde`
//! `with`-module used to (de)serialize a `Vec<NodeInfo>` as a single compact
//! byte string (the `nodes` field of `find_node`/`get_peers` responses).

use crate::{
    addr::{
        Addr,
        ADDR_LEN,
    },
    node_id::{
        NodeID,
        NODE_ID_LEN,
    },
};
use serde::{
    de::{
        self,
        Visitor,
    },
    Deserializer,
    Serializer,
};
use std::{
    fmt,
    net::SocketAddrV4,
};

pub const NODE_INFO_LEN: usize = NODE_ID_LEN + ADDR_LEN;

/// A contact as carried in a `nodes` list: an identifier plus the address it
/// claims to be reachable at.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeInfo {
    pub id: NodeID,
    pub addr: Addr,
}

impl NodeInfo {
    pub fn new(id: NodeID, addr: SocketAddrV4) -> NodeInfo {
        NodeInfo {
            id,
            addr: Addr::new(addr),
        }
    }
}

/// Encodes a compact `nodes` string. IPv6 addresses are out of scope and are
/// skipped; this encoder only ever receives IPv4 contacts.
pub fn compact(nodes: &[NodeInfo]) -> Vec<u8> {
    let mut out = Vec::with_capacity(nodes.len() * NODE_INFO_LEN);
    for node in nodes {
        out.extend_from_slice(node.id.as_bytes());
        out.extend_from_slice(&node.addr.to_bytes());
    }
    out
}

/// Decodes a compact `nodes` string. Returns an empty list if the input
/// length is not a multiple of [`NODE_INFO_LEN`].
pub fn uncompact(bytes: &[u8]) -> Vec<NodeInfo> {
    if bytes.len() % NODE_INFO_LEN != 0 {
        return Vec::new();
    }

    bytes
        .chunks_exact(NODE_INFO_LEN)
        .map(|chunk| {
            let mut id_bytes = [0u8; NODE_ID_LEN];
            id_bytes.copy_from_slice(&chunk[..NODE_ID_LEN]);
            let addr = Addr::from_bytes(&chunk[NODE_ID_LEN..])
                .expect("chunk is exactly NODE_INFO_LEN bytes");

            NodeInfo {
                id: NodeID::new(id_bytes),
                addr,
            }
        })
        .collect()
}

pub fn serialize<S>(nodes: &[NodeInfo], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serde_bytes::serialize(&compact(nodes)[..], serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<NodeInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    struct NodesVisitor;

    impl<'de> Visitor<'de> for NodesVisitor {
        type Value = Vec<NodeInfo>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a compact string of 26-byte node records")
        }

        fn visit_bytes<E>(self, v: &[u8]) -> Result<Vec<NodeInfo>, E>
        where
            E: de::Error,
        {
            Ok(uncompact(v))
        }

        fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Vec<NodeInfo>, E>
        where
            E: de::Error,
        {
            self.visit_bytes(&v)
        }

        fn visit_none<E>(self) -> Result<Vec<NodeInfo>, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_bytes(NodesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn sample_nodes() -> Vec<NodeInfo> {
        vec![
            NodeInfo::new(
                NodeID::new([1u8; NODE_ID_LEN]),
                SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 1234),
            ),
            NodeInfo::new(
                NodeID::new([2u8; NODE_ID_LEN]),
                SocketAddrV4::new(Ipv4Addr::new(5, 6, 7, 8), 5678),
            ),
        ]
    }

    #[test]
    fn round_trips_through_compact_bytes() {
        let nodes = sample_nodes();
        assert_eq!(uncompact(&compact(&nodes)), nodes);
    }

    #[test]
    fn encoded_length_is_26_bytes_per_node() {
        let nodes = sample_nodes();
        assert_eq!(compact(&nodes).len(), nodes.len() * NODE_INFO_LEN);
    }

    #[test]
    fn rejects_truncated_input() {
        assert_eq!(uncompact(&[0u8; 27]), Vec::new());
    }
}
