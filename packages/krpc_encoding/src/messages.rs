use crate::{
    booleans,
    errors::{
        ErrorKind,
        Result,
    },
    node_info,
    Addr,
    NodeID,
    NodeInfo,
};
use serde_bytes::ByteBuf;
use serde_derive::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Envelope holding information common to every query, response, and error.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    /// Public IP address of the requester. Only sent by peers supporting
    /// BEP-0042.
    pub ip: Option<Addr>,

    /// Transaction ID generated by the querying node and echoed in the
    /// response. Used to correlate requests and responses on the wire; this
    /// implementation does not itself correlate against it (see the design
    /// notes on transaction correlation).
    #[serde(rename = "t", with = "serde_bytes")]
    pub transaction_id: Vec<u8>,

    /// Client version string.
    #[serde(rename = "v")]
    pub version: Option<ByteBuf>,

    #[serde(flatten)]
    pub message_type: MessageType,

    /// Sent by read-only DHT nodes defined in BEP-0043.
    #[serde(
        rename = "ro",
        default,
        skip_serializing_if = "booleans::is_false",
        deserialize_with = "booleans::deserialize"
    )]
    pub read_only: bool,
}

impl Message {
    pub fn decode(bytes: &[u8]) -> Result<Message> {
        serde_bencode::de::from_bytes(bytes).map_err(|_| ErrorKind::DecodeError.into())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_bencode::ser::to_bytes(self).map_err(|_| ErrorKind::EncodeError.into())
    }
}

/// The three KRPC message shapes, discriminated by the `y` key.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "y")]
pub enum MessageType {
    #[serde(rename = "q")]
    Query {
        #[serde(flatten)]
        query: Query,
    },

    #[serde(rename = "r")]
    Response {
        #[serde(rename = "r")]
        response: Response,
    },

    #[serde(rename = "e")]
    Error {
        #[serde(rename = "e")]
        error: KRPCError,
    },
}

/// Error sent when a query cannot be fulfilled: `[code, message]`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct KRPCError(pub u32, pub String);

impl KRPCError {
    pub fn new(error_code: u32, message: &str) -> KRPCError {
        KRPCError(error_code, message.to_string())
    }
}

impl fmt::Display for KRPCError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>{}", self.0, self.1)
    }
}

/// The four queries this node answers and emits.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "q", content = "a")]
pub enum Query {
    /// The most basic query. The appropriate response is [`Response::OnlyID`]
    /// carrying the responding node's own id.
    #[serde(rename = "ping")]
    Ping {
        /// Sender's node ID.
        id: NodeID,
    },

    /// Finds the contact information for a node given its ID. The queried
    /// node responds with [`Response::NextHop`] carrying the K closest good
    /// nodes in its own routing table.
    #[serde(rename = "find_node")]
    FindNode {
        /// Node ID of the querying node.
        id: NodeID,

        /// ID of the node being searched for.
        target: NodeID,
    },

    /// Gets peers associated with a torrent infohash. The queried node
    /// responds with [`Response::NextHop`] (no known peers) or
    /// [`Response::GetPeers`] (peers on file), always including a `token`
    /// required by a subsequent [`Query::AnnouncePeer`].
    #[serde(rename = "get_peers")]
    GetPeers {
        /// Node ID of the querying node.
        id: NodeID,

        /// Infohash of the torrent being searched for.
        info_hash: NodeID,
    },

    /// Announces that the peer controlling the querying node is downloading
    /// a torrent on a port.
    #[serde(rename = "announce_peer")]
    AnnouncePeer {
        /// Node ID of the querying node.
        id: NodeID,

        /// When true, `port` is ignored and the UDP source port of this
        /// query is used as the peer's port instead.
        #[serde(deserialize_with = "booleans::deserialize")]
        implied_port: bool,

        /// Infohash of the torrent being announced.
        info_hash: NodeID,

        /// Peer's port; meaningful only when `implied_port` is false.
        port: Option<u16>,

        /// Token received in a previous [`Query::GetPeers`] response.
        #[serde(with = "serde_bytes")]
        token: Vec<u8>,
    },
}

impl Query {
    pub fn querying_id(&self) -> &NodeID {
        match self {
            Query::Ping { id } => id,
            Query::FindNode { id, .. } => id,
            Query::GetPeers { id, .. } => id,
            Query::AnnouncePeer { id, .. } => id,
        }
    }
}

/// The response shapes matching each [`Query`] variant.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Response {
    /// Response to [`Query::FindNode`] and the no-peers-on-file branch of
    /// [`Query::GetPeers`].
    NextHop {
        /// Identifier of the queried node.
        id: NodeID,

        /// Token used in a future [`Query::AnnouncePeer`]. Always present for
        /// `get_peers`, absent for `find_node`.
        token: Option<Vec<u8>>,

        #[serde(with = "node_info")]
        nodes: Vec<NodeInfo>,
    },

    /// Response to [`Query::GetPeers`] when the queried node has peers on
    /// file for the infohash.
    GetPeers {
        /// Identifier of the queried node.
        id: NodeID,

        /// Token used in a future [`Query::AnnouncePeer`].
        token: Option<Vec<u8>>,

        #[serde(rename = "values")]
        peers: Vec<Addr>,
    },

    /// Response to [`Query::Ping`] and [`Query::AnnouncePeer`].
    OnlyID {
        /// Identifier of the queried node.
        id: NodeID,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{
        Ipv4Addr,
        SocketAddrV4,
    };

    fn envelope(transaction_id: &[u8], message_type: MessageType) -> Message {
        Message {
            ip: None,
            transaction_id: transaction_id.to_vec(),
            version: None,
            message_type,
            read_only: false,
        }
    }

    #[test]
    fn ping_query_round_trips() {
        let msg = envelope(
            b"aa",
            MessageType::Query {
                query: Query::Ping {
                    id: NodeID::new([7u8; 20]),
                },
            },
        );

        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
        assert_eq!(encoded, decoded.encode().unwrap());
    }

    #[test]
    fn find_node_response_round_trips_with_nodes() {
        let node = NodeInfo::new(
            NodeID::new([9u8; 20]),
            SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 1234),
        );
        let msg = envelope(
            b"ZZ",
            MessageType::Response {
                response: Response::NextHop {
                    id: NodeID::new([1u8; 20]),
                    token: None,
                    nodes: vec![node],
                },
            },
        );

        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn announce_peer_decodes_implied_port_flag() {
        let query = Query::AnnouncePeer {
            id: NodeID::new([0xaa; 20]),
            implied_port: true,
            info_hash: NodeID::new([0xbb; 20]),
            port: Some(0),
            token: b"xy".to_vec(),
        };
        let msg = envelope(b"aa", MessageType::Query { query });
        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();

        match decoded.message_type {
            MessageType::Query {
                query: Query::AnnouncePeer { implied_port, .. },
            } => assert!(implied_port),
            _ => panic!("expected an announce_peer query"),
        }
    }

    #[test]
    fn malformed_bytes_are_rejected() {
        assert!(Message::decode(b"not bencode").is_err());
    }
}
