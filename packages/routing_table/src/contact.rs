use chrono::{
    DateTime,
    Utc,
};
use krpc_encoding::NodeID;
use std::net::SocketAddrV4;

/// A `(NodeID, IPv4 address, UDP port)` triple resident in the routing
/// table, plus the bookkeeping the table needs to order and age it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Contact {
    pub id: NodeID,
    pub addr: SocketAddrV4,
    pub last_seen: DateTime<Utc>,
}

impl Contact {
    pub fn new(id: NodeID, addr: SocketAddrV4) -> Contact {
        Contact {
            id,
            addr,
            last_seen: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}
