//! A passive BitTorrent Mainline DHT crawler node: joins the Kademlia
//! overlay, answers `ping`/`find_node`/`get_peers`/`announce_peer` queries,
//! maintains a routing table, and surfaces `announce_peer` observations to
//! an external callback.

mod discovery;
mod dispatch;
pub mod errors;
mod node;
pub mod options;
pub mod peer_event;
pub mod token_manager;

pub use crate::{
    errors::{
        Error,
        ErrorKind,
        Result,
    },
    node::Node,
    options::{
        NodeOptions,
        NodeOptionsBuilder,
    },
    peer_event::PeerHandler,
};
