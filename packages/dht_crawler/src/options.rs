use crate::peer_event::PeerHandler;
use krpc_encoding::NodeID;
use std::{
    net::{
        Ipv4Addr,
        SocketAddr,
    },
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

/// Default bootstrap endpoints, resolved by DNS on every discovery tick.
pub const DEFAULT_BOOTSTRAP_NODES: &[&str] = &[
    "router.bittorrent.com:6881",
    "dht.transmissionbt.com:6881",
    "router.utorrent.com:6881",
    "dht.libtorrent.org:25401",
];

const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_millis(1500);
const DEFAULT_DISCOVERY_QUEUE_CAPACITY: usize = 256;

/// Immutable configuration consumed by `Node::start`.
pub struct NodeOptions {
    pub(crate) node_id: Option<NodeID>,
    pub(crate) bind_address: SocketAddr,
    pub(crate) announced_address: Option<Ipv4Addr>,
    pub(crate) snapshot_path: Option<PathBuf>,
    pub(crate) peer_handler: Option<Arc<dyn PeerHandler>>,
    pub(crate) bootstrap_nodes: Vec<String>,
    pub(crate) discovery_interval: Duration,
    pub(crate) discovery_queue_capacity: usize,
}

impl Default for NodeOptions {
    fn default() -> NodeOptions {
        NodeOptions {
            node_id: None,
            bind_address: "0.0.0.0:6881".parse().expect("valid default bind address"),
            announced_address: None,
            snapshot_path: None,
            peer_handler: None,
            bootstrap_nodes: DEFAULT_BOOTSTRAP_NODES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            discovery_queue_capacity: DEFAULT_DISCOVERY_QUEUE_CAPACITY,
        }
    }
}

/// Builds a [`NodeOptions`] value. Generalizes the reference's functional
/// options (`NodeOption func(*Node)`) into an idiomatic fluent builder.
#[derive(Default)]
pub struct NodeOptionsBuilder {
    options: NodeOptions,
}

impl NodeOptionsBuilder {
    pub fn new() -> NodeOptionsBuilder {
        NodeOptionsBuilder::default()
    }

    /// Presets the 160-bit identity instead of generating one at random.
    pub fn node_id(mut self, id: NodeID) -> Self {
        self.options.node_id = Some(id);
        self
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.options.bind_address = addr;
        self
    }

    /// External IPv4 this node describes itself as reachable at. Purely
    /// informational (logged at startup); this builder does not perform
    /// public-IP discovery, so callers that want one set must supply it
    /// themselves.
    pub fn announced_address(mut self, ip: Ipv4Addr) -> Self {
        self.options.announced_address = Some(ip);
        self
    }

    /// Path the routing-table snapshot is read from at startup and written
    /// to at shutdown.
    pub fn snapshot_path(mut self, path: PathBuf) -> Self {
        self.options.snapshot_path = Some(path);
        self
    }

    pub fn peer_handler(mut self, handler: Arc<dyn PeerHandler>) -> Self {
        self.options.peer_handler = Some(handler);
        self
    }

    /// Overrides the default bootstrap endpoint list.
    pub fn bootstrap_nodes(mut self, nodes: Vec<String>) -> Self {
        self.options.bootstrap_nodes = nodes;
        self
    }

    /// Overrides the 1.5s default discovery tick, mainly useful in tests.
    pub fn discovery_interval(mut self, interval: Duration) -> Self {
        self.options.discovery_interval = interval;
        self
    }

    pub fn discovery_queue_capacity(mut self, capacity: usize) -> Self {
        self.options.discovery_queue_capacity = capacity;
        self
    }

    pub fn build(self) -> NodeOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_bootstrap_list_and_interval() {
        let options = NodeOptionsBuilder::new().build();
        assert_eq!(options.bootstrap_nodes, DEFAULT_BOOTSTRAP_NODES.to_vec());
        assert_eq!(options.discovery_interval, DEFAULT_DISCOVERY_INTERVAL);
        assert_eq!(options.discovery_queue_capacity, DEFAULT_DISCOVERY_QUEUE_CAPACITY);
        assert!(options.node_id.is_none());
    }

    #[test]
    fn builder_overrides_apply() {
        let id = NodeID::random();
        let options = NodeOptionsBuilder::new()
            .node_id(id)
            .bootstrap_nodes(vec!["example.org:6881".to_string()])
            .discovery_interval(Duration::from_secs(3))
            .discovery_queue_capacity(100)
            .build();

        assert_eq!(options.node_id, Some(id));
        assert_eq!(options.bootstrap_nodes, vec!["example.org:6881".to_string()]);
        assert_eq!(options.discovery_interval, Duration::from_secs(3));
        assert_eq!(options.discovery_queue_capacity, 100);
    }

    #[test]
    fn announced_address_defaults_to_none_and_can_be_overridden() {
        let options = NodeOptionsBuilder::new().build();
        assert!(options.announced_address.is_none());

        let ip = Ipv4Addr::new(203, 0, 113, 7);
        let options = NodeOptionsBuilder::new().announced_address(ip).build();
        assert_eq!(options.announced_address, Some(ip));
    }
}
