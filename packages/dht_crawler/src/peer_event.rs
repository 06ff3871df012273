use std::net::Ipv4Addr;

/// Callback invoked synchronously from the inbound dispatcher whenever a peer
/// announces a torrent via `announce_peer`. Implementations must not block
/// indefinitely; the dispatcher runs the call behind a panic boundary so a
/// misbehaving handler cannot bring down the inbound-datagram task.
pub trait PeerHandler: Send + Sync {
    fn on_peer(&self, ip: Ipv4Addr, port: u16, info_hash_hex: String, peer_id_hex: String);
}

impl<F> PeerHandler for F
where
    F: Fn(Ipv4Addr, u16, String, String) + Send + Sync,
{
    fn on_peer(&self, ip: Ipv4Addr, port: u16, info_hash_hex: String, peer_id_hex: String) {
        self(ip, port, info_hash_hex, peer_id_hex)
    }
}
