use krpc_encoding::NodeID;

/// Derives the `get_peers` token for an infohash from the first two bytes of
/// the infohash itself, rather than the reference's per-call random token
/// (see `DESIGN.md`). Not validated on a later `announce_peer`.
pub fn token_for(info_hash: &NodeID) -> Vec<u8> {
    info_hash.as_bytes()[..2].to_vec()
}
