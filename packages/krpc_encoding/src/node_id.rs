use rand::RngCore;
use serde::{
    de::{
        self,
        Visitor,
    },
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    cmp::Ordering,
    fmt,
};

pub const NODE_ID_LEN: usize = 20;

/// 160-bit identifier of a DHT participant, also used to address torrent
/// infohashes in queries that search the network for peers of a torrent.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeID([u8; NODE_ID_LEN]);

impl NodeID {
    pub fn new(bytes: [u8; NODE_ID_LEN]) -> NodeID {
        NodeID(bytes)
    }

    /// Generates a fresh identifier from a cryptographically adequate PRNG.
    pub fn random() -> NodeID {
        let mut bytes = [0u8; NODE_ID_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        NodeID(bytes)
    }

    pub fn from_hex(hex: &str) -> Option<NodeID> {
        let decoded = hex::decode(hex).ok()?;
        if decoded.len() != NODE_ID_LEN {
            return None;
        }
        let mut bytes = [0u8; NODE_ID_LEN];
        bytes.copy_from_slice(&decoded);
        Some(NodeID(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// The bitwise XOR of two identifiers, interpreted as a 160-bit unsigned
    /// integer distance.
    pub fn distance(&self, other: &NodeID) -> Distance {
        let mut out = [0u8; NODE_ID_LEN];
        for i in 0..NODE_ID_LEN {
            out[i] = self.0[i] ^ other.0[i];
        }
        Distance(out)
    }

    /// Builds an identity artificially close to `target`: the first 10 bytes
    /// of `target` followed by the last 10 bytes of `owner`. Used to attract
    /// `announce_peer` traffic for a torrent infohash. When `target` does not
    /// carry a full identifier (e.g. an empty query field), `owner` is
    /// returned unchanged.
    pub fn neighbor(owner: &NodeID, target: &[u8]) -> NodeID {
        if target.len() != NODE_ID_LEN {
            return *owner;
        }

        let mut bytes = [0u8; NODE_ID_LEN];
        bytes[..10].copy_from_slice(&target[..10]);
        bytes[10..].copy_from_slice(&owner.0[10..]);
        NodeID(bytes)
    }
}

impl Ord for NodeID {
    fn cmp(&self, other: &NodeID) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for NodeID {
    fn partial_cmp(&self, other: &NodeID) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeID({})", self.to_hex())
    }
}

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// XOR distance between two [`NodeID`]s, ordered as a 160-bit unsigned
/// big-endian integer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Distance([u8; NODE_ID_LEN]);

impl Distance {
    pub fn zero() -> Distance {
        Distance([0u8; NODE_ID_LEN])
    }

    /// Index (0-based, from the most significant bit) of the highest set bit,
    /// i.e. the k-bucket index this distance falls into. `None` for a zero
    /// distance (owner to itself).
    pub fn bucket_index(&self) -> Option<usize> {
        for (byte_idx, byte) in self.0.iter().enumerate() {
            if *byte != 0 {
                let bit_idx = 7 - byte.leading_zeros() as usize;
                return Some((NODE_ID_LEN - 1 - byte_idx) * 8 + bit_idx);
            }
        }
        None
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }
}

impl Serialize for NodeID {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde_bytes::serialize(&self.0[..], serializer)
    }
}

impl<'de> Deserialize<'de> for NodeID {
    fn deserialize<D>(deserializer: D) -> Result<NodeID, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NodeIDVisitor;

        impl<'de> Visitor<'de> for NodeIDVisitor {
            type Value = NodeID;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 20-byte node identifier")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<NodeID, E>
            where
                E: de::Error,
            {
                if v.len() != NODE_ID_LEN {
                    return Err(de::Error::invalid_length(v.len(), &self));
                }
                let mut bytes = [0u8; NODE_ID_LEN];
                bytes.copy_from_slice(v);
                Ok(NodeID(bytes))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<NodeID, E>
            where
                E: de::Error,
            {
                self.visit_bytes(&v)
            }
        }

        deserializer.deserialize_bytes(NodeIDVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_identity_zero() {
        let id = NodeID::random();
        assert_eq!(id.distance(&id), Distance::zero());
    }

    #[test]
    fn distance_is_symmetric() {
        let a = NodeID::random();
        let b = NodeID::random();
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn neighbor_shares_prefix_and_suffix() {
        let owner = NodeID::random();
        let target = NodeID::random();
        let neighbor = NodeID::neighbor(&owner, target.as_bytes());

        assert_eq!(&neighbor.as_bytes()[..10], &target.as_bytes()[..10]);
        assert_eq!(&neighbor.as_bytes()[10..], &owner.as_bytes()[10..]);
    }

    #[test]
    fn neighbor_passes_through_on_short_target() {
        let owner = NodeID::random();
        assert_eq!(NodeID::neighbor(&owner, &[]), owner);
    }

    #[test]
    fn bucket_index_matches_highest_set_bit() {
        let mut bytes = [0u8; NODE_ID_LEN];
        bytes[19] = 0b0000_0001;
        let distance = Distance(bytes);
        assert_eq!(distance.bucket_index(), Some(0));

        let mut bytes = [0u8; NODE_ID_LEN];
        bytes[0] = 0b1000_0000;
        let distance = Distance(bytes);
        assert_eq!(distance.bucket_index(), Some(159));
    }
}
