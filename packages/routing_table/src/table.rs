use crate::{
    bucket::{
        Bucket,
        Insert,
    },
    contact::Contact,
    errors::{
        Error,
        ErrorKind,
    },
    snapshot,
};
use krpc_encoding::NodeID;
use std::{
    net::SocketAddrV4,
    time::Duration,
};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Prefix-tree of [`Bucket`]s keyed by XOR distance from `owner`.
pub struct RoutingTable {
    owner: NodeID,
    buckets: Vec<Bucket>,
}

impl RoutingTable {
    pub fn new(owner: NodeID) -> RoutingTable {
        RoutingTable {
            owner,
            buckets: vec![Bucket::root()],
        }
    }

    pub fn owner_id(&self) -> NodeID {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_index_for(&self, distance_index: usize) -> usize {
        self.buckets
            .iter()
            .position(|bucket| bucket.covers(distance_index))
            .expect("buckets cover the full distance range")
    }

    /// Inserts or refreshes `(id, addr)` without attempting a liveness probe
    /// on a full, non-owner bucket — the newcomer is simply dropped in that
    /// case. Returns whether the contact ended up resident in the table.
    pub fn update_no_probe(&mut self, id: NodeID, addr: SocketAddrV4) -> bool {
        if id == self.owner {
            return false;
        }
        let distance_index = match self.owner.distance(&id).bucket_index() {
            Some(index) => index,
            None => return false,
        };

        loop {
            let idx = self.bucket_index_for(distance_index);
            if self.buckets[idx].refresh(&id, addr) {
                return true;
            }

            match self.buckets[idx].insert(Contact::new(id, addr)) {
                Insert::Inserted => return true,
                Insert::Dropped => return false,
                Insert::NeedsSplit => {
                    let upper = self.buckets[idx].split(&self.owner);
                    self.buckets.insert(idx + 1, upper);
                }
            }
        }
    }

    /// Inserts or refreshes `(id, addr)`. When the target bucket is full and
    /// does not cover the owner's prefix, the least-recently-seen contact is
    /// probed for liveness before the newcomer is dropped.
    pub async fn update(&mut self, id: NodeID, addr: SocketAddrV4) -> bool {
        if id == self.owner {
            return false;
        }
        let distance_index = match self.owner.distance(&id).bucket_index() {
            Some(index) => index,
            None => return false,
        };

        loop {
            let idx = self.bucket_index_for(distance_index);
            if self.buckets[idx].refresh(&id, addr) {
                return true;
            }

            match self.buckets[idx].insert(Contact::new(id, addr)) {
                Insert::Inserted => return true,
                Insert::NeedsSplit => {
                    let upper = self.buckets[idx].split(&self.owner);
                    self.buckets.insert(idx + 1, upper);
                }
                Insert::Dropped => {
                    let oldest = self.buckets[idx].oldest().copied();
                    let oldest = match oldest {
                        Some(contact) => contact,
                        None => return false,
                    };

                    let alive = tokio_krpc::probe(oldest.addr, self.owner, PROBE_TIMEOUT).await;
                    if alive {
                        return false;
                    }

                    self.buckets[idx].evict_oldest_and_insert(Contact::new(id, addr));
                    return true;
                }
            }
        }
    }

    /// Returns up to `k` contacts with the smallest XOR distance to
    /// `target`, ascending, ties broken by more-recent `last_seen`.
    pub fn closest(&self, target: &NodeID, k: usize) -> Vec<Contact> {
        let mut all: Vec<Contact> = self
            .buckets
            .iter()
            .flat_map(|bucket| bucket.contacts().iter().copied())
            .collect();

        all.sort_by(|a, b| {
            let distance_a = target.distance(&a.id);
            let distance_b = target.distance(&b.id);
            distance_a
                .cmp(&distance_b)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
        });

        all.truncate(k);
        all
    }

    pub fn snapshot(&self) -> Vec<u8> {
        snapshot::encode(&self.owner, &self.buckets)
    }

    /// Rebuilds a table from a previously-taken snapshot. Any framing error
    /// is reported so the caller can fall back to a freshly generated
    /// identity (a `SnapshotError`).
    pub fn restore(bytes: &[u8]) -> Result<RoutingTable, Error> {
        let (owner, buckets) = snapshot::decode(bytes)?;
        if buckets.is_empty() {
            return Err(ErrorKind::SnapshotError.into());
        }
        Ok(RoutingTable { owner, buckets })
    }
}
