use crate::contact::Contact;
use krpc_encoding::NodeID;

/// Maximum number of contacts held by a single bucket.
pub const K: usize = 8;

/// Outcome of attempting to insert an unknown contact into a bucket.
#[derive(Debug, PartialEq, Eq)]
pub enum Insert {
    /// The contact was added; the bucket may now be full.
    Inserted,
    /// The bucket was full and covers the owner's prefix; caller should
    /// split and retry.
    NeedsSplit,
    /// The bucket was full and does not cover the owner's prefix; the
    /// contact was dropped (after an unsuccessful liveness probe, when one
    /// was attempted).
    Dropped,
}

/// A fixed-capacity set of contacts covering the distance range
/// `[lo, hi)`, where `lo`/`hi` are bucket indices as produced by
/// [`krpc_encoding::Distance::bucket_index`]. Contacts are ordered
/// oldest-first, most-recently-seen last.
pub struct Bucket {
    pub lo: usize,
    pub hi: usize,
    contacts: Vec<Contact>,
}

impl Bucket {
    /// The single bucket covering the entire 160-bit distance space.
    pub fn root() -> Bucket {
        Bucket {
            lo: 0,
            hi: krpc_encoding::NODE_ID_LEN * 8,
            contacts: Vec::new(),
        }
    }

    /// An empty bucket covering `[lo, hi)`, used when rebuilding a table from
    /// a snapshot.
    pub fn empty_range(lo: usize, hi: usize) -> Bucket {
        Bucket {
            lo,
            hi,
            contacts: Vec::new(),
        }
    }

    /// Appends a contact read back from a snapshot without re-checking
    /// capacity or distance range — the snapshot is trusted to have been
    /// produced by this same bucket layout.
    pub fn restore_contact(&mut self, contact: Contact) {
        self.contacts.push(contact);
    }

    pub fn covers(&self, distance_index: usize) -> bool {
        distance_index >= self.lo && distance_index < self.hi
    }

    /// Whether this bucket's range includes distance index 0 — the range
    /// nearest to the owner, which is the only range this implementation
    /// ever subdivides further.
    pub fn covers_owner_prefix(&self) -> bool {
        self.lo == 0
    }

    pub fn is_full(&self) -> bool {
        self.contacts.len() >= K
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, id: &NodeID) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.id == id)
    }

    /// Moves an already-resident contact to the most-recently-seen position
    /// and refreshes its address and timestamp.
    pub fn refresh(&mut self, id: &NodeID, addr: std::net::SocketAddrV4) -> bool {
        if let Some(pos) = self.contacts.iter().position(|c| &c.id == id) {
            let mut contact = self.contacts.remove(pos);
            contact.addr = addr;
            contact.touch();
            self.contacts.push(contact);
            true
        } else {
            false
        }
    }

    /// Inserts an unknown contact, per the bucket's insertion state machine.
    pub fn insert(&mut self, contact: Contact) -> Insert {
        if !self.is_full() {
            self.contacts.push(contact);
            return Insert::Inserted;
        }

        if self.covers_owner_prefix() && self.hi - self.lo > 1 {
            Insert::NeedsSplit
        } else {
            Insert::Dropped
        }
    }

    /// The least-recently-seen contact, a candidate for a liveness probe
    /// before eviction.
    pub fn oldest(&self) -> Option<&Contact> {
        self.contacts.first()
    }

    /// Evicts the least-recently-seen contact (after a failed probe) and
    /// inserts the newcomer in its place.
    pub fn evict_oldest_and_insert(&mut self, contact: Contact) {
        if !self.contacts.is_empty() {
            self.contacts.remove(0);
        }
        self.contacts.push(contact);
    }

    /// Splits this bucket in half at the midpoint of its range. `self`
    /// becomes the lower half (`[lo, mid)`); the returned bucket is the
    /// upper half (`[mid, hi)`). Contacts are redistributed by their
    /// distance-bucket-index relative to `owner`.
    pub fn split(&mut self, owner: &NodeID) -> Bucket {
        let mid = self.lo + (self.hi - self.lo) / 2;

        let mut upper = Bucket {
            lo: mid,
            hi: self.hi,
            contacts: Vec::new(),
        };

        self.hi = mid;

        let mut lower_contacts = Vec::new();
        for contact in self.contacts.drain(..) {
            let idx = owner
                .distance(&contact.id)
                .bucket_index()
                .unwrap_or(usize::max_value());
            if idx < mid {
                lower_contacts.push(contact);
            } else {
                upper.contacts.push(contact);
            }
        }
        self.contacts = lower_contacts;

        upper
    }
}
