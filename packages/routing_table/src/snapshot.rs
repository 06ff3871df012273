//! Opaque byte framing for a routing-table snapshot. Hand-rolled rather than
//! a generic serde format, since this crate has no serde dependency: owner
//! id, then one record per bucket (its range plus its contacts).

use crate::{
    bucket::Bucket,
    contact::Contact,
    errors::{
        Error,
        ErrorKind,
    },
};
use byteorder::{
    LittleEndian,
    ReadBytesExt,
    WriteBytesExt,
};
use chrono::{
    TimeZone,
    Utc,
};
use krpc_encoding::{
    NodeID,
    NODE_ID_LEN,
};
use std::{
    io::{
        Cursor,
        Read,
        Write,
    },
    net::{
        Ipv4Addr,
        SocketAddrV4,
    },
};

pub fn encode(owner: &NodeID, buckets: &[Bucket]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_all(owner.as_bytes()).expect("writing to a Vec cannot fail");
    out.write_u32::<LittleEndian>(buckets.len() as u32)
        .expect("writing to a Vec cannot fail");

    for bucket in buckets {
        out.write_u16::<LittleEndian>(bucket.lo as u16).unwrap();
        out.write_u16::<LittleEndian>(bucket.hi as u16).unwrap();
        out.write_u16::<LittleEndian>(bucket.contacts().len() as u16)
            .unwrap();

        for contact in bucket.contacts() {
            out.write_all(contact.id.as_bytes()).unwrap();
            out.write_all(&contact.addr.ip().octets()).unwrap();
            out.write_u16::<LittleEndian>(contact.addr.port()).unwrap();
            out.write_i64::<LittleEndian>(contact.last_seen.timestamp())
                .unwrap();
        }
    }

    out
}

pub fn decode(bytes: &[u8]) -> Result<(NodeID, Vec<Bucket>), Error> {
    let mut cursor = Cursor::new(bytes);

    let mut owner_bytes = [0u8; NODE_ID_LEN];
    cursor
        .read_exact(&mut owner_bytes)
        .map_err(|_| ErrorKind::SnapshotOwnerError)?;
    let owner = NodeID::new(owner_bytes);

    let bucket_count = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ErrorKind::SnapshotError)?;

    let mut buckets = Vec::with_capacity(bucket_count as usize);
    for _ in 0..bucket_count {
        let lo = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| ErrorKind::SnapshotError)? as usize;
        let hi = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| ErrorKind::SnapshotError)? as usize;
        let contact_count = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| ErrorKind::SnapshotError)?;

        let mut bucket = Bucket::empty_range(lo, hi);

        for _ in 0..contact_count {
            let mut id_bytes = [0u8; NODE_ID_LEN];
            cursor
                .read_exact(&mut id_bytes)
                .map_err(|_| ErrorKind::SnapshotError)?;

            let mut ip_bytes = [0u8; 4];
            cursor
                .read_exact(&mut ip_bytes)
                .map_err(|_| ErrorKind::SnapshotError)?;
            let port = cursor
                .read_u16::<LittleEndian>()
                .map_err(|_| ErrorKind::SnapshotError)?;
            let last_seen_secs = cursor
                .read_i64::<LittleEndian>()
                .map_err(|_| ErrorKind::SnapshotError)?;

            let contact = Contact {
                id: NodeID::new(id_bytes),
                addr: SocketAddrV4::new(Ipv4Addr::from(ip_bytes), port),
                last_seen: Utc.timestamp(last_seen_secs, 0),
            };
            bucket.restore_contact(contact);
        }

        buckets.push(bucket);
    }

    Ok((owner, buckets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_empty_table() {
        let owner = NodeID::random();
        let buckets = vec![Bucket::root()];
        let bytes = encode(&owner, &buckets);
        let (decoded_owner, decoded_buckets) = decode(&bytes).unwrap();
        assert_eq!(owner, decoded_owner);
        assert_eq!(decoded_buckets.len(), 1);
    }

    #[test]
    fn round_trips_a_populated_bucket() {
        let owner = NodeID::random();
        let mut bucket = Bucket::root();
        bucket.insert(Contact::new(
            NodeID::random(),
            SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 4321),
        ));
        let bytes = encode(&owner, &[bucket]);
        let (_, decoded) = decode(&bytes).unwrap();
        assert_eq!(decoded[0].len(), 1);
        assert_eq!(decoded[0].contacts()[0].addr.port(), 4321);
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(decode(&[0u8; 3]).is_err());
    }
}
