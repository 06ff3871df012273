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
    fmt,
    net::{
        Ipv4Addr,
        SocketAddrV4,
    },
};

pub const ADDR_LEN: usize = 6;

/// Compact 6-byte encoding of an IPv4 address and UDP port, used for peer
/// entries in a `get_peers` response's `values` list and for the optional
/// BEP-0042 `ip` echo.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Addr(SocketAddrV4);

impl Addr {
    pub fn new(addr: SocketAddrV4) -> Addr {
        Addr(addr)
    }

    pub fn ip(&self) -> &Ipv4Addr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; ADDR_LEN] {
        let mut bytes = [0u8; ADDR_LEN];
        bytes[..4].copy_from_slice(&self.0.ip().octets());
        bytes[4..].copy_from_slice(&self.0.port().to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Addr> {
        if bytes.len() != ADDR_LEN {
            return None;
        }
        let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_le_bytes([bytes[4], bytes[5]]);
        Some(Addr(SocketAddrV4::new(ip, port)))
    }
}

impl From<SocketAddrV4> for Addr {
    fn from(addr: SocketAddrV4) -> Addr {
        Addr(addr)
    }
}

impl Serialize for Addr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde_bytes::serialize(&self.to_bytes()[..], serializer)
    }
}

impl<'de> Deserialize<'de> for Addr {
    fn deserialize<D>(deserializer: D) -> Result<Addr, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AddrVisitor;

        impl<'de> Visitor<'de> for AddrVisitor {
            type Value = Addr;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 6-byte compact peer address")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Addr, E>
            where
                E: de::Error,
            {
                Addr::from_bytes(v).ok_or_else(|| de::Error::invalid_length(v.len(), &self))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Addr, E>
            where
                E: de::Error,
            {
                self.visit_bytes(&v)
            }
        }

        deserializer.deserialize_bytes(AddrVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_compact_bytes() {
        let addr = Addr::new(SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 1234));
        let bytes = addr.to_bytes();
        assert_eq!(Addr::from_bytes(&bytes), Some(addr));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(Addr::from_bytes(&[1, 2, 3]), None);
    }
}
