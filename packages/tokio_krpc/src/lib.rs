//! `tokio`-backed UDP transport for KRPC datagrams: binds a socket, drives a
//! spawn-per-datagram read loop, and enforces the 5-second write deadline.
//! Outbound queries are fire-and-forget; this crate does not correlate
//! responses to transactions (see the design notes on transaction
//! correlation).

mod errors;
mod socket;
mod token;

pub use crate::{
    errors::{
        Error,
        ErrorKind,
        Result,
    },
    socket::{
        probe,
        UdpTransport,
    },
    token::{
        TransactionId,
        TRANSACTION_ID_LEN,
    },
};
