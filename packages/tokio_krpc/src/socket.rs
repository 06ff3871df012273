use crate::errors::{
    Error,
    ErrorKind,
};
use failure::ResultExt;
use krpc_encoding::NodeID;
use std::{
    future::Future,
    net::{
        SocketAddr,
        SocketAddrV4,
    },
    sync::Arc,
    time::Duration,
};
use tokio::net::UdpSocket;

const RECV_BUFFER_LEN: usize = 8192;
const WRITE_DEADLINE: Duration = Duration::from_secs(5);

/// A bound UDP socket shared by every sender task and by the read loop.
/// Writes carry a 5-second deadline; short writes are reported as
/// [`ErrorKind::WriteIncomplete`] rather than silently retried — this
/// transport is not responsible for retries.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<UdpTransport, Error> {
        let socket = UdpSocket::bind(addr)
            .await
            .context(ErrorKind::BindError)?;

        Ok(UdpTransport {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.socket
            .local_addr()
            .map_err(|_| ErrorKind::BindError.into())
    }

    /// Sends one datagram, enforcing the 5-second write deadline.
    pub async fn send(&self, to: SocketAddr, data: &[u8]) -> Result<(), Error> {
        let write = self.socket.send_to(data, to);
        let n = tokio::time::timeout(WRITE_DEADLINE, write)
            .await
            .map_err(|_| ErrorKind::SendError { to })?
            .context(ErrorKind::SendError { to })?;

        if n != data.len() {
            return Err(ErrorKind::WriteIncomplete { to }.into());
        }

        Ok(())
    }

    /// Reads datagrams until either the socket errors or `shutdown` reports
    /// true, spawning `dispatch(addr, bytes)` as an independent task for each
    /// one. No ordering is guaranteed between dispatched tasks.
    pub async fn run_read_loop<F, Fut>(
        &self,
        dispatch: F,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Result<(), Error>
    where
        F: Fn(SocketAddr, Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let dispatch = Arc::new(dispatch);
        let mut buf = vec![0u8; RECV_BUFFER_LEN];

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    let (n, addr) = received.context(ErrorKind::ReceiveError)?;
                    let datagram = buf[..n].to_vec();
                    let dispatch = dispatch.clone();
                    tokio::spawn(async move {
                        dispatch(addr, datagram).await;
                    });
                }
                changed = shutdown.recv() => {
                    match changed {
                        Some(false) => {}
                        Some(true) | None => return Ok(()),
                    }
                }
            }
        }
    }
}

/// A best-effort liveness check for a stale bucket entry: binds a throwaway
/// socket, sends a `ping`, and waits up to `timeout` for any reply.
/// Independent of the node's own socket and read loop so it cannot race with
/// normal dispatch.
pub async fn probe(addr: SocketAddrV4, own_id: NodeID, timeout: Duration) -> bool {
    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket,
        Err(_) => return false,
    };

    let query = krpc_encoding::Query::Ping { id: own_id };
    let message = krpc_encoding::Message {
        ip: None,
        transaction_id: crate::token::TransactionId::generate().to_vec(),
        version: None,
        message_type: krpc_encoding::MessageType::Query { query },
        read_only: false,
    };

    let encoded = match message.encode() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    if socket.send_to(&encoded, SocketAddr::V4(addr)).await.is_err() {
        return false;
    }

    let mut buf = [0u8; 512];
    tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map(|result| result.is_ok())
        .unwrap_or(false)
}
