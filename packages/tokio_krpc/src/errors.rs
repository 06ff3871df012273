use failure::{
    Backtrace,
    Context,
    Fail,
};
use std::{
    fmt,
    net::SocketAddr,
};

#[derive(Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "failed to bind udp socket")]
    BindError,

    #[fail(display = "failed to send datagram to {}", to)]
    SendError { to: SocketAddr },

    #[fail(display = "send to {} completed a short write", to)]
    WriteIncomplete { to: SocketAddr },

    #[fail(display = "failed to receive datagram")]
    ReceiveError,

    #[fail(display = "krpc encoding error")]
    Encoding,
}

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(inner: Context<ErrorKind>) -> Error {
        Error { inner }
    }
}

impl From<krpc_encoding::Error> for Error {
    fn from(_cause: krpc_encoding::Error) -> Error {
        ErrorKind::Encoding.into()
    }
}
