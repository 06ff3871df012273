use failure::{
    Backtrace,
    Context,
    Fail,
};
use std::fmt;

/// Error kinds produced while encoding or decoding KRPC messages.
#[derive(Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "failed to decode bencode message")]
    DecodeError,

    #[fail(display = "failed to encode bencode message")]
    EncodeError,

    #[fail(display = "message was not a query, response, or error")]
    UnknownMessageType,

    #[fail(display = "query had an unrecognized 'q' value")]
    UnknownQuery,
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

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.inner.get_context()
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
