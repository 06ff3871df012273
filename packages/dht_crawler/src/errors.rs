use failure::{
    Backtrace,
    Context,
    Fail,
};
use std::fmt;

#[derive(Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "failed to start dht node")]
    BindError,

    #[fail(display = "peer handler panicked while processing an announce")]
    CallbackPanic,
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

impl From<tokio_krpc::Error> for Error {
    fn from(cause: tokio_krpc::Error) -> Error {
        cause.context(ErrorKind::BindError).into()
    }
}
