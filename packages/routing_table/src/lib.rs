pub mod bucket;
pub mod contact;
pub mod errors;
pub mod snapshot;
mod table;

pub use bucket::{
    Bucket,
    Insert,
    K,
};
pub use contact::Contact;
pub use errors::{
    Error,
    ErrorKind,
    Result,
};
pub use table::RoutingTable;
