//! HTTP/1.1 client (hyper) over a pluggable byte stream.
//!
//! The docker daemon listens on a unix socket and the configuration agents on
//! TCP; both are reached through the same [`HttpClient`], differing only in
//! the [`Connector`] that opens the stream.
mod client;
pub use client::{Body, HttpClient};

mod connector;
#[cfg(unix)]
pub use connector::UnixConnector;
pub use connector::{Connector, TcpConnector};

mod response;
pub use response::HttpResponse;
