use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens the byte stream an [`HttpClient`](super::HttpClient) runs hyper over.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn connect(&self) -> io::Result<Self::Stream>;

    /// Value of the `Host` header.
    fn authority(&self) -> &str;

    /// Human-readable endpoint for errors and logs.
    fn endpoint(&self) -> String;
}

/// Local unix-domain socket (e.g. the docker daemon).
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: std::path::PathBuf,
}

#[cfg(unix)]
impl UnixConnector {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(unix)]
#[async_trait]
impl Connector for UnixConnector {
    type Stream = tokio::net::UnixStream;

    async fn connect(&self) -> io::Result<Self::Stream> {
        tokio::net::UnixStream::connect(&self.path).await
    }

    fn authority(&self) -> &str {
        "localhost"
    }

    fn endpoint(&self) -> String {
        format!("unix:{}", self.path.display())
    }
}

/// Plain TCP to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    authority: String,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            authority: format!("{host}:{port}"),
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = tokio::net::TcpStream;

    async fn connect(&self) -> io::Result<Self::Stream> {
        tokio::net::TcpStream::connect(self.authority.as_str()).await
    }

    fn authority(&self) -> &str {
        &self.authority
    }

    fn endpoint(&self) -> String {
        format!("http://{}", self.authority)
    }
}
