//! Canned-response HTTP servers for client tests.
use std::{
    convert::Infallible,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, body::Incoming, header, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    task::JoinHandle,
};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Responder = Arc<dyn Fn(&Recorded) -> (u16, String) + Send + Sync>;
type Log = Arc<Mutex<Vec<Recorded>>>;

/// How a test server treats each connection.
#[derive(Clone)]
enum Mode {
    Respond(Responder),
    /// Read the request head, write these bytes verbatim, close.
    Raw(&'static [u8]),
    /// Read and never answer.
    Silent,
}

pub struct FakeServer {
    _dir: Option<tempfile::TempDir>,
    path: PathBuf,
    port: u16,
    log: Log,
    task: JoinHandle<()>,
}

impl FakeServer {
    pub async fn unix<F>(respond: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        Self::unix_with(Mode::Respond(Arc::new(respond))).await
    }

    /// Accepts connections and never answers.
    pub async fn unix_silent() -> Self {
        Self::unix_with(Mode::Silent).await
    }

    /// Answers every request with `reply`, byte for byte, then hangs up.
    pub async fn unix_raw(reply: &'static [u8]) -> Self {
        Self::unix_with(Mode::Raw(reply)).await
    }

    async fn unix_with(mode: Mode) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();
        let log: Log = Arc::default();
        let l = log.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(serve(stream, mode.clone(), l.clone()));
            }
        });
        Self {
            _dir: Some(dir),
            path,
            port: 0,
            log,
            task,
        }
    }

    pub async fn tcp<F>(respond: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mode = Mode::Respond(Arc::new(respond));
        let log: Log = Arc::default();
        let l = log.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(serve(stream, mode.clone(), l.clone()));
            }
        });
        Self {
            _dir: None,
            path: PathBuf::new(),
            port,
            log,
            task,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve<S>(mut stream: S, mode: Mode, log: Log)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let respond = match mode {
        Mode::Respond(respond) => respond,
        Mode::Raw(reply) => {
            read_head(&mut stream).await;
            let _ = stream.write_all(reply).await;
            let _ = stream.shutdown().await;
            return;
        }
        Mode::Silent => {
            let mut buf = [0u8; 1024];
            while matches!(stream.read(&mut buf).await, Ok(n) if n > 0) {}
            return;
        }
    };

    let service = service_fn(move |req: Request<Incoming>| {
        let respond = respond.clone();
        let log = log.clone();
        async move {
            let (parts, incoming) = req.into_parts();
            let body = incoming
                .collect()
                .await
                .map(|c| c.to_bytes())
                .unwrap_or_default();
            let recorded = Recorded {
                method: parts.method.to_string(),
                path: parts
                    .uri
                    .path_and_query()
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                headers: parts
                    .headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                    .collect(),
                body: String::from_utf8_lossy(&body).into_owned(),
            };
            log.lock().unwrap().push(recorded.clone());

            let (status, body) = respond(&recorded);
            let resp = Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(body)))
                .unwrap();
            Ok::<_, Infallible>(resp)
        }
    });
    let _ = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await;
}

async fn read_head<S: AsyncRead + Unpin>(stream: &mut S) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
