use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, client::conn::http1, header};
use hyper_util::rt::TokioIo;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{Connector, HttpResponse};
use crate::error::ExecError;

const USER_AGENT: &str = concat!("fleet-ctl/", env!("CARGO_PKG_VERSION"));

/// Request body with its media type.
#[derive(Debug, Clone)]
pub struct Body {
    pub content_type: &'static str,
    pub bytes: Bytes,
}

impl Body {
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content_type: "application/json",
            bytes: Bytes::from(value.to_string()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            content_type: "text/plain",
            bytes: Bytes::copy_from_slice(text.as_bytes()),
        }
    }
}

/// HTTP/1.1 client over whatever stream the [`Connector`] opens.
///
/// Each request gets its own connection. Connect, send and receive share one
/// deadline.
#[derive(Debug, Clone)]
pub struct HttpClient<C> {
    connector: C,
    timeout: Duration,
}

/// Drives a hyper connection; aborted when the exchange is dropped.
struct ConnectionTask(JoinHandle<()>);

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<C: Connector> HttpClient<C> {
    pub fn new(connector: C, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse, ExecError> {
        self.request("GET", path, None).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse, ExecError> {
        self.request("DELETE", path, None).await
    }

    pub async fn post(&self, path: &str, body: Option<Body>) -> Result<HttpResponse, ExecError> {
        self.request("POST", path, body).await
    }

    pub async fn put(&self, path: &str, body: Body) -> Result<HttpResponse, ExecError> {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Body>,
    ) -> Result<HttpResponse, ExecError> {
        let endpoint = self.connector.endpoint();
        trace!(endpoint = %endpoint, method, path, "http request");
        match tokio::time::timeout(self.timeout, self.exchange(method, path, body)).await {
            Ok(res) => res,
            Err(_) => Err(ExecError::Timeout {
                endpoint: format!("{endpoint}{path}"),
                after: self.timeout,
            }),
        }
    }

    async fn exchange(
        &self,
        method: &str,
        path: &str,
        body: Option<Body>,
    ) -> Result<HttpResponse, ExecError> {
        let endpoint = format!("{}{path}", self.connector.endpoint());
        let request = self.build(method, path, body).map_err(|reason| ExecError::InvalidRequest {
            endpoint: endpoint.clone(),
            reason,
        })?;

        let stream = self
            .connector
            .connect()
            .await
            .map_err(|source| ExecError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;
        let http_err = |source| ExecError::Http {
            endpoint: endpoint.clone(),
            source,
        };

        let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(http_err)?;
        let conn_endpoint = endpoint.clone();
        let _connection = ConnectionTask(tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(endpoint = %conn_endpoint, error = %e, "http connection ended with error");
            }
        }));

        let response = sender.send_request(request).await.map_err(http_err)?;
        let (parts, incoming) = response.into_parts();
        let body = incoming.collect().await.map_err(http_err)?.to_bytes();

        let resp = HttpResponse::new(parts.status, parts.headers, body);
        trace!(endpoint = %endpoint, status = resp.status, bytes = resp.body.len(), "http response");
        Ok(resp)
    }

    fn build(&self, method: &str, path: &str, body: Option<Body>) -> Result<Request<Full<Bytes>>, String> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|e| e.to_string())?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, self.connector.authority())
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "*/*");
        let payload = match body {
            Some(b) => {
                builder = builder.header(header::CONTENT_TYPE, b.content_type);
                b.bytes
            }
            None => Bytes::new(),
        };
        builder
            .header(header::CONTENT_LENGTH, payload.len())
            .body(Full::new(payload))
            .map_err(|e| e.to_string())
    }
}
