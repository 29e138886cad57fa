//! Docker engine implementation of [`ContainerRuntime`].
//!
//! Lifecycle calls go to the engine API over its unix socket. Image builds
//! shell out to the docker CLI with the recipe on stdin.
mod api;
mod config;
pub use config::DockerConfig;

use std::{
    net::Ipv4Addr,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use fleet_core::{error::CoreError, error::CoreResult, runtime::ContainerRuntime};
use serde_json::{Value, json};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, trace, warn};

use crate::{
    error::ExecError,
    http::{Body, Connector, HttpClient, HttpResponse, UnixConnector},
    selinux,
};

const SELINUX_TARGET: &str = "/selinux";

pub struct DockerRuntime<C = UnixConnector> {
    http: HttpClient<C>,
    binary: PathBuf,
    stop_grace_secs: u32,
    selinuxfs: Option<PathBuf>,
}

impl DockerRuntime<UnixConnector> {
    /// Runtime on the configured socket, resolving the selinuxfs mount if the
    /// hack is enabled.
    pub async fn connect(config: &DockerConfig) -> Result<Self, ExecError> {
        config.validate()?;
        let selinuxfs = if config.selinux_hack {
            let found = selinux::find_mount(Path::new(selinux::PROC_MOUNTS))
                .await
                .map_err(|source| ExecError::Io {
                    endpoint: selinux::PROC_MOUNTS.into(),
                    source,
                })?;
            if found.is_none() {
                warn!("selinux hack requested but no selinuxfs is mounted");
            }
            found
        } else {
            None
        };
        Ok(Self::with_connector(
            UnixConnector::new(&config.socket),
            config,
            selinuxfs,
        ))
    }
}

impl<C: Connector> DockerRuntime<C> {
    pub fn with_connector(connector: C, config: &DockerConfig, selinuxfs: Option<PathBuf>) -> Self {
        Self {
            http: HttpClient::new(connector, config.timeout()),
            binary: config.binary.clone(),
            stop_grace_secs: config.stop_grace_secs,
            selinuxfs,
        }
    }

    /// Send a request and require one of the success statuses.
    async fn call(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        extra_ok: &[u16],
    ) -> CoreResult<HttpResponse> {
        let resp = self
            .http
            .request(method, path, body.as_ref().map(Body::json))
            .await?;
        if matches!(resp.status, 200 | 201 | 204) || extra_ok.contains(&resp.status) {
            return Ok(resp);
        }
        Err(CoreError::protocol(
            format!("{method} {path}"),
            resp.status,
            resp.text().trim(),
        ))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> CoreResult<T> {
        let resp = self.call("GET", path, None, &[]).await?;
        resp.json().map_err(|e| {
            ExecError::Malformed {
                endpoint: format!("{}{path}", self.http.endpoint()),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn inspect(&self, name: &str) -> CoreResult<api::ContainerInspect> {
        self.get_json(&format!("/containers/{name}/json")).await
    }

    fn create_body(&self, image: &str) -> Value {
        let mut body = json!({
            "Hostname": "",
            "Domainname": "",
            "User": "",
            "AttachStdin": true,
            "AttachStdout": true,
            "AttachStderr": true,
            "Tty": true,
            "OpenStdin": true,
            "StdinOnce": true,
            "Image": image,
            "WorkingDir": "",
            "NetworkDisabled": false,
        });
        if let Some(fs) = &self.selinuxfs {
            body["Volumes"] = json!({ SELINUX_TARGET: {} });
            body["HostConfig"] = json!({
                "Binds": [format!("{}:{SELINUX_TARGET}:ro", fs.display())],
            });
        }
        body
    }
}

#[async_trait]
impl<C: Connector> ContainerRuntime for DockerRuntime<C> {
    async fn build_image(&self, spec: &str, repo: &str, tag: &str) -> CoreResult<()> {
        let image = format!("{repo}:{tag}");
        let endpoint = format!("{} build {image}", self.binary.display());
        debug!(image = %image, "docker build");
        trace!(image = %image, recipe = spec, "build recipe");

        let transport = |reason: String| CoreError::Transport {
            endpoint: endpoint.clone(),
            reason,
        };
        // Intermediate containers are removed; only the final image stays.
        let mut child = Command::new(&self.binary)
            .args(["build", "--rm", "-t", image.as_str(), "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| transport(format!("spawn failed: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits early closes the pipe; its exit status says why.
            if let Err(e) = stdin.write_all(spec.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(transport(format!("writing recipe: {e}")));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| transport(format!("wait failed: {e}")))?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        let status = output
            .status
            .code()
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(u16::MAX);
        Err(CoreError::protocol(endpoint, status, detail.trim()))
    }

    async fn create_container(&self, image: &str, name: &str) -> CoreResult<()> {
        debug!(instance = name, image, "docker create");
        self.call(
            "POST",
            &format!("/containers/create?name={name}"),
            Some(self.create_body(image)),
            &[],
        )
        .await
        .map(drop)
    }

    async fn start_container(&self, name: &str) -> CoreResult<()> {
        debug!(instance = name, "docker start");
        self.call("POST", &format!("/containers/{name}/start"), None, &[])
            .await
            .map(drop)
    }

    async fn stop_container(&self, name: &str) -> CoreResult<()> {
        debug!(instance = name, "docker stop");
        // 304: already stopped.
        self.call(
            "POST",
            &format!("/containers/{name}/stop?t={}", self.stop_grace_secs),
            None,
            &[304],
        )
        .await
        .map(drop)
    }

    async fn delete_container(&self, name: &str) -> CoreResult<()> {
        debug!(instance = name, "docker rm");
        self.call("DELETE", &format!("/containers/{name}"), None, &[])
            .await
            .map(drop)
    }

    async fn delete_image(&self, image: &str) -> CoreResult<()> {
        debug!(image, "docker rmi");
        self.call("DELETE", &format!("/images/{image}"), None, &[])
            .await
            .map(drop)
    }

    async fn container_exists(&self, name: &str, include_stopped: bool) -> CoreResult<bool> {
        let path = if include_stopped {
            "/containers/json?all=1"
        } else {
            "/containers/json"
        };
        let list: Vec<api::ContainerSummary> = self.get_json(path).await?;
        Ok(list.iter().any(|c| c.matches(name)))
    }

    async fn image_exists(&self, repo: &str, tag: &str) -> CoreResult<bool> {
        let image = format!("{repo}:{tag}");
        let list: Vec<api::ImageSummary> = self.get_json("/images/json").await?;
        Ok(list.iter().any(|i| i.matches(&image)))
    }

    async fn get_address(&self, name: &str) -> CoreResult<String> {
        let info = self.inspect(name).await?;
        let addr = info.network_settings.ip_address.trim();
        if addr.is_empty() {
            return Err(CoreError::ResourceState(format!(
                "{name} has no address (not running?)"
            )));
        }
        if addr.parse::<Ipv4Addr>().is_err() {
            return Err(CoreError::ResourceState(format!(
                "{name} reported a non-IPv4 address {addr:?}"
            )));
        }
        Ok(addr.to_string())
    }

    async fn get_hosts_table_path(&self, name: &str) -> CoreResult<PathBuf> {
        let info = self.inspect(name).await?;
        let path = info.hosts_path.trim();
        if path.is_empty() {
            return Err(CoreError::ResourceState(format!(
                "{name} has no hosts file"
            )));
        }
        Ok(PathBuf::from(path))
    }
}
