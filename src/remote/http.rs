//! Adapter for `dayledger-server`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{
    build_client, decode_snapshot, map_status_error, map_transport_error, Backend, RemoteError,
    RemotePort,
};
use crate::models::Snapshot;

pub struct HttpRemote {
    client: Client,
    snapshot_url: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, RemoteError> {
        Ok(Self {
            client: build_client()?,
            snapshot_url: format!("{}/snapshot", base_url.trim_end_matches('/')),
            token,
        })
    }
}

#[async_trait]
impl RemotePort for HttpRemote {
    fn backend(&self) -> Backend {
        Backend::Http
    }

    fn is_writable(&self) -> bool {
        self.token.is_some()
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, RemoteError> {
        let response = self
            .client
            .get(&self.snapshot_url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Snapshot::empty());
        }
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let body = response.text().await.map_err(map_transport_error)?;
        decode_snapshot(&body)
    }

    async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
        let token = self.token.as_deref().ok_or(RemoteError::ReadOnly)?;

        let response = self
            .client
            .put(&self.snapshot_url)
            .bearer_auth(token)
            .json(snapshot)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        Ok(())
    }
}
