//! Snapshot stored in a JSONBin bin.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use super::{build_client, map_status_error, map_transport_error, Backend, RemoteError, RemotePort};
use crate::models::Snapshot;

pub const DEFAULT_API_BASE: &str = "https://api.jsonbin.io/v3";

const MASTER_KEY_HEADER: &str = "X-Master-Key";

pub struct JsonBinRemote {
    client: Client,
    api_base: String,
    bin_id: String,
    master_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    record: Option<Snapshot>,
}

impl JsonBinRemote {
    pub fn new(bin_id: &str, master_key: Option<String>) -> Result<Self, RemoteError> {
        Ok(Self {
            client: build_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            bin_id: bin_id.to_string(),
            master_key,
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn bin_url(&self) -> String {
        format!("{}/b/{}", self.api_base, self.bin_id)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.master_key {
            Some(key) => request.header(MASTER_KEY_HEADER, key),
            None => request,
        }
    }
}

#[async_trait]
impl RemotePort for JsonBinRemote {
    fn backend(&self) -> Backend {
        Backend::JsonBin
    }

    fn is_writable(&self) -> bool {
        self.master_key.is_some()
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, RemoteError> {
        let request = self.client.get(format!("{}/latest", self.bin_url()));
        let response = self
            .with_key(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let latest = response
            .json::<LatestResponse>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(latest.record.unwrap_or_default())
    }

    async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
        if self.master_key.is_none() {
            return Err(RemoteError::ReadOnly);
        }

        let response = self
            .with_key(self.client.put(self.bin_url()))
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
