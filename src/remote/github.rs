//! Snapshot stored as a JSON file in a GitHub repository, through the
//! contents API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use super::{
    build_client, decode_snapshot, map_status_error, map_transport_error, Backend, RemoteError,
    RemotePort,
};
use crate::models::Snapshot;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_PATH: &str = "dayledger.json";
pub const DEFAULT_BRANCH: &str = "main";

pub struct GithubRemote {
    client: Client,
    api_base: String,
    repository: String,
    path: String,
    branch: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

impl GithubRemote {
    pub fn new(
        repository: &str,
        path: &str,
        branch: &str,
        token: Option<String>,
    ) -> Result<Self, RemoteError> {
        Ok(Self {
            client: build_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            repository: repository.trim_matches('/').to_string(),
            path: path.trim_start_matches('/').to_string(),
            branch: branch.to_string(),
            token,
        })
    }

    /// Points the adapter at a GitHub Enterprise (or test) API.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base, self.repository, self.path
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::ACCEPT, "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }

    /// Current file, or `None` if it does not exist yet.
    async fn get_contents(&self) -> Result<Option<ContentsResponse>, RemoteError> {
        let request = self
            .client
            .get(self.contents_url())
            .query(&[("ref", self.branch.as_str())]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let contents = response
            .json::<ContentsResponse>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some(contents))
    }
}

fn decode_content(content: &str) -> Result<Snapshot, RemoteError> {
    // GitHub wraps base64 content at 60 columns.
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(e.to_string()))?;
    let json = String::from_utf8(bytes).map_err(|e| RemoteError::Decode(e.to_string()))?;
    decode_snapshot(&json)
}

#[async_trait]
impl RemotePort for GithubRemote {
    fn backend(&self) -> Backend {
        Backend::Github
    }

    fn is_writable(&self) -> bool {
        self.token.is_some()
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, RemoteError> {
        match self.get_contents().await? {
            Some(contents) => decode_content(&contents.content),
            None => Ok(Snapshot::empty()),
        }
    }

    async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
        if self.token.is_none() {
            return Err(RemoteError::ReadOnly);
        }

        let sha = self.get_contents().await?.map(|c| c.sha);
        let json = snapshot
            .to_json_pretty()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        let body = PutContentsRequest {
            message: format!("Update dayledger data - {}", Utc::now().to_rfc3339()),
            content: STANDARD.encode(json),
            branch: &self.branch,
            sha,
        };

        let response = self
            .authorize(self.client.put(self.contents_url()))
            .json(&body)
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
