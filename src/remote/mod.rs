//! Remote snapshot stores.
//!
//! Every backend stores the whole [`Snapshot`] as one JSON blob. Reads never
//! need a credential; writes do, and an adapter built without one reports
//! itself as read-only.

mod github;
mod http;
mod jsonbin;
mod memory;

pub use github::GithubRemote;
pub use http::HttpRemote;
pub use jsonbin::JsonBinRemote;
pub use memory::MemoryRemote;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::RemoteConfig;
use crate::models::Snapshot;

const USER_AGENT: &str = concat!("dayledger/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote unreachable: {0}")]
    Unreachable(String),

    #[error("Remote rejected the credential")]
    Unauthorized,

    #[error("Remote is read-only (no credential configured)")]
    ReadOnly,

    #[error("Remote returned HTTP {0}")]
    Status(u16),

    #[error("Remote sent an unreadable snapshot: {0}")]
    Decode(String),

    #[error("Remote misconfigured: {0}")]
    Misconfigured(String),
}

/// The one seam between the synchronizer and a remote store.
#[async_trait]
pub trait RemotePort: Send + Sync {
    fn backend(&self) -> Backend;

    /// True when a credential is available for `put_snapshot`.
    fn is_writable(&self) -> bool;

    /// Current remote snapshot; an empty one if nothing was stored yet.
    async fn fetch_snapshot(&self) -> Result<Snapshot, RemoteError>;

    async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Http,
    Github,
    JsonBin,
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Http => write!(f, "http"),
            Backend::Github => write!(f, "github"),
            Backend::JsonBin => write!(f, "jsonbin"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for Backend {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "github" => Ok(Backend::Github),
            "jsonbin" => Ok(Backend::JsonBin),
            "memory" => Ok(Backend::Memory),
            other => Err(RemoteError::Misconfigured(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

/// Builds the adapter named by the config. `Ok(None)` means no remote is
/// configured at all.
pub fn from_config(config: &RemoteConfig) -> Result<Option<Arc<dyn RemotePort>>, RemoteError> {
    let Some(name) = config.backend.as_deref() else {
        return Ok(None);
    };
    let token = config.token.clone().filter(|t| !t.trim().is_empty());

    let port: Arc<dyn RemotePort> = match name.parse::<Backend>()? {
        Backend::Http => {
            let url = required(&config.url, "url")?;
            Arc::new(HttpRemote::new(url, token)?)
        }
        Backend::Github => {
            let repository = required(&config.repository, "repository")?;
            let mut remote = GithubRemote::new(
                repository,
                config.path.as_deref().unwrap_or(github::DEFAULT_PATH),
                config.branch.as_deref().unwrap_or(github::DEFAULT_BRANCH),
                token,
            )?;
            if let Some(url) = &config.url {
                remote = remote.with_api_base(url);
            }
            Arc::new(remote)
        }
        Backend::JsonBin => {
            let bin_id = required(&config.bin_id, "bin_id")?;
            let mut remote = JsonBinRemote::new(bin_id, token)?;
            if let Some(url) = &config.url {
                remote = remote.with_api_base(url);
            }
            Arc::new(remote)
        }
        Backend::Memory => Arc::new(MemoryRemote::new(token.is_some())),
    };

    Ok(Some(port))
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, RemoteError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RemoteError::Misconfigured(format!("remote.{field} is required")))
}

pub(crate) fn build_client() -> Result<reqwest::Client, RemoteError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| RemoteError::Misconfigured(e.to_string()))
}

pub(crate) fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else if let Some(status) = error.status() {
        map_status_error(status)
    } else {
        RemoteError::Unreachable(error.to_string())
    }
}

pub(crate) fn map_status_error(status: StatusCode) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        other => RemoteError::Status(other.as_u16()),
    }
}

pub(crate) fn decode_snapshot(body: &str) -> Result<Snapshot, RemoteError> {
    if body.trim().is_empty() {
        return Ok(Snapshot::empty());
    }
    Snapshot::from_json(body).map_err(|e| RemoteError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("HTTP".parse::<Backend>().unwrap(), Backend::Http);
        assert_eq!(" github ".parse::<Backend>().unwrap(), Backend::Github);
        assert_eq!("jsonbin".parse::<Backend>().unwrap(), Backend::JsonBin);
        assert!(matches!(
            "firestore".parse::<Backend>(),
            Err(RemoteError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_from_config_without_backend_is_none() {
        assert!(from_config(&RemoteConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_from_config_requires_backend_fields() {
        let config = RemoteConfig {
            backend: Some("http".to_string()),
            ..RemoteConfig::default()
        };
        assert!(matches!(
            from_config(&config),
            Err(RemoteError::Misconfigured(msg)) if msg.contains("remote.url")
        ));

        let config = RemoteConfig {
            backend: Some("jsonbin".to_string()),
            bin_id: Some("abc".to_string()),
            token: Some("key".to_string()),
            ..RemoteConfig::default()
        };
        let port = from_config(&config).unwrap().unwrap();
        assert_eq!(port.backend(), Backend::JsonBin);
        assert!(port.is_writable());
    }

    #[test]
    fn test_blank_token_is_read_only() {
        let config = RemoteConfig {
            backend: Some("github".to_string()),
            repository: Some("someone/data".to_string()),
            token: Some("  ".to_string()),
            ..RemoteConfig::default()
        };
        let port = from_config(&config).unwrap().unwrap();
        assert!(!port.is_writable());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error(StatusCode::FORBIDDEN),
            RemoteError::Unauthorized
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_GATEWAY),
            RemoteError::Status(502)
        ));
    }

    #[test]
    fn test_decode_snapshot() {
        assert!(decode_snapshot("").unwrap().is_empty());
        assert!(decode_snapshot("{}").unwrap().is_empty());
        assert!(matches!(
            decode_snapshot("<html>"),
            Err(RemoteError::Decode(_))
        ));
    }
}
