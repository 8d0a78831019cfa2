//! Bearer API key authentication for write endpoints.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{error_response, AppState};

/// API key entry in the server config file
#[derive(Debug, Clone, Deserialize)]
struct ApiKeyEntry {
    key: String,
    name: String,
}

/// Server config file structure
#[derive(Debug, Clone, Deserialize, Default)]
struct ServerConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// The client behind a valid API key, added to request extensions after auth.
#[derive(Debug, Clone)]
pub struct AuthClient {
    pub name: String,
}

/// API key store - maps key -> client
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthClient>,
}

impl ApiKeyStore {
    /// Load API keys from the server config file. A missing or broken file
    /// leaves the store empty, so every write is refused.
    pub fn load(config_path: &Path) -> Self {
        let entries = match std::fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<ServerConfigFile>(&contents) {
                Ok(config) => config.api_keys,
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                Vec::new()
            }
        };

        let store = Self::from_entries(entries.into_iter().map(|e| (e.key, e.name)));
        if store.is_empty() {
            tracing::warn!("No API keys loaded - all snapshot uploads will be rejected");
        } else {
            tracing::info!("Loaded {} API key(s)", store.keys.len());
        }
        store
    }

    pub fn from_entries<K, N>(entries: impl IntoIterator<Item = (K, N)>) -> Self
    where
        K: Into<String>,
        N: Into<String>,
    {
        let keys = entries
            .into_iter()
            .map(|(key, name)| (key.into(), AuthClient { name: name.into() }))
            .collect();
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Validate an API key and return the associated client
    pub fn validate(&self, key: &str) -> Option<AuthClient> {
        self.keys.get(key).cloned()
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(key) => key.trim(),
            None => {
                return error_response(
                    StatusCode::UNAUTHORIZED,
                    "invalid_auth",
                    "Authorization header must use Bearer scheme",
                );
            }
        },
        None => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header required",
            );
        }
    };

    match state.api_keys.validate(api_key) {
        Some(client) => {
            request.extensions_mut().insert(client);
            next.run(request).await
        }
        None => error_response(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key"),
    }
}
