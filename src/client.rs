use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

/// Header naming the project a request belongs to.
pub const PROJECT_HEADER: &str = "X-Snapgram-Project";
/// Header carrying the session secret on authenticated calls.
pub const SESSION_HEADER: &str = "X-Snapgram-Session";

/// Sentinel id asking the backend to assign a unique id server-side.
pub const UNIQUE_ID: &str = "unique()";

/// Which sub-API a request belongs to. Decides how non-2xx responses map
/// onto the error taxonomy when the status alone is not specific enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Identity,
    Document,
    Storage,
}

/// Handle to the hosted backend. Constructed once from validated
/// configuration and passed by reference into every operation; the session
/// secret is the only mutable state it carries.
pub struct Client {
    http: reqwest::Client,
    base: Url,
    config: Config,
    session: RwLock<Option<String>>,
}

impl Client {
    /// Build a client. No timeout is configured and nothing retries: every
    /// failure is reported exactly once to the caller.
    pub fn new(config: Config) -> Result<Self> {
        // A trailing slash makes Url::join treat the endpoint as a base
        // rather than replacing its last path segment.
        let base = Url::parse(&format!(
            "{}/",
            config.backend.endpoint.trim_end_matches('/')
        ))
        .map_err(|e| Error::Validation(format!("invalid endpoint: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("snapgram/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            config,
            session: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adopt a session secret, e.g. one persisted from a previous run.
    pub async fn set_session(&self, secret: impl Into<String>) {
        *self.session.write().await = Some(secret.into());
    }

    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    pub async fn session_secret(&self) -> Option<String> {
        self.session.read().await.clone()
    }

    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Resolve a path (no leading slash) against the configured endpoint.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Validation(format!("invalid request path '{path}': {e}")))
    }

    pub(crate) fn get(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.get(self.url(path)?))
    }

    pub(crate) fn post(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.post(self.url(path)?))
    }

    pub(crate) fn patch(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.patch(self.url(path)?))
    }

    pub(crate) fn delete(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.delete(self.url(path)?))
    }

    /// Send a request expecting a JSON body back.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        rb: RequestBuilder,
        scope: Scope,
    ) -> Result<T> {
        let response = self.dispatch(rb).await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if status.is_success() {
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            Err(error_for(scope, status, &bytes))
        }
    }

    /// Send a request where success carries no body of interest.
    pub(crate) async fn send_no_content(&self, rb: RequestBuilder, scope: Scope) -> Result<()> {
        let response = self.dispatch(rb).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await?;
        Err(error_for(scope, status, &bytes))
    }

    async fn dispatch(&self, rb: RequestBuilder) -> Result<reqwest::Response> {
        let mut rb = rb.header(PROJECT_HEADER, &self.config.backend.project_id);
        if let Some(secret) = self.session.read().await.clone() {
            rb = rb.header(SESSION_HEADER, secret);
        }
        Ok(rb.send().await?)
    }
}

/// Error payload the backend returns for failed requests.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

fn error_for(scope: Scope, status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<ApiErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        _ => match scope {
            // Auth means the backend judged the credentials and said no.
            // Only client errors carry that judgement; a failing server on
            // an identity route must never read as "signed out".
            Scope::Identity if status.is_client_error() => Error::Auth(message),
            Scope::Identity => Error::Backend(message),
            Scope::Document => Error::Persistence(message),
            Scope::Storage => Error::Storage(message),
        },
    }
}
