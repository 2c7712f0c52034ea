//! Client options: backend, credentials, endpoint and model naming.
//!
//! Options are resolved once, in [`LiveClientBuilder::build`]. Values set on the
//! builder win over the environment, which wins over defaults.

use crate::error::{LiveError, Result};
use crate::transport::{ConnectRequest, Connector, WebSocketConnector};
use genai_types::{ContentNormalizer, DefaultNormalizer};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use url::Url;

/// Default API version for Google AI Studio.
pub const DEFAULT_STUDIO_API_VERSION: &str = "v1beta";
/// Default API version for Vertex AI.
pub const DEFAULT_VERTEX_API_VERSION: &str = "v1beta1";
/// Location used for Vertex AI when none is configured.
pub const DEFAULT_VERTEX_LOCATION: &str = "us-central1";

const STUDIO_BASE_URL: &str = "wss://generativelanguage.googleapis.com";
const EPHEMERAL_TOKEN_PREFIX: &str = "auth_tokens/";

/// Environment variables consulted by [`LiveClientBuilder::build`].
pub mod env {
    /// API key (preferred).
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    /// API key (fallback).
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    /// `true`/`1` selects Vertex AI.
    pub const GOOGLE_GENAI_USE_VERTEXAI: &str = "GOOGLE_GENAI_USE_VERTEXAI";
    /// Vertex AI project.
    pub const GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
    /// Vertex AI location.
    pub const GOOGLE_CLOUD_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";
}

/// Which service the client talks to.
#[derive(Debug, Clone)]
pub enum LiveBackend {
    /// Google AI Studio, authenticated with an API key or ephemeral token.
    Studio {
        /// API key or `auth_tokens/...` ephemeral token.
        api_key: SecretString,
    },
    /// Vertex AI, authenticated with an OAuth access token.
    Vertex {
        /// Google Cloud project.
        project: String,
        /// Google Cloud location, e.g. `us-central1` or `global`.
        location: String,
        /// Access token sent as a bearer token.
        access_token: SecretString,
    },
}

/// Resolved client options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Backend and credentials.
    pub backend: LiveBackend,
    /// API version segment of the endpoint.
    pub api_version: String,
    /// Override for the endpoint origin (scheme and host).
    pub base_url: Option<Url>,
}

impl ClientOptions {
    /// Whether this targets Vertex AI.
    pub fn is_vertex(&self) -> bool {
        matches!(self.backend, LiveBackend::Vertex { .. })
    }

    /// Expand a caller-supplied model id to the resource name the service expects.
    ///
    /// A malformed id is a [`LiveError::ConnectionError`], the same error the
    /// service's handshake rejection produces.
    pub fn resolve_model(&self, model: &str) -> Result<String> {
        let model = model.trim();
        check_model_format(model)?;

        match &self.backend {
            LiveBackend::Studio { .. } => {
                if model.starts_with("models/") || model.starts_with("tunedModels/") {
                    Ok(model.to_string())
                } else {
                    Ok(format!("models/{}", model))
                }
            }
            LiveBackend::Vertex { project, location, .. } => {
                if model.starts_with("projects/") {
                    return Ok(model.to_string());
                }
                let publisher_path = if model.starts_with("publishers/") {
                    model.to_string()
                } else if let Some(id) = model.strip_prefix("models/") {
                    format!("publishers/google/models/{}", id)
                } else if let Some((publisher, id)) = model.split_once('/') {
                    format!("publishers/{}/models/{}", publisher, id)
                } else {
                    format!("publishers/google/models/{}", model)
                };
                Ok(format!("projects/{}/locations/{}/{}", project, location, publisher_path))
            }
        }
    }

    /// Endpoint URL and credentials for one connection.
    pub fn connect_request(&self) -> Result<ConnectRequest> {
        match &self.backend {
            LiveBackend::Studio { api_key } => {
                let key = api_key.expose_secret();
                let (method, param) = if key.starts_with(EPHEMERAL_TOKEN_PREFIX) {
                    ("BidiGenerateContentConstrained", "access_token")
                } else {
                    ("BidiGenerateContent", "key")
                };
                let mut url = self.origin(STUDIO_BASE_URL)?;
                url.set_path(&format!(
                    "/ws/google.ai.generativelanguage.{}.GenerativeService.{}",
                    self.api_version, method
                ));
                url.query_pairs_mut().append_pair(param, key);
                Ok(ConnectRequest::new(url))
            }
            LiveBackend::Vertex { location, access_token, .. } => {
                let host = if location == "global" {
                    "wss://aiplatform.googleapis.com".to_string()
                } else {
                    format!("wss://{}-aiplatform.googleapis.com", location)
                };
                let mut url = self.origin(&host)?;
                url.set_path(&format!(
                    "/ws/google.cloud.aiplatform.{}.LlmBidiService/BidiGenerateContent",
                    self.api_version
                ));
                Ok(ConnectRequest::new(url).with_bearer_token(access_token.clone()))
            }
        }
    }

    fn origin(&self, default: &str) -> Result<Url> {
        let mut url = match &self.base_url {
            Some(base) => base.clone(),
            None => Url::parse(default)
                .map_err(|e| LiveError::config(format!("invalid endpoint {}: {}", default, e)))?,
        };
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => return Err(LiveError::config(format!("unsupported URL scheme: {}", other))),
        };
        url.set_scheme(scheme)
            .map_err(|_| LiveError::config(format!("cannot use scheme {} for {}", scheme, url)))?;
        url.set_query(None);
        Ok(url)
    }
}

/// Model ids are `/`-separated segments of letters, digits and `-._@:`.
fn check_model_format(model: &str) -> Result<()> {
    if model.is_empty() {
        return Err(LiveError::connection("invalid model identifier: model is required"));
    }
    let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '@' | ':');
    let valid_segment = |segment: &str| !segment.is_empty() && segment.chars().all(valid_char);
    if !model.split('/').all(valid_segment) {
        return Err(LiveError::connection(format!("invalid model identifier: {:?}", model)));
    }
    Ok(())
}

/// Entry point for opening live sessions.
///
/// ```rust,no_run
/// use genai_live::LiveClient;
///
/// # fn main() -> genai_live::Result<()> {
/// let client = LiveClient::builder().api_key("your-api-key").build()?;
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LiveClient {
    pub(crate) options: Arc<ClientOptions>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) normalizer: Arc<dyn ContentNormalizer>,
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient").field("options", &self.options).finish_non_exhaustive()
    }
}

impl LiveClient {
    /// Start building a client.
    pub fn builder() -> LiveClientBuilder {
        LiveClientBuilder::default()
    }

    /// Client from environment variables alone.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// The resolved options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

/// Builder for [`LiveClient`].
#[derive(Default)]
pub struct LiveClientBuilder {
    api_key: Option<SecretString>,
    use_vertex: Option<bool>,
    project: Option<String>,
    location: Option<String>,
    access_token: Option<SecretString>,
    api_version: Option<String>,
    base_url: Option<String>,
    connector: Option<Arc<dyn Connector>>,
    normalizer: Option<Arc<dyn ContentNormalizer>>,
}

impl LiveClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Google AI Studio API key or ephemeral `auth_tokens/...` token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Target Vertex AI in a project and location.
    pub fn vertex(mut self, project: impl Into<String>, location: impl Into<String>) -> Self {
        self.use_vertex = Some(true);
        self.project = Some(project.into());
        self.location = Some(location.into());
        self
    }

    /// Choose the backend explicitly, leaving project and location to the environment.
    pub fn use_vertex(mut self, use_vertex: bool) -> Self {
        self.use_vertex = Some(use_vertex);
        self
    }

    /// OAuth access token for Vertex AI.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Override the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Override the endpoint origin, e.g. for a proxy.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use a custom transport.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Use a custom content normalizer.
    pub fn normalizer(mut self, normalizer: Arc<dyn ContentNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Build, filling gaps from the process environment.
    pub fn build(self) -> Result<LiveClient> {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    /// Build, filling gaps from `lookup` instead of the process environment.
    pub fn build_with_env<F>(self, lookup: F) -> Result<LiveClient>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let use_vertex = self
            .use_vertex
            .or_else(|| {
                lookup(env::GOOGLE_GENAI_USE_VERTEXAI)
                    .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            })
            .unwrap_or(false);

        let backend = if use_vertex {
            let project = self
                .project
                .or_else(|| lookup(env::GOOGLE_CLOUD_PROJECT))
                .ok_or_else(|| LiveError::config("Vertex AI requires a project"))?;
            let location = self
                .location
                .or_else(|| lookup(env::GOOGLE_CLOUD_LOCATION))
                .unwrap_or_else(|| DEFAULT_VERTEX_LOCATION.to_string());
            let access_token = self
                .access_token
                .ok_or_else(|| LiveError::config("Vertex AI requires an access token"))?;
            LiveBackend::Vertex { project, location, access_token }
        } else {
            let api_key = self
                .api_key
                .or_else(|| {
                    lookup(env::GOOGLE_API_KEY)
                        .or_else(|| lookup(env::GEMINI_API_KEY))
                        .map(SecretString::from)
                })
                .ok_or_else(|| {
                    LiveError::config(format!(
                        "an API key is required: set it on the builder or via {} / {}",
                        env::GOOGLE_API_KEY,
                        env::GEMINI_API_KEY
                    ))
                })?;
            LiveBackend::Studio { api_key }
        };

        let default_version =
            if use_vertex { DEFAULT_VERTEX_API_VERSION } else { DEFAULT_STUDIO_API_VERSION };
        let api_version = self.api_version.unwrap_or_else(|| default_version.to_string());
        let base_url = self
            .base_url
            .map(|raw| {
                Url::parse(&raw)
                    .map_err(|e| LiveError::config(format!("invalid base URL {}: {}", raw, e)))
            })
            .transpose()?;

        let options = ClientOptions { backend, api_version, base_url };
        tracing::debug!(vertex = options.is_vertex(), api_version = %options.api_version, "live client configured");

        Ok(LiveClient {
            options: Arc::new(options),
            connector: self.connector.unwrap_or_else(|| Arc::new(WebSocketConnector::new())),
            normalizer: self.normalizer.unwrap_or_else(|| Arc::new(DefaultNormalizer)),
        })
    }
}
