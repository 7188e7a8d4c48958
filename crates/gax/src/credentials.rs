//! Credentials port and the universe-domain check.
//!
//! Token acquisition is not this crate's business: a [`Credentials`] value
//! only turns itself into request headers. The built-in implementations
//! cover the cases that need no token exchange.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::call::Metadata;
use crate::errors::{ConfigError, ErrorKind, RpcError};

/// Universe domain of the public deployment.
pub const DEFAULT_UNIVERSE_DOMAIN: &str = "googleapis.com";

/// Audience and scopes the credentials are asked to authorise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub audience: Option<String>,
    pub scopes: Vec<String>,
}

/// Source of authentication headers.
#[async_trait]
pub trait Credentials: Send + Sync + fmt::Debug {
    /// Headers to attach to one outbound attempt.
    async fn headers(&self, context: &AuthContext) -> Result<Metadata, RpcError>;

    /// Universe domain the credentials were issued for.
    fn universe_domain(&self) -> &str {
        DEFAULT_UNIVERSE_DOMAIN
    }

    /// Project billed for quota, when the credentials carry one.
    fn quota_project_id(&self) -> Option<&str> {
        None
    }
}

// ---------------------------------------------------------------------------
// Built-in credentials
// ---------------------------------------------------------------------------

/// Sends no authentication headers.
#[derive(Debug, Clone, Default)]
pub struct AnonymousCredentials {
    universe_domain: Option<String>,
}

impl AnonymousCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_universe_domain(mut self, universe_domain: impl Into<String>) -> Self {
        self.universe_domain = Some(universe_domain.into());
        self
    }
}

#[async_trait]
impl Credentials for AnonymousCredentials {
    async fn headers(&self, _context: &AuthContext) -> Result<Metadata, RpcError> {
        Ok(Metadata::new())
    }

    fn universe_domain(&self) -> &str {
        self.universe_domain
            .as_deref()
            .unwrap_or(DEFAULT_UNIVERSE_DOMAIN)
    }
}

/// A pre-issued OAuth access token sent as `authorization: Bearer <token>`.
#[derive(Clone)]
pub struct AccessTokenCredentials {
    token: String,
    universe_domain: String,
    quota_project_id: Option<String>,
}

impl AccessTokenCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            universe_domain: DEFAULT_UNIVERSE_DOMAIN.to_string(),
            quota_project_id: None,
        }
    }

    #[must_use]
    pub fn with_universe_domain(mut self, universe_domain: impl Into<String>) -> Self {
        self.universe_domain = universe_domain.into();
        self
    }

    #[must_use]
    pub fn with_quota_project_id(mut self, project: impl Into<String>) -> Self {
        self.quota_project_id = Some(project.into());
        self
    }
}

impl fmt::Debug for AccessTokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenCredentials")
            .field("token", &"<redacted>")
            .field("universe_domain", &self.universe_domain)
            .field("quota_project_id", &self.quota_project_id)
            .finish()
    }
}

#[async_trait]
impl Credentials for AccessTokenCredentials {
    async fn headers(&self, _context: &AuthContext) -> Result<Metadata, RpcError> {
        if self.token.is_empty() {
            return Err(RpcError::new(
                ErrorKind::Unauthenticated,
                "access token is empty",
            ));
        }
        let mut md = Metadata::new();
        md.push("authorization", format!("Bearer {}", self.token));
        Ok(md)
    }

    fn universe_domain(&self) -> &str {
        &self.universe_domain
    }

    fn quota_project_id(&self) -> Option<&str> {
        self.quota_project_id.as_deref()
    }
}

/// An API key sent as `x-goog-api-key`.
#[derive(Clone)]
pub struct ApiKeyCredentials {
    key: String,
    universe_domain: String,
}

impl ApiKeyCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            universe_domain: DEFAULT_UNIVERSE_DOMAIN.to_string(),
        }
    }

    #[must_use]
    pub fn with_universe_domain(mut self, universe_domain: impl Into<String>) -> Self {
        self.universe_domain = universe_domain.into();
        self
    }
}

impl fmt::Debug for ApiKeyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCredentials")
            .field("key", &"<redacted>")
            .field("universe_domain", &self.universe_domain)
            .finish()
    }
}

#[async_trait]
impl Credentials for ApiKeyCredentials {
    async fn headers(&self, _context: &AuthContext) -> Result<Metadata, RpcError> {
        let mut md = Metadata::new();
        md.push("x-goog-api-key", self.key.clone());
        Ok(md)
    }

    fn universe_domain(&self) -> &str {
        &self.universe_domain
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Resolves credentials from a file path or from the ambient environment.
pub trait CredentialsLoader: Send + Sync + fmt::Debug {
    fn load_file(&self, path: &Path, context: &AuthContext)
        -> Result<Arc<dyn Credentials>, ConfigError>;

    /// Credentials used when the caller configured none.
    fn default_credentials(
        &self,
        context: &AuthContext,
    ) -> Result<Arc<dyn Credentials>, ConfigError>;
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    access_token: Option<String>,
    universe_domain: Option<String>,
    quota_project_id: Option<String>,
}

/// Reads JSON files holding a pre-issued `access_token`; falls back to
/// anonymous credentials when none are configured.
#[derive(Debug, Clone, Default)]
pub struct DefaultCredentialsLoader;

impl CredentialsLoader for DefaultCredentialsLoader {
    fn load_file(
        &self,
        path: &Path,
        _context: &AuthContext,
    ) -> Result<Arc<dyn Credentials>, ConfigError> {
        let file_error = |reason: String| ConfigError::CredentialsFile {
            path: path.display().to_string(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let parsed: TokenFile = serde_json::from_str(&text).map_err(|e| file_error(e.to_string()))?;

        let Some(token) = parsed.access_token else {
            return Err(file_error(format!(
                "credentials of type '{}' require a token exchange, which is not supported",
                parsed.kind.as_deref().unwrap_or("unknown")
            )));
        };

        debug!(path = %path.display(), "loaded access token credentials");
        let mut creds = AccessTokenCredentials::new(token);
        if let Some(universe) = parsed.universe_domain {
            creds = creds.with_universe_domain(universe);
        }
        if let Some(project) = parsed.quota_project_id {
            creds = creds.with_quota_project_id(project);
        }
        Ok(Arc::new(creds))
    }

    fn default_credentials(
        &self,
        _context: &AuthContext,
    ) -> Result<Arc<dyn Credentials>, ConfigError> {
        Ok(Arc::new(AnonymousCredentials::new()))
    }
}

// ---------------------------------------------------------------------------
// Universe check
// ---------------------------------------------------------------------------

/// Compares the credentials' universe domain with the client's, once.
///
/// Credentials that report no universe are accepted. Only success is cached;
/// a mismatch is re-detected on every call.
#[derive(Debug)]
pub struct UniverseCheck {
    client_universe: String,
    validated: OnceLock<()>,
}

impl UniverseCheck {
    pub fn new(client_universe: impl Into<String>) -> Self {
        Self {
            client_universe: client_universe.into(),
            validated: OnceLock::new(),
        }
    }

    pub fn client_universe(&self) -> &str {
        &self.client_universe
    }

    pub fn is_validated(&self) -> bool {
        self.validated.get().is_some()
    }

    pub fn validate(&self, credentials: &dyn Credentials) -> Result<(), RpcError> {
        if self.is_validated() {
            return Ok(());
        }
        let credentials_universe = credentials.universe_domain();
        if !credentials_universe.is_empty()
            && !self.client_universe.is_empty()
            && credentials_universe != self.client_universe
        {
            return Err(RpcError::new(
                ErrorKind::UniverseMismatch,
                format!(
                    "the configured universe domain ({}) does not match the universe domain found in the credentials ({}); \
                     if you haven't configured the universe domain explicitly, googleapis.com is the default",
                    self.client_universe, credentials_universe
                ),
            ));
        }
        let _ = self.validated.set(());
        Ok(())
    }
}
