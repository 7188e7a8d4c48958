//! Client options and endpoint resolution.
//!
//! [`ClientOptions`] is what a caller hands to a client builder; every field
//! is optional. [`resolve_endpoint`] turns it, the service descriptor and the
//! process environment into the concrete host, universe domain and client
//! certificate a transport is built with. Every environment value is checked
//! here, so an invalid value fails construction instead of the first call.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::credentials::{AuthContext, Credentials, DEFAULT_UNIVERSE_DOMAIN};
use crate::descriptor::ServiceDescriptor;
use crate::errors::ConfigError;

/// Selects whether a client certificate source is used.
pub const USE_CLIENT_CERTIFICATE_ENV: &str = "GOOGLE_API_USE_CLIENT_CERTIFICATE";
/// Selects the mTLS endpoint: `never`, `auto` or `always`.
pub const USE_MTLS_ENDPOINT_ENV: &str = "GOOGLE_API_USE_MTLS_ENDPOINT";
/// Overrides the default universe domain.
pub const UNIVERSE_DOMAIN_ENV: &str = "GOOGLE_CLOUD_UNIVERSE_DOMAIN";

/// Version of this crate, reported in `x-goog-api-client`.
pub const GAX_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Read access to environment variables.
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// PEM-encoded client certificate chain and private key.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Callable producing the client certificate for mTLS.
pub type ClientCertSource = Arc<dyn Fn() -> Result<ClientCertificate, ConfigError> + Send + Sync>;

/// Annotations for the `x-goog-api-client` and `user-agent` headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    /// Version of the service library.
    pub gapic_version: Option<String>,
    /// Prepended to the `user-agent` header.
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Value of `x-goog-api-client`.
    pub fn api_client_header(&self) -> String {
        let mut tokens = vec![format!("gax/{GAX_VERSION}")];
        if let Some(version) = &self.gapic_version {
            tokens.push(format!("gapic/{version}"));
        }
        tokens.join(" ")
    }

    /// Value of `user-agent`.
    pub fn user_agent_header(&self) -> String {
        match &self.user_agent {
            Some(ua) => format!("{ua} gax/{GAX_VERSION}"),
            None => format!("gax/{GAX_VERSION}"),
        }
    }
}

/// Caller-supplied client configuration. All fields are optional.
///
/// `credentials`, `credentials_file` and `api_key` are mutually exclusive.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Explicit host override; wins over every other endpoint setting.
    pub api_endpoint: Option<String>,
    #[serde(skip)]
    pub credentials: Option<Arc<dyn Credentials>>,
    pub credentials_file: Option<PathBuf>,
    pub api_key: Option<String>,
    /// OAuth scopes; the service defaults apply when unset.
    pub scopes: Option<Vec<String>>,
    #[serde(skip)]
    pub client_cert_source: Option<ClientCertSource>,
    /// Project billed for quota, sent as `x-goog-user-project`.
    pub quota_project_id: Option<String>,
    pub universe_domain: Option<String>,
    /// Audience for self-signed JWTs; defaults to `https://<host>/`.
    pub api_audience: Option<String>,
    pub client_info: ClientInfo,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_endpoint", &self.api_endpoint)
            .field("credentials", &self.credentials)
            .field("credentials_file", &self.credentials_file)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("scopes", &self.scopes)
            .field("client_cert_source", &self.client_cert_source.is_some())
            .field("quota_project_id", &self.quota_project_id)
            .field("universe_domain", &self.universe_domain)
            .field("api_audience", &self.api_audience)
            .field("client_info", &self.client_info)
            .finish()
    }
}

impl ClientOptions {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn Credentials>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_universe_domain(mut self, universe_domain: impl Into<String>) -> Self {
        self.universe_domain = Some(universe_domain.into());
        self
    }

    #[must_use]
    pub fn with_quota_project_id(mut self, project: impl Into<String>) -> Self {
        self.quota_project_id = Some(project.into());
        self
    }

    #[must_use]
    pub fn with_client_cert_source(mut self, source: ClientCertSource) -> Self {
        self.client_cert_source = Some(source);
        self
    }

    /// Fails when more than one credential source is set.
    pub fn validate_credential_sources(&self) -> Result<(), ConfigError> {
        let sources = [
            self.credentials.is_some(),
            self.credentials_file.is_some(),
            self.api_key.is_some(),
        ];
        if sources.iter().filter(|set| **set).count() > 1 {
            return Err(ConfigError::MutuallyExclusiveCredentials);
        }
        Ok(())
    }

    /// Audience and scopes for `host`.
    pub fn auth_context(&self, service: &ServiceDescriptor, host: &str) -> AuthContext {
        AuthContext {
            audience: Some(
                self.api_audience
                    .clone()
                    .unwrap_or_else(|| format!("https://{}/", strip_port(host))),
            ),
            scopes: self.scopes.clone().unwrap_or_else(|| {
                service
                    .default_scopes
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseMtlsEndpoint {
    Never,
    Auto,
    Always,
}

/// Outcome of [`resolve_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Host, optionally with a port or scheme when given explicitly.
    pub host: String,
    pub universe_domain: String,
    /// Present when a client certificate source is in use.
    pub client_certificate: Option<ClientCertificate>,
    /// The mTLS host was selected.
    pub mtls: bool,
}

/// Resolves the endpoint, universe domain and client certificate.
pub fn resolve_endpoint(
    service: &ServiceDescriptor,
    options: &ClientOptions,
    env: &dyn Environment,
) -> Result<ResolvedEndpoint, ConfigError> {
    let use_client_cert = read_use_client_cert(env)?;
    let use_mtls = read_use_mtls_endpoint(env)?;
    let universe_domain = resolve_universe_domain(options, env)?;

    let cert_source = if use_client_cert {
        options.client_cert_source.as_ref()
    } else {
        None
    };
    let client_certificate = cert_source.map(|source| source()).transpose()?;

    let wants_mtls = match use_mtls {
        UseMtlsEndpoint::Always => true,
        UseMtlsEndpoint::Auto => client_certificate.is_some(),
        UseMtlsEndpoint::Never => false,
    };

    let (host, mtls) = if let Some(endpoint) = &options.api_endpoint {
        (endpoint.clone(), false)
    } else if wants_mtls {
        if universe_domain != DEFAULT_UNIVERSE_DOMAIN {
            return Err(ConfigError::MtlsUniverseUnsupported {
                universe: universe_domain,
                default: DEFAULT_UNIVERSE_DOMAIN,
            });
        }
        (service.mtls_host.to_string(), true)
    } else {
        (service.endpoint_for_universe(&universe_domain), false)
    };

    debug!(
        service = service.name,
        host = %host,
        universe_domain = %universe_domain,
        mtls,
        client_certificate = client_certificate.is_some(),
        "resolved endpoint"
    );

    Ok(ResolvedEndpoint {
        host,
        universe_domain,
        client_certificate,
        mtls,
    })
}

fn read_use_client_cert(env: &dyn Environment) -> Result<bool, ConfigError> {
    match env.var(USE_CLIENT_CERTIFICATE_ENV) {
        None => Ok(false),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidEnvironment {
                variable: USE_CLIENT_CERTIFICATE_ENV,
                value,
                expected: "`true` or `false`",
            }),
        },
    }
}

fn read_use_mtls_endpoint(env: &dyn Environment) -> Result<UseMtlsEndpoint, ConfigError> {
    match env.var(USE_MTLS_ENDPOINT_ENV) {
        None => Ok(UseMtlsEndpoint::Auto),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "never" => Ok(UseMtlsEndpoint::Never),
            "auto" => Ok(UseMtlsEndpoint::Auto),
            "always" => Ok(UseMtlsEndpoint::Always),
            _ => Err(ConfigError::InvalidEnvironment {
                variable: USE_MTLS_ENDPOINT_ENV,
                value,
                expected: "`never`, `auto` or `always`",
            }),
        },
    }
}

fn resolve_universe_domain(
    options: &ClientOptions,
    env: &dyn Environment,
) -> Result<String, ConfigError> {
    let universe = options
        .universe_domain
        .clone()
        .or_else(|| env.var(UNIVERSE_DOMAIN_ENV))
        .unwrap_or_else(|| DEFAULT_UNIVERSE_DOMAIN.to_string());
    if universe.trim().is_empty() {
        return Err(ConfigError::EmptyUniverseDomain);
    }
    Ok(universe)
}

/// `host:port` form for the binary transport; `default_port` is appended to
/// bare hosts.
pub fn with_default_port(host: &str, default_port: u16) -> String {
    let authority = host
        .split_once("://")
        .map_or(host, |(_, rest)| rest)
        .trim_end_matches('/');
    if has_port(authority) {
        authority.to_string()
    } else {
        format!("{authority}:{default_port}")
    }
}

fn has_port(authority: &str) -> bool {
    match authority.rsplit_once(':') {
        // `[::1]` style literals carry colons inside the brackets.
        Some((_, port)) => !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn strip_port(host: &str) -> &str {
    let authority = host.split_once("://").map_or(host, |(_, rest)| rest);
    match authority.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AnonymousCredentials;

    static SERVICE: ServiceDescriptor = ServiceDescriptor {
        name: "test.v1.Things",
        default_host: "things.googleapis.com",
        mtls_host: "things.mtls.googleapis.com",
        endpoint_template: "things.{UNIVERSE_DOMAIN}",
        default_port: 443,
        default_scopes: &["https://www.googleapis.com/auth/cloud-platform"],
        rpcs: &[],
    };

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cert_source() -> ClientCertSource {
        Arc::new(|| {
            Ok(ClientCertificate {
                cert_pem: b"cert".to_vec(),
                key_pem: b"key".to_vec(),
            })
        })
    }

    #[test]
    fn test_defaults() {
        let resolved = resolve_endpoint(&SERVICE, &ClientOptions::default(), &env(&[])).unwrap();
        assert_eq!(resolved.host, "things.googleapis.com");
        assert_eq!(resolved.universe_domain, "googleapis.com");
        assert!(!resolved.mtls);
        assert!(resolved.client_certificate.is_none());
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let options = ClientOptions::default().with_endpoint("localhost:8080");
        let resolved = resolve_endpoint(
            &SERVICE,
            &options,
            &env(&[(USE_MTLS_ENDPOINT_ENV, "always")]),
        )
        .unwrap();
        assert_eq!(resolved.host, "localhost:8080");
    }

    #[test]
    fn test_invalid_environment_values() {
        let err = resolve_endpoint(
            &SERVICE,
            &ClientOptions::default(),
            &env(&[(USE_CLIENT_CERTIFICATE_ENV, "yes")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment { variable, .. } if variable == USE_CLIENT_CERTIFICATE_ENV));

        let err = resolve_endpoint(
            &SERVICE,
            &ClientOptions::default(),
            &env(&[(USE_MTLS_ENDPOINT_ENV, "sometimes")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment { variable, .. } if variable == USE_MTLS_ENDPOINT_ENV));
    }

    #[test]
    fn test_auto_selects_mtls_with_certificate() {
        let options = ClientOptions::default().with_client_cert_source(cert_source());
        let resolved = resolve_endpoint(
            &SERVICE,
            &options,
            &env(&[(USE_CLIENT_CERTIFICATE_ENV, "true")]),
        )
        .unwrap();
        assert_eq!(resolved.host, "things.mtls.googleapis.com");
        assert!(resolved.mtls);
        assert!(resolved.client_certificate.is_some());

        // Certificate source ignored unless the environment opts in.
        let resolved = resolve_endpoint(&SERVICE, &options, &env(&[])).unwrap();
        assert_eq!(resolved.host, "things.googleapis.com");
        assert!(resolved.client_certificate.is_none());
    }

    #[test]
    fn test_universe_domain_precedence() {
        let from_env = env(&[(UNIVERSE_DOMAIN_ENV, "example.com")]);
        let resolved = resolve_endpoint(&SERVICE, &ClientOptions::default(), &from_env).unwrap();
        assert_eq!(resolved.host, "things.example.com");

        let options = ClientOptions::default().with_universe_domain("other.com");
        let resolved = resolve_endpoint(&SERVICE, &options, &from_env).unwrap();
        assert_eq!(resolved.universe_domain, "other.com");

        let options = ClientOptions::default().with_universe_domain("");
        assert!(matches!(
            resolve_endpoint(&SERVICE, &options, &env(&[])),
            Err(ConfigError::EmptyUniverseDomain)
        ));
    }

    #[test]
    fn test_mtls_rejected_outside_default_universe() {
        let options = ClientOptions::default().with_universe_domain("example.com");
        let err = resolve_endpoint(
            &SERVICE,
            &options,
            &env(&[(USE_MTLS_ENDPOINT_ENV, "always")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MtlsUniverseUnsupported { .. }));
    }

    #[test]
    fn test_credential_sources_are_exclusive() {
        let options = ClientOptions::default()
            .with_credentials(Arc::new(AnonymousCredentials::new()))
            .with_api_key("k");
        assert!(matches!(
            options.validate_credential_sources(),
            Err(ConfigError::MutuallyExclusiveCredentials)
        ));
        assert!(ClientOptions::default()
            .with_api_key("k")
            .validate_credential_sources()
            .is_ok());
    }

    #[test]
    fn test_options_deserialize() {
        let options: ClientOptions = serde_json::from_value(serde_json::json!({
            "api_endpoint": "localhost:9000",
            "quota_project_id": "billing",
            "client_info": {"user_agent": "my-app/1.0"}
        }))
        .unwrap();
        assert_eq!(options.api_endpoint.as_deref(), Some("localhost:9000"));
        assert_eq!(
            options.client_info.user_agent_header(),
            format!("my-app/1.0 gax/{GAX_VERSION}")
        );
    }

    #[test]
    fn test_port_helpers() {
        assert_eq!(with_default_port("things.googleapis.com", 443), "things.googleapis.com:443");
        assert_eq!(with_default_port("localhost:8080", 443), "localhost:8080");
        assert_eq!(with_default_port("http://localhost:8080/", 443), "localhost:8080");

        let context = ClientOptions::default().auth_context(&SERVICE, "things.googleapis.com:443");
        assert_eq!(context.audience.as_deref(), Some("https://things.googleapis.com/"));
        assert_eq!(context.scopes.len(), 1);
    }
}
