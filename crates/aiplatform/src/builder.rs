//! [`ClientBuilder`]: options, environment and transport registry in, service
//! clients out.
//!
//! Construction resolves everything that can fail up front: credential
//! sources, environment variables, the endpoint, the transport name and the
//! transport itself. A client that builds is ready to issue calls.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gax::blocking::BlockingRuntime;
use gax::credentials::{
    ApiKeyCredentials, AuthContext, Credentials, CredentialsLoader, DefaultCredentialsLoader,
};
use gax::descriptor::ServiceDescriptor;
use gax::errors::ConfigError;
use gax::executor::{Executor, ExecutorConfig};
use gax::interceptor::{Interceptor, InterceptorChain};
use gax::lro::PollPolicy;
use gax::options::{
    resolve_endpoint, ClientOptions, Environment, ProcessEnvironment, ResolvedEndpoint,
};
use gax::transport::{Regime, TransportConfig, TransportRegistry};
use tracing::info;

use crate::blocking::{BlockingDatasetServiceClient, BlockingPipelineServiceClient};
use crate::client::ClientCore;
use crate::dataset_service::DatasetServiceClient;
use crate::descriptors::{DATASET_SERVICE, PIPELINE_SERVICE};
use crate::pipeline_service::PipelineServiceClient;

/// Transport used by async clients when none is named.
pub const DEFAULT_ASYNC_TRANSPORT: &str = "grpc_asyncio";
/// Transport used by blocking clients when none is named.
pub const DEFAULT_BLOCKING_TRANSPORT: &str = "grpc";

/// Registry with every built-in transport: `grpc`, `grpc_asyncio`, `rest`.
pub fn default_registry() -> TransportRegistry {
    let mut registry = TransportRegistry::new();
    grpc::register(&mut registry);
    rest::register(&mut registry);
    registry
}

/// Builds dataset and pipeline clients.
#[derive(Clone)]
pub struct ClientBuilder {
    options: ClientOptions,
    transport: Option<String>,
    registry: Option<TransportRegistry>,
    loader: Arc<dyn CredentialsLoader>,
    environment: Arc<dyn Environment>,
    interceptors: InterceptorChain,
    poll_policy: PollPolicy,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("transport", &self.transport)
            .field("registry", &self.registry)
            .field("interceptors", &self.interceptors)
            .field("poll_policy", &self.poll_policy)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            transport: None,
            registry: None,
            loader: Arc::new(DefaultCredentialsLoader),
            environment: Arc::new(ProcessEnvironment),
            interceptors: InterceptorChain::new(),
            poll_policy: PollPolicy::default(),
        }
    }

    /// Selects a transport by registry name.
    #[must_use]
    pub fn with_transport(mut self, name: impl Into<String>) -> Self {
        self.transport = Some(name.into());
        self
    }

    /// Replaces the [`default_registry`].
    #[must_use]
    pub fn with_registry(mut self, registry: TransportRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_credentials_loader(mut self, loader: Arc<dyn CredentialsLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Reads environment variables from `environment` instead of the process.
    #[must_use]
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    /// Runs `interceptor` around every call.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Runs `interceptor` around calls to `method` only.
    #[must_use]
    pub fn with_method_interceptor(
        mut self,
        method: impl Into<String>,
        interceptor: Arc<dyn Interceptor>,
    ) -> Self {
        self.interceptors.push_for(method, interceptor);
        self
    }

    /// Polling schedule of the operation handles the clients return.
    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    // -----------------------------------------------------------------------
    // Async clients
    // -----------------------------------------------------------------------

    /// Builds an async dataset client. Must run inside a tokio runtime.
    pub fn build_dataset_service(&self) -> Result<DatasetServiceClient, ConfigError> {
        let core = self.core(&DATASET_SERVICE, Regime::Cooperative)?;
        Ok(DatasetServiceClient::from_core(core))
    }

    /// Builds an async pipeline client. Must run inside a tokio runtime.
    pub fn build_pipeline_service(&self) -> Result<PipelineServiceClient, ConfigError> {
        let core = self.core(&PIPELINE_SERVICE, Regime::Cooperative)?;
        Ok(PipelineServiceClient::from_core(core))
    }

    // -----------------------------------------------------------------------
    // Blocking clients
    // -----------------------------------------------------------------------

    /// Builds a blocking dataset client with its own runtime. Must not run
    /// inside an async context.
    pub fn build_blocking_dataset_service(
        &self,
    ) -> Result<BlockingDatasetServiceClient, ConfigError> {
        let runtime = BlockingRuntime::new()?;
        let core = {
            let _entered = runtime.enter();
            self.core(&DATASET_SERVICE, Regime::Blocking)?
        };
        Ok(BlockingDatasetServiceClient::new(
            DatasetServiceClient::from_core(core),
            runtime,
        ))
    }

    /// Builds a blocking pipeline client with its own runtime.
    pub fn build_blocking_pipeline_service(
        &self,
    ) -> Result<BlockingPipelineServiceClient, ConfigError> {
        let runtime = BlockingRuntime::new()?;
        let core = {
            let _entered = runtime.enter();
            self.core(&PIPELINE_SERVICE, Regime::Blocking)?
        };
        Ok(BlockingPipelineServiceClient::new(
            PipelineServiceClient::from_core(core),
            runtime,
        ))
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    fn core(
        &self,
        service: &'static ServiceDescriptor,
        regime: Regime,
    ) -> Result<ClientCore, ConfigError> {
        let options = &self.options;
        options.validate_credential_sources()?;

        let endpoint = resolve_endpoint(service, options, self.environment.as_ref())?;

        let name = self.transport.as_deref().unwrap_or(match regime {
            Regime::Cooperative => DEFAULT_ASYNC_TRANSPORT,
            Regime::Blocking => DEFAULT_BLOCKING_TRANSPORT,
        });
        let registry = self.registry.clone().unwrap_or_else(default_registry);
        let (kind, factory) = registry.resolve(name, regime)?;

        let auth = options.auth_context(service, &endpoint.host);
        let credentials = self.credentials(&endpoint, &auth)?;
        let universe_domain = endpoint.universe_domain.clone();

        info!(
            service = service.name,
            transport = name,
            host = %endpoint.host,
            universe_domain = %universe_domain,
            mtls = endpoint.mtls,
            "building client"
        );

        let transport = factory(TransportConfig {
            service,
            endpoint,
            kind,
            user_agent: options.client_info.user_agent_header(),
        })?;

        let executor = Executor::new(ExecutorConfig {
            service,
            transport,
            credentials,
            universe_domain,
            auth,
            interceptors: self.interceptors.clone(),
            client_info: options.client_info.clone(),
            quota_project_id: options.quota_project_id.clone(),
        });
        Ok(ClientCore::new(executor, self.poll_policy.clone()))
    }

    /// Explicit credentials, then a credentials file, then an API key, then
    /// the loader's defaults.
    fn credentials(
        &self,
        endpoint: &ResolvedEndpoint,
        auth: &AuthContext,
    ) -> Result<Arc<dyn Credentials>, ConfigError> {
        let options = &self.options;
        if let Some(credentials) = &options.credentials {
            return Ok(credentials.clone());
        }
        if let Some(path) = &options.credentials_file {
            return self.loader.load_file(path, auth);
        }
        if let Some(key) = &options.api_key {
            return Ok(Arc::new(
                ApiKeyCredentials::new(key.clone())
                    .with_universe_domain(endpoint.universe_domain.clone()),
            ));
        }
        self.loader.default_credentials(auth)
    }
}
