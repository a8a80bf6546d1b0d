//! Session-guarded HTTP client facade.

use crate::bridge::HostBridge;
use crate::cookie::CookieAccessor;
use crate::descriptor::{Body, Method, RequestDescriptor};
use crate::governor::ResponseGovernor;
use crate::identity::{IdentityCache, IdentityRecord, MemoryIdentityCache};
use crate::interceptor::RequestInterceptor;
use crate::navigator::{Navigator, SharedLocation};
use crate::response::Response;
use crate::state::SessionState;
use crate::termination::{SessionTerminator, TerminationReason};
use crate::transport::{ReqwestTransport, Transport};
use crate::{ClientError, ClientResult};
use carebridge_config::ClientConfig;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-call options for the facade methods.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Body,
    bearer: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(self, value: Value) -> Self {
        self.body(Body::Json(value))
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Authenticate this call with a bearer token. Bearer calls never
    /// carry the CSRF header.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    fn into_descriptor(self, method: Method, path: &str) -> ClientResult<RequestDescriptor> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::InvalidRequest(format!("Invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::InvalidRequest(format!("Invalid value for header {}: {}", name, e)))?;
            headers.append(name, value);
        }
        if let Some(token) = &self.bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::InvalidRequest(format!("Invalid bearer token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(RequestDescriptor::new(method, path)
            .with_headers(headers)
            .with_query(self.query)
            .with_body(self.body))
    }
}

/// Builder for [`SessionGuardedClient`].
pub struct SessionGuardedClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    cookie_jar: Option<Arc<Jar>>,
    identity: Option<Arc<dyn IdentityCache>>,
    bridge: Option<Arc<dyn HostBridge>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl SessionGuardedClientBuilder {
    fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            cookie_jar: None,
            identity: None,
            bridge: None,
            navigator: None,
        }
    }

    /// Use a custom transport instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Cookie jar the CSRF token is read from. With the default transport
    /// the same jar receives `Set-Cookie` updates.
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn identity_cache(mut self, identity: Arc<dyn IdentityCache>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Attach the host bridge notified when the session ends.
    pub fn host_bridge(mut self, bridge: Arc<dyn HostBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> ClientResult<SessionGuardedClient> {
        let base_url = self.config.base_url()?;
        let jar = self.cookie_jar.unwrap_or_default();

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_jar(&self.config, jar.clone())?),
        };

        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(MemoryIdentityCache::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(SharedLocation::new()));

        let interceptor = RequestInterceptor::new(CookieAccessor::new(jar, base_url), &self.config)?;
        let terminator = SessionTerminator::new(
            identity.clone(),
            self.bridge,
            navigator,
            self.config.login_path.clone(),
        );
        let state = Arc::new(SessionState::new());
        let governor = ResponseGovernor::new(
            transport.clone(),
            interceptor,
            terminator,
            state.clone(),
            &self.config,
        );

        info!(
            base_url = %self.config.base_url,
            refresh_policy = %self.config.refresh_policy,
            "Session-guarded client ready"
        );

        Ok(SessionGuardedClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
                governor,
                identity,
                state,
            }),
        })
    }
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    governor: ResponseGovernor,
    identity: Arc<dyn IdentityCache>,
    state: Arc<SessionState>,
}

/// HTTP client that keeps the session alive across 401s and CSRF
/// rotations, and tears it down when it cannot.
///
/// Cheap to clone; clones share cookies, identity and session state.
#[derive(Clone)]
pub struct SessionGuardedClient {
    inner: Arc<ClientInner>,
}

impl SessionGuardedClient {
    /// Client with the reqwest transport and in-memory identity cache.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> SessionGuardedClientBuilder {
        SessionGuardedClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &SessionState {
        &self.inner.state
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> ClientResult<Response> {
        self.request(Method::Get, path, options).await
    }

    pub async fn post(&self, path: &str, options: RequestOptions) -> ClientResult<Response> {
        self.request(Method::Post, path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> ClientResult<Response> {
        self.request(Method::Put, path, options).await
    }

    pub async fn patch(&self, path: &str, options: RequestOptions) -> ClientResult<Response> {
        self.request(Method::Patch, path, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> ClientResult<Response> {
        self.request(Method::Delete, path, options).await
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<Response> {
        let request = options.into_descriptor(method, path)?;
        self.send(request).await
    }

    /// Run a prebuilt descriptor through the session pipeline.
    pub async fn send(&self, request: RequestDescriptor) -> ClientResult<Response> {
        self.inner.governor.execute(request).await
    }

    /// Ask the backend who is logged in and cache the answer.
    pub async fn me(&self) -> ClientResult<IdentityRecord> {
        let path = self.inner.config.identity_path.clone();
        let response = self.send(RequestDescriptor::new(Method::Get, path)).await?;

        let payload = response.data()?;
        let record = IdentityRecord::from_profile(&payload).ok_or_else(|| {
            ClientError::UnexpectedPayload("identity response has no user id".to_string())
        })?;

        self.inner.identity.store(&record)?;
        info!(user_id = %record.user_id, "Identity cached");
        Ok(record)
    }

    /// Cached identity, without a network call.
    pub fn identity(&self) -> ClientResult<Option<IdentityRecord>> {
        Ok(self.inner.identity.load()?)
    }

    /// Tell the backend to end the session, then terminate locally.
    ///
    /// The server call is best-effort and never recovered; local teardown
    /// always runs.
    pub async fn logout(&self) {
        let path = self.inner.config.logout_path.clone();
        let request = self
            .inner
            .governor
            .prepare(RequestDescriptor::new(Method::Post, path));

        match self.inner.transport.send(&request).await {
            Ok(response) if response.status().is_success() => info!("Server session ended"),
            Ok(response) => warn!(status = %response.status(), "Logout rejected by server"),
            Err(e) => warn!(error = %e, "Logout request failed"),
        }

        self.inner.state.clear_bearer_token();
        self.inner
            .governor
            .terminator()
            .terminate(TerminationReason::Logout);
    }
}
