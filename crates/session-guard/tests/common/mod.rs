//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use carebridge_config::{ClientConfig, RefreshPolicy};
use parking_lot::Mutex;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use session_guard::{
    BridgeError, HostBridge, HostMessage, MemoryIdentityCache, Method, Navigator,
    RequestDescriptor, Response, SessionGuardedClient, Transport, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const BASE_URL: &str = "https://care.example.com/api";

/// One scripted answer.
#[derive(Clone)]
pub struct Reply {
    status: u16,
    body: String,
    delay: Duration,
    set_cookie: Option<String>,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
            set_cookie: None,
        }
    }

    pub fn ok() -> Self {
        Self::status(200).body("{}")
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Store this `Set-Cookie` value in the jar when the reply is sent.
    pub fn set_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.set_cookie = Some(cookie.into());
        self
    }
}

/// What the transport saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Transport answering from per-endpoint reply queues.
///
/// The last reply for an endpoint repeats forever. Unscripted endpoints
/// answer 404.
pub struct ScriptedTransport {
    jar: Arc<Jar>,
    url: Url,
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    events: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(jar: Arc<Jar>) -> Arc<Self> {
        Arc::new(Self {
            jar,
            url: Url::parse(&format!("{}/", BASE_URL)).unwrap(),
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, method: Method, path: &str, replies: Vec<Reply>) {
        self.replies
            .lock()
            .insert((method, path.to_string()), replies.into());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// `start <path>` and `settled <path>` in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.path.clone()).collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn next_reply(&self, method: Method, path: &str) -> Reply {
        let mut replies = self.replies.lock();
        match replies.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Reply::status(404),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, TransportError> {
        self.calls.lock().push(RecordedCall {
            method: request.method(),
            path: request.path().to_string(),
            headers: request.headers().clone(),
        });
        self.events.lock().push(format!("start {}", request.path()));

        let reply = self.next_reply(request.method(), request.path());
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        if let Some(cookie) = &reply.set_cookie {
            self.jar.add_cookie_str(cookie, &self.url);
        }
        self.events.lock().push(format!("settled {}", request.path()));

        Ok(Response::new(
            StatusCode::from_u16(reply.status).unwrap(),
            HeaderMap::new(),
            reply.body.into_bytes(),
        ))
    }
}

/// Host bridge that records every message.
#[derive(Default)]
pub struct RecordingBridge {
    messages: Mutex<Vec<HostMessage>>,
}

impl RecordingBridge {
    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages.lock().clone()
    }
}

impl HostBridge for RecordingBridge {
    fn post_message(&self, message: &HostMessage) -> Result<(), BridgeError> {
        self.messages.lock().push(*message);
        Ok(())
    }
}

/// Navigator that records every location.
#[derive(Default)]
pub struct RecordingNavigator {
    locations: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn locations(&self) -> Vec<String> {
        self.locations.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: &str) {
        self.locations.lock().push(location.to_string());
    }
}

/// A client wired to scripted doubles.
pub struct Harness {
    pub client: SessionGuardedClient,
    pub transport: Arc<ScriptedTransport>,
    pub jar: Arc<Jar>,
    pub identity: Arc<MemoryIdentityCache>,
    pub bridge: Arc<RecordingBridge>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(RefreshPolicy::PerRequest)
    }

    pub fn with_policy(policy: RefreshPolicy) -> Self {
        let mut config = ClientConfig::with_base_url(BASE_URL);
        config.refresh_policy = policy;

        let jar = Arc::new(Jar::default());
        let transport = ScriptedTransport::new(jar.clone());
        let identity = Arc::new(MemoryIdentityCache::new());
        let bridge = Arc::new(RecordingBridge::default());
        let navigator = Arc::new(RecordingNavigator::default());

        let client = SessionGuardedClient::builder(config)
            .transport(transport.clone())
            .cookie_jar(jar.clone())
            .identity_cache(identity.clone())
            .host_bridge(bridge.clone())
            .navigator(navigator.clone())
            .build()
            .unwrap();

        Self {
            client,
            transport,
            jar,
            identity,
            bridge,
            navigator,
        }
    }

    /// Set a cookie as if the server had issued it.
    pub fn set_cookie(&self, cookie: &str) {
        let url = Url::parse(&format!("{}/", BASE_URL)).unwrap();
        self.jar.add_cookie_str(cookie, &url);
    }
}
