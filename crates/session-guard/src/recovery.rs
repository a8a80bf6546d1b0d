//! Session recovery: refresh and CSRF re-acquisition round trips.
//!
//! A recovery is one call to the refresh endpoint (after a 401) or the
//! identity check (after a CSRF rejection). It succeeds on any 2xx and
//! fails on anything else, including a timeout.
//!
//! With [`RefreshPolicy::PerRequest`] every failing call runs its own
//! recovery. With [`RefreshPolicy::Coalesced`] concurrent failures of the
//! same kind await one shared in-flight recovery.

use crate::descriptor::RequestDescriptor;
use crate::error::RecoveryError;
use crate::transport::Transport;
use carebridge_config::RefreshPolicy;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which round trip re-establishes the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryKind {
    /// `POST /auth/refresh` after a 401.
    SessionRefresh,
    /// `GET /auth/me` after a CSRF rejection, so the server re-issues the cookie.
    CsrfCheck,
}

impl fmt::Display for RecoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryKind::SessionRefresh => f.write_str("session refresh"),
            RecoveryKind::CsrfCheck => f.write_str("CSRF check"),
        }
    }
}

type RecoveryResult = Result<(), RecoveryError>;
type SharedRecovery = Shared<BoxFuture<'static, RecoveryResult>>;

struct InFlight {
    generation: u64,
    future: SharedRecovery,
}

/// Runs recoveries under the configured policy.
pub struct RecoveryCoordinator {
    transport: Arc<dyn Transport>,
    policy: RefreshPolicy,
    timeout: Duration,
    in_flight: Mutex<HashMap<RecoveryKind, InFlight>>,
    next_generation: AtomicU64,
}

impl RecoveryCoordinator {
    pub fn new(transport: Arc<dyn Transport>, policy: RefreshPolicy, timeout: Duration) -> Self {
        Self {
            transport,
            policy,
            timeout,
            in_flight: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Whether a coalesced recovery of this kind is currently running.
    pub fn is_in_flight(&self, kind: RecoveryKind) -> bool {
        self.in_flight.lock().contains_key(&kind)
    }

    /// Run (or join) a recovery. `request` must already be prepared for
    /// dispatch; it is dropped unused when joining an in-flight recovery.
    pub async fn recover(&self, kind: RecoveryKind, request: RequestDescriptor) -> RecoveryResult {
        match self.policy {
            RefreshPolicy::PerRequest => {
                attempt(self.transport.clone(), kind, request, self.timeout).await
            }
            RefreshPolicy::Coalesced => self.recover_coalesced(kind, request).await,
        }
    }

    async fn recover_coalesced(&self, kind: RecoveryKind, request: RequestDescriptor) -> RecoveryResult {
        let (generation, future) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&kind) {
                Some(existing) => {
                    debug!(kind = %kind, "Joining in-flight recovery");
                    (existing.generation, existing.future.clone())
                }
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let future = attempt(self.transport.clone(), kind, request, self.timeout)
                        .boxed()
                        .shared();
                    in_flight.insert(
                        kind,
                        InFlight {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(&kind)
            .is_some_and(|entry| entry.generation == generation)
        {
            in_flight.remove(&kind);
        }

        result
    }
}

async fn attempt(
    transport: Arc<dyn Transport>,
    kind: RecoveryKind,
    request: RequestDescriptor,
    timeout: Duration,
) -> RecoveryResult {
    debug!(kind = %kind, method = %request.method(), path = %request.path(), "Starting recovery");

    match tokio::time::timeout(timeout, transport.send(&request)).await {
        Err(_) => {
            warn!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "Recovery timed out");
            Err(RecoveryError::TimedOut {
                kind,
                after: timeout,
            })
        }
        Ok(Err(source)) => {
            warn!(kind = %kind, error = %source, "Recovery transport failure");
            Err(RecoveryError::Transport { kind, source })
        }
        Ok(Ok(response)) if response.status().is_success() => {
            info!(kind = %kind, "Session recovered");
            Ok(())
        }
        Ok(Ok(response)) => {
            warn!(kind = %kind, status = %response.status(), "Recovery rejected");
            Err(RecoveryError::Rejected {
                kind,
                status: response.status(),
            })
        }
    }
}
