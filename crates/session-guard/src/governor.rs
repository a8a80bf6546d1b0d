//! Response governor: the retry-once recovery loop.
//!
//! Each call runs through a per-call state machine:
//! - Dispatched -> ResponseOk -> Completed
//! - Dispatched -> AuthRejection -> Unauthorized -> Recover -> RefreshAttempt
//!   -> RecoverySucceeded -> Dispatched (replay)
//! - Dispatched -> CsrfRejection -> CsrfRejected -> Recover -> RefreshAttempt
//!   -> RecoveryFailed -> Terminated
//! - a second rejection on the replay gives up with the replay's error.

use crate::call_fsm::{CallMachine, CallMachineInput, CallState};
use crate::descriptor::{Method, RequestDescriptor};
use crate::interceptor::RequestInterceptor;
use crate::outcome::{into_result, SessionOutcome};
use crate::recovery::{RecoveryCoordinator, RecoveryKind};
use crate::response::{summarize_body, Response};
use crate::state::SessionState;
use crate::termination::{SessionTerminator, TerminationReason};
use crate::transport::Transport;
use crate::{ClientError, ClientResult};
use carebridge_config::ClientConfig;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives one call to settlement, recovering the session at most once.
pub struct ResponseGovernor {
    transport: Arc<dyn Transport>,
    interceptor: RequestInterceptor,
    coordinator: RecoveryCoordinator,
    terminator: SessionTerminator,
    state: Arc<SessionState>,
    refresh_path: String,
    identity_path: String,
}

impl ResponseGovernor {
    pub fn new(
        transport: Arc<dyn Transport>,
        interceptor: RequestInterceptor,
        terminator: SessionTerminator,
        state: Arc<SessionState>,
        config: &ClientConfig,
    ) -> Self {
        let coordinator = RecoveryCoordinator::new(
            transport.clone(),
            config.refresh_policy,
            config.refresh_timeout(),
        );

        Self {
            transport,
            interceptor,
            coordinator,
            terminator,
            state,
            refresh_path: config.refresh_path.clone(),
            identity_path: config.identity_path.clone(),
        }
    }

    pub fn terminator(&self) -> &SessionTerminator {
        &self.terminator
    }

    /// Apply the default bearer token (when the caller set no
    /// `Authorization`) and run the interceptor.
    pub fn prepare(&self, mut request: RequestDescriptor) -> RequestDescriptor {
        if !request.headers().contains_key(AUTHORIZATION) {
            if let Some(token) = self.state.bearer_token() {
                match HeaderValue::from_str(&format!("Bearer {}", token)) {
                    Ok(value) => {
                        request.headers.insert(AUTHORIZATION, value);
                    }
                    Err(_) => warn!("Bearer token is not a valid header value, sending without it"),
                }
            }
        }
        self.interceptor.prepare(request)
    }

    /// Send one prepared descriptor and classify the response.
    async fn dispatch(&self, request: &RequestDescriptor) -> ClientResult<Response> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| ClientError::Transport {
                method: request.method(),
                path: request.path().to_string(),
                source,
            })?;

        let result = into_result(request, response);
        if let Err(error) = &result {
            if let Some(failure) = error.http_failure() {
                debug!(
                    method = %failure.method,
                    path = %failure.path,
                    status = %failure.status,
                    body = %summarize_body(&failure.body),
                    "Request failed"
                );
            }
        }
        result
    }

    /// Execute a call: dispatch, and on a 401 or CSRF rejection recover the
    /// session once and replay. A failed recovery terminates the session and
    /// returns the error that triggered it.
    pub async fn execute(&self, request: RequestDescriptor) -> ClientResult<Response> {
        let mut machine = CallMachine::new();
        let mut request = self.prepare(request);

        loop {
            let error = match self.dispatch(&request).await {
                Ok(response) => {
                    transition(&mut machine, &CallMachineInput::ResponseOk)?;
                    return Ok(response);
                }
                Err(error) => error,
            };

            let kind = match SessionOutcome::of_error(&error) {
                SessionOutcome::Unauthorized => {
                    transition(&mut machine, &CallMachineInput::AuthRejection)?;
                    RecoveryKind::SessionRefresh
                }
                SessionOutcome::CsrfRejected => {
                    transition(&mut machine, &CallMachineInput::CsrfRejection)?;
                    RecoveryKind::CsrfCheck
                }
                _ => {
                    transition(&mut machine, &CallMachineInput::Failure)?;
                    return Err(error);
                }
            };

            if request.already_retried() {
                debug!(
                    method = %request.method(),
                    path = %request.path(),
                    "Replay rejected again, giving up"
                );
                transition(&mut machine, &CallMachineInput::GiveUp)?;
                return Err(error);
            }

            request.mark_retried();
            transition(&mut machine, &CallMachineInput::Recover)?;
            info!(
                kind = %kind,
                method = %request.method(),
                path = %request.path(),
                "Recovering session"
            );

            match self.coordinator.recover(kind, self.recovery_request(kind)).await {
                Ok(()) => {
                    transition(&mut machine, &CallMachineInput::RecoverySucceeded)?;
                    request = self.prepare(request);
                }
                Err(recovery) => {
                    transition(&mut machine, &CallMachineInput::RecoveryFailed)?;
                    warn!(error = %recovery, "Session recovery failed");
                    self.terminator.terminate(TerminationReason::SessionExpired);
                    return Err(error);
                }
            }
        }
    }

    /// Descriptor for the recovery round trip of `kind`.
    ///
    /// The refresh call rides on the session cookie alone. The identity
    /// check is prepared like any other call.
    fn recovery_request(&self, kind: RecoveryKind) -> RequestDescriptor {
        match kind {
            RecoveryKind::SessionRefresh => self
                .interceptor
                .prepare(RequestDescriptor::new(Method::Post, self.refresh_path.clone())),
            RecoveryKind::CsrfCheck => {
                self.prepare(RequestDescriptor::new(Method::Get, self.identity_path.clone()))
            }
        }
    }
}

fn transition(machine: &mut CallMachine, input: &CallMachineInput) -> ClientResult<CallState> {
    let old_state = CallState::from(machine.state());

    machine.consume(input).map_err(|_| {
        ClientError::InvalidStateTransition(format!(
            "Cannot apply {:?} in state {:?}",
            input,
            machine.state()
        ))
    })?;

    let new_state = CallState::from(machine.state());
    if old_state != new_state {
        debug!(old_state = ?old_state, new_state = ?new_state, "Call state transition");
    }
    Ok(new_state)
}
