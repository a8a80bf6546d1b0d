//! Session-aware HTTP client for the Carebridge backend.
//!
//! This crate provides:
//! - CSRF token attachment from the session cookie on mutating requests
//! - Silent session refresh after a 401 and CSRF re-acquisition after a 403
//! - At most one replay per call, tracked by an explicit per-call FSM
//! - Session termination: cached identity cleared, host notified, login redirect
//! - A get/post/put/patch/delete facade over a pluggable transport

mod bridge;
mod call_fsm;
mod client;
mod cookie;
mod descriptor;
mod error;
mod governor;
mod identity;
mod interceptor;
mod navigator;
mod outcome;
mod recovery;
mod response;
mod state;
mod termination;
mod transport;

pub use bridge::{BridgeError, ChannelHostBridge, HostBridge, HostMessage};
pub use call_fsm::call_machine;
pub use call_fsm::{CallMachine, CallMachineInput, CallMachineState, CallState};
pub use client::{RequestOptions, SessionGuardedClient, SessionGuardedClientBuilder};
pub use cookie::{find_cookie, CookieAccessor};
pub use descriptor::{AuthenticationMode, Body, Method, MultipartPart, RequestDescriptor};
pub use error::{ClientError, ClientResult, HttpFailure, RecoveryError};
pub use governor::ResponseGovernor;
pub use identity::{
    FileIdentityCache, IdentityCache, IdentityError, IdentityRecord, IdentityResult,
    MemoryIdentityCache,
};
pub use interceptor::RequestInterceptor;
pub use navigator::{Navigator, SharedLocation};
pub use outcome::{is_csrf_rejection, SessionOutcome};
pub use recovery::{RecoveryCoordinator, RecoveryKind};
pub use response::Response;
pub use state::SessionState;
pub use termination::{SessionTerminator, TerminationReason};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportErrorKind};
