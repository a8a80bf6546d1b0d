//! Session termination: clear identity, notify the host, redirect to login.

use crate::bridge::{HostBridge, HostMessage};
use crate::identity::IdentityCache;
use crate::navigator::Navigator;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Recovery after a 401 or CSRF rejection failed.
    SessionExpired,
    /// The user logged out.
    Logout,
}

impl TerminationReason {
    pub fn host_message(&self) -> HostMessage {
        match self {
            TerminationReason::SessionExpired => HostMessage::SessionExpired,
            TerminationReason::Logout => HostMessage::Logout,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::SessionExpired => f.write_str("session_expired"),
            TerminationReason::Logout => f.write_str("logout"),
        }
    }
}

/// Ends the local session. Every step is best-effort; nothing here fails.
pub struct SessionTerminator {
    identity: Arc<dyn IdentityCache>,
    bridge: Option<Arc<dyn HostBridge>>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl SessionTerminator {
    pub fn new(
        identity: Arc<dyn IdentityCache>,
        bridge: Option<Arc<dyn HostBridge>>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            bridge,
            navigator,
            login_path: login_path.into(),
        }
    }

    /// Run the termination steps in order: identity, host, redirect.
    pub fn terminate(&self, reason: TerminationReason) {
        info!(reason = %reason, "Terminating session");

        if let Err(e) = self.identity.clear() {
            warn!(error = %e, "Failed to clear cached identity");
        }

        match &self.bridge {
            Some(bridge) => {
                if let Err(e) = bridge.post_message(&reason.host_message()) {
                    warn!(error = %e, "Failed to notify host bridge");
                }
            }
            None => debug!("No host bridge attached"),
        }

        self.navigator.navigate(&self.login_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeError, ChannelHostBridge};
    use crate::identity::{IdentityError, IdentityRecord, IdentityResult, MemoryIdentityCache};
    use crate::navigator::SharedLocation;
    use chrono::Utc;

    fn cached_identity() -> Arc<MemoryIdentityCache> {
        let cache = Arc::new(MemoryIdentityCache::new());
        cache
            .store(&IdentityRecord {
                user_id: "u-1".into(),
                email: None,
                role: Some("parent".into()),
                display_name: None,
                cached_at: Utc::now(),
            })
            .unwrap();
        cache
    }

    #[test]
    fn test_terminate_runs_all_steps() {
        let identity = cached_identity();
        let (bridge, mut messages) = ChannelHostBridge::channel();
        let location = Arc::new(SharedLocation::new());

        let terminator = SessionTerminator::new(
            identity.clone(),
            Some(Arc::new(bridge)),
            location.clone(),
            "/login",
        );
        terminator.terminate(TerminationReason::SessionExpired);

        assert!(identity.load().unwrap().is_none());
        assert_eq!(messages.try_recv().unwrap(), HostMessage::SessionExpired);
        assert_eq!(location.current().as_deref(), Some("/login"));
    }

    #[test]
    fn test_logout_posts_logout_message() {
        let (bridge, mut messages) = ChannelHostBridge::channel();
        let terminator = SessionTerminator::new(
            Arc::new(MemoryIdentityCache::new()),
            Some(Arc::new(bridge)),
            Arc::new(SharedLocation::new()),
            "/login",
        );
        terminator.terminate(TerminationReason::Logout);
        assert_eq!(messages.try_recv().unwrap(), HostMessage::Logout);
    }

    #[test]
    fn test_no_bridge_still_redirects() {
        let identity = cached_identity();
        let location = Arc::new(SharedLocation::new());
        let terminator =
            SessionTerminator::new(identity.clone(), None, location.clone(), "/login");

        terminator.terminate(TerminationReason::SessionExpired);

        assert!(identity.load().unwrap().is_none());
        assert_eq!(location.current().as_deref(), Some("/login"));
    }

    struct BrokenBridge;

    impl HostBridge for BrokenBridge {
        fn post_message(&self, _message: &HostMessage) -> Result<(), BridgeError> {
            Err(BridgeError::Rejected("host gone".into()))
        }
    }

    struct BrokenCache;

    impl IdentityCache for BrokenCache {
        fn load(&self) -> IdentityResult<Option<IdentityRecord>> {
            Ok(None)
        }

        fn store(&self, _record: &IdentityRecord) -> IdentityResult<()> {
            Ok(())
        }

        fn clear(&self) -> IdentityResult<()> {
            Err(IdentityError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[test]
    fn test_step_failures_do_not_stop_redirect() {
        let location = Arc::new(SharedLocation::new());
        let terminator = SessionTerminator::new(
            Arc::new(BrokenCache),
            Some(Arc::new(BrokenBridge)),
            location.clone(),
            "/signin",
        );

        terminator.terminate(TerminationReason::SessionExpired);
        assert_eq!(location.current().as_deref(), Some("/signin"));
    }
}
