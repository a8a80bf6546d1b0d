//! Navigation sink for the post-termination redirect.

use tokio::sync::watch;
use tracing::info;

/// Where the UI goes next. Fire-and-forget.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

/// Navigator that records the current location in a watch channel.
#[derive(Clone)]
pub struct SharedLocation {
    sender: watch::Sender<Option<String>>,
}

impl Default for SharedLocation {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedLocation {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Last location navigated to, if any.
    pub fn current(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.sender.subscribe()
    }
}

impl Navigator for SharedLocation {
    fn navigate(&self, location: &str) {
        info!(location = %location, "Navigating");
        self.sender.send_replace(Some(location.to_string()));
    }
}
