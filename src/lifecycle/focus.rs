//! Application focus tracking
//!
//! The host is the only writer: it calls [`FocusState::set`] from its
//! focus-change callback. Sensors only read, through a [`FocusGate`].
//! The rig runs on one cooperative thread, so nothing here is locked beyond
//! what the watch channel does internally. If the rig is ever moved onto a
//! multi-threaded scheduler the single-writer rule still has to hold.

use std::time::Duration;
use tokio::sync::watch;

/// Process-wide foreground flag, owned by the host
pub struct FocusState {
    tx: watch::Sender<bool>,
}

impl FocusState {
    pub fn new(has_focus: bool) -> Self {
        let (tx, _rx) = watch::channel(has_focus);
        FocusState { tx }
    }

    /// Host focus-change notification
    pub fn set(&self, has_focus: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != has_focus;
            *current = has_focus;
            changed
        });
    }

    pub fn has_focus(&self) -> bool {
        *self.tx.borrow()
    }

    /// A read-only gate that settles for `settle_delay` before waiting on focus
    pub fn gate(&self, settle_delay: Duration) -> FocusGate {
        FocusGate {
            rx: self.tx.subscribe(),
            settle_delay,
        }
    }
}

impl Default for FocusState {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Suspension point that resumes once the application has focus
#[derive(Clone)]
pub struct FocusGate {
    rx: watch::Receiver<bool>,
    settle_delay: Duration,
}

impl FocusGate {
    pub fn has_focus(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Sleep the settle delay, then wait until focus is held.
    ///
    /// Returning from an OS dialog does not hand focus back immediately,
    /// hence the fixed delay before the flag is trusted. Never resolves
    /// while focus is false.
    pub async fn wait(&self) {
        tokio::time::sleep(self.settle_delay).await;

        let mut rx = self.rx.clone();
        if rx.wait_for(|has_focus| *has_focus).await.is_err() {
            // host is gone, focus can no longer arrive
            std::future::pending::<()>().await;
        }
    }
}
