//! Lifecycle management for sensors

pub mod focus;
pub mod lifetime;

pub use self::focus::{FocusGate, FocusState};
pub use self::lifetime::{Interrupted, Lifetime, Ticket};

use crate::error::SensorError;
use crate::status::StatusSink;
use async_trait::async_trait;
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::watch;

/// State of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorState {
    #[default]
    Idle,
    AwaitingPermission,
    /// Waiting on focus, and on the platform reporting the service as up
    AwaitingFocus,
    Running,
    Stopped,
}

impl SensorState {
    /// True while an activation is suspended
    pub fn is_activating(self) -> bool {
        matches!(
            self,
            SensorState::AwaitingPermission | SensorState::AwaitingFocus
        )
    }
}

/// How an activation ended
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    Running,
    /// Completed without starting the sensor
    Degraded(SensorError),
    /// Abandoned because the sensor was destroyed or stopped while suspended
    Cancelled,
}

impl ActivationOutcome {
    pub fn is_running(&self) -> bool {
        matches!(self, ActivationOutcome::Running)
    }
}

/// Trait every sensor implements
#[async_trait(?Send)]
pub trait SensorLifecycle {
    fn name(&self) -> &str;

    fn state(&self) -> SensorState;

    /// Bring the sensor up. Suspends across permission prompts and focus loss.
    async fn activate(&self) -> ActivationOutcome;

    /// Release the platform resource. Safe to call in any state.
    fn stop(&self);

    /// Cancel any in-flight activation of this sensor and refuse new ones
    fn destroy(&self);
}

/// Shared state and suspension helpers composed into every sensor
pub struct SensorBase {
    pub name: String,
    state: Cell<SensorState>,
    lifetime: Lifetime,
    focus: FocusGate,
    poll_interval: Duration,
    sink: Rc<dyn StatusSink>,
    /// Outcome of the latest activation, `None` while it is in flight
    settled: watch::Sender<Option<ActivationOutcome>>,
}

impl SensorBase {
    /// Create a new sensor base
    pub fn new(
        name: &str,
        focus: FocusGate,
        poll_interval: Duration,
        sink: Rc<dyn StatusSink>,
    ) -> Self {
        SensorBase {
            name: name.to_string(),
            state: Cell::new(SensorState::Idle),
            lifetime: Lifetime::new(),
            focus,
            poll_interval,
            sink,
            settled: watch::channel(None).0,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> SensorState {
        self.state.get()
    }

    /// Set the state
    pub fn set_state(&self, state: SensorState) {
        let previous = self.state.replace(state);
        if previous != state {
            tracing::debug!(sensor = %self.name, ?previous, ?state, "state transition");
        }
    }

    /// Post a milestone to the status sink
    pub fn post(&self, line: &str) {
        self.sink.post(line);
    }

    /// Check re-entry and hand out the ticket for a new activation.
    ///
    /// While another activation is suspended this waits for it and returns
    /// its outcome, so the device is never started twice.
    pub async fn begin_activation(&self) -> Result<Ticket, ActivationOutcome> {
        if self.lifetime.is_destroyed() {
            return Err(ActivationOutcome::Cancelled);
        }

        match self.get_state() {
            SensorState::Running => {
                tracing::debug!(sensor = %self.name, "already running, activation skipped");
                Err(ActivationOutcome::Running)
            }
            state if state.is_activating() => {
                tracing::debug!(sensor = %self.name, ?state, "joining activation in progress");
                Err(self.join_in_flight().await)
            }
            _ => {
                self.settled.send_replace(None);
                Ok(self.lifetime.ticket())
            }
        }
    }

    async fn join_in_flight(&self) -> ActivationOutcome {
        let mut rx = self.settled.subscribe();
        let outcome = match rx.wait_for(|settled| settled.is_some()).await {
            Ok(settled) => (*settled).clone(),
            // the sender lives as long as self
            Err(_) => None,
        };
        outcome.unwrap_or(ActivationOutcome::Cancelled)
    }

    fn settle(&self, outcome: ActivationOutcome) -> ActivationOutcome {
        self.settled.send_replace(Some(outcome.clone()));
        outcome
    }

    /// Run `fut` unless the sensor is destroyed or stopped first
    pub async fn suspend<F: Future>(
        &self,
        ticket: Ticket,
        fut: F,
    ) -> Result<F::Output, Interrupted> {
        self.lifetime.guard(ticket, fut).await
    }

    /// Settle, then wait for application focus
    pub async fn wait_for_focus(&self, ticket: Ticket) -> Result<(), Interrupted> {
        self.suspend(ticket, self.focus.wait()).await
    }

    /// Poll `predicate` every `poll_interval` until it holds
    pub async fn wait_until<P>(&self, ticket: Ticket, predicate: P) -> Result<(), Interrupted>
    where
        P: Fn() -> bool,
    {
        let poll_interval = self.poll_interval;
        self.suspend(ticket, async move {
            while !predicate() {
                tokio::time::sleep(poll_interval).await;
            }
        })
        .await
    }

    pub fn mark_running(&self) -> ActivationOutcome {
        self.set_state(SensorState::Running);
        self.settle(ActivationOutcome::Running)
    }

    /// Finish without starting the sensor
    pub fn degrade(&self, reason: SensorError) -> ActivationOutcome {
        tracing::info!(sensor = %self.name, %reason, "activation degraded");
        self.set_state(SensorState::Idle);
        self.settle(ActivationOutcome::Degraded(reason))
    }

    /// Finish an activation whose suspension was interrupted
    pub fn interrupted(&self, reason: Interrupted) -> ActivationOutcome {
        tracing::debug!(sensor = %self.name, ?reason, "activation cancelled");
        if reason == Interrupted::Destroyed {
            if self.get_state().is_activating() {
                self.set_state(SensorState::Idle);
            }
            return self.settle(ActivationOutcome::Cancelled);
        }
        // a stop (or a newer activation) already owns the state
        ActivationOutcome::Cancelled
    }

    /// Invalidate pending suspensions and mark the sensor stopped
    pub fn mark_stopped(&self) {
        self.lifetime.invalidate();
        if self.get_state().is_activating() {
            self.settle(ActivationOutcome::Cancelled);
        }
        self.set_state(SensorState::Stopped);
    }

    pub fn destroy(&self) {
        tracing::debug!(sensor = %self.name, "destroyed");
        self.lifetime.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifetime.is_destroyed()
    }
}
