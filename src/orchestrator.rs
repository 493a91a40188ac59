//! Concurrent sensor bring-up

use crate::lifecycle::{ActivationOutcome, SensorLifecycle, SensorState};
use crate::status::StatusSink;
use futures::future::join_all;
use std::rc::Rc;
use tokio::sync::watch;

/// Per-sensor result of [`Orchestrator::start`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessReport {
    pub entries: Vec<(String, ActivationOutcome)>,
}

impl ReadinessReport {
    /// True when every sensor reached the running state
    pub fn all_running(&self) -> bool {
        self.entries.iter().all(|(_, outcome)| outcome.is_running())
    }

    pub fn outcome(&self, name: &str) -> Option<&ActivationOutcome> {
        self.entries
            .iter()
            .find(|(sensor, _)| sensor == name)
            .map(|(_, outcome)| outcome)
    }
}

/// Starts every registered sensor at once and reports when all have finished.
///
/// Holds borrowed sensors only; the host keeps ownership so it can keep
/// ticking them while activation is in flight.
pub struct Orchestrator<'a> {
    sensors: Vec<&'a dyn SensorLifecycle>,
    sink: Rc<dyn StatusSink>,
    ready: watch::Sender<bool>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(sink: Rc<dyn StatusSink>) -> Self {
        let (ready, _rx) = watch::channel(false);
        Orchestrator {
            sensors: Vec::new(),
            sink,
            ready,
        }
    }

    /// Register a sensor with the orchestrator
    pub fn register(&mut self, sensor: &'a dyn SensorLifecycle) {
        self.sensors.push(sensor);
    }

    pub fn sensor_names(&self) -> Vec<&str> {
        self.sensors.iter().map(|sensor| sensor.name()).collect()
    }

    /// Activate all sensors concurrently and wait for every one to finish.
    ///
    /// Degraded or cancelled sensors count as finished; nothing is retried.
    pub async fn start(&self) -> ReadinessReport {
        tracing::info!(sensors = ?self.sensor_names(), "starting sensors");

        let outcomes = join_all(self.sensors.iter().map(|sensor| sensor.activate())).await;
        let entries: Vec<_> = self
            .sensors
            .iter()
            .map(|sensor| sensor.name().to_string())
            .zip(outcomes)
            .collect();

        for (name, outcome) in &entries {
            tracing::info!(sensor = %name, ?outcome, "activation finished");
        }

        self.sink.post("All sensors finished");
        self.ready.send_replace(true);

        ReadinessReport { entries }
    }

    /// Resolves once [`start`](Self::start) has completed
    pub async fn ready(&self) {
        let mut rx = self.ready.subscribe();
        // the sender lives as long as self, so the channel cannot close here
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Stop every registered sensor
    pub fn stop_all(&self) {
        for sensor in &self.sensors {
            sensor.stop();
        }
    }

    pub fn states(&self) -> Vec<(String, SensorState)> {
        self.sensors
            .iter()
            .map(|sensor| (sensor.name().to_string(), sensor.state()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use crate::status::StatusBoard;
    use async_trait::async_trait;
    use std::cell::Cell;
    use std::time::Duration;

    /// Finishes after a fixed delay with a fixed outcome
    struct Scripted {
        name: &'static str,
        delay: Duration,
        outcome: ActivationOutcome,
        stopped: Cell<bool>,
    }

    impl Scripted {
        fn new(name: &'static str, delay_ms: u64, outcome: ActivationOutcome) -> Self {
            Scripted {
                name,
                delay: Duration::from_millis(delay_ms),
                outcome,
                stopped: Cell::new(false),
            }
        }
    }

    #[async_trait(?Send)]
    impl SensorLifecycle for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn state(&self) -> SensorState {
            if self.stopped.get() {
                SensorState::Stopped
            } else {
                SensorState::Idle
            }
        }

        async fn activate(&self) -> ActivationOutcome {
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }

        fn stop(&self) {
            self.stopped.set(true);
        }

        fn destroy(&self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn start_waits_for_slowest_sensor() {
        let fast = Scripted::new("fast", 10, ActivationOutcome::Running);
        let slow = Scripted::new("slow", 1_000, ActivationOutcome::Running);
        let board = Rc::new(StatusBoard::new());
        let mut orchestrator = Orchestrator::new(board.clone());
        orchestrator.register(&fast);
        orchestrator.register(&slow);

        let started = tokio::time::Instant::now();
        let report = orchestrator.start().await;

        assert!(started.elapsed() >= Duration::from_millis(1_000));
        assert!(report.all_running());
        assert!(orchestrator.is_ready());
        assert!(board.contains("All sensors finished"));
    }

    #[tokio::test(start_paused = true)]
    async fn activations_run_concurrently() {
        let a = Scripted::new("a", 500, ActivationOutcome::Running);
        let b = Scripted::new("b", 500, ActivationOutcome::Running);
        let c = Scripted::new("c", 500, ActivationOutcome::Running);
        let mut orchestrator = Orchestrator::new(Rc::new(StatusBoard::new()));
        for sensor in [&a, &b, &c] {
            orchestrator.register(sensor);
        }

        let started = tokio::time::Instant::now();
        orchestrator.start().await;
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_sensor_still_counts_as_finished() {
        let ok = Scripted::new("ok", 10, ActivationOutcome::Running);
        let denied = Scripted::new(
            "denied",
            20,
            ActivationOutcome::Degraded(SensorError::DeviceUnavailable("none".into())),
        );
        let mut orchestrator = Orchestrator::new(Rc::new(StatusBoard::new()));
        orchestrator.register(&ok);
        orchestrator.register(&denied);

        let (report, _) = tokio::join!(orchestrator.start(), orchestrator.ready());

        assert!(!report.all_running());
        assert_eq!(report.outcome("ok"), Some(&ActivationOutcome::Running));
        assert!(matches!(
            report.outcome("denied"),
            Some(ActivationOutcome::Degraded(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_is_pending_until_start_completes() {
        let slow = Scripted::new("slow", 1_000, ActivationOutcome::Running);
        let mut orchestrator = Orchestrator::new(Rc::new(StatusBoard::new()));
        orchestrator.register(&slow);

        let early = tokio::time::timeout(Duration::from_millis(500), orchestrator.ready()).await;
        assert!(early.is_err());
        assert!(!orchestrator.is_ready());
    }

    #[test]
    fn stop_all_reaches_every_sensor() {
        let a = Scripted::new("a", 0, ActivationOutcome::Running);
        let b = Scripted::new("b", 0, ActivationOutcome::Running);
        let mut orchestrator = Orchestrator::new(Rc::new(StatusBoard::new()));
        orchestrator.register(&a);
        orchestrator.register(&b);

        orchestrator.stop_all();
        assert!(orchestrator
            .states()
            .iter()
            .all(|(_, state)| *state == SensorState::Stopped));
    }
}
