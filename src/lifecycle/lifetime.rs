//! Cancellation scoped to one sensor's lifetime

use std::future::Future;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Epoch {
    generation: u64,
    destroyed: bool,
}

/// Why a suspended activation was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The owning sensor was destroyed
    Destroyed,
    /// The sensor was stopped (or restarted) while suspended
    Superseded,
}

/// Marks which activation attempt a suspension belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Lifetime handle owned by a single sensor.
///
/// `destroy` cancels whatever the sensor is currently suspended on and every
/// later suspension. `invalidate` only abandons suspensions issued under an
/// older ticket, which is how `stop()` keeps a pending activation from
/// starting the device after the fact.
pub struct Lifetime {
    tx: watch::Sender<Epoch>,
}

impl Lifetime {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Epoch::default());
        Lifetime { tx }
    }

    /// Ticket for the current generation
    pub fn ticket(&self) -> Ticket {
        Ticket(self.tx.borrow().generation)
    }

    /// Abandon suspensions issued under earlier tickets
    pub fn invalidate(&self) {
        self.tx.send_modify(|epoch| epoch.generation += 1);
    }

    pub fn destroy(&self) {
        self.tx.send_modify(|epoch| epoch.destroyed = true);
    }

    pub fn is_destroyed(&self) -> bool {
        self.tx.borrow().destroyed
    }

    fn check(&self, ticket: Ticket) -> Result<(), Interrupted> {
        interruption(&self.tx.borrow(), ticket).map_or(Ok(()), Err)
    }

    /// Run `fut` until it completes or the ticket is interrupted
    pub async fn guard<F: Future>(&self, ticket: Ticket, fut: F) -> Result<F::Output, Interrupted> {
        self.check(ticket)?;

        let mut rx = self.tx.subscribe();
        let interrupted = async move {
            match rx.wait_for(|epoch| interruption(epoch, ticket).is_some()).await {
                Ok(epoch) => interruption(&epoch, ticket).unwrap_or(Interrupted::Destroyed),
                Err(_) => Interrupted::Destroyed,
            }
        };

        tokio::select! {
            biased;
            reason = interrupted => Err(reason),
            output = fut => Ok(output),
        }
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

fn interruption(epoch: &Epoch, ticket: Ticket) -> Option<Interrupted> {
    if epoch.destroyed {
        Some(Interrupted::Destroyed)
    } else if epoch.generation != ticket.0 {
        Some(Interrupted::Superseded)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn guard_passes_through_output() {
        let lifetime = Lifetime::new();
        let ticket = lifetime.ticket();
        assert_eq!(lifetime.guard(ticket, async { 7 }).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_cancels_pending_guard() {
        let lifetime = Lifetime::new();
        let ticket = lifetime.ticket();

        let (result, _) = tokio::join!(
            lifetime.guard(ticket, std::future::pending::<()>()),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                lifetime.destroy();
            }
        );

        assert_eq!(result, Err(Interrupted::Destroyed));
        assert!(lifetime.is_destroyed());
    }

    #[tokio::test]
    async fn stale_ticket_is_rejected() {
        let lifetime = Lifetime::new();
        let stale = lifetime.ticket();
        lifetime.invalidate();

        assert_eq!(
            lifetime.guard(stale, async {}).await,
            Err(Interrupted::Superseded)
        );
        assert_eq!(lifetime.guard(lifetime.ticket(), async { 1 }).await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn destroying_one_lifetime_leaves_others_running() {
        let first = Lifetime::new();
        let second = Lifetime::new();

        let (a, b, _) = tokio::join!(
            first.guard(first.ticket(), tokio::time::sleep(Duration::from_millis(50))),
            second.guard(second.ticket(), tokio::time::sleep(Duration::from_millis(50))),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                first.destroy();
            }
        );

        assert_eq!(a, Err(Interrupted::Destroyed));
        assert_eq!(b, Ok(()));
    }
}
