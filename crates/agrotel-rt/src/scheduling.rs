//! ---
//! agrotel_section: "01-core-functionality"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Runtime helpers supporting the telemetry simulator."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A repeating tick source owned by a single timer loop.
#[async_trait]
pub trait Ticker: Send {
    /// Resolve at the next tick. The first tick fires one full period after
    /// the ticker was created.
    async fn tick(&mut self);
}

/// Factory for tickers, injected into timer-driven components.
pub trait TickScheduler: Send + Sync + fmt::Debug {
    /// Create a fresh ticker for one timer session.
    fn ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

/// Scheduler backed by `tokio::time`, honouring paused test clocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalScheduler;

impl TickScheduler for IntervalScheduler {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        Box::new(IntervalTicker::new(period))
    }
}

/// Delay-on-miss interval. The underlying [`Interval`] is built on first use
/// so the ticker can be created outside of a runtime context.
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    start: Instant,
    interval: Option<Interval>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            start: Instant::now() + period,
            interval: None,
        }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        let (start, period) = (self.start, self.period);
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}

type TickAck = oneshot::Sender<()>;

/// Hand-driven scheduler for deterministic tests.
///
/// Each call to [`ManualScheduler::fire`] releases one tick to the most
/// recently created ticker and resolves once the owning loop has finished
/// handling it and come back for the next tick.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    current: Arc<Mutex<Option<mpsc::UnboundedSender<TickAck>>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release one tick. Returns `false` when no live ticker consumed it.
    pub async fn fire(&self) -> bool {
        let Some(sender) = self.current.lock().clone() else {
            return false;
        };
        let (ack, done) = oneshot::channel();
        if sender.send(ack).is_err() {
            return false;
        }
        done.await.is_ok()
    }

    /// Whether a ticker is currently waiting for ticks.
    pub fn is_armed(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|sender| !sender.is_closed())
            .unwrap_or(false)
    }
}

impl TickScheduler for ManualScheduler {
    fn ticker(&self, _period: Duration) -> Box<dyn Ticker> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.current.lock() = Some(sender);
        Box::new(ManualTicker {
            receiver,
            pending: None,
        })
    }
}

struct ManualTicker {
    receiver: mpsc::UnboundedReceiver<TickAck>,
    pending: Option<TickAck>,
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        // Coming back for another tick means the previous one was handled.
        if let Some(ack) = self.pending.take() {
            let _ = ack.send(());
        }
        match self.receiver.recv().await {
            Some(ack) => self.pending = Some(ack),
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn interval_ticker_waits_a_full_period_before_first_tick() {
        let began = Instant::now();
        let mut ticker = IntervalScheduler.ticker(Duration::from_millis(2000));
        ticker.tick().await;
        assert_eq!(began.elapsed(), Duration::from_millis(2000));
        ticker.tick().await;
        assert_eq!(began.elapsed(), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn manual_fire_without_ticker_reports_false() {
        let scheduler = ManualScheduler::new();
        assert!(!scheduler.is_armed());
        assert!(!scheduler.fire().await);
    }

    #[tokio::test]
    async fn manual_fire_resolves_after_loop_handles_tick() {
        let scheduler = ManualScheduler::new();
        let mut ticker = scheduler.ticker(Duration::from_secs(1));
        let handled = Arc::new(AtomicUsize::new(0));
        let counter = handled.clone();
        let task = tokio::spawn(async move {
            loop {
                ticker.tick().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert!(scheduler.is_armed());
        assert!(scheduler.fire().await);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert!(scheduler.fire().await);
        assert_eq!(handled.load(Ordering::SeqCst), 2);

        task.abort();
        let _ = task.await;
        assert!(!scheduler.fire().await);
    }
}
