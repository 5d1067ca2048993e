//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Telemetry simulator connection lifecycle and timer loop."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::sync::{Arc, Weak};

use agrotel_common::{epoch_millis, SimulatorConfig};
use agrotel_logging::{
    agt_debug, agt_info, agt_warn, log_lifecycle_event, LifecycleOutcome, LogContext,
};
use agrotel_rt::{IntervalScheduler, TickScheduler, Ticker};
use parking_lot::{Mutex, ReentrantMutex};
use prometheus::Registry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::commands::{CommandAck, CommandParameters};
use crate::history::{self, HistoricalPoint, HistoryRange};
use crate::metrics::{MetricsSnapshot, SimulatorMetrics};
use crate::registry::{DeliveryReport, SubscriberRegistry, Subscription};
use crate::sensors::{SensorCatalog, SensorEvent, SensorReading};
use crate::{Result, SimulatorError};

const HISTORY_STREAM: u64 = 0x6869_7374_6f72_7921;

struct State {
    connected: bool,
    disposed: bool,
    /// Incremented on every connect; ticks from older sessions are dropped.
    session: u64,
    tick: u64,
    readings: Vec<SensorReading>,
    rng: StdRng,
    /// Separate stream so history queries never shift tick values.
    history_rng: StdRng,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    config: SimulatorConfig,
    catalog: SensorCatalog,
    scheduler: Arc<dyn TickScheduler>,
    state: Mutex<State>,
    sensor_subscribers: Arc<SubscriberRegistry<SensorEvent>>,
    connection_subscribers: Arc<SubscriberRegistry<bool>>,
    /// Held for every fan-out and every transition. Re-entrant so callbacks
    /// may call back into the simulator on the delivering thread.
    dispatch: ReentrantMutex<()>,
    metrics: SimulatorMetrics,
    registry: Registry,
}

/// Simulated telemetry service consumed by the dashboard panels.
///
/// Cloning yields another handle onto the same simulator.
#[derive(Clone)]
pub struct TelemetrySimulator {
    inner: Arc<Inner>,
}

impl TelemetrySimulator {
    /// Simulator over `catalog`, with metrics on a private registry.
    pub fn new(
        config: SimulatorConfig,
        catalog: SensorCatalog,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Result<Self> {
        Self::with_registry(config, catalog, scheduler, Registry::new())
    }

    /// The five farm sensors on a real tokio interval.
    pub fn farm_default(config: SimulatorConfig) -> Result<Self> {
        Self::new(
            config,
            SensorCatalog::farm_default(),
            Arc::new(IntervalScheduler),
        )
    }

    pub fn with_registry(
        config: SimulatorConfig,
        catalog: SensorCatalog,
        scheduler: Arc<dyn TickScheduler>,
        registry: Registry,
    ) -> Result<Self> {
        let metrics = SimulatorMetrics::register(&registry)?;
        let (rng, history_rng) = match config.random_seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed ^ HISTORY_STREAM),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };
        let now = epoch_millis();
        let readings = catalog.iter().map(|spec| spec.seed_reading(now)).collect();
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                catalog,
                scheduler,
                state: Mutex::new(State {
                    connected: false,
                    disposed: false,
                    session: 0,
                    tick: 0,
                    readings,
                    rng,
                    history_rng,
                    timer: None,
                }),
                sensor_subscribers: SubscriberRegistry::new("sensor"),
                connection_subscribers: SubscriberRegistry::new("connection"),
                dispatch: ReentrantMutex::new(()),
                metrics,
                registry,
            }),
        })
    }

    /// Move to `Connected`, announce it, emit one snapshot per sensor and
    /// start the repeating timer. No-op while already connected.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();
        let runtime = Handle::try_current().map_err(|_| SimulatorError::NoRuntime)?;

        let (session, snapshot) = {
            let mut state = inner.state.lock();
            if state.disposed {
                drop(state);
                log_lifecycle_event(
                    None,
                    "simulator.connect",
                    "refused: simulator disposed",
                    LifecycleOutcome::Fault,
                );
                return Err(SimulatorError::Disposed);
            }
            if state.connected {
                agt_debug!(
                    context = LogContext::new().with_session(state.session),
                    "connect ignored: already connected"
                );
                return Ok(());
            }
            state.connected = true;
            state.session += 1;
            state.tick = 0;
            let now = epoch_millis();
            state.readings = inner
                .catalog
                .iter()
                .map(|spec| spec.seed_reading(now))
                .collect();
            (state.session, state.readings.clone())
        };

        inner.metrics.observe_connect();
        log_lifecycle_event(
            Some(&LogContext::new().with_session(session)),
            "simulator.connect",
            "connected",
            LifecycleOutcome::Success,
        );

        inner.announce(true);
        for reading in snapshot {
            if !inner.is_current(session) {
                break;
            }
            inner.publish(SensorEvent::Snapshot(reading));
        }

        let ticker = inner.scheduler.ticker(inner.config.tick_interval);
        let timer = runtime.spawn(run_timer(Arc::downgrade(inner), session, ticker));
        let mut state = inner.state.lock();
        if state.connected && state.session == session {
            state.timer = Some(timer);
        } else {
            // A subscriber disconnected (or cycled the connection) during the snapshot burst.
            timer.abort();
        }
        Ok(())
    }

    /// Stop the timer, announce `false` and wipe both registries.
    ///
    /// Safe in any state. Once this returns no further tick is delivered.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();
        let (was_connected, session) = {
            let mut state = inner.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            let was_connected = state.connected;
            state.connected = false;
            (was_connected, state.session)
        };

        if was_connected {
            log_lifecycle_event(
                Some(&LogContext::new().with_session(session)),
                "simulator.disconnect",
                "disconnected",
                LifecycleOutcome::Success,
            );
        }

        inner.announce(false);
        let sensors = inner.sensor_subscribers.clear();
        let connections = inner.connection_subscribers.clear();
        agt_debug!(
            context = LogContext::new().with_session(session),
            "cleared {} sensor and {} connection subscribers",
            sensors,
            connections
        );
    }

    /// Disconnect and refuse any later `connect`.
    pub fn dispose(&self) {
        let _dispatch = self.inner.dispatch.lock();
        self.disconnect();
        let mut state = self.inner.state.lock();
        if !state.disposed {
            state.disposed = true;
            log_lifecycle_event(
                Some(&LogContext::new().with_session(state.session)),
                "simulator.dispose",
                "disposed",
                LifecycleOutcome::Success,
            );
        }
    }

    /// Register for sensor events emitted from now on.
    pub fn on_sensor_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SensorEvent) + Send + Sync + 'static,
    {
        self.inner.sensor_subscribers.insert(Arc::new(callback))
    }

    /// Register for connection changes. `callback` is invoked with the
    /// current state before this returns.
    pub fn on_connection_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();
        let subscription = inner
            .connection_subscribers
            .insert(Arc::new(move |connected: &bool| callback(*connected)));
        let connected = inner.state.lock().connected;
        let report = inner
            .connection_subscribers
            .deliver_to(subscription.handle(), &connected);
        inner.metrics.observe_failures(report.failed);
        subscription
    }

    /// Simulated device command; always acknowledged after the configured latency.
    pub async fn send_command(
        &self,
        device_id: &str,
        command: &str,
        parameters: CommandParameters,
    ) -> CommandAck {
        agt_info!(
            context = LogContext::new().with_device(device_id),
            "dispatching command {} ({} parameters)",
            command,
            parameters.len()
        );
        self.inner.metrics.observe_command();
        tokio::time::sleep(self.inner.config.command_latency).await;
        CommandAck::succeeded(device_id, command, parameters)
    }

    /// Synthetic hourly history ending at call time, oldest first.
    pub async fn get_historical_data(
        &self,
        sensor_id: &str,
        range: HistoryRange,
    ) -> Vec<HistoricalPoint> {
        let now = epoch_millis();
        let points = {
            let mut state = self.inner.state.lock();
            history::generate(&mut state.history_rng, sensor_id, range, now)
        };
        tokio::time::sleep(self.inner.config.history_latency).await;
        points
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Current sensor table, seed values until the first tick.
    pub fn readings(&self) -> Vec<SensorReading> {
        self.inner.state.lock().readings.clone()
    }

    pub fn catalog(&self) -> &SensorCatalog {
        &self.inner.catalog
    }

    pub fn sensor_subscriber_count(&self) -> usize {
        self.inner.sensor_subscribers.len()
    }

    pub fn connection_subscriber_count(&self) -> usize {
        self.inner.connection_subscribers.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn metrics_registry(&self) -> &Registry {
        &self.inner.registry
    }
}

impl std::fmt::Debug for TelemetrySimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TelemetrySimulator")
            .field("connected", &state.connected)
            .field("disposed", &state.disposed)
            .field("session", &state.session)
            .field("sensors", &self.inner.catalog.len())
            .finish()
    }
}

impl Inner {
    fn is_current(&self, session: u64) -> bool {
        let state = self.state.lock();
        state.connected && state.session == session
    }

    fn announce(&self, connected: bool) {
        let report = self.connection_subscribers.deliver(&connected);
        self.metrics.observe_failures(report.failed);
    }

    fn publish(&self, event: SensorEvent) -> DeliveryReport {
        let report = self.sensor_subscribers.deliver(&event);
        self.metrics.observe_delivery(report.delivered, report.failed);
        report
    }

    /// Handle one timer tick for `session`. Returns `false` once the session
    /// is over and the timer loop should stop.
    fn on_tick(&self, session: u64) -> bool {
        let _dispatch = self.dispatch.lock();
        let (update, tick) = {
            let mut state = self.state.lock();
            if !state.connected || state.session != session {
                return false;
            }
            state.tick += 1;
            let index = state.rng.gen_range(0..self.catalog.len());
            let Some(spec) = self.catalog.get(index) else {
                return false;
            };
            let perturbation = (state.rng.gen::<f64>() - 0.5) * spec.range;
            let update = spec.perturb(perturbation, epoch_millis());
            if let Some(reading) = state.readings.get_mut(index) {
                if let Err(err) = reading.merge(&update) {
                    agt_warn!(
                        context = LogContext::new().with_sensor(&spec.id),
                        "sensor table out of step: {}",
                        err
                    );
                }
            }
            (update, state.tick)
        };

        self.metrics.observe_tick();
        agt_debug!(
            context = LogContext::new()
                .with_sensor(&update.id)
                .with_tick(tick)
                .with_session(session),
            "value={} trend={:.3}",
            update.value,
            update.trend
        );
        self.publish(SensorEvent::Update(update));
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

async fn run_timer(inner: Weak<Inner>, session: u64, mut ticker: Box<dyn Ticker>) {
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.on_tick(session) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrotel_rt::ManualScheduler;
    use std::time::Duration;

    fn manual_simulator(seed: u64) -> (TelemetrySimulator, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let config = SimulatorConfig {
            random_seed: Some(seed),
            ..SimulatorConfig::instant()
        };
        let simulator = TelemetrySimulator::new(
            config,
            SensorCatalog::farm_default(),
            Arc::new(scheduler.clone()),
        )
        .expect("simulator");
        (simulator, scheduler)
    }

    fn collect_events(simulator: &TelemetrySimulator) -> (Arc<Mutex<Vec<SensorEvent>>>, Subscription) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let subscription = simulator.on_sensor_update(move |event| sink.lock().push(event.clone()));
        (events, subscription)
    }

    #[test]
    fn connect_outside_runtime_is_rejected() {
        let (simulator, _) = manual_simulator(1);
        assert!(matches!(simulator.connect(), Err(SimulatorError::NoRuntime)));
        assert!(!simulator.is_connected());
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let (simulator, scheduler) = manual_simulator(1);
        let (events, _sub) = collect_events(&simulator);
        simulator.connect().expect("connect");
        simulator.connect().expect("second connect");
        assert_eq!(events.lock().len(), 5);
        assert_eq!(simulator.metrics().connections, 1);

        assert!(scheduler.fire().await);
        assert_eq!(events.lock().len(), 6);
        assert_eq!(simulator.metrics().ticks, 1);
    }

    #[tokio::test]
    async fn ticks_update_the_sensor_table() {
        let (simulator, scheduler) = manual_simulator(9);
        let (events, _sub) = collect_events(&simulator);
        simulator.connect().expect("connect");
        assert!(scheduler.fire().await);

        let last = events.lock().last().cloned().expect("tick event");
        let SensorEvent::Update(update) = last else {
            panic!("expected an update event");
        };
        let reading = simulator
            .readings()
            .into_iter()
            .find(|reading| reading.id == update.id)
            .expect("reading");
        assert_eq!(reading.value, update.value);
        assert_eq!(reading.trend, update.trend);
    }

    #[tokio::test]
    async fn disconnect_stops_timer_and_clears_registries() {
        let (simulator, scheduler) = manual_simulator(2);
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        let _conn = simulator.on_connection_change(move |connected| sink.lock().push(connected));
        let (_events, _sub) = collect_events(&simulator);

        simulator.connect().expect("connect");
        simulator.disconnect();

        assert_eq!(*states.lock(), vec![false, true, false]);
        assert_eq!(simulator.sensor_subscriber_count(), 0);
        assert_eq!(simulator.connection_subscriber_count(), 0);
        assert!(!scheduler.fire().await);
        assert_eq!(simulator.metrics().ticks, 0);

        simulator.disconnect();
        assert!(!simulator.is_connected());
    }

    #[tokio::test]
    async fn reconnect_starts_a_fresh_session() {
        let (simulator, scheduler) = manual_simulator(3);
        simulator.connect().expect("connect");
        simulator.disconnect();
        simulator.connect().expect("reconnect");

        let (events, _sub) = collect_events(&simulator);
        assert!(scheduler.fire().await);
        assert_eq!(events.lock().len(), 1);
        assert_eq!(simulator.metrics().connections, 2);
    }

    #[tokio::test]
    async fn subscriber_may_disconnect_during_snapshot_burst() {
        let (simulator, scheduler) = manual_simulator(4);
        let handle = simulator.clone();
        let seen = Arc::new(Mutex::new(0usize));
        let counter = seen.clone();
        let _sub = simulator.on_sensor_update(move |_| {
            *counter.lock() += 1;
            handle.disconnect();
        });

        simulator.connect().expect("connect");
        assert!(!simulator.is_connected());
        assert_eq!(*seen.lock(), 1);
        assert!(!scheduler.fire().await);
    }

    #[tokio::test]
    async fn reconnect_during_snapshot_burst_sends_one_snapshot_per_sensor() {
        let (simulator, _scheduler) = manual_simulator(4);
        let handle = simulator.clone();
        let seen: Arc<Mutex<Vec<SensorEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cycled = Arc::new(Mutex::new(false));
        let _sub = simulator.on_sensor_update(move |_| {
            let mut cycled = cycled.lock();
            if *cycled {
                return;
            }
            *cycled = true;
            drop(cycled);
            handle.disconnect();
            let sink = sink.clone();
            let _recorder = handle.on_sensor_update(move |event| sink.lock().push(event.clone()));
            handle.connect().expect("reconnect");
        });

        simulator.connect().expect("connect");

        let seen = seen.lock();
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(SensorEvent::is_snapshot));
        let ids: Vec<&str> = seen.iter().map(SensorEvent::sensor_id).collect();
        assert_eq!(
            ids,
            vec!["sensor_001", "sensor_002", "sensor_003", "sensor_004", "sensor_005"]
        );
        assert!(simulator.is_connected());
    }

    #[tokio::test]
    async fn history_queries_do_not_shift_tick_values() {
        async fn ticks(query_history: bool) -> Vec<(String, f64, f64)> {
            let (simulator, scheduler) = manual_simulator(12);
            if query_history {
                simulator
                    .get_historical_data("sensor_001", HistoryRange::LastWeek)
                    .await;
            }
            simulator.connect().expect("connect");
            let (events, _sub) = collect_events(&simulator);
            for _ in 0..4 {
                assert!(scheduler.fire().await);
            }
            let events = events.lock();
            events
                .iter()
                .map(|event| match event {
                    SensorEvent::Update(update) => (update.id.clone(), update.value, update.trend),
                    SensorEvent::Snapshot(reading) => panic!("late snapshot for {}", reading.id),
                })
                .collect()
        }

        let quiet = ticks(false).await;
        let queried = ticks(true).await;
        assert_eq!(quiet.len(), 4);
        assert_eq!(quiet, queried);
    }

    #[tokio::test]
    async fn dispose_refuses_later_connects() {
        let (simulator, _) = manual_simulator(5);
        simulator.connect().expect("connect");
        simulator.dispose();
        assert!(simulator.is_disposed());
        assert!(matches!(simulator.connect(), Err(SimulatorError::Disposed)));
    }

    #[tokio::test]
    async fn panicking_connection_subscriber_is_counted() {
        let (simulator, _) = manual_simulator(6);
        let _bad = simulator.on_connection_change(|_| panic!("connection subscriber failure"));
        assert_eq!(simulator.metrics().subscriber_failures, 1);
        assert_eq!(simulator.connection_subscriber_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_command_waits_for_configured_latency() {
        let config = SimulatorConfig {
            command_latency: Duration::from_millis(1000),
            ..SimulatorConfig::default()
        };
        let simulator = TelemetrySimulator::farm_default(config).expect("simulator");
        let began = tokio::time::Instant::now();
        let ack = simulator
            .send_command("pump_1", "start", CommandParameters::new())
            .await;
        assert_eq!(began.elapsed(), Duration::from_millis(1000));
        assert!(ack.success);
        assert_eq!(ack.device_id, "pump_1");
        assert_eq!(simulator.metrics().commands, 1);
    }

    #[tokio::test]
    async fn stubs_do_not_require_a_connection() {
        let (simulator, _) = manual_simulator(7);
        let points = simulator
            .get_historical_data("sensor_003", HistoryRange::LastHour)
            .await;
        assert_eq!(points.len(), 2);
        let ack = simulator
            .send_command("valve_2", "close", CommandParameters::new())
            .await;
        assert_eq!(ack.command, "close");
        assert!(!simulator.is_connected());
    }
}
