//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Prometheus counters for simulator activity."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use prometheus::{IntCounter, Opts, Registry};

/// Plain copy of the simulator counters for tests and CLI summaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sensor_events: u64,
    pub ticks: u64,
    pub subscriber_failures: u64,
    pub commands: u64,
    pub connections: u64,
}

/// Prometheus metric handles for simulator activity.
#[derive(Clone)]
pub struct SimulatorMetrics {
    sensor_events: IntCounter,
    ticks: IntCounter,
    subscriber_failures: IntCounter,
    commands: IntCounter,
    connections: IntCounter,
}

impl SimulatorMetrics {
    /// Register simulator metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let sensor_events = IntCounter::with_opts(Opts::new(
            "agrotel_sensor_events_total",
            "Sensor events handed to subscribers",
        ))?;
        let ticks = IntCounter::with_opts(Opts::new(
            "agrotel_ticks_total",
            "Timer ticks that produced a reading",
        ))?;
        let subscriber_failures = IntCounter::with_opts(Opts::new(
            "agrotel_subscriber_failures_total",
            "Subscriber callbacks that panicked during fan-out",
        ))?;
        let commands = IntCounter::with_opts(Opts::new(
            "agrotel_commands_total",
            "Device commands dispatched",
        ))?;
        let connections = IntCounter::with_opts(Opts::new(
            "agrotel_connections_total",
            "Successful connect transitions",
        ))?;

        registry.register(Box::new(sensor_events.clone()))?;
        registry.register(Box::new(ticks.clone()))?;
        registry.register(Box::new(subscriber_failures.clone()))?;
        registry.register(Box::new(commands.clone()))?;
        registry.register(Box::new(connections.clone()))?;

        Ok(Self {
            sensor_events,
            ticks,
            subscriber_failures,
            commands,
            connections,
        })
    }

    pub(crate) fn observe_delivery(&self, delivered: usize, failed: usize) {
        self.sensor_events.inc_by((delivered + failed) as u64);
        self.subscriber_failures.inc_by(failed as u64);
    }

    pub(crate) fn observe_failures(&self, failed: usize) {
        self.subscriber_failures.inc_by(failed as u64);
    }

    pub(crate) fn observe_tick(&self) {
        self.ticks.inc();
    }

    pub(crate) fn observe_command(&self) {
        self.commands.inc();
    }

    pub(crate) fn observe_connect(&self) {
        self.connections.inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sensor_events: self.sensor_events.get(),
            ticks: self.ticks.get(),
            subscriber_failures: self.subscriber_failures.get(),
            commands: self.commands.get(),
            connections: self.connections.get(),
        }
    }
}

impl std::fmt::Debug for SimulatorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SimulatorMetrics")
            .field(&self.snapshot())
            .finish()
    }
}
