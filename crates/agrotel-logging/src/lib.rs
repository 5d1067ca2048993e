//! ---
//! agrotel_section: "03-logging"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Structured logging adapters and context macros."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Context-carrying logging helpers used by the simulator and the CLI.

#[macro_use]
pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Sensor identifier associated with the log event.
    pub sensor: Option<&'a str>,
    /// Target device for commands.
    pub device: Option<&'a str>,
    /// Timer tick counter within the current session.
    pub tick: Option<u64>,
    /// Connection session number.
    pub session: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sensor identifier.
    pub fn with_sensor(mut self, sensor: &'a str) -> Self {
        self.sensor = Some(sensor);
        self
    }

    /// Attach a device identifier.
    pub fn with_device(mut self, device: &'a str) -> Self {
        self.device = Some(device);
        self
    }

    /// Attach a tick value.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attach a session number.
    pub fn with_session(mut self, session: u64) -> Self {
        self.session = Some(session);
        self
    }
}

/// Outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The transition completed.
    Success,
    /// The transition was refused or failed.
    Fault,
}

impl LifecycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleOutcome::Success => "success",
            LifecycleOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event (connect, disconnect, dispose).
pub fn log_lifecycle_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: LifecycleOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        LifecycleOutcome::Success => agt_info!(
            context = ctx,
            "{} [{}]: {}",
            event,
            outcome.as_str(),
            message
        ),
        LifecycleOutcome::Fault => agt_error!(
            context = ctx,
            "{} [{}]: {}",
            event,
            outcome.as_str(),
            message
        ),
    }
}
