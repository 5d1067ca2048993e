//! ---
//! agrotel_section: "03-logging"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Structured logging adapters and context macros."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---

/// Shared expansion for the level-specific macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! __agt_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            sensor = ctx.sensor.unwrap_or(""),
            device = ctx.device.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            session = ctx.session.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with telemetry context.
#[macro_export]
macro_rules! agt_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with telemetry context.
#[macro_export]
macro_rules! agt_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with telemetry context.
#[macro_export]
macro_rules! agt_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with telemetry context.
#[macro_export]
macro_rules! agt_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__agt_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
