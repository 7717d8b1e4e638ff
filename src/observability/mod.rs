//! Observability
//!
//! - Structured JSON logging
//! - Typed lifecycle and health events
//! - Monotonic gateway counters
//!
//! Observability never changes routing decisions and never fails an operation.
//!
//! ```ignore
//! use tabletgate::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ProbeFailed, &[("tablet", "zone1-0000000101")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::BootStart);
        log_event(Event::BootComplete);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ConfigLoaded, &[("tablets", "3")]);
    }
}
