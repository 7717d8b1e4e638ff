//! Observable events
//!
//! Every log line emitted by the gateway names one of these events.

use std::fmt;

use super::Severity;

/// Observable events in the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Gateway startup begins
    BootStart,
    /// Gateway ready to route
    BootComplete,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Shutdown initiated
    ShutdownStart,
    /// All monitors stopped
    ShutdownComplete,
    /// HTTP introspection listener bound
    HttpListening,

    // Health checking
    /// A monitor task was started for a tablet
    MonitorStarted,
    /// A monitor task was stopped and its entry removed
    MonitorStopped,
    /// A probe returned an error or timed out
    ProbeFailed,
    /// A tablet transitioned to serving
    TabletServing,
    /// A tablet transitioned to not serving
    TabletNotServing,
    /// Registry refused a second serving primary and demoted the stale one
    DualPrimaryDemoted,

    // Role resolution
    /// Topology changed and was reloaded
    TopologyReload,
    /// Topology watch failed
    WatchError,
    /// Tablet metadata could not be parsed
    ParsingError,

    // Sessions
    /// Session opened
    SessionOpened,
    /// Session closed
    SessionClosed,
    /// Transaction pinned to a tablet
    TransactionPinned,
    /// Transaction finished and pin released
    TransactionReleased,
    /// Statement rejected before reaching a backend
    StatementRejected,
}

impl Event {
    /// Returns the event name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "BOOT_START",
            Event::BootComplete => "BOOT_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::HttpListening => "HTTP_LISTENING",
            Event::MonitorStarted => "MONITOR_STARTED",
            Event::MonitorStopped => "MONITOR_STOPPED",
            Event::ProbeFailed => "PROBE_FAILED",
            Event::TabletServing => "TABLET_SERVING",
            Event::TabletNotServing => "TABLET_NOT_SERVING",
            Event::DualPrimaryDemoted => "DUAL_PRIMARY_DEMOTED",
            Event::TopologyReload => "TOPOLOGY_RELOAD",
            Event::WatchError => "WATCH_ERROR",
            Event::ParsingError => "PARSING_ERROR",
            Event::SessionOpened => "SESSION_OPENED",
            Event::SessionClosed => "SESSION_CLOSED",
            Event::TransactionPinned => "TRANSACTION_PINNED",
            Event::TransactionReleased => "TRANSACTION_RELEASED",
            Event::StatementRejected => "STATEMENT_REJECTED",
        }
    }

    /// Severity an event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ProbeFailed
            | Event::TabletNotServing
            | Event::DualPrimaryDemoted
            | Event::StatementRejected => Severity::Warn,
            Event::WatchError | Event::ParsingError => Severity::Error,
            Event::TransactionPinned | Event::TransactionReleased => Severity::Trace,
            _ => Severity::Info,
        }
    }

    /// Events that signal a broken health-check pipeline rather than a sick tablet
    pub fn is_defect(&self) -> bool {
        matches!(self, Event::WatchError | Event::ParsingError)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
