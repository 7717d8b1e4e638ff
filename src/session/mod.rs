//! Client sessions
//!
//! A session belongs to exactly one client connection and is never shared.
//! It carries the routing target chosen with `use` and, while a transaction
//! is open, the pin to the tablet and backend transaction serving it.
//!
//! ```text
//!          begin                 commit / rollback
//!   Idle ---------> InTransaction ------------------> Idle
//!                   |       ^
//!                   +-------+  any statement (routed to the pin)
//! ```

mod target;

use std::fmt;

use uuid::Uuid;

pub use target::Target;

use crate::tablet::TransactionId;
use crate::topology::{TabletAlias, TabletType};

/// Where an open transaction lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub alias: TabletAlias,
    pub transaction: TransactionId,
    /// Role the tablet was picked for at begin
    pub role: TabletType,
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.transaction, self.alias)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    InTransaction(Pin),
}

#[derive(Debug)]
pub struct Session {
    connection_id: Uuid,
    target: Target,
    state: SessionState,
}

impl Session {
    /// New idle session targeting the primary
    pub fn new() -> Self {
        Self::with_target(Target::default())
    }

    pub fn with_target(target: Target) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            target,
            state: SessionState::Idle,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Change the routing target. An open transaction keeps its pin.
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pin(&self) -> Option<&Pin> {
        match &self.state {
            SessionState::InTransaction(pin) => Some(pin),
            SessionState::Idle => None,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.pin().is_some()
    }

    /// Enter a transaction. Returns the previous pin if one was still open.
    pub(crate) fn enter(&mut self, pin: Pin) -> Option<Pin> {
        match std::mem::replace(&mut self.state, SessionState::InTransaction(pin)) {
            SessionState::InTransaction(previous) => Some(previous),
            SessionState::Idle => None,
        }
    }

    /// Leave the transaction, returning its pin
    pub(crate) fn release(&mut self) -> Option<Pin> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::InTransaction(pin) => Some(pin),
            SessionState::Idle => None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
