//! Request registrations.
//!
//! Every operation kind has its own small state machine. At most one request
//! of a kind is outstanding at any time; the registration is cleared the
//! moment its completion (or immediate failure) is handled.
//!
//! # State Diagram
//!
//! ```text
//!                 issue                 complete / fail
//! ┌──────┐ ─────────────────▶ ┌─────────┐ ───────────────▶ ┌──────┐
//! │ Idle │                    │ Pending │                  │ Idle │
//! └──┬───┘                    └─────────┘                  └──────┘
//!    │ defer (create only)         ▲
//!    ▼                             │ issue
//! ┌─────────────────┐              │
//! │ AwaitingDestroy │──────────────┘
//! └────────┬────────┘
//!          │ abandon (destroy failed)
//!          ▼
//!       ┌──────┐
//!       │ Idle │
//!       └──────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Find,
    Join,
    Start,
    Destroy,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Create,
        OperationKind::Find,
        OperationKind::Join,
        OperationKind::Start,
        OperationKind::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Find => "find",
            Self::Join => "join",
            Self::Start => "start",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub kind: OperationKind,
    pub id: u64,
}

impl RequestTicket {
    pub fn new(kind: OperationKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Where a single operation kind is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPhase {
    /// Nothing outstanding
    #[default]
    Idle,
    /// Waiting for the backend to complete this ticket
    Pending(RequestTicket),
    /// Create waiting for an existing session to be destroyed
    AwaitingDestroy,
}

impl RequestPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn ticket(&self) -> Option<RequestTicket> {
        match self {
            Self::Pending(ticket) => Some(*ticket),
            _ => None,
        }
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Pending(ticket) => write!(f, "Pending({})", ticket),
            Self::AwaitingDestroy => write!(f, "AwaitingDestroy"),
        }
    }
}

/// Request lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    Issue(RequestTicket),
    DeferUntilDestroyed,
    Complete(RequestTicket),
    Fail(RequestTicket),
    Abandon,
}

/// Error when a request transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} transition from {from} via {event:?}: {reason}")]
pub struct InvalidTransition {
    pub kind: OperationKind,
    pub from: RequestPhase,
    pub event: RequestEvent,
    pub reason: &'static str,
}

/// Registrations for all operation kinds.
#[derive(Debug, Default)]
pub struct PendingRequests {
    phases: HashMap<OperationKind, RequestPhase>,
    next_id: u64,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a ticket for a new request. Does not register it.
    pub fn next_ticket(&mut self, kind: OperationKind) -> RequestTicket {
        self.next_id += 1;
        RequestTicket::new(kind, self.next_id)
    }

    /// Current phase of an operation kind.
    pub fn phase(&self, kind: OperationKind) -> RequestPhase {
        self.phases.get(&kind).copied().unwrap_or_default()
    }

    /// Check if a kind has anything outstanding.
    pub fn is_busy(&self, kind: OperationKind) -> bool {
        !self.phase(kind).is_idle()
    }

    /// Check if `ticket` is the live registration for its kind.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.phase(ticket.kind).ticket() == Some(ticket)
    }

    /// Count kinds with something outstanding.
    pub fn busy_count(&self) -> usize {
        self.phases.values().filter(|p| !p.is_idle()).count()
    }

    /// Apply an event to one kind's state machine.
    pub fn apply(&mut self, kind: OperationKind, event: RequestEvent) -> Result<(), InvalidTransition> {
        let from = self.phase(kind);
        let to = Self::transition(kind, from, event)?;
        if to.is_idle() {
            self.phases.remove(&kind);
        } else {
            self.phases.insert(kind, to);
        }
        Ok(())
    }

    fn transition(
        kind: OperationKind,
        from: RequestPhase,
        event: RequestEvent,
    ) -> Result<RequestPhase, InvalidTransition> {
        use RequestEvent::*;
        use RequestPhase::*;

        let invalid = |reason: &'static str| InvalidTransition {
            kind,
            from,
            event,
            reason,
        };

        match (from, event) {
            (_, Issue(ticket)) | (_, Complete(ticket)) | (_, Fail(ticket)) if ticket.kind != kind => {
                Err(invalid("Ticket belongs to another operation kind"))
            }

            // Issue: Idle/AwaitingDestroy -> Pending
            (Idle, Issue(ticket)) => Ok(Pending(ticket)),
            (AwaitingDestroy, Issue(ticket)) => Ok(Pending(ticket)),
            (Pending(_), Issue(_)) => Err(invalid("Request already pending")),

            // DeferUntilDestroyed: Idle -> AwaitingDestroy (create only)
            (Idle, DeferUntilDestroyed) if kind == OperationKind::Create => Ok(AwaitingDestroy),
            (Idle, DeferUntilDestroyed) => Err(invalid("Only create can wait for a destroy")),
            (_, DeferUntilDestroyed) => Err(invalid("Request already pending")),

            // Complete / Fail: Pending -> Idle, ticket must match
            (Pending(current), Complete(ticket)) | (Pending(current), Fail(ticket)) => {
                if current == ticket {
                    Ok(Idle)
                } else {
                    Err(invalid("Stale ticket"))
                }
            }
            (_, Complete(_)) | (_, Fail(_)) => Err(invalid("No request pending")),

            // Abandon: AwaitingDestroy -> Idle
            (AwaitingDestroy, Abandon) => Ok(Idle),
            (_, Abandon) => Err(invalid("Not awaiting a destroy")),
        }
    }
}
