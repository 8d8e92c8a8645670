//! Session backend capability.
//!
//! A backend is whatever asynchronous session provider is available: the
//! in-process LAN provider in [`super::lan`], or an adapter over an online
//! service. It holds no business state of its own.
//!
//! Every request either fails immediately with a [`BackendError`] (nothing
//! will ever be delivered for it) or takes ownership of a
//! [`CompletionHandle`] and completes it exactly once, later. Completion
//! consumes the handle, so a second completion cannot be expressed.

use std::fmt;
use std::marker::PhantomData;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use super::request::RequestTicket;
use super::settings::{NamedSession, SessionSearch, SessionSearchResult, SessionSettings};

/// Unique network identity of the local player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIdentity(pub String);

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a join request, forwarded verbatim from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinResult {
    Success,
    SessionIsFull,
    SessionDoesNotExist,
    AlreadyInSession,
    CouldNotRetrieveAddress,
    UnknownError,
}

impl JoinResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SessionIsFull => "session_is_full",
            Self::SessionDoesNotExist => "session_does_not_exist",
            Self::AlreadyInSession => "already_in_session",
            Self::CouldNotRetrieveAddress => "could_not_retrieve_address",
            Self::UnknownError => "unknown_error",
        }
    }
}

/// Results of a find request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchOutcome {
    pub results: Vec<SessionSearchResult>,
    pub success: bool,
}

/// Payload of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Succeeded(bool),
    Found(SearchOutcome),
    Joined(JoinResult),
}

/// A completion delivered back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BackendCompletion {
    pub ticket: RequestTicket,
    pub outcome: CompletionOutcome,
}

/// Values a request can complete with.
pub trait CompletionValue {
    fn into_outcome(self) -> CompletionOutcome;
}

impl CompletionValue for bool {
    fn into_outcome(self) -> CompletionOutcome {
        CompletionOutcome::Succeeded(self)
    }
}

impl CompletionValue for SearchOutcome {
    fn into_outcome(self) -> CompletionOutcome {
        CompletionOutcome::Found(self)
    }
}

impl CompletionValue for JoinResult {
    fn into_outcome(self) -> CompletionOutcome {
        CompletionOutcome::Joined(self)
    }
}

/// One-shot completion registration for a single backend request.
#[must_use = "dropping a completion handle means the request never completes"]
pub struct CompletionHandle<T> {
    ticket: RequestTicket,
    tx: mpsc::Sender<BackendCompletion>,
    _value: PhantomData<fn(T)>,
}

impl<T: CompletionValue> CompletionHandle<T> {
    pub(crate) fn new(ticket: RequestTicket, tx: mpsc::Sender<BackendCompletion>) -> Self {
        Self {
            ticket,
            tx,
            _value: PhantomData,
        }
    }

    /// Ticket of the request this handle completes.
    pub fn ticket(&self) -> RequestTicket {
        self.ticket
    }

    /// Deliver the completion.
    ///
    /// Delivery is queued; the orchestrator reacts on its next poll. If the
    /// orchestrator is gone the completion is discarded.
    pub fn complete(self, value: T) {
        let completion = BackendCompletion {
            ticket: self.ticket,
            outcome: value.into_outcome(),
        };
        if self.tx.send(completion).is_err() {
            tracing::debug!("Completion for {} dropped, orchestrator gone", self.ticket);
        }
    }
}

impl<T> fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("ticket", &self.ticket)
            .finish()
    }
}

/// Reasons a backend refuses to begin a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("no local player identity")]
    NoLocalIdentity,
    #[error("session {0:?} already exists")]
    SessionExists(String),
    #[error("session {0:?} not found")]
    SessionNotFound(String),
    #[error("session provider unavailable")]
    ProviderUnavailable,
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Asynchronous session provider.
///
/// Requests never block. A request returning `Ok` has taken ownership of its
/// completion handle and will complete it exactly once; a request returning
/// `Err` drops the handle and will never complete.
pub trait SessionBackend {
    /// Provider name. The LAN provider reports [`super::settings::NULL_SUBSYSTEM`].
    fn subsystem_name(&self) -> &str;

    fn create_session(
        &mut self,
        identity: &PlayerIdentity,
        session_name: &str,
        settings: &SessionSettings,
        done: CompletionHandle<bool>,
    ) -> Result<(), BackendError>;

    fn find_sessions(
        &mut self,
        identity: &PlayerIdentity,
        search: &SessionSearch,
        done: CompletionHandle<SearchOutcome>,
    ) -> Result<(), BackendError>;

    fn join_session(
        &mut self,
        identity: &PlayerIdentity,
        session_name: &str,
        result: &SessionSearchResult,
        done: CompletionHandle<JoinResult>,
    ) -> Result<(), BackendError>;

    fn start_session(
        &mut self,
        session_name: &str,
        done: CompletionHandle<bool>,
    ) -> Result<(), BackendError>;

    fn destroy_session(
        &mut self,
        session_name: &str,
        done: CompletionHandle<bool>,
    ) -> Result<(), BackendError>;

    /// The session currently registered under `session_name`, if any.
    fn named_session(&self, session_name: &str) -> Option<NamedSession>;

    /// Address a client travels to after joining `session_name`.
    fn resolve_connect_string(&self, session_name: &str) -> Result<String, BackendError>;

    /// Make progress on outstanding requests.
    ///
    /// Called by the orchestrator before it dispatches completions.
    /// Providers that complete from their own threads leave this empty.
    fn poll(&mut self) {}
}
