//! Session orchestrator.
//!
//! Owns the lifecycle of the single well-known session: issues backend
//! requests, tracks their registrations, turns backend completions into
//! [`SessionEvent`]s and replaces an existing session by destroying it before
//! creating the new one.
//!
//! The orchestrator is driven from one loop. Operations return immediately;
//! completions are queued by the backend and handled by [`SessionOrchestrator::poll`].
//!
//! # Example
//!
//! ```rust
//! use matchmaking_sessions::session::{
//!     LanBackend, LanDirectory, MatchType, OrchestratorConfig, PlayerIdentity,
//!     SessionEvent, SessionOrchestrator,
//! };
//!
//! let directory = LanDirectory::new();
//! let mut host = SessionOrchestrator::new(OrchestratorConfig::default())
//!     .with_backend(LanBackend::new(directory.clone(), "Alice", "192.168.1.10:7777"))
//!     .with_identity(PlayerIdentity("alice".to_string()));
//! let events = host.subscribe();
//!
//! host.create_session(4, MatchType::FreeForAll).unwrap();
//! host.poll();
//!
//! assert_eq!(
//!     events.drain(),
//!     vec![SessionEvent::CreateSessionComplete { success: true }]
//! );
//! ```

use std::sync::mpsc;

use super::backend::{
    BackendCompletion, BackendError, CompletionHandle, CompletionOutcome, JoinResult,
    PlayerIdentity, SearchOutcome, SessionBackend,
};
use super::config::{CreateSuccessReporting, OrchestratorConfig, StartBehavior};
use super::error::SessionError;
use super::events::{EventBus, SessionEvent, Subscription, SubscriptionId};
use super::match_type::MatchType;
use super::request::{OperationKind, PendingRequests, RequestEvent, RequestPhase, RequestTicket};
use super::settings::{
    Locality, NamedSession, SessionSearch, SessionSearchResult, SessionSettings,
};

/// A create waiting for the existing session to be destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecreateRequest {
    pub connections: u32,
    pub match_type: MatchType,
}

/// Session lifecycle orchestrator.
pub struct SessionOrchestrator {
    config: OrchestratorConfig,
    backend: Option<Box<dyn SessionBackend>>,
    identity: Option<PlayerIdentity>,
    requests: PendingRequests,
    recreate: Option<RecreateRequest>,
    last_settings: Option<SessionSettings>,
    last_search: Option<SessionSearch>,
    completion_tx: mpsc::Sender<BackendCompletion>,
    completion_rx: mpsc::Receiver<BackendCompletion>,
    events: EventBus,
}

impl SessionOrchestrator {
    /// Create an orchestrator with no backend and no local identity.
    pub fn new(config: OrchestratorConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            config,
            backend: None,
            identity: None,
            requests: PendingRequests::new(),
            recreate: None,
            last_settings: None,
            last_search: None,
            completion_tx,
            completion_rx,
            events: EventBus::new(),
        }
    }

    pub fn with_backend(mut self, backend: impl SessionBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn with_identity(mut self, identity: PlayerIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Create and advertise the session.
    ///
    /// If a session with the well-known name already exists it is destroyed
    /// first and the create is issued once that destroy completes.
    pub fn create_session(&mut self, connections: u32, match_type: MatchType) -> Result<(), SessionError> {
        if connections == 0 {
            return Err(SessionError::InvalidConnections);
        }
        let Some(backend) = self.backend.as_ref() else {
            tracing::warn!("CreateSession ignored, no session backend");
            return Err(SessionError::BackendUnavailable);
        };
        if self.requests.is_busy(OperationKind::Create) {
            return Err(SessionError::RequestPending(OperationKind::Create));
        }

        let request = RecreateRequest {
            connections,
            match_type,
        };

        if backend.named_session(&self.config.session_name).is_some() {
            if let Some(kind) = self.destroy_in_flight() {
                return Err(SessionError::RequestPending(kind));
            }
            tracing::info!(
                "Session {} already exists, destroying before create",
                self.config.session_name
            );
            self.defer_create(request)?;
            self.issue_destroy();
            return Ok(());
        }

        self.issue_create(request);
        Ok(())
    }

    /// Search for sessions to join.
    pub fn find_sessions(&mut self, max_results: u32) -> Result<(), SessionError> {
        let Some(locality) = self.locality() else {
            tracing::warn!("FindSessions ignored, no session backend");
            return Err(SessionError::BackendUnavailable);
        };
        let ticket = self.register(OperationKind::Find)?;

        let search = SessionSearch::new(max_results, locality);
        let handle = CompletionHandle::new(ticket, self.completion_tx.clone());
        let issued = match (self.backend.as_mut(), self.identity.as_ref()) {
            (Some(backend), Some(identity)) => backend.find_sessions(identity, &search, handle),
            (Some(_), None) => Err(BackendError::NoLocalIdentity),
            (None, _) => Err(BackendError::ProviderUnavailable),
        };
        self.last_search = Some(search);

        match issued {
            Ok(()) => tracing::info!("Find sessions issued ({}, max {})", ticket, max_results),
            Err(err) => {
                self.fail_issue(ticket, &err);
                self.events.publish(SessionEvent::FindSessionsComplete {
                    results: Vec::new(),
                    success: false,
                });
            }
        }
        Ok(())
    }

    /// Join a session returned by a search.
    pub fn join_session(&mut self, result: &SessionSearchResult) -> Result<(), SessionError> {
        if self.backend.is_none() {
            tracing::warn!("JoinSession failed, no session backend");
            self.events.publish(SessionEvent::JoinSessionComplete {
                result: JoinResult::UnknownError,
            });
            return Ok(());
        }
        let ticket = self.register(OperationKind::Join)?;

        let handle = CompletionHandle::new(ticket, self.completion_tx.clone());
        let issued = match (self.backend.as_mut(), self.identity.as_ref()) {
            (Some(backend), Some(identity)) => {
                backend.join_session(identity, &self.config.session_name, result, handle)
            }
            (Some(_), None) => Err(BackendError::NoLocalIdentity),
            (None, _) => Err(BackendError::ProviderUnavailable),
        };

        match issued {
            Ok(()) => tracing::info!(
                "Join issued ({}, session {} hosted by {})",
                ticket,
                result.session_id,
                result.owner_name
            ),
            Err(err) => {
                self.fail_issue(ticket, &err);
                self.events.publish(SessionEvent::JoinSessionComplete {
                    result: JoinResult::UnknownError,
                });
            }
        }
        Ok(())
    }

    /// Start the hosted session.
    pub fn start_session(&mut self) -> Result<(), SessionError> {
        if self.backend.is_none() {
            tracing::warn!("StartSession failed, no session backend");
            self.events
                .publish(SessionEvent::StartSessionComplete { success: false });
            return Ok(());
        }
        let ticket = self.register(OperationKind::Start)?;

        let handle = CompletionHandle::new(ticket, self.completion_tx.clone());
        let name = &self.config.session_name;
        let issued = match (self.backend.as_mut(), self.config.start_behavior) {
            (Some(backend), StartBehavior::Start) => backend.start_session(name, handle),
            (Some(backend), StartBehavior::Destroy) => backend.destroy_session(name, handle),
            (None, _) => Err(BackendError::ProviderUnavailable),
        };

        match issued {
            Ok(()) => tracing::info!(
                "Start issued ({}, backend {:?})",
                ticket,
                self.config.start_behavior
            ),
            Err(err) => {
                self.fail_issue(ticket, &err);
                self.events
                    .publish(SessionEvent::StartSessionComplete { success: false });
            }
        }
        Ok(())
    }

    /// Destroy the session.
    pub fn destroy_session(&mut self) -> Result<(), SessionError> {
        if self.backend.is_none() {
            tracing::warn!("DestroySession failed, no session backend");
            self.events
                .publish(SessionEvent::DestroySessionComplete { success: false });
            return Ok(());
        }
        if let Some(kind) = self.destroy_in_flight() {
            return Err(SessionError::RequestPending(kind));
        }
        self.issue_destroy();
        Ok(())
    }

    /// Create the session again once the next destroy completes.
    ///
    /// The create counts as outstanding until then.
    pub fn queue_recreate(&mut self, connections: u32, match_type: MatchType) -> Result<(), SessionError> {
        if connections == 0 {
            return Err(SessionError::InvalidConnections);
        }
        self.defer_create(RecreateRequest {
            connections,
            match_type,
        })
    }

    // ------------------------------------------------------------------
    // Completion dispatch
    // ------------------------------------------------------------------

    /// Let the backend make progress, then handle every queued completion.
    ///
    /// Returns the number of completions handled, stale ones included.
    pub fn poll(&mut self) -> usize {
        if let Some(backend) = self.backend.as_mut() {
            backend.poll();
        }

        let mut handled = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.dispatch(completion);
            handled += 1;
        }
        handled
    }

    fn dispatch(&mut self, completion: BackendCompletion) {
        let ticket = completion.ticket;

        // Unregister before anything else reacts to the completion.
        if let Err(err) = self
            .requests
            .apply(ticket.kind, RequestEvent::Complete(ticket))
        {
            tracing::warn!("Dropping stale completion {}: {}", ticket, err);
            return;
        }

        match (ticket.kind, completion.outcome) {
            (OperationKind::Create, CompletionOutcome::Succeeded(success)) => {
                self.on_create_complete(ticket, success)
            }
            (OperationKind::Find, CompletionOutcome::Found(outcome)) => {
                self.on_find_complete(ticket, outcome)
            }
            (OperationKind::Join, CompletionOutcome::Joined(result)) => {
                self.on_join_complete(ticket, result)
            }
            (OperationKind::Start, CompletionOutcome::Succeeded(success)) => {
                tracing::info!("Start complete ({}, success={})", ticket, success);
                self.events
                    .publish(SessionEvent::StartSessionComplete { success });
            }
            (OperationKind::Destroy, CompletionOutcome::Succeeded(success)) => {
                self.on_destroy_complete(ticket, success)
            }
            (kind, outcome) => {
                tracing::warn!("Completion for {} carried unexpected outcome {:?}", kind, outcome);
            }
        }
    }

    fn on_create_complete(&mut self, ticket: RequestTicket, backend_success: bool) {
        let success = match self.config.create_success {
            CreateSuccessReporting::Forward => backend_success,
            CreateSuccessReporting::AlwaysTrue => true,
        };
        tracing::info!(
            "Create complete ({}, backend success={}, reported={})",
            ticket,
            backend_success,
            success
        );
        self.events
            .publish(SessionEvent::CreateSessionComplete { success });
    }

    fn on_find_complete(&mut self, ticket: RequestTicket, outcome: SearchOutcome) {
        tracing::info!(
            "Find complete ({}, {} results, success={})",
            ticket,
            outcome.results.len(),
            outcome.success
        );
        let event = if outcome.results.is_empty() {
            SessionEvent::FindSessionsComplete {
                results: Vec::new(),
                success: false,
            }
        } else {
            SessionEvent::FindSessionsComplete {
                results: outcome.results,
                success: outcome.success,
            }
        };
        self.events.publish(event);
    }

    fn on_join_complete(&mut self, ticket: RequestTicket, result: JoinResult) {
        tracing::info!("Join complete ({}, {})", ticket, result.as_str());

        let resolved = self
            .backend
            .as_ref()
            .map(|backend| backend.resolve_connect_string(&self.config.session_name));
        match resolved {
            Some(Ok(address)) => {
                self.events
                    .publish(SessionEvent::ConnectAddressResolved { address });
            }
            Some(Err(err)) => tracing::debug!("No connect address after join: {}", err),
            None => {}
        }

        self.events
            .publish(SessionEvent::JoinSessionComplete { result });
    }

    fn on_destroy_complete(&mut self, ticket: RequestTicket, success: bool) {
        tracing::info!("Destroy complete ({}, success={})", ticket, success);
        self.events
            .publish(SessionEvent::DestroySessionComplete { success });

        let Some(request) = self.recreate.take() else {
            return;
        };
        if success {
            tracing::info!(
                "Recreating session ({} connections, {})",
                request.connections,
                request.match_type
            );
            self.issue_create(request);
        } else {
            self.abandon_create();
        }
    }

    // ------------------------------------------------------------------
    // Issuing
    // ------------------------------------------------------------------

    fn issue_create(&mut self, request: RecreateRequest) {
        let Some(locality) = self.locality() else {
            self.abandon_create();
            return;
        };
        let ticket = match self.register(OperationKind::Create) {
            Ok(ticket) => ticket,
            Err(err) => {
                tracing::warn!("Create not issued: {}", err);
                return;
            }
        };

        let settings = self.build_settings(request, locality);
        let handle = CompletionHandle::new(ticket, self.completion_tx.clone());
        let issued = match (self.backend.as_mut(), self.identity.as_ref()) {
            (Some(backend), Some(identity)) => {
                backend.create_session(identity, &self.config.session_name, &settings, handle)
            }
            (Some(_), None) => Err(BackendError::NoLocalIdentity),
            (None, _) => Err(BackendError::ProviderUnavailable),
        };
        self.last_settings = Some(settings);

        match issued {
            Ok(()) => tracing::info!(
                "Create issued ({}, {} connections, {})",
                ticket,
                request.connections,
                request.match_type
            ),
            Err(err) => {
                self.fail_issue(ticket, &err);
                self.events
                    .publish(SessionEvent::CreateSessionComplete { success: false });
            }
        }
    }

    fn issue_destroy(&mut self) {
        let ticket = match self.register(OperationKind::Destroy) {
            Ok(ticket) => ticket,
            Err(err) => {
                tracing::warn!("Destroy not issued: {}", err);
                return;
            }
        };

        let handle = CompletionHandle::new(ticket, self.completion_tx.clone());
        let issued = match self.backend.as_mut() {
            Some(backend) => backend.destroy_session(&self.config.session_name, handle),
            None => Err(BackendError::ProviderUnavailable),
        };

        match issued {
            Ok(()) => tracing::info!("Destroy issued ({})", ticket),
            Err(err) => {
                self.fail_issue(ticket, &err);
                self.events
                    .publish(SessionEvent::DestroySessionComplete { success: false });
                if self.recreate.take().is_some() {
                    self.abandon_create();
                }
            }
        }
    }

    /// Kind of the outstanding request that is already destroying the session.
    ///
    /// A start counts when it is configured to destroy.
    fn destroy_in_flight(&self) -> Option<OperationKind> {
        if self.requests.is_busy(OperationKind::Destroy) {
            return Some(OperationKind::Destroy);
        }
        let start_destroys = self.config.start_behavior == StartBehavior::Destroy;
        (start_destroys && self.requests.is_busy(OperationKind::Start)).then_some(OperationKind::Start)
    }

    fn defer_create(&mut self, request: RecreateRequest) -> Result<(), SessionError> {
        self.requests
            .apply(OperationKind::Create, RequestEvent::DeferUntilDestroyed)
            .map_err(|_| SessionError::RequestPending(OperationKind::Create))?;
        self.recreate = Some(request);
        Ok(())
    }

    /// End a deferred create that will never be issued.
    fn abandon_create(&mut self) {
        if self
            .requests
            .apply(OperationKind::Create, RequestEvent::Abandon)
            .is_ok()
        {
            tracing::warn!("Deferred create abandoned");
            self.events
                .publish(SessionEvent::CreateSessionComplete { success: false });
        }
    }

    fn register(&mut self, kind: OperationKind) -> Result<RequestTicket, SessionError> {
        let ticket = self.requests.next_ticket(kind);
        self.requests
            .apply(kind, RequestEvent::Issue(ticket))
            .map_err(|_| SessionError::RequestPending(kind))?;
        Ok(ticket)
    }

    fn fail_issue(&mut self, ticket: RequestTicket, err: &BackendError) {
        tracing::warn!("Backend refused {}: {}", ticket, err);
        if let Err(transition) = self.requests.apply(ticket.kind, RequestEvent::Fail(ticket)) {
            tracing::warn!("{}", transition);
        }
    }

    fn build_settings(&self, request: RecreateRequest, locality: Locality) -> SessionSettings {
        let mut settings = SessionSettings::new(request.connections, locality)
            .with_match_type(request.match_type);
        settings.should_advertise = self.config.advertise;
        settings.uses_presence = self.config.uses_presence;
        settings.allow_join_via_presence = self.config.allow_join_via_presence;
        settings.allow_join_in_progress = self.config.allow_join_in_progress;
        settings.use_lobbies_if_available = self.config.use_lobbies_if_available;
        settings.build_unique_id = self.config.build_unique_id;
        settings
    }

    fn locality(&self) -> Option<Locality> {
        self.backend
            .as_ref()
            .map(|backend| Locality::from_subsystem(backend.subsystem_name()))
    }

    // ------------------------------------------------------------------
    // Events and inspection
    // ------------------------------------------------------------------

    /// Subscribe to completion events.
    pub fn subscribe(&mut self) -> Subscription {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&dyn SessionBackend> {
        self.backend.as_deref()
    }

    /// The session registered under the well-known name, if any.
    pub fn existing_session(&self) -> Option<NamedSession> {
        self.backend
            .as_ref()
            .and_then(|backend| backend.named_session(&self.config.session_name))
    }

    pub fn phase(&self, kind: OperationKind) -> RequestPhase {
        self.requests.phase(kind)
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.requests.is_busy(kind)
    }

    /// Count operation kinds with a request outstanding.
    pub fn pending_count(&self) -> usize {
        self.requests.busy_count()
    }

    pub fn pending_recreate(&self) -> Option<RecreateRequest> {
        self.recreate
    }

    /// Settings of the most recent create request.
    pub fn last_settings(&self) -> Option<&SessionSettings> {
        self.last_settings.as_ref()
    }

    /// Parameters of the most recent find request.
    pub fn last_search(&self) -> Option<&SessionSearch> {
        self.last_search.as_ref()
    }
}
