//! Session lifecycle module.
//!
//! This module provides the session types, the backend seam and the
//! orchestrator that sits between them:
//!
//! - `match_type` - Match types and their advertised tags
//! - `settings` - Session settings, searches and search results
//! - `backend` - The `SessionBackend` trait and its completion handles
//! - `lan` - In-process LAN backend
//! - `request` - Per-kind request registrations
//! - `events` - Completion events and subscriptions
//! - `orchestrator` - Create/find/join/start/destroy and destroy-then-recreate
//! - `matching` - Picking a search result to join
//! - `flow` - Host/join triggers driving an orchestrator
//! - `config` - Orchestrator configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SessionOrchestrator                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐          │
//! │  │ PendingRequests │  │ RecreateRequest │  │    EventBus     │          │
//! │  │                 │  │                 │  │                 │          │
//! │  │ kind →          │  │ create waiting  │  │ id →            │          │
//! │  │   RequestPhase  │  │ on a destroy    │  │   Subscription  │          │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘          │
//! │           ▲                                         │                   │
//! │           │ completions (mpsc)                      │ SessionEvent      │
//! │  ┌────────┴────────────────────────────┐            ▼                   │
//! │  │    Box<dyn SessionBackend>          │   MatchmakingFlow / game code  │
//! │  │    (LanBackend, online providers)   │                                │
//! │  └─────────────────────────────────────┘                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use matchmaking_sessions::session::{
//!     FlowSetup, LanBackend, LanDirectory, MatchmakingFlow, OrchestratorConfig,
//!     PlayerIdentity, SessionOrchestrator,
//! };
//!
//! let mut orchestrator = SessionOrchestrator::new(OrchestratorConfig::load("sessions.json")?)
//!     .with_backend(LanBackend::new(LanDirectory::new(), "Alice", "192.168.1.10:7777"))
//!     .with_identity(PlayerIdentity("alice".into()));
//! let mut flow = MatchmakingFlow::setup(&mut orchestrator, FlowSetup::default());
//!
//! flow.host_pressed(&mut orchestrator);
//! loop {
//!     orchestrator.poll();
//!     for travel in flow.process_events(&mut orchestrator) {
//!         // hand off to the game layer
//!     }
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod lan;
pub mod match_type;
pub mod matching;
pub mod orchestrator;
pub mod request;
pub mod settings;

// Re-export commonly used types
pub use backend::{
    BackendError, CompletionHandle, CompletionOutcome, CompletionValue, JoinResult,
    PlayerIdentity, SearchOutcome, SessionBackend,
};
pub use config::{
    CreateSuccessReporting, OrchestratorConfig, StartBehavior, DEFAULT_MAX_SEARCH_RESULTS,
    DEFAULT_SESSION_NAME,
};
pub use error::{ConfigError, SessionError};
pub use events::{EventBus, SessionEvent, Subscription, SubscriptionId};
pub use flow::{FlowSetup, MatchmakingFlow, TravelRequest};
pub use lan::{LanBackend, LanDirectory};
pub use match_type::{MatchType, UnknownMatchType, MATCH_TYPE_KEY};
pub use matching::MatchDecision;
pub use orchestrator::{RecreateRequest, SessionOrchestrator};
pub use request::{InvalidTransition, OperationKind, RequestPhase, RequestTicket};
pub use settings::{
    Advertisement, Locality, NamedSession, NamedSessionState, SessionAttribute, SessionSearch,
    SessionSearchResult, SessionSettings, NULL_SUBSYSTEM,
};
