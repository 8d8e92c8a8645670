//! Matchmaking Sessions Library
//!
//! This crate manages the lifecycle of the one well-known game session a
//! player hosts or joins.
//!
//! # Overview
//!
//! The session module provides:
//!
//! - **Session Orchestrator** - Issues create, find, join, start and destroy
//!   requests to a backend and reports each completion as an event.
//!
//! - **Destroy-then-Recreate** - Hosting while a session already exists
//!   destroys it first and creates the new one once the destroy completes.
//!
//! - **Backend Seam** - Any session provider implementing `SessionBackend`.
//!   A LAN backend sharing an in-process directory is included.
//!
//! - **Matchmaking Flow** - Host/join triggers that pick a session by match
//!   type and tell the game where to travel.
//!
//! # Design Principles
//!
//! 1. **One request per kind** - A second request of a kind already in flight
//!    is refused, and completions for superseded requests are dropped.
//!
//! 2. **Single-threaded driving** - Completions are queued and handled by
//!    `poll`, so subscribers never run inside a backend call.
//!
//! 3. **No transport** - Travel requests are handed to the game layer.
//!
//! 4. **Serialization-ready** - Events, results and config are serde types.
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
//!
//! let mut host = SessionOrchestrator::new(OrchestratorConfig::default())
//!     .with_backend(LanBackend::new(directory.clone(), "Alice", "192.168.1.10:7777"))
//!     .with_identity(PlayerIdentity("alice".to_string()));
//! host.create_session(4, MatchType::FreeForAll).unwrap();
//! host.poll();
//!
//! let mut client = SessionOrchestrator::new(OrchestratorConfig::default())
//!     .with_backend(LanBackend::new(directory.clone(), "Bob", "192.168.1.11:7777"))
//!     .with_identity(PlayerIdentity("bob".to_string()));
//! let events = client.subscribe();
//! client.find_sessions(100).unwrap();
//! client.poll();
//!
//! match events.try_next() {
//!     Some(SessionEvent::FindSessionsComplete { results, success }) => {
//!         assert!(success);
//!         assert_eq!(results.len(), 1);
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

pub mod session;
