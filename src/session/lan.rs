//! In-process LAN session provider.
//!
//! Identifies itself as the `NULL` subsystem, so sessions it hosts are LAN
//! sessions. Every backend created from the same [`LanDirectory`] sees the
//! sessions the others advertise, which lets a host and its clients run in
//! one process.
//!
//! Requests are queued and completed on the next [`SessionBackend::poll`].

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::backend::{
    BackendError, CompletionHandle, JoinResult, PlayerIdentity, SearchOutcome, SessionBackend,
};
use super::settings::{
    NamedSession, NamedSessionState, SessionSearch, SessionSearchResult, SessionSettings,
    NULL_SUBSYSTEM,
};

/// A session advertised on the directory.
#[derive(Debug, Clone)]
struct HostedSession {
    session_id: String,
    owner_name: String,
    address: String,
    settings: SessionSettings,
    open_public_connections: u32,
    members: Vec<PlayerIdentity>,
    state: NamedSessionState,
    hosted_at: DateTime<Utc>,
}

impl HostedSession {
    fn to_result(&self) -> SessionSearchResult {
        SessionSearchResult {
            session_id: self.session_id.clone(),
            owner_name: self.owner_name.clone(),
            settings: self.settings.clone(),
            open_public_connections: self.open_public_connections,
            ping_ms: None,
        }
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    /// Kept in publication order
    sessions: Vec<HostedSession>,
    next_id: u64,
}

/// Shared registry of advertised LAN sessions.
#[derive(Debug, Clone, Default)]
pub struct LanDirectory {
    state: Rc<RefCell<DirectoryState>>,
}

impl LanDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a session. The host occupies one of its slots.
    fn publish(
        &self,
        owner: &PlayerIdentity,
        owner_name: &str,
        address: &str,
        settings: SessionSettings,
    ) -> String {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let session_id = format!("lan-{}", state.next_id);
        state.sessions.push(HostedSession {
            session_id: session_id.clone(),
            owner_name: owner_name.to_string(),
            address: address.to_string(),
            open_public_connections: settings.num_public_connections.saturating_sub(1),
            settings,
            members: vec![owner.clone()],
            state: NamedSessionState::Pending,
            hosted_at: Utc::now(),
        });
        session_id
    }

    fn unpublish(&self, session_id: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.session_id != session_id);
        state.sessions.len() != before
    }

    /// Sessions passing `search`, in publication order.
    fn search(&self, search: &SessionSearch, exclude: &[String]) -> Vec<SessionSearchResult> {
        self.state
            .borrow()
            .sessions
            .iter()
            .filter(|s| !exclude.contains(&s.session_id))
            .filter(|s| search.accepts(&s.settings))
            .take(search.max_results as usize)
            .map(HostedSession::to_result)
            .collect()
    }

    /// Take a slot in a session, returning the host address.
    fn reserve_slot(&self, session_id: &str, member: &PlayerIdentity) -> Result<String, JoinResult> {
        let mut state = self.state.borrow_mut();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or(JoinResult::SessionDoesNotExist)?;

        if session.members.contains(member) {
            return Err(JoinResult::AlreadyInSession);
        }
        if session.state == NamedSessionState::InProgress && !session.settings.allow_join_in_progress {
            return Err(JoinResult::UnknownError);
        }
        if session.open_public_connections == 0 {
            return Err(JoinResult::SessionIsFull);
        }
        if session.address.is_empty() {
            return Err(JoinResult::CouldNotRetrieveAddress);
        }

        session.open_public_connections -= 1;
        session.members.push(member.clone());
        Ok(session.address.clone())
    }

    fn release_slot(&self, session_id: &str, member: &PlayerIdentity) {
        let mut state = self.state.borrow_mut();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.session_id == session_id) {
            let before = session.members.len();
            session.members.retain(|m| m != member);
            if session.members.len() != before {
                session.open_public_connections += 1;
            }
        }
    }

    fn set_state(&self, session_id: &str, new_state: NamedSessionState) {
        let mut state = self.state.borrow_mut();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.session_id == session_id) {
            session.state = new_state;
        }
    }

    /// Count advertised sessions.
    pub fn count(&self) -> usize {
        self.state.borrow().sessions.len()
    }

    /// Open slots of an advertised session.
    pub fn open_slots(&self, session_id: &str) -> Option<u32> {
        self.state
            .borrow()
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .map(|s| s.open_public_connections)
    }

    /// When a session was advertised.
    pub fn hosted_at(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.state
            .borrow()
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .map(|s| s.hosted_at)
    }
}

/// A session this backend hosts or has joined.
#[derive(Debug, Clone)]
struct LocalSession {
    named: NamedSession,
    member: PlayerIdentity,
    connect_address: String,
}

enum LanRequest {
    Create {
        identity: PlayerIdentity,
        session_name: String,
        settings: SessionSettings,
        done: CompletionHandle<bool>,
    },
    Find {
        identity: PlayerIdentity,
        search: SessionSearch,
        done: CompletionHandle<SearchOutcome>,
    },
    Join {
        identity: PlayerIdentity,
        session_name: String,
        result: SessionSearchResult,
        done: CompletionHandle<JoinResult>,
    },
    Start {
        session_name: String,
        done: CompletionHandle<bool>,
    },
    Destroy {
        session_name: String,
        done: CompletionHandle<bool>,
    },
}

/// LAN provider backed by a [`LanDirectory`].
pub struct LanBackend {
    directory: LanDirectory,
    owner_name: String,
    address: String,
    sessions: HashMap<String, LocalSession>,
    queue: VecDeque<LanRequest>,
}

impl LanBackend {
    /// Create a provider for a player reachable at `address`.
    pub fn new(directory: LanDirectory, owner_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            directory,
            owner_name: owner_name.into(),
            address: address.into(),
            sessions: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn directory(&self) -> &LanDirectory {
        &self.directory
    }

    /// Count requests waiting for the next poll.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn hosted_ids(&self) -> Vec<String> {
        self.sessions
            .values()
            .filter(|s| s.named.hosting)
            .map(|s| s.named.session_id.clone())
            .collect()
    }

    fn process(&mut self, request: LanRequest) {
        match request {
            LanRequest::Create {
                identity,
                session_name,
                settings,
                done,
            } => {
                if self.sessions.contains_key(&session_name) {
                    done.complete(false);
                    return;
                }
                let session_id = self.directory.publish(
                    &identity,
                    &self.owner_name,
                    &self.address,
                    settings.advertised(),
                );
                tracing::info!("LAN: Hosting {} as {} at {}", session_name, session_id, self.address);
                self.sessions.insert(
                    session_name.clone(),
                    LocalSession {
                        named: NamedSession {
                            name: session_name,
                            session_id,
                            settings,
                            state: NamedSessionState::Pending,
                            hosting: true,
                            created_at: Utc::now(),
                        },
                        member: identity,
                        connect_address: self.address.clone(),
                    },
                );
                done.complete(true);
            }

            LanRequest::Find {
                identity,
                search,
                done,
            } => {
                let results = self.directory.search(&search, &self.hosted_ids());
                tracing::debug!("LAN: {} found {} sessions", identity, results.len());
                done.complete(SearchOutcome {
                    results,
                    success: true,
                });
            }

            LanRequest::Join {
                identity,
                session_name,
                result,
                done,
            } => {
                if self.sessions.contains_key(&session_name) {
                    done.complete(JoinResult::AlreadyInSession);
                    return;
                }
                match self.directory.reserve_slot(&result.session_id, &identity) {
                    Ok(address) => {
                        tracing::info!("LAN: {} joined {} at {}", identity, result.session_id, address);
                        self.sessions.insert(
                            session_name.clone(),
                            LocalSession {
                                named: NamedSession {
                                    name: session_name,
                                    session_id: result.session_id,
                                    settings: result.settings,
                                    state: NamedSessionState::Pending,
                                    hosting: false,
                                    created_at: Utc::now(),
                                },
                                member: identity,
                                connect_address: address,
                            },
                        );
                        done.complete(JoinResult::Success);
                    }
                    Err(code) => {
                        tracing::info!("LAN: {} could not join {}: {}", identity, result.session_id, code.as_str());
                        done.complete(code);
                    }
                }
            }

            LanRequest::Start { session_name, done } => match self.sessions.get_mut(&session_name) {
                Some(local) => {
                    local.named.state = NamedSessionState::InProgress;
                    if local.named.hosting {
                        self.directory
                            .set_state(&local.named.session_id, NamedSessionState::InProgress);
                    }
                    done.complete(true);
                }
                None => done.complete(false),
            },

            LanRequest::Destroy { session_name, done } => match self.sessions.remove(&session_name) {
                Some(local) => {
                    if local.named.hosting {
                        self.directory.unpublish(&local.named.session_id);
                    } else {
                        self.directory
                            .release_slot(&local.named.session_id, &local.member);
                    }
                    tracing::info!("LAN: Destroyed {}", session_name);
                    done.complete(true);
                }
                None => done.complete(false),
            },
        }
    }
}

impl SessionBackend for LanBackend {
    fn subsystem_name(&self) -> &str {
        NULL_SUBSYSTEM
    }

    fn create_session(
        &mut self,
        identity: &PlayerIdentity,
        session_name: &str,
        settings: &SessionSettings,
        done: CompletionHandle<bool>,
    ) -> Result<(), BackendError> {
        if self.sessions.contains_key(session_name) {
            return Err(BackendError::SessionExists(session_name.to_string()));
        }
        if settings.num_public_connections == 0 {
            return Err(BackendError::Rejected("no public connections".to_string()));
        }
        self.queue.push_back(LanRequest::Create {
            identity: identity.clone(),
            session_name: session_name.to_string(),
            settings: settings.clone(),
            done,
        });
        Ok(())
    }

    fn find_sessions(
        &mut self,
        identity: &PlayerIdentity,
        search: &SessionSearch,
        done: CompletionHandle<SearchOutcome>,
    ) -> Result<(), BackendError> {
        self.queue.push_back(LanRequest::Find {
            identity: identity.clone(),
            search: search.clone(),
            done,
        });
        Ok(())
    }

    fn join_session(
        &mut self,
        identity: &PlayerIdentity,
        session_name: &str,
        result: &SessionSearchResult,
        done: CompletionHandle<JoinResult>,
    ) -> Result<(), BackendError> {
        self.queue.push_back(LanRequest::Join {
            identity: identity.clone(),
            session_name: session_name.to_string(),
            result: result.clone(),
            done,
        });
        Ok(())
    }

    fn start_session(&mut self, session_name: &str, done: CompletionHandle<bool>) -> Result<(), BackendError> {
        if !self.sessions.contains_key(session_name) {
            return Err(BackendError::SessionNotFound(session_name.to_string()));
        }
        self.queue.push_back(LanRequest::Start {
            session_name: session_name.to_string(),
            done,
        });
        Ok(())
    }

    fn destroy_session(&mut self, session_name: &str, done: CompletionHandle<bool>) -> Result<(), BackendError> {
        let local = self
            .sessions
            .get_mut(session_name)
            .ok_or_else(|| BackendError::SessionNotFound(session_name.to_string()))?;
        if local.named.state == NamedSessionState::Destroying {
            return Err(BackendError::Rejected(format!("{} is already being destroyed", session_name)));
        }
        local.named.state = NamedSessionState::Destroying;
        self.queue.push_back(LanRequest::Destroy {
            session_name: session_name.to_string(),
            done,
        });
        Ok(())
    }

    fn named_session(&self, session_name: &str) -> Option<NamedSession> {
        self.sessions.get(session_name).map(|s| s.named.clone())
    }

    fn resolve_connect_string(&self, session_name: &str) -> Result<String, BackendError> {
        self.sessions
            .get(session_name)
            .map(|s| s.connect_address.clone())
            .ok_or_else(|| BackendError::SessionNotFound(session_name.to_string()))
    }

    fn poll(&mut self) {
        let queued = std::mem::take(&mut self.queue);
        for request in queued {
            self.process(request);
        }
    }
}
