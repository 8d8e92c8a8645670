//! Host/join matchmaking flow.
//!
//! Drives a [`SessionOrchestrator`] from two triggers and turns its events
//! into travel requests for the game layer.
//!
//! ```text
//!   host_pressed ──▶ create ──▶ CreateSessionComplete(true)  ──▶ Server(lobby?listen)
//!                               CreateSessionComplete(false) ──▶ host re-enabled
//!
//!   join_pressed ──▶ find ──▶ FindSessionsComplete ──▶ first match ──▶ join
//!                                                  └─▶ nothing      ──▶ join re-enabled
//!                             JoinSessionComplete(Success)  ──▶ Client(resolved address)
//!                             JoinSessionComplete(!Success) ──▶ join re-enabled
//!
//!   StartSessionComplete(true) ──▶ Server(game)
//! ```

use serde::{Deserialize, Serialize};

use super::events::{SessionEvent, Subscription};
use super::match_type::MatchType;
use super::matching::{self, MatchDecision};
use super::orchestrator::SessionOrchestrator;

/// Flow parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSetup {
    pub connections: u32,
    pub match_type: MatchType,
    pub lobby_path: String,
    pub game_path: String,
}

impl Default for FlowSetup {
    fn default() -> Self {
        Self {
            connections: 4,
            match_type: MatchType::FreeForAll,
            lobby_path: "/Game/Maps/Lobby".to_string(),
            game_path: "/Game/Maps/Game".to_string(),
        }
    }
}

/// Where the game layer should go next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TravelRequest {
    /// Load a map as the listen server
    Server { url: String },
    /// Connect to a host
    Client { address: String },
}

/// Matchmaking flow bound to one orchestrator subscription.
#[derive(Debug)]
pub struct MatchmakingFlow {
    connections: u32,
    match_type: MatchType,
    lobby_url: String,
    game_path: String,
    host_enabled: bool,
    join_enabled: bool,
    /// Address resolved for the join in flight
    resolved_address: Option<String>,
    subscription: Option<Subscription>,
}

impl MatchmakingFlow {
    /// Subscribe to `orchestrator` and enable both triggers.
    pub fn setup(orchestrator: &mut SessionOrchestrator, setup: FlowSetup) -> Self {
        let subscription = orchestrator.subscribe();
        tracing::debug!(
            "Flow: Setup with {} connections, {}, lobby {}",
            setup.connections,
            setup.match_type,
            setup.lobby_path
        );
        Self {
            connections: setup.connections,
            match_type: setup.match_type,
            lobby_url: format!("{}?listen", setup.lobby_path),
            game_path: setup.game_path,
            host_enabled: true,
            join_enabled: true,
            resolved_address: None,
            subscription: Some(subscription),
        }
    }

    pub fn host_enabled(&self) -> bool {
        self.host_enabled
    }

    pub fn join_enabled(&self) -> bool {
        self.join_enabled
    }

    pub fn lobby_url(&self) -> &str {
        &self.lobby_url
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    /// Host trigger. Disabled until the create fails.
    pub fn host_pressed(&mut self, orchestrator: &mut SessionOrchestrator) {
        if !self.host_enabled {
            return;
        }
        self.host_enabled = false;

        if let Err(err) = orchestrator.create_session(self.connections, self.match_type) {
            tracing::warn!("Flow: Host refused: {}", err);
            self.host_enabled = true;
        }
    }

    /// Join trigger. Disabled until the search or join fails.
    pub fn join_pressed(&mut self, orchestrator: &mut SessionOrchestrator) {
        if !self.join_enabled {
            return;
        }
        self.join_enabled = false;

        let max_results = orchestrator.config().default_max_search_results;
        if let Err(err) = orchestrator.find_sessions(max_results) {
            tracing::warn!("Flow: Join refused: {}", err);
            self.join_enabled = true;
        }
    }

    /// React to every event received since the last call.
    pub fn process_events(&mut self, orchestrator: &mut SessionOrchestrator) -> Vec<TravelRequest> {
        let events = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return Vec::new(),
        };

        let mut travel = Vec::new();
        for event in events {
            if let Some(request) = self.handle(orchestrator, event) {
                tracing::info!("Flow: Travel {:?}", request);
                travel.push(request);
            }
        }
        travel
    }

    fn handle(&mut self, orchestrator: &mut SessionOrchestrator, event: SessionEvent) -> Option<TravelRequest> {
        match event {
            SessionEvent::CreateSessionComplete { success: true } => Some(TravelRequest::Server {
                url: self.lobby_url.clone(),
            }),
            SessionEvent::CreateSessionComplete { success: false } => {
                self.host_enabled = true;
                None
            }
            SessionEvent::FindSessionsComplete { results, success } => {
                match matching::decide(&results, success, self.match_type) {
                    MatchDecision::Join(result) => {
                        if let Err(err) = orchestrator.join_session(&result) {
                            tracing::warn!("Flow: Join of {} refused: {}", result.session_id, err);
                            self.join_enabled = true;
                        }
                    }
                    MatchDecision::Retry => self.join_enabled = true,
                    MatchDecision::NoMatch => {
                        tracing::debug!("Flow: No {} session among {} results", self.match_type, results.len());
                    }
                }
                None
            }
            SessionEvent::ConnectAddressResolved { address } => {
                self.resolved_address = Some(address);
                None
            }
            SessionEvent::JoinSessionComplete { result } => {
                let address = self.resolved_address.take();
                if !result.is_success() {
                    self.join_enabled = true;
                    return None;
                }
                match address {
                    Some(address) => Some(TravelRequest::Client { address }),
                    None => {
                        tracing::warn!("Flow: Joined but no connect address was resolved");
                        self.join_enabled = true;
                        None
                    }
                }
            }
            SessionEvent::StartSessionComplete { success: true } => Some(TravelRequest::Server {
                url: self.game_path.clone(),
            }),
            SessionEvent::StartSessionComplete { success: false } => None,
            SessionEvent::DestroySessionComplete { .. } => None,
        }
    }

    /// Drop the subscription. Later events are no longer seen.
    pub fn teardown(&mut self, orchestrator: &mut SessionOrchestrator) {
        if let Some(subscription) = self.subscription.take() {
            orchestrator.unsubscribe(subscription.id());
        }
    }
}
