//! Session advertisement, search and discovery types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::match_type::{MatchType, MATCH_TYPE_KEY};

/// Name the LAN / peer-to-peer provider identifies itself with.
pub const NULL_SUBSYSTEM: &str = "NULL";

/// Whether a session is LAN-only or routed through an online service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locality {
    Lan,
    Online,
}

impl Locality {
    /// Derive locality from the active provider's name.
    pub fn from_subsystem(name: &str) -> Self {
        if name == NULL_SUBSYSTEM {
            Self::Lan
        } else {
            Self::Online
        }
    }

    pub fn is_lan(&self) -> bool {
        matches!(self, Self::Lan)
    }
}

/// How an attribute is advertised to other players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Advertisement {
    /// Kept on the local session only
    DontAdvertise,
    /// Visible once a client pings the host
    ViaPingOnly,
    /// Published with the session and returned in searches
    #[default]
    ViaOnlineServiceAndPing,
}

/// An attribute attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAttribute {
    pub value: String,
    pub advertisement: Advertisement,
}

/// Settings for a session being created.
///
/// Built once per create request and reused verbatim if the create has to
/// wait for an existing session to be destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Public connection slots
    pub num_public_connections: u32,

    /// LAN vs online
    pub locality: Locality,

    /// Publish the session to searches
    pub should_advertise: bool,

    /// Session is visible through presence
    pub uses_presence: bool,

    /// Players may join through presence (friends list)
    pub allow_join_via_presence: bool,

    /// Players may join after the match started
    pub allow_join_in_progress: bool,

    /// Prefer provider lobbies when the provider has them
    pub use_lobbies_if_available: bool,

    /// Build id advertised with the session. Searches do not filter on it
    pub build_unique_id: u32,

    attributes: BTreeMap<String, SessionAttribute>,
}

impl SessionSettings {
    /// Settings with all advertisement flags enabled.
    pub fn new(num_public_connections: u32, locality: Locality) -> Self {
        Self {
            num_public_connections,
            locality,
            should_advertise: true,
            uses_presence: true,
            allow_join_via_presence: true,
            allow_join_in_progress: true,
            use_lobbies_if_available: true,
            build_unique_id: 1,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>, advertisement: Advertisement) {
        self.attributes.insert(
            key.into(),
            SessionAttribute {
                value: value.into(),
                advertisement,
            },
        );
    }

    /// Get an attribute value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|a| a.value.as_str())
    }

    /// Advertise a match type.
    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.set(
            MATCH_TYPE_KEY,
            match_type.display_name(),
            Advertisement::ViaOnlineServiceAndPing,
        );
        self
    }

    /// Advertised match-type tag, if any.
    pub fn match_type_tag(&self) -> Option<&str> {
        self.get(MATCH_TYPE_KEY)
    }

    /// Copy of these settings holding only the advertised attributes.
    pub fn advertised(&self) -> Self {
        let mut copy = self.clone();
        copy.attributes
            .retain(|_, a| a.advertisement == Advertisement::ViaOnlineServiceAndPing);
        copy
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &SessionAttribute)> {
        self.attributes.iter().map(|(k, a)| (k.as_str(), a))
    }
}

/// Parameters of a single find request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSearch {
    pub max_results: u32,
    pub locality: Locality,
    /// Only return sessions that are visible through presence
    pub presence_only: bool,
}

impl SessionSearch {
    pub fn new(max_results: u32, locality: Locality) -> Self {
        Self {
            max_results,
            locality,
            presence_only: true,
        }
    }

    /// Check whether an advertised session passes this search's filters.
    pub fn accepts(&self, settings: &SessionSettings) -> bool {
        settings.should_advertise
            && settings.locality == self.locality
            && (!self.presence_only || settings.uses_presence)
    }
}

/// A session found by a search.
///
/// Opaque to the orchestrator beyond its advertised attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSearchResult {
    /// Provider-assigned session id
    pub session_id: String,

    /// Display name of the hosting player
    pub owner_name: String,

    /// Advertised settings
    pub settings: SessionSettings,

    /// Open public slots at the time of the search
    pub open_public_connections: u32,

    /// Round-trip time to the host, if measured
    pub ping_ms: Option<u32>,
}

impl SessionSearchResult {
    /// Advertised match-type tag.
    pub fn match_type_tag(&self) -> Option<&str> {
        self.settings.match_type_tag()
    }

    /// Convert to JSON for a session browser.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": self.session_id,
            "owner": self.owner_name,
            "match_type": self.match_type_tag(),
            "open_slots": self.open_public_connections,
            "max_slots": self.settings.num_public_connections,
            "lan": self.settings.locality.is_lan(),
            "ping_ms": self.ping_ms
        })
    }
}

/// Lifecycle state of a named session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamedSessionState {
    /// Created, match not started yet
    #[default]
    Pending,
    /// Match in progress
    InProgress,
    /// Being torn down
    Destroying,
}

/// A session this process currently hosts or has joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSession {
    pub name: String,
    pub session_id: String,
    pub settings: SessionSettings,
    pub state: NamedSessionState,
    /// Whether this process is the host
    pub hosting: bool,
    pub created_at: DateTime<Utc>,
}
