//! Host and client matchmaking over one LAN directory.

use matchmaking_sessions::session::{
    FlowSetup, JoinResult, LanBackend, LanDirectory, MatchType, MatchmakingFlow,
    NamedSessionState, OperationKind, OrchestratorConfig, PlayerIdentity, SessionError,
    SessionEvent, SessionOrchestrator, StartBehavior, TravelRequest,
};
use pretty_assertions::assert_eq;

const HOST_ADDRESS: &str = "192.168.1.10:7777";

fn orchestrator(directory: &LanDirectory, name: &str, address: &str) -> SessionOrchestrator {
    SessionOrchestrator::new(OrchestratorConfig::default())
        .with_backend(LanBackend::new(directory.clone(), name, address))
        .with_identity(PlayerIdentity(name.to_lowercase()))
}

#[test]
fn test_host_and_client_full_lifecycle() {
    let directory = LanDirectory::new();
    let mut host = orchestrator(&directory, "Alice", HOST_ADDRESS);
    let mut client = orchestrator(&directory, "Bob", "192.168.1.11:7777");

    let mut host_flow = MatchmakingFlow::setup(&mut host, FlowSetup::default());
    let mut client_flow = MatchmakingFlow::setup(&mut client, FlowSetup::default());

    // Host
    host_flow.host_pressed(&mut host);
    host.poll();
    assert_eq!(
        host_flow.process_events(&mut host),
        vec![TravelRequest::Server {
            url: "/Game/Maps/Lobby?listen".to_string()
        }]
    );
    assert_eq!(directory.count(), 1);

    // Client finds, matches and joins
    client_flow.join_pressed(&mut client);
    client.poll();
    assert!(client_flow.process_events(&mut client).is_empty());
    assert!(client.is_pending(OperationKind::Join));

    client.poll();
    assert_eq!(
        client_flow.process_events(&mut client),
        vec![TravelRequest::Client {
            address: HOST_ADDRESS.to_string()
        }]
    );
    let joined = client.existing_session().unwrap();
    assert!(!joined.hosting);
    assert_eq!(directory.open_slots(&joined.session_id), Some(2));

    // Host starts the match
    host.start_session().unwrap();
    host.poll();
    assert_eq!(
        host_flow.process_events(&mut host),
        vec![TravelRequest::Server {
            url: "/Game/Maps/Game".to_string()
        }]
    );
    assert_eq!(
        host.existing_session().unwrap().state,
        NamedSessionState::InProgress
    );

    // Tear down
    let host_events = host.subscribe();
    host.destroy_session().unwrap();
    host.poll();
    assert_eq!(
        host_events.drain(),
        vec![SessionEvent::DestroySessionComplete { success: true }]
    );
    assert!(host.existing_session().is_none());
    assert_eq!(directory.count(), 0);
}

#[test]
fn test_host_again_recreates_session() {
    let directory = LanDirectory::new();
    let mut host = orchestrator(&directory, "Alice", HOST_ADDRESS);
    let events = host.subscribe();

    host.create_session(4, MatchType::FreeForAll).unwrap();
    host.poll();
    let first = host.existing_session().unwrap();
    events.drain();

    host.create_session(2, MatchType::CaptureTheFlag).unwrap();
    assert!(host.pending_recreate().is_some());

    // Destroy completes first, the recreate is issued after it
    host.poll();
    assert_eq!(
        events.drain(),
        vec![SessionEvent::DestroySessionComplete { success: true }]
    );
    assert!(host.is_pending(OperationKind::Create));

    host.poll();
    assert_eq!(
        events.drain(),
        vec![SessionEvent::CreateSessionComplete { success: true }]
    );

    let second = host.existing_session().unwrap();
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(second.settings.num_public_connections, 2);
    assert_eq!(second.settings.match_type_tag(), Some("Capture the Flag"));
    assert_eq!(directory.count(), 1);
    assert_eq!(host.pending_count(), 0);
}

#[test]
fn test_full_session_rejects_late_joiner() {
    let directory = LanDirectory::new();
    let mut host = orchestrator(&directory, "Alice", HOST_ADDRESS);
    host.create_session(2, MatchType::FreeForAll).unwrap();
    host.poll();

    let mut bob = orchestrator(&directory, "Bob", "192.168.1.11:7777");
    let mut carol = orchestrator(&directory, "Carol", "192.168.1.12:7777");

    let bob_events = bob.subscribe();
    bob.find_sessions(10).unwrap();
    bob.poll();
    let result = match bob_events.try_next() {
        Some(SessionEvent::FindSessionsComplete { results, .. }) => results[0].clone(),
        other => panic!("unexpected {:?}", other),
    };

    bob.join_session(&result).unwrap();
    bob.poll();
    assert_eq!(
        bob_events.drain(),
        vec![
            SessionEvent::ConnectAddressResolved {
                address: HOST_ADDRESS.to_string()
            },
            SessionEvent::JoinSessionComplete {
                result: JoinResult::Success
            },
        ]
    );

    let carol_events = carol.subscribe();
    carol.join_session(&result).unwrap();
    carol.poll();
    assert_eq!(
        carol_events.drain(),
        vec![SessionEvent::JoinSessionComplete {
            result: JoinResult::SessionIsFull
        }]
    );
}

#[test]
fn test_match_type_filters_sessions() {
    let directory = LanDirectory::new();
    let mut ctf_host = orchestrator(&directory, "Alice", HOST_ADDRESS);
    ctf_host.create_session(4, MatchType::CaptureTheFlag).unwrap();
    ctf_host.poll();

    let mut client = orchestrator(&directory, "Bob", "192.168.1.11:7777");
    let setup = FlowSetup {
        match_type: MatchType::CaptureTheFlag,
        ..FlowSetup::default()
    };
    let mut flow = MatchmakingFlow::setup(&mut client, setup);

    flow.join_pressed(&mut client);
    client.poll();
    flow.process_events(&mut client);
    client.poll();
    assert_eq!(
        flow.process_events(&mut client),
        vec![TravelRequest::Client {
            address: HOST_ADDRESS.to_string()
        }]
    );
}

#[test]
fn test_host_again_while_destroying_start_is_refused() {
    let directory = LanDirectory::new();
    let config = OrchestratorConfig {
        start_behavior: StartBehavior::Destroy,
        ..OrchestratorConfig::default()
    };
    let mut host = SessionOrchestrator::new(config)
        .with_backend(LanBackend::new(directory.clone(), "Alice", HOST_ADDRESS))
        .with_identity(PlayerIdentity("alice".to_string()));
    let events = host.subscribe();

    host.create_session(4, MatchType::FreeForAll).unwrap();
    host.poll();
    events.drain();

    host.start_session().unwrap();
    assert_eq!(
        host.create_session(2, MatchType::CaptureTheFlag),
        Err(SessionError::RequestPending(OperationKind::Start))
    );

    host.poll();
    assert_eq!(
        events.drain(),
        vec![SessionEvent::StartSessionComplete { success: true }]
    );
    assert!(host.existing_session().is_none());

    // The session is gone, so hosting again creates directly
    host.create_session(2, MatchType::CaptureTheFlag).unwrap();
    host.poll();
    assert_eq!(
        events.drain(),
        vec![SessionEvent::CreateSessionComplete { success: true }]
    );
    assert_eq!(directory.count(), 1);
    assert_eq!(
        host.existing_session().unwrap().settings.match_type_tag(),
        Some("Capture the Flag")
    );
}
