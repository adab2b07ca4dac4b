use std::time::Duration;

use dawn_engine::{
    events::{ConnectFailure, ConnectionFailedEvent},
    net::NetState,
    session::{GameSession, GameSessionInfo},
    EngineConfig,
};
use dawn_shared::{messages::RejectReason, NetMode};
use dawn_test::{local_context, HookCall, RecordingHooks, TestNetwork, SERVER_PORT, SHIP};

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

#[test]
fn listen_and_connect() {
    init_logging();
    let mut network = TestNetwork::new(4, RecordingHooks::default());
    network.add_client();
    assert!(network.connect_all());

    assert_eq!(network.server_net().net_mode(), NetMode::Server);
    assert_eq!(network.server_net().state(), NetState::Listening);
    assert_eq!(network.client_net(0).net_mode(), NetMode::Client);
    assert_eq!(network.client_net(0).state(), NetState::Connected);

    let client = network.client_net(0).local_client().unwrap();
    assert_eq!(network.server_net().connected_clients(), vec![client]);
    assert!(network.step_until(10, |network| {
        network.server_hooks().count(HookCall::ClientConnected(client)) == 1
    }));
    assert_eq!(network.server_hooks().count(HookCall::ServerStart), 1);
    assert!(network.server_mode().running_as_server());
    assert_eq!(
        network.client_hooks(0).calls,
        vec![HookCall::JoinServer(client)]
    );
    assert!(!network.client_mode(0).running_as_server());
}

#[test]
fn server_full_rejects_connection() {
    init_logging();
    let mut network = TestNetwork::new(1, RecordingHooks::default());
    network.add_client();
    assert!(network.connect_all());
    network.add_client();

    assert!(network.step_until(60, |network| {
        network.client_net(1).state() == NetState::Disconnected
    }));
    let failures: Vec<_> = network.clients[1]
        .events()
        .pending::<ConnectionFailedEvent>()
        .cloned()
        .collect();
    assert_eq!(
        failures,
        vec![ConnectionFailedEvent {
            reason: ConnectFailure::Rejected(RejectReason::ServerFull)
        }]
    );
    assert_eq!(network.client_net(1).net_mode(), NetMode::None);
    assert_eq!(network.server_net().client_count(), 1);
    assert!(network.client_hooks(1).calls.is_empty());
}

#[test]
fn connect_times_out_without_server() {
    init_logging();
    let mut config = EngineConfig::default();
    config.net.connect_timeout = Duration::from_millis(200);
    let mut session = GameSession::new(
        local_context(config),
        GameSessionInfo::JoinNetGame {
            host: "127.0.0.1".to_string(),
            port: SERVER_PORT,
        },
    )
    .unwrap();

    for _ in 0..60 {
        session.update(1.0 / 60.0);
        if session.net().unwrap().state() == NetState::Disconnected {
            break;
        }
    }
    assert_eq!(session.net().unwrap().state(), NetState::Disconnected);
    assert!(session
        .events()
        .pending::<ConnectionFailedEvent>()
        .any(|event| event.reason == ConnectFailure::TimedOut));
}

#[test]
fn unexpected_client_disconnect_is_reported_once() {
    init_logging();
    let mut config = EngineConfig::default();
    config.net.heartbeat_interval = Duration::from_millis(100);
    config.net.disconnection_timeout = Duration::from_millis(500);
    let mut network = TestNetwork::with_config(config, 4, RecordingHooks::spawning_ships());
    network.add_client();
    assert!(network.connect_all());
    let client = network.client_net(0).local_client().unwrap();

    assert!(network.step_until(60, |network| {
        network.clients[0]
            .scene()
            .iter()
            .any(|entity| entity.entity_type() == SHIP)
    }));
    let ship = network
        .server
        .scene()
        .iter()
        .find(|entity| entity.entity_type() == SHIP)
        .map(|entity| entity.id())
        .unwrap();

    network.pause_client(0);
    assert!(network.step_until(120, |network| {
        network.server_hooks().count(HookCall::ClientDisconnected(client)) > 0
    }));
    network.step_n(60);

    assert_eq!(
        network.server_hooks().count(HookCall::ClientDisconnected(client)),
        1
    );
    assert_eq!(network.server_net().client_count(), 0);
    let net_data = network
        .server
        .scene()
        .component::<dawn_engine::net::CNetData>(ship)
        .unwrap();
    assert_eq!(net_data.owner(), None);
}

#[test]
fn graceful_client_disconnect() {
    init_logging();
    let mut network = TestNetwork::new(4, RecordingHooks::default());
    network.add_client();
    assert!(network.connect_all());
    let client = network.client_net(0).local_client().unwrap();

    network.clients[0].net_mut().unwrap().disconnect();
    assert_eq!(network.client_net(0).net_mode(), NetMode::None);
    assert!(network.step_until(10, |network| {
        network.server_hooks().count(HookCall::ClientDisconnected(client)) == 1
    }));
    assert_eq!(network.server_net().client_count(), 0);
}

#[test]
fn closing_the_server_ends_it_once() {
    init_logging();
    let mut network = TestNetwork::new(4, RecordingHooks::default());
    network.add_client();
    assert!(network.connect_all());
    assert!(network.server_mode().running_as_server());

    network.server.net_mut().unwrap().close();
    assert_eq!(network.server_net().net_mode(), NetMode::None);
    network.step_n(5);

    assert_eq!(network.server_hooks().count(HookCall::ServerEnd), 1);
    assert_eq!(network.server_hooks().count(HookCall::ServerStart), 1);
    assert!(!network.server_mode().running_as_server());

    assert!(network.step_until(10, |network| {
        network.client_net(0).state() == NetState::Disconnected
    }));
}
