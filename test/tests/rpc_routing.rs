use dawn_engine::net::CNetData;
use dawn_shared::{
    math::Vec3, ClientId, EntityId, EntityType, NetRole, RpcDirection, RpcError,
};
use dawn_test::{
    CShipControls, RecordingHooks, TestNetwork, FIRE_AT, NOTIFY_HIT, SET_LINEAR_VELOCITY, SHIP,
    TOGGLE_WEAPON,
};

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

fn ship_owned_by(network: &TestNetwork, client: ClientId) -> Option<EntityId> {
    network.server.scene().iter().find_map(|entity| {
        let net_data = entity.component::<CNetData>()?;
        (entity.entity_type() == SHIP && net_data.owner() == Some(client)).then(|| entity.id())
    })
}

/// Two connected clients, each with a ship every client has acknowledged
fn network_with_ships() -> (TestNetwork, [ClientId; 2], [EntityId; 2]) {
    let mut network = TestNetwork::new(4, RecordingHooks::spawning_ships());
    network.add_client();
    network.add_client();
    assert!(network.connect_all());
    let clients = [
        network.client_net(0).local_client().unwrap(),
        network.client_net(1).local_client().unwrap(),
    ];
    assert!(network.step_until(120, |network| {
        clients.iter().all(|owner| {
            ship_owned_by(network, *owner).is_some_and(|ship| {
                clients
                    .iter()
                    .all(|client| network.server_net().is_spawned_for(*client, ship))
            })
        })
    }));
    let ships = [
        ship_owned_by(&network, clients[0]).unwrap(),
        ship_owned_by(&network, clients[1]).unwrap(),
    ];
    (network, clients, ships)
}

fn server_controls(network: &TestNetwork, ship: EntityId) -> CShipControls {
    network
        .server
        .scene()
        .component::<CShipControls>(ship)
        .unwrap()
        .clone()
}

#[test]
fn owner_sends_server_rpc() {
    init_logging();
    let (mut network, _, ships) = network_with_ships();

    let (scene, net) = network.clients[0].scene_and_net();
    net.unwrap()
        .call_rpc(scene, ships[0], &TOGGLE_WEAPON, &true)
        .unwrap();
    let (scene, net) = network.clients[0].scene_and_net();
    net.unwrap()
        .call_rpc(scene, ships[0], &SET_LINEAR_VELOCITY, &Vec3::new(0.0, 0.0, 100.0))
        .unwrap();

    assert!(network.step_until(30, |network| {
        let controls = server_controls(network, ships[0]);
        controls.firing_weapon && controls.target_linear_velocity == Vec3::new(0.0, 0.0, 100.0)
    }));
    // and the change comes back to every client through replication
    assert!(network.step_until(30, |network| {
        (0..2).all(|index| {
            network.clients[index]
                .scene()
                .component::<CShipControls>(ships[0])
                .is_some_and(|controls| controls.firing_weapon)
        })
    }));
}

#[test]
fn proxies_cannot_call_rpcs_they_dont_own() {
    init_logging();
    let (mut network, _, ships) = network_with_ships();

    let (scene, net) = network.clients[0].scene_and_net();
    let net = net.unwrap();
    assert_eq!(
        net.call_rpc(scene, ships[1], &SET_LINEAR_VELOCITY, &Vec3::UNIT_Z),
        Err(RpcError::NotPermitted {
            name: "set_linear_velocity",
            direction: RpcDirection::Server,
            role: Some(NetRole::SimulatedProxy),
        })
    );
    assert_eq!(
        net.call_rpc(scene, ships[0], &NOTIFY_HIT, &1),
        Err(RpcError::NotPermitted {
            name: "notify_hit",
            direction: RpcDirection::Client,
            role: Some(NetRole::AuthoritativeProxy),
        })
    );
    assert_eq!(
        net.call_rpc(scene, ships[0], &FIRE_AT, &Vec3::ZERO),
        Err(RpcError::UnknownRpc {
            component: "CShipControls",
            name: "fire_at",
        })
    );
    let missing = EntityId::from_raw(9999);
    assert_eq!(
        net.call_rpc(scene, missing, &TOGGLE_WEAPON, &true),
        Err(RpcError::UnknownEntity { entity: missing })
    );
}

#[test]
fn server_rpc_on_authority_runs_immediately() {
    init_logging();
    let (mut network, _, ships) = network_with_ships();

    let (scene, net) = network.server.scene_and_net();
    net.unwrap()
        .call_rpc(scene, ships[1], &TOGGLE_WEAPON, &true)
        .unwrap();
    assert!(server_controls(&network, ships[1]).firing_weapon);
}

#[test]
fn client_rpc_reaches_every_client() {
    init_logging();
    let (mut network, _, ships) = network_with_ships();

    let (scene, net) = network.server.scene_and_net();
    net.unwrap().call_rpc(scene, ships[0], &NOTIFY_HIT, &3).unwrap();
    assert!(network.step_until(30, |network| {
        (0..2).all(|index| {
            network.clients[index]
                .scene()
                .component::<CShipControls>(ships[0])
                .is_some_and(|controls| controls.hits_taken == 3)
        })
    }));
    assert_eq!(server_controls(&network, ships[0]).hits_taken, 0);
}

#[test]
fn entities_without_net_data_run_rpcs_locally() {
    init_logging();
    let (mut network, _, _) = network_with_ships();

    let (scene, net) = network.clients[0].scene_and_net();
    let local = scene.create_entity(EntityType::from_name("Drone"));
    scene
        .insert_component(local, CShipControls::default())
        .unwrap();
    net.unwrap()
        .call_rpc(scene, local, &TOGGLE_WEAPON, &true)
        .unwrap();
    assert!(
        scene
            .component::<CShipControls>(local)
            .unwrap()
            .firing_weapon
    );
}
