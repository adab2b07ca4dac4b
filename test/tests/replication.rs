use dawn_engine::net::{CNetData, CNetTransform};
use dawn_shared::{
    math::{Colour, Quat, Vec3},
    ClientId, EntityId, NetRole,
};
use dawn_test::{
    CProjectile, CShipControls, CWeapon, RecordingHooks, TestNetwork, PROJECTILE, SHIP,
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

fn connected_network(clients: usize) -> TestNetwork {
    let mut network = TestNetwork::new(4, RecordingHooks::spawning_ships());
    for _ in 0..clients {
        network.add_client();
    }
    assert!(network.connect_all());
    network
}

#[test]
fn ship_replicates_to_owner_as_authoritative_proxy() {
    init_logging();
    let mut network = connected_network(1);
    let client = network.client_net(0).local_client().unwrap();
    assert!(network.step_until(10, |network| ship_owned_by(network, client).is_some()));
    let ship = ship_owned_by(&network, client).unwrap();

    {
        let scene = network.server.scene_mut();
        let transform = scene.component_mut::<CNetTransform>(ship).unwrap();
        transform.position = Vec3::new(10.0, -4.0, 2.5);
        transform.orientation = Quat::from_axis_angle(Vec3::UNIT_Z, 0.5);
        let controls = scene.component_mut::<CShipControls>(ship).unwrap();
        controls.target_linear_velocity = Vec3::new(0.0, 0.0, 100.0);
        controls.target_angular_velocity = Vec3::new(1.2, 0.0, 0.0);
        controls.firing_weapon = true;
    }

    assert!(network.step_until(60, |network| {
        let server = network.server.scene();
        let client = network.clients[0].scene();
        client.contains(ship)
            && client.component::<CNetTransform>(ship) == server.component::<CNetTransform>(ship)
            && client.component::<CShipControls>(ship) == server.component::<CShipControls>(ship)
    }));

    let client_scene = network.clients[0].scene();
    let net_data = client_scene.component::<CNetData>(ship).unwrap();
    assert_eq!(net_data.role(), NetRole::AuthoritativeProxy);
    assert_eq!(net_data.owner(), Some(client));
    assert!(client_scene.component::<CWeapon>(ship).is_none());
    assert!(network.server.scene().component::<CWeapon>(ship).is_some());
    assert!(network.client_net(0).is_replicated(ship));
    assert!(network.server_net().is_spawned_for(client, ship));
}

#[test]
fn other_clients_see_a_simulated_proxy() {
    init_logging();
    let mut network = connected_network(2);
    let first = network.client_net(0).local_client().unwrap();
    let second = network.client_net(1).local_client().unwrap();
    assert!(network.step_until(60, |network| {
        ship_owned_by(network, first).is_some_and(|ship| network.clients[1].scene().contains(ship))
            && ship_owned_by(network, second)
                .is_some_and(|ship| network.clients[0].scene().contains(ship))
    }));

    let first_ship = ship_owned_by(&network, first).unwrap();
    let role_on = |index: usize| {
        network.clients[index]
            .scene()
            .component::<CNetData>(first_ship)
            .map(CNetData::role)
    };
    assert_eq!(role_on(0), Some(NetRole::AuthoritativeProxy));
    assert_eq!(role_on(1), Some(NetRole::SimulatedProxy));
    assert_eq!(
        network.clients[1]
            .scene()
            .component::<CNetData>(first_ship)
            .and_then(CNetData::owner),
        None
    );
}

#[test]
fn destroy_reaches_clients() {
    init_logging();
    let mut network = connected_network(1);
    let client = network.client_net(0).local_client().unwrap();
    assert!(network.step_until(60, |network| {
        ship_owned_by(network, client).is_some_and(|ship| network.clients[0].scene().contains(ship))
    }));
    let ship = ship_owned_by(&network, client).unwrap();

    let (scene, net) = network.server.scene_and_net();
    assert!(net.unwrap().destroy_entity(scene, ship));
    assert!(network.step_until(60, |network| !network.clients[0].scene().contains(ship)));
    assert!(network.step_until(60, |network| network.server_net().replica_count(client) == 0));
    assert!(!network.client_net(0).is_replicated(ship));
}

#[test]
fn late_joiner_receives_existing_entities() {
    init_logging();
    let mut network = TestNetwork::new(4, RecordingHooks::default());
    network.step_n(2);

    let (scene, net) = network.server.scene_and_net();
    let projectile = net.unwrap().spawn_entity(scene, PROJECTILE, None).unwrap();
    let expected = CProjectile {
        kind: 2,
        position: Vec3::new(1.0, 2.0, 3.0),
        direction: Vec3::new(0.0, 1.0, 0.0),
        velocity: Vec3::new(0.0, 50.0, 0.0),
        colour: Colour::rgb(255, 64, 0),
    };
    *network
        .server
        .scene_mut()
        .component_mut::<CProjectile>(projectile)
        .unwrap() = expected.clone();

    network.add_client();
    assert!(network.connect_all());
    assert!(network.step_until(60, |network| {
        network.clients[0].scene().component::<CProjectile>(projectile) == Some(&expected)
    }));
    assert_eq!(
        network.clients[0]
            .scene()
            .component::<CNetData>(projectile)
            .map(CNetData::role),
        Some(NetRole::SimulatedProxy)
    );
}

#[test]
fn updates_follow_continuous_changes() {
    init_logging();
    let mut network = connected_network(1);
    let client = network.client_net(0).local_client().unwrap();
    assert!(network.step_until(60, |network| {
        ship_owned_by(network, client).is_some_and(|ship| network.clients[0].scene().contains(ship))
    }));
    let ship = ship_owned_by(&network, client).unwrap();

    for step in 0..30 {
        network
            .server
            .scene_mut()
            .component_mut::<CNetTransform>(ship)
            .unwrap()
            .position = Vec3::new(step as f32, 0.0, 0.0);
        network.step();
    }
    assert!(network.step_until(10, |network| {
        network.clients[0]
            .scene()
            .component::<CNetTransform>(ship)
            .map(|transform| transform.position)
            == Some(Vec3::new(29.0, 0.0, 0.0))
    }));
}

#[test]
fn spawning_requires_a_listening_server() {
    init_logging();
    let mut network = connected_network(1);
    let (scene, net) = network.clients[0].scene_and_net();
    assert!(net.unwrap().spawn_entity(scene, SHIP, None).is_err());
}
