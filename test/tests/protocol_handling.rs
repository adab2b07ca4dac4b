//! Drives one real net instance against a hand-written peer on the same
//! in-process transport, checking what goes over the wire.

use std::{net::SocketAddr, sync::Arc};

use dawn_engine::{
    events::{
        DisconnectedFromServerEvent, EventSystem, ServerClientConnectedEvent,
        ServerClientDisconnectedEvent,
    },
    net::{CNetData, CNetTransform, NetInstance, NetState},
    transport::{LocalTransport, PacketReceiver, PacketSender, Transport},
    Context, EngineConfig, NetConfig,
};
use dawn_shared::{
    math::{Quat, Vec3},
    messages::{pack_messages, read_packet, ClientMessage, ServerMessage},
    BitWriter, ClientId, EntityId, IdSpace, NetRole, SceneManager, Serde,
};
use dawn_test::{CShipControls, ShooterPipeline, NOTIFY_HIT, SHIP, TOGGLE_WEAPON};

const DT: f32 = 1.0 / 60.0;

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init()
        .ok();
}

fn address(text: &str) -> SocketAddr {
    text.parse().unwrap()
}

struct FakePeer {
    sender: Box<dyn PacketSender>,
    receiver: Box<dyn PacketReceiver>,
    protocol_id: u32,
}

impl FakePeer {
    fn new((sender, receiver): (Box<dyn PacketSender>, Box<dyn PacketReceiver>)) -> Self {
        Self {
            sender,
            receiver,
            protocol_id: NetConfig::default().protocol_id,
        }
    }

    fn send<M: Serde>(&self, to: SocketAddr, messages: Vec<M>) {
        for packet in pack_messages(self.protocol_id, 1200, messages) {
            self.sender.send(&to, &packet).unwrap();
        }
    }

    fn send_garbage(&self, to: SocketAddr, count: usize) {
        for _ in 0..count {
            for packet in pack_messages(0xBAD, 1200, vec![ClientMessage::Heartbeat]) {
                self.sender.send(&to, &packet).unwrap();
            }
        }
    }

    fn receive<M: Serde>(&mut self) -> Vec<(SocketAddr, M)> {
        let mut received = Vec::new();
        while let Some((from, payload)) = self.receiver.receive().unwrap() {
            for message in read_packet::<M>(self.protocol_id, payload).unwrap() {
                received.push((from, message));
            }
        }
        received
    }
}

fn messages<M>(received: Vec<(SocketAddr, M)>) -> Vec<M> {
    received.into_iter().map(|(_, message)| message).collect()
}

fn context(transport: &LocalTransport) -> Context {
    Context::new(EngineConfig::default(), Arc::new(transport.clone()))
}

#[test]
fn client_applies_server_messages() {
    init_logging();
    let transport = LocalTransport::new();
    let mut server = FakePeer::new(transport.listen(address("0.0.0.0:9000")).unwrap());
    let mut client = NetInstance::connect(&context(&transport), "127.0.0.1", 9000).unwrap();
    client.set_entity_pipeline(ShooterPipeline::new());
    let mut scene = SceneManager::with_id_space(IdSpace::Local);
    let mut events = EventSystem::new();

    // handshake
    client.update(DT, &mut scene, &mut events);
    let received = server.receive::<ClientMessage>();
    assert_eq!(received.len(), 1);
    let (client_address, message) = received[0].clone();
    assert_eq!(message, ClientMessage::Connect);
    server.send(
        client_address,
        vec![ServerMessage::ConnectAccept {
            client: ClientId::new(7),
        }],
    );
    client.update(DT, &mut scene, &mut events);
    assert_eq!(client.state(), NetState::Connected);
    assert_eq!(client.local_client(), Some(ClientId::new(7)));

    // authoritative copy of a ship
    let pipeline = ShooterPipeline::new();
    let layout = pipeline.ship_layout().clone();
    let mut source = SceneManager::new();
    let ship = source.create_entity(SHIP);
    source
        .insert_component(ship, CNetTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY))
        .unwrap();
    source.insert_component(ship, CShipControls::default()).unwrap();
    let mut state = BitWriter::new();
    layout
        .write_full(source.entity(ship).unwrap(), &mut state)
        .unwrap();

    server.send(
        client_address,
        vec![ServerMessage::EntitySpawn {
            entity: ship,
            entity_type: SHIP,
            role: NetRole::SimulatedProxy,
            fingerprint: layout.fingerprint(),
            state: state.to_vec(),
        }],
    );
    client.update(DT, &mut scene, &mut events);
    assert_eq!(
        scene.component::<CNetTransform>(ship),
        source.component::<CNetTransform>(ship)
    );
    assert_eq!(
        scene.component::<CNetData>(ship).map(CNetData::role),
        Some(NetRole::SimulatedProxy)
    );
    assert!(messages(server.receive::<ClientMessage>())
        .contains(&ClientMessage::SpawnAck { entity: ship }));

    // a newer update followed by an older one
    let baseline = layout.snapshot(source.entity(ship).unwrap()).unwrap();
    let mut write_position = |position: Vec3| {
        source
            .component_mut::<CNetTransform>(ship)
            .unwrap()
            .position = position;
        let mut delta = BitWriter::new();
        layout
            .write_delta(source.entity(ship).unwrap(), Some(&baseline), &mut delta)
            .unwrap();
        delta.to_vec()
    };
    let newer = write_position(Vec3::new(5.0, 0.0, 0.0));
    let older = write_position(Vec3::new(-5.0, 0.0, 0.0));
    server.send(
        client_address,
        vec![
            ServerMessage::EntityUpdate {
                entity: ship,
                sequence: 3,
                delta: newer,
            },
            ServerMessage::EntityUpdate {
                entity: ship,
                sequence: 2,
                delta: older,
            },
        ],
    );
    client.update(DT, &mut scene, &mut events);
    assert_eq!(
        scene.component::<CNetTransform>(ship).unwrap().position,
        Vec3::new(5.0, 0.0, 0.0)
    );
    let acks: Vec<ClientMessage> = messages(server.receive::<ClientMessage>())
        .into_iter()
        .filter(|message| matches!(message, ClientMessage::UpdateAck { .. }))
        .collect();
    assert_eq!(
        acks,
        vec![ClientMessage::UpdateAck {
            entity: ship,
            sequence: 3
        }]
    );

    // spawns that must be refused
    let mismatched = EntityId::from_raw(50);
    let authority = EntityId::from_raw(51);
    let local = EntityId::from_raw(EntityId::LOCAL_BIT | 52);
    let spawn = |entity, role, fingerprint| ServerMessage::EntitySpawn {
        entity,
        entity_type: SHIP,
        role,
        fingerprint,
        state: state_bytes(&layout, &source, ship),
    };
    server.send(
        client_address,
        vec![
            spawn(mismatched, NetRole::SimulatedProxy, layout.fingerprint() ^ 1),
            spawn(authority, NetRole::Authority, layout.fingerprint()),
            spawn(local, NetRole::SimulatedProxy, layout.fingerprint()),
        ],
    );
    client.update(DT, &mut scene, &mut events);
    for refused in [mismatched, authority, local] {
        assert!(!scene.contains(refused));
    }
    assert!(!messages(server.receive::<ClientMessage>())
        .iter()
        .any(|message| matches!(message, ClientMessage::SpawnAck { .. })));
    assert_eq!(scene.len(), 1);

    // destroy, then a late duplicate spawn
    server.send(
        client_address,
        vec![ServerMessage::EntityDestroy { entity: ship }],
    );
    client.update(DT, &mut scene, &mut events);
    assert!(!scene.contains(ship));
    assert!(messages(server.receive::<ClientMessage>())
        .contains(&ClientMessage::DestroyAck { entity: ship }));
    server.send(
        client_address,
        vec![spawn(ship, NetRole::SimulatedProxy, layout.fingerprint())],
    );
    client.update(DT, &mut scene, &mut events);
    assert!(!scene.contains(ship));

    // an RPC that was in flight when the ship died is not an error
    server.send(
        client_address,
        vec![ServerMessage::Rpc {
            entity: ship,
            index: 0,
            args: Vec::new(),
        }],
    );
    client.update(DT, &mut scene, &mut events);

    // three protocol errors so far, the limit is sixteen
    server.send_garbage(client_address, 12);
    client.update(DT, &mut scene, &mut events);
    assert_eq!(client.state(), NetState::Connected);
    server.send_garbage(client_address, 1);
    client.update(DT, &mut scene, &mut events);
    assert_eq!(client.state(), NetState::Disconnected);
    assert!(events.has_pending::<DisconnectedFromServerEvent>());
    assert!(messages(server.receive::<ClientMessage>()).contains(&ClientMessage::Disconnect));
}

fn state_bytes(
    layout: &dawn_shared::RepLayout,
    scene: &SceneManager,
    entity: EntityId,
) -> Vec<u8> {
    let mut writer = BitWriter::new();
    layout
        .write_full(scene.entity(entity).unwrap(), &mut writer)
        .unwrap();
    writer.to_vec()
}

fn rpc_args<A: Serde>(args: A) -> Vec<u8> {
    let mut writer = BitWriter::new();
    args.ser(&mut writer);
    writer.to_vec()
}

#[test]
fn server_checks_client_messages() {
    init_logging();
    let transport = LocalTransport::new();
    let mut server = NetInstance::listen(&context(&transport), "0.0.0.0", 9000, 4).unwrap();
    server.set_entity_pipeline(ShooterPipeline::new());
    let mut scene = SceneManager::new();
    let mut events = EventSystem::new();
    let mut peer = FakePeer::new(transport.connect(address("127.0.0.1:9000")).unwrap());
    let server_address = address("127.0.0.1:9000");

    peer.send(server_address, vec![ClientMessage::Connect]);
    server.update(DT, &mut scene, &mut events);
    let client = events
        .pending::<ServerClientConnectedEvent>()
        .next()
        .map(|event| event.client)
        .unwrap();
    assert!(messages(peer.receive::<ServerMessage>())
        .contains(&ServerMessage::ConnectAccept { client }));

    let unowned = server.spawn_entity(&mut scene, SHIP, None).unwrap();
    let owned = server.spawn_entity(&mut scene, SHIP, Some(client)).unwrap();
    server.update(DT, &mut scene, &mut events);
    let spawned: Vec<EntityId> = messages(peer.receive::<ServerMessage>())
        .into_iter()
        .filter_map(|message| match message {
            ServerMessage::EntitySpawn { entity, role, .. } => {
                let expected = if entity == owned {
                    NetRole::AuthoritativeProxy
                } else {
                    NetRole::SimulatedProxy
                };
                assert_eq!(role, expected);
                Some(entity)
            }
            _ => None,
        })
        .collect();
    assert_eq!(spawned.len(), 2);
    peer.send(
        server_address,
        spawned
            .iter()
            .map(|entity| ClientMessage::SpawnAck { entity: *entity })
            .collect(),
    );
    server.update(DT, &mut scene, &mut events);
    assert!(server.is_spawned_for(client, owned));

    let layout = ShooterPipeline::new().ship_layout().clone();
    let toggle = layout
        .rpc_index::<CShipControls, bool>(TOGGLE_WEAPON.name())
        .unwrap() as u16;
    let notify = layout
        .rpc_index::<CShipControls, u32>(NOTIFY_HIT.name())
        .unwrap() as u16;
    peer.send(
        server_address,
        vec![
            ClientMessage::Rpc {
                entity: unowned,
                index: toggle,
                args: rpc_args(true),
            },
            ClientMessage::Rpc {
                entity: owned,
                index: notify,
                args: rpc_args(4u32),
            },
            ClientMessage::Rpc {
                entity: owned,
                index: toggle,
                args: rpc_args(true),
            },
        ],
    );
    server.update(DT, &mut scene, &mut events);
    let controls = |entity| scene.component::<CShipControls>(entity).unwrap().clone();
    assert!(!controls(unowned).firing_weapon);
    assert!(controls(owned).firing_weapon);
    assert_eq!(controls(owned).hits_taken, 0);

    // an RPC sent before the client heard of the destroy is dropped quietly
    assert!(server.destroy_entity(&mut scene, unowned));
    server.update(DT, &mut scene, &mut events);
    assert!(messages(peer.receive::<ServerMessage>())
        .contains(&ServerMessage::EntityDestroy { entity: unowned }));
    peer.send(
        server_address,
        vec![ClientMessage::Rpc {
            entity: unowned,
            index: toggle,
            args: rpc_args(true),
        }],
    );
    server.update(DT, &mut scene, &mut events);

    // two protocol errors so far
    peer.send_garbage(server_address, 13);
    server.update(DT, &mut scene, &mut events);
    assert_eq!(server.client_count(), 1);
    peer.send_garbage(server_address, 1);
    server.update(DT, &mut scene, &mut events);
    assert!(events
        .pending::<ServerClientDisconnectedEvent>()
        .any(|event| event.client == client));
    assert_eq!(server.client_count(), 0);
    assert!(messages(peer.receive::<ServerMessage>()).contains(&ServerMessage::Disconnect));
    assert_eq!(
        scene.component::<CNetData>(owned).and_then(CNetData::owner),
        None
    );
}
