use std::{net::SocketAddr, sync::Arc, time::Duration};

use log::{info, trace, warn};

use dawn_shared::{
    BitWriter, ClientId, ComponentKind, EntityId, EntityType, NetMode, NetRole, RepError,
    Replicate, Rpc, RpcDirection, RpcError, SceneManager, Serde,
};

use crate::{
    config::NetConfig,
    context::Context,
    error::NetError,
    events::EventSystem,
    net::{
        client::{ClientPhase, ClientSide},
        pipeline::build_entity,
        server::ServerSide,
        CNetData, NetEntityPipeline, NetState, Tick,
    },
    transport::{resolve, Socket, Transport},
};

enum Side {
    Idle,
    Server(ServerSide),
    Client(ClientSide),
}

/// One participant of a networked session, either the server or a client.
///
/// All networking happens inside [`NetInstance::update`], which is called
/// once per simulation step with the scene it replicates.
pub struct NetInstance {
    config: NetConfig,
    transport: Arc<dyn Transport>,
    clock: Duration,
    state: NetState,
    socket: Option<Socket>,
    pipeline: Option<Box<dyn NetEntityPipeline>>,
    side: Side,
}

impl NetInstance {
    /// Creates an instance with no socket. Call `start_listening` or
    /// `start_connecting` to bring it up.
    pub fn new(ctx: &Context) -> Self {
        Self {
            config: ctx.config().net.clone(),
            transport: ctx.transport().clone(),
            clock: Duration::ZERO,
            state: NetState::Uninitialized,
            socket: None,
            pipeline: None,
            side: Side::Idle,
        }
    }

    /// Creates a server bound to `host:port`
    pub fn listen(ctx: &Context, host: &str, port: u16, max_clients: u16) -> Result<Self, NetError> {
        let mut instance = Self::new(ctx);
        instance.start_listening(host, port, max_clients)?;
        Ok(instance)
    }

    /// Creates a client and starts connecting to `host:port`
    pub fn connect(ctx: &Context, host: &str, port: u16) -> Result<Self, NetError> {
        let mut instance = Self::new(ctx);
        instance.start_connecting(host, port)?;
        Ok(instance)
    }

    fn require_state(&self, operation: &'static str, state: NetState) -> Result<(), NetError> {
        if self.state == state {
            Ok(())
        } else {
            Err(NetError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    pub fn start_listening(
        &mut self,
        host: &str,
        port: u16,
        max_clients: u16,
    ) -> Result<(), NetError> {
        self.require_state("listen", NetState::Uninitialized)?;
        let address = resolve(host, port)?;
        let socket = self.transport.listen(address)?;
        info!("listening on {} for up to {} clients", socket.0.local_addr(), max_clients);
        self.socket = Some(socket);
        self.side = Side::Server(ServerSide::new(max_clients));
        self.state = NetState::Listening;
        Ok(())
    }

    pub fn start_connecting(&mut self, host: &str, port: u16) -> Result<(), NetError> {
        self.require_state("connect", NetState::Uninitialized)?;
        let server = resolve(host, port)?;
        let socket = self.transport.connect(server)?;
        info!("connecting to {} from {}", server, socket.0.local_addr());
        self.socket = Some(socket);
        self.side = Side::Client(ClientSide::new(server, self.clock));
        self.state = NetState::Connecting;
        Ok(())
    }

    pub fn set_entity_pipeline<P: NetEntityPipeline + 'static>(&mut self, pipeline: P) {
        self.pipeline = Some(Box::new(pipeline));
    }

    pub fn state(&self) -> NetState {
        self.state
    }

    /// `Server` while listening, `Client` while connecting or connected,
    /// `None` otherwise
    pub fn net_mode(&self) -> NetMode {
        match self.state {
            NetState::Listening => NetMode::Server,
            NetState::Connecting | NetState::Connected => NetMode::Client,
            NetState::Uninitialized | NetState::Disconnected | NetState::Closed => NetMode::None,
        }
    }

    /// Id the server gave this client
    pub fn local_client(&self) -> Option<ClientId> {
        match &self.side {
            Side::Client(client) => client.client_id(),
            _ => None,
        }
    }

    pub fn connected_clients(&self) -> Vec<ClientId> {
        match &self.side {
            Side::Server(server) => server.client_ids(),
            _ => Vec::new(),
        }
    }

    pub fn client_count(&self) -> usize {
        match &self.side {
            Side::Server(server) => server.client_ids().len(),
            _ => 0,
        }
    }

    pub fn client_address(&self, client: ClientId) -> Option<SocketAddr> {
        match &self.side {
            Side::Server(server) => server.client_address(client),
            _ => None,
        }
    }

    /// True once `client` has acknowledged the spawn of `entity`
    pub fn is_spawned_for(&self, client: ClientId, entity: EntityId) -> bool {
        match &self.side {
            Side::Server(server) => server.has_spawned(client, entity),
            _ => false,
        }
    }

    /// Entities the server is tracking for `client`, spawned or not
    pub fn replica_count(&self, client: ClientId) -> usize {
        match &self.side {
            Side::Server(server) => server.replica_count(client),
            _ => 0,
        }
    }

    /// True if `entity` was materialized from the server
    pub fn is_replicated(&self, entity: EntityId) -> bool {
        match &self.side {
            Side::Client(client) => client.is_replicated(entity),
            _ => false,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().map(|(sender, _)| sender.local_addr())
    }

    /// Time accumulated through `update`
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Advances the net clock by `dt` seconds, handles everything received
    /// and sends whatever is due
    pub fn update(&mut self, dt: f32, scene: &mut SceneManager, events: &mut EventSystem) {
        if matches!(self.state, NetState::Uninitialized | NetState::Closed) {
            return;
        }
        self.clock += Duration::try_from_secs_f32(dt).unwrap_or(Duration::ZERO);

        let Some((sender, receiver)) = &mut self.socket else {
            return;
        };
        let side = &mut self.side;
        let mut tick = Tick {
            config: &self.config,
            now: self.clock,
            sender: &**sender,
            pipeline: self.pipeline.as_deref(),
            scene,
            events,
        };

        loop {
            match receiver.receive() {
                Ok(Some((from, payload))) => match side {
                    Side::Server(server) => server.receive(&mut tick, from, payload),
                    Side::Client(client) => client.receive(&mut tick, from, payload),
                    Side::Idle => {}
                },
                Ok(None) => break,
                Err(error) => {
                    warn!("receive failed: {}", error);
                    break;
                }
            }
        }

        let phase = match side {
            Side::Server(server) => {
                server.update(&mut tick);
                None
            }
            Side::Client(client) => {
                client.update(&mut tick);
                Some(client.phase())
            }
            Side::Idle => None,
        };
        if let Some(phase) = phase {
            self.state = match phase {
                ClientPhase::Connecting => NetState::Connecting,
                ClientPhase::Connected => NetState::Connected,
                ClientPhase::Disconnected => NetState::Disconnected,
            };
        }
    }

    /// Creates an `Authority` entity of `entity_type` through the pipeline.
    /// Only a listening server spawns networked entities.
    pub fn spawn_entity(
        &mut self,
        scene: &mut SceneManager,
        entity_type: EntityType,
        owner: Option<ClientId>,
    ) -> Result<EntityId, NetError> {
        self.require_state("spawn entities", NetState::Listening)?;
        let id = build_entity(
            self.pipeline.as_deref(),
            scene,
            None,
            entity_type,
            NetRole::Authority,
        )?;
        if let Some(net_data) = scene.component_mut::<CNetData>(id) {
            net_data.set_owner(owner);
        }
        trace!("spawned {} of type {} owned by {:?}", id, entity_type, owner);
        Ok(id)
    }

    /// Removes an entity; clients are told on the next update
    pub fn destroy_entity(&mut self, scene: &mut SceneManager, entity: EntityId) -> bool {
        scene.destroy_entity(entity).is_some()
    }

    /// Calls `rpc` on `entity`. Server RPCs run here when this participant
    /// has authority and go to the server from the owning client. Client
    /// RPCs go from the server to every client that has the entity.
    pub fn call_rpc<C: Replicate, A: Serde + 'static>(
        &mut self,
        scene: &mut SceneManager,
        entity: EntityId,
        rpc: &Rpc<C, A>,
        args: &A,
    ) -> Result<(), RpcError> {
        let target = scene
            .entity_mut(entity)
            .ok_or(RpcError::UnknownEntity { entity })?;
        let (layout, role) = match target.component::<CNetData>() {
            Some(net_data) => (net_data.layout().clone(), Some(net_data.role())),
            None => (Arc::new(C::rep_layout()), None),
        };
        let unknown = || RpcError::UnknownRpc {
            component: ComponentKind::of::<C>().name(),
            name: rpc.name(),
        };
        let index = layout.rpc_index::<C, A>(rpc.name()).ok_or_else(unknown)?;
        let direction = layout.rpc(index).ok_or_else(unknown)?.direction();
        let wire_index = u16::try_from(index).map_err(|_| RepError::UnknownRpcIndex {
            index: index as u64,
            count: layout.rpcs().len(),
        })?;
        let mut writer = BitWriter::new();
        args.ser(&mut writer);
        let bytes = writer.to_vec();

        match (direction, role) {
            (RpcDirection::Server, None | Some(NetRole::Authority)) => {
                layout.invoke_rpc(index, target, &bytes)?;
                Ok(())
            }
            (RpcDirection::Server, Some(NetRole::AuthoritativeProxy)) => match &mut self.side {
                Side::Client(client) if client.phase() == ClientPhase::Connected => {
                    client.queue_rpc(entity, wire_index, bytes);
                    Ok(())
                }
                _ => Err(RpcError::NotConnected { name: rpc.name() }),
            },
            (RpcDirection::Client, Some(NetRole::Authority)) => {
                if let Side::Server(server) = &mut self.side {
                    let sent = server.queue_rpc(entity, wire_index, &bytes);
                    trace!("queued RPC {} on {} for {} clients", rpc.name(), entity, sent);
                }
                Ok(())
            }
            (direction, role) => Err(RpcError::NotPermitted {
                name: rpc.name(),
                direction,
                role,
            }),
        }
    }

    /// Tells the other end we are leaving and releases the socket
    pub fn disconnect(&mut self) {
        if let Some((sender, _)) = &self.socket {
            match &mut self.side {
                Side::Server(server) => server.shutdown(&**sender, &self.config, self.clock),
                Side::Client(client) => {
                    client.disconnect(&**sender, &self.config, self.clock)
                }
                Side::Idle => {}
            }
        }
        self.socket = None;
        self.side = Side::Idle;
        if self.state != NetState::Closed {
            self.state = NetState::Disconnected;
        }
    }

    /// Disconnects and stops all further processing
    pub fn close(&mut self) {
        if self.state == NetState::Closed {
            return;
        }
        self.disconnect();
        info!("net instance closed");
        self.state = NetState::Closed;
    }
}

impl Drop for NetInstance {
    fn drop(&mut self) {
        self.close();
    }
}
