use std::{
    collections::HashMap,
    net::SocketAddr,
    time::Duration,
};

use log::{debug, info, trace, warn};

use dawn_shared::{
    messages::{read_packet, ClientMessage, ServerMessage},
    sequence_greater_than, BitReader, ClientId, EntityId, EntityType, NetRole, RepError,
    RpcDirection,
};

use crate::{
    config::NetConfig,
    error::{ProtocolError, TransportError},
    events::{ConnectFailure, ConnectionFailedEvent, DisconnectedFromServerEvent, JoinServerEvent},
    net::{connection::Connection, pipeline::build_entity, CNetData, Tick},
    transport::PacketSender,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClientPhase {
    Connecting,
    Connected,
    Disconnected,
}

/// Client half of a `NetInstance`: the server connection and the entities
/// materialized from it
pub(crate) struct ClientSide {
    phase: ClientPhase,
    server: Connection<ClientMessage>,
    client_id: Option<ClientId>,
    connect_started: Duration,
    last_connect_attempt: Option<Duration>,
    /// Replicated entities and the sequence of the last update applied
    entities: HashMap<EntityId, Option<u16>>,
    /// Destroyed entities and when the last destroy for each arrived, kept
    /// until late spawns and updates can no longer be in flight
    destroyed: HashMap<EntityId, Duration>,
}

impl ClientSide {
    pub fn new(server: SocketAddr, now: Duration) -> Self {
        Self {
            phase: ClientPhase::Connecting,
            server: Connection::new(server, now),
            client_id: None,
            connect_started: now,
            last_connect_attempt: None,
            entities: HashMap::new(),
            destroyed: HashMap::new(),
        }
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn is_replicated(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    fn lose_server(&mut self, tick: &mut Tick<'_>) {
        if self.phase == ClientPhase::Connected {
            self.phase = ClientPhase::Disconnected;
            tick.events.push(DisconnectedFromServerEvent);
        }
    }

    fn fail_connect(&mut self, tick: &mut Tick<'_>, reason: ConnectFailure) {
        if self.phase == ClientPhase::Connecting {
            warn!("connection to {} failed: {:?}", self.server.address(), reason);
            self.phase = ClientPhase::Disconnected;
            tick.events.push(ConnectionFailedEvent { reason });
        }
    }

    pub fn receive(&mut self, tick: &mut Tick<'_>, from: SocketAddr, payload: &[u8]) {
        if from != self.server.address() || self.phase == ClientPhase::Disconnected {
            trace!("ignoring packet from {}", from);
            return;
        }
        let messages = match read_packet::<ServerMessage>(tick.config.protocol_id, payload) {
            Ok(messages) => messages,
            Err(error) => {
                self.protocol_error(tick, error.into());
                return;
            }
        };
        self.server.mark_received(tick.now);

        for message in messages {
            if self.phase == ClientPhase::Disconnected {
                break;
            }
            if let Err(error) = self.handle_message(tick, message) {
                self.protocol_error(tick, error);
            }
        }
    }

    fn protocol_error(&mut self, tick: &mut Tick<'_>, error: ProtocolError) {
        warn!("dropped message from server: {}", error);
        if self
            .server
            .record_protocol_error(tick.config.max_protocol_errors)
        {
            warn!("leaving server: too many protocol errors");
            let connected = self.phase == ClientPhase::Connected;
            self.disconnect(tick.sender, tick.config, tick.now);
            if connected {
                tick.events.push(DisconnectedFromServerEvent);
            }
        }
    }

    fn handle_message(
        &mut self,
        tick: &mut Tick<'_>,
        message: ServerMessage,
    ) -> Result<(), ProtocolError> {
        if self.phase == ClientPhase::Connecting {
            match message {
                ServerMessage::ConnectAccept { client } => {
                    info!("joined {} as {}", self.server.address(), client);
                    self.phase = ClientPhase::Connected;
                    self.client_id = Some(client);
                    tick.events.push(JoinServerEvent { client });
                }
                ServerMessage::ConnectReject { reason } => {
                    self.fail_connect(tick, ConnectFailure::Rejected(reason));
                }
                _ => trace!("ignoring message before accept"),
            }
            return Ok(());
        }

        match message {
            ServerMessage::ConnectAccept { .. }
            | ServerMessage::ConnectReject { .. }
            | ServerMessage::Heartbeat => {}
            ServerMessage::Disconnect => {
                info!("server {} closed the connection", self.server.address());
                self.lose_server(tick);
            }
            ServerMessage::EntitySpawn {
                entity,
                entity_type,
                role,
                fingerprint,
                state,
            } => self.handle_spawn(tick, entity, entity_type, role, fingerprint, &state)?,
            ServerMessage::EntityUpdate {
                entity,
                sequence,
                delta,
            } => self.handle_update(tick, entity, sequence, &delta)?,
            ServerMessage::EntityDestroy { entity } => {
                if self.entities.remove(&entity).is_some() {
                    debug!("destroying replicated {}", entity);
                    tick.scene.destroy_entity(entity);
                }
                self.destroyed.insert(entity, tick.now);
                self.server.queue(ClientMessage::DestroyAck { entity });
            }
            ServerMessage::Rpc {
                entity,
                index,
                args,
            } => self.handle_rpc(tick, entity, index, &args)?,
        }
        Ok(())
    }

    fn handle_spawn(
        &mut self,
        tick: &mut Tick<'_>,
        entity: EntityId,
        entity_type: EntityType,
        role: NetRole,
        fingerprint: u64,
        state: &[u8],
    ) -> Result<(), ProtocolError> {
        if entity.is_local() || !role.is_proxy() {
            return Err(ProtocolError::InvalidSpawn { entity, role });
        }
        if self.destroyed.contains_key(&entity) {
            trace!("ignoring late spawn of destroyed {}", entity);
            return Ok(());
        }
        if self.entities.contains_key(&entity) {
            // our ack was lost
            self.server.queue(ClientMessage::SpawnAck { entity });
            return Ok(());
        }

        let id = build_entity(tick.pipeline, tick.scene, Some(entity), entity_type, role)?;
        let owner = match role {
            NetRole::AuthoritativeProxy => self.client_id,
            _ => None,
        };
        if let Err(error) = Self::apply_spawn(tick, id, role, owner, fingerprint, state) {
            tick.scene.destroy_entity(id);
            return Err(error);
        }

        debug!("spawned replicated {} of type {} as {:?}", id, entity_type, role);
        self.entities.insert(id, None);
        self.server.queue(ClientMessage::SpawnAck { entity });
        Ok(())
    }

    fn apply_spawn(
        tick: &mut Tick<'_>,
        id: EntityId,
        role: NetRole,
        owner: Option<ClientId>,
        fingerprint: u64,
        state: &[u8],
    ) -> Result<(), ProtocolError> {
        let target = tick
            .scene
            .entity_mut(id)
            .ok_or(ProtocolError::UnknownEntity { entity: id })?;
        let net_data = target
            .component_mut::<CNetData>()
            .ok_or(ProtocolError::UnknownEntity { entity: id })?;
        net_data.set_role(role);
        net_data.set_owner(owner);
        let layout = net_data.layout().clone();
        if layout.fingerprint() != fingerprint {
            return Err(RepError::LayoutMismatch {
                local: layout.fingerprint(),
                received: fingerprint,
            }
            .into());
        }
        layout.read_full(target, &mut BitReader::new(state))?;
        Ok(())
    }

    fn handle_update(
        &mut self,
        tick: &mut Tick<'_>,
        entity: EntityId,
        sequence: u16,
        delta: &[u8],
    ) -> Result<(), ProtocolError> {
        if self.destroyed.contains_key(&entity) {
            return Ok(());
        }
        let last = self
            .entities
            .get_mut(&entity)
            .ok_or(ProtocolError::UnknownEntity { entity })?;
        if last.is_some_and(|last| !sequence_greater_than(sequence, last)) {
            trace!("dropping stale update {} for {}", sequence, entity);
            return Ok(());
        }

        let target = tick
            .scene
            .entity_mut(entity)
            .ok_or(ProtocolError::UnknownEntity { entity })?;
        let layout = target
            .component::<CNetData>()
            .map(|net_data| net_data.layout().clone())
            .ok_or(ProtocolError::UnknownEntity { entity })?;
        layout.read_delta(target, &mut BitReader::new(delta))?;

        *last = Some(sequence);
        self.server
            .queue(ClientMessage::UpdateAck { entity, sequence });
        Ok(())
    }

    fn handle_rpc(
        &mut self,
        tick: &mut Tick<'_>,
        entity: EntityId,
        index: u16,
        args: &[u8],
    ) -> Result<(), ProtocolError> {
        if self.destroyed.contains_key(&entity) {
            trace!("dropping RPC {} for destroyed {}", index, entity);
            return Ok(());
        }
        if !self.entities.contains_key(&entity) {
            return Err(ProtocolError::UnknownEntity { entity });
        }
        let target = tick
            .scene
            .entity_mut(entity)
            .ok_or(ProtocolError::UnknownEntity { entity })?;
        let layout = target
            .component::<CNetData>()
            .map(|net_data| net_data.layout().clone())
            .ok_or(ProtocolError::UnknownEntity { entity })?;
        let permitted = layout
            .rpc(usize::from(index))
            .is_some_and(|rpc| rpc.direction() == RpcDirection::Client);
        if !permitted {
            return Err(ProtocolError::RpcNotPermitted { entity, index });
        }
        layout.invoke_rpc(usize::from(index), target, args)?;
        Ok(())
    }

    /// Forgets destroyed entities older than `retention`
    fn forget_destroyed(&mut self, now: Duration, retention: Duration) {
        self.destroyed
            .retain(|_, destroyed_at| now.saturating_sub(*destroyed_at) < retention);
    }

    pub fn update(&mut self, tick: &mut Tick<'_>) {
        self.forget_destroyed(tick.now, tick.config.disconnection_timeout);
        match self.phase {
            ClientPhase::Connecting => {
                if tick.now.saturating_sub(self.connect_started) >= tick.config.connect_timeout {
                    self.fail_connect(tick, ConnectFailure::TimedOut);
                    return;
                }
                let retry = self.last_connect_attempt.map_or(true, |sent| {
                    tick.now.saturating_sub(sent) >= tick.config.connect_retry_interval
                });
                if retry {
                    trace!("sending connect to {}", self.server.address());
                    self.server.queue(ClientMessage::Connect);
                    self.last_connect_attempt = Some(tick.now);
                }
            }
            ClientPhase::Connected => {
                if self
                    .server
                    .timed_out(tick.now, tick.config.disconnection_timeout)
                {
                    warn!("server {} timed out", self.server.address());
                    self.lose_server(tick);
                    return;
                }
                if self
                    .server
                    .heartbeat_due(tick.now, tick.config.heartbeat_interval)
                {
                    self.server.queue(ClientMessage::Heartbeat);
                }
            }
            ClientPhase::Disconnected => return,
        }

        if let Err(error) = self.server.flush(tick.sender, tick.config, tick.now) {
            self.on_send_error(tick, error);
        }
    }

    fn on_send_error(&mut self, tick: &mut Tick<'_>, error: TransportError) {
        match self.phase {
            ClientPhase::Connecting => self.fail_connect(tick, ConnectFailure::Transport(error)),
            ClientPhase::Connected => self.lose_server(tick),
            ClientPhase::Disconnected => {}
        }
    }

    /// Queues an RPC for the server
    pub fn queue_rpc(&mut self, entity: EntityId, index: u16, args: Vec<u8>) {
        self.server.queue(ClientMessage::Rpc {
            entity,
            index,
            args,
        });
    }

    /// Leaves the server, telling it if we got as far as connecting
    pub fn disconnect(&mut self, sender: &dyn PacketSender, config: &NetConfig, now: Duration) {
        if self.phase == ClientPhase::Disconnected {
            return;
        }
        info!("leaving {}", self.server.address());
        self.server.queue(ClientMessage::Disconnect);
        let _ = self.server.flush(sender, config, now);
        self.phase = ClientPhase::Disconnected;
    }
}
