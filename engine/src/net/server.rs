use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    net::SocketAddr,
    time::Duration,
};

use log::{debug, info, trace, warn};

use dawn_shared::{
    messages::{
        max_message_bits, pack_messages, read_packet, ClientMessage, RejectReason, ServerMessage,
    },
    ClientId, EntityId, NetRole, RpcDirection,
};

use crate::{
    config::NetConfig,
    error::ProtocolError,
    events::{ServerClientConnectedEvent, ServerClientDisconnectedEvent},
    net::{connection::Connection, replicator::ClientReplicas, CNetData, Tick},
    transport::PacketSender,
};

struct RemoteClient {
    connection: Connection<ServerMessage>,
    replicas: ClientReplicas,
}

/// Server half of a `NetInstance`: accepted clients and what each of them
/// has been sent
pub(crate) struct ServerSide {
    max_clients: u16,
    clients: BTreeMap<ClientId, RemoteClient>,
    addresses: HashMap<SocketAddr, ClientId>,
    next_client: u16,
}

impl ServerSide {
    pub fn new(max_clients: u16) -> Self {
        Self {
            max_clients,
            clients: BTreeMap::new(),
            addresses: HashMap::new(),
            next_client: 0,
        }
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn client_address(&self, client: ClientId) -> Option<SocketAddr> {
        self.clients
            .get(&client)
            .map(|client| client.connection.address())
    }

    pub fn has_spawned(&self, client: ClientId, entity: EntityId) -> bool {
        self.clients
            .get(&client)
            .is_some_and(|client| client.replicas.is_spawned(entity))
    }

    fn allocate_client_id(&mut self) -> Option<ClientId> {
        for _ in 0..=u16::MAX {
            let id = ClientId::new(self.next_client);
            self.next_client = self.next_client.wrapping_add(1);
            if !self.clients.contains_key(&id) {
                return Some(id);
            }
        }
        None
    }

    pub fn receive(&mut self, tick: &mut Tick<'_>, from: SocketAddr, payload: &[u8]) {
        let known = self.addresses.get(&from).copied();
        let messages = match read_packet::<ClientMessage>(tick.config.protocol_id, payload) {
            Ok(messages) => messages,
            Err(error) => {
                match known {
                    Some(client) => self.protocol_error(tick, client, error.into()),
                    None => debug!("dropping packet from unknown {}: {}", from, error),
                }
                return;
            }
        };

        let Some(client) = known else {
            if messages.contains(&ClientMessage::Connect) {
                self.accept(tick, from);
            } else {
                trace!("ignoring {} messages from unknown {}", messages.len(), from);
            }
            return;
        };

        if let Some(remote) = self.clients.get_mut(&client) {
            remote.connection.mark_received(tick.now);
        }
        for message in messages {
            if !self.clients.contains_key(&client) {
                // dropped while handling an earlier message
                break;
            }
            if let Err(error) = self.handle_message(tick, client, message) {
                self.protocol_error(tick, client, error);
            }
        }
    }

    fn accept(&mut self, tick: &mut Tick<'_>, from: SocketAddr) {
        let client = if self.clients.len() >= usize::from(self.max_clients) {
            None
        } else {
            self.allocate_client_id()
        };
        let Some(client) = client else {
            warn!("rejecting connection from {}: server full", from);
            let reject = ServerMessage::ConnectReject {
                reason: RejectReason::ServerFull,
            };
            for packet in pack_messages(
                tick.config.protocol_id,
                tick.config.max_packet_bytes,
                [reject],
            ) {
                if let Err(error) = tick.sender.send(&from, &packet) {
                    warn!("failed to reject {}: {}", from, error);
                }
            }
            return;
        };

        let mut connection = Connection::new(from, tick.now);
        connection.queue(ServerMessage::ConnectAccept { client });
        self.clients.insert(
            client,
            RemoteClient {
                connection,
                replicas: ClientReplicas::new(
                    client,
                    max_message_bits(tick.config.max_packet_bytes),
                ),
            },
        );
        self.addresses.insert(from, client);
        info!("{} connected from {}", client, from);
        tick.events.push(ServerClientConnectedEvent { client });
    }

    fn handle_message(
        &mut self,
        tick: &mut Tick<'_>,
        client: ClientId,
        message: ClientMessage,
    ) -> Result<(), ProtocolError> {
        let Some(remote) = self.clients.get_mut(&client) else {
            return Ok(());
        };
        match message {
            ClientMessage::Connect => {
                // our accept was lost
                remote.connection.queue(ServerMessage::ConnectAccept { client });
            }
            ClientMessage::Disconnect => {
                info!("{} disconnected", client);
                self.drop_client(tick, client, false);
            }
            ClientMessage::Heartbeat => {}
            ClientMessage::SpawnAck { entity } => remote.replicas.ack_spawn(entity),
            ClientMessage::UpdateAck { entity, sequence } => {
                remote.replicas.ack_update(entity, sequence)
            }
            ClientMessage::DestroyAck { entity } => remote.replicas.ack_destroy(entity),
            ClientMessage::Rpc { entity, index, .. } if remote.replicas.is_destroying(entity) => {
                trace!("dropping RPC {} from {} for destroyed {}", index, client, entity);
            }
            ClientMessage::Rpc {
                entity,
                index,
                args,
            } => Self::invoke_rpc(tick, client, entity, index, &args)?,
        }
        Ok(())
    }

    fn invoke_rpc(
        tick: &mut Tick<'_>,
        client: ClientId,
        entity: EntityId,
        index: u16,
        args: &[u8],
    ) -> Result<(), ProtocolError> {
        let target = tick
            .scene
            .entity_mut(entity)
            .ok_or(ProtocolError::UnknownEntity { entity })?;
        let net_data = target
            .component::<CNetData>()
            .ok_or(ProtocolError::UnknownEntity { entity })?;
        let layout = net_data.layout().clone();
        let permitted = net_data.role() == NetRole::Authority
            && net_data.owner() == Some(client)
            && layout
                .rpc(usize::from(index))
                .is_some_and(|rpc| rpc.direction() == RpcDirection::Server);
        if !permitted {
            return Err(ProtocolError::RpcNotPermitted { entity, index });
        }
        trace!("{} invoked RPC {} on {}", client, index, entity);
        layout.invoke_rpc(usize::from(index), target, args)?;
        Ok(())
    }

    fn protocol_error(&mut self, tick: &mut Tick<'_>, client: ClientId, error: ProtocolError) {
        warn!("dropped message from {}: {}", client, error);
        let limit_reached = self
            .clients
            .get_mut(&client)
            .is_some_and(|remote| {
                remote
                    .connection
                    .record_protocol_error(tick.config.max_protocol_errors)
            });
        if limit_reached {
            warn!("disconnecting {}: too many protocol errors", client);
            self.drop_client(tick, client, true);
        }
    }

    /// Forgets a client, releasing what it owned
    fn drop_client(&mut self, tick: &mut Tick<'_>, client: ClientId, notify: bool) {
        let Some(mut remote) = self.clients.remove(&client) else {
            return;
        };
        self.addresses.remove(&remote.connection.address());
        if notify {
            remote.connection.queue(ServerMessage::Disconnect);
            let _ = remote
                .connection
                .flush(tick.sender, tick.config, tick.now);
        }
        for entity in tick.scene.iter_mut() {
            if let Some(net_data) = entity.component_mut::<CNetData>() {
                if net_data.owner() == Some(client) {
                    net_data.set_owner(None);
                }
            }
        }
        tick.events.push(ServerClientDisconnectedEvent { client });
    }

    pub fn update(&mut self, tick: &mut Tick<'_>) {
        let timed_out: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, remote)| {
                remote
                    .connection
                    .timed_out(tick.now, tick.config.disconnection_timeout)
            })
            .map(|(client, _)| *client)
            .collect();
        for client in timed_out {
            warn!("{} timed out", client);
            self.drop_client(tick, client, true);
        }

        let replicated: BTreeSet<EntityId> = tick
            .scene
            .iter()
            .filter(|entity| {
                entity
                    .component::<CNetData>()
                    .is_some_and(|net_data| net_data.role() == NetRole::Authority)
            })
            .map(|entity| entity.id())
            .collect();

        let mut outbox = Vec::new();
        for remote in self.clients.values_mut() {
            remote
                .replicas
                .retain_alive(|entity| replicated.contains(&entity));
            for id in &replicated {
                if remote.replicas.contains(*id) {
                    continue;
                }
                let Some(entity) = tick.scene.entity(*id) else {
                    continue;
                };
                let Some(net_data) = entity.component::<CNetData>() else {
                    continue;
                };
                if let Err(error) = remote.replicas.begin_spawn(entity, net_data) {
                    warn!("cannot spawn {}: {}", id, error);
                }
            }

            remote.replicas.collect_messages(
                &*tick.scene,
                tick.now,
                tick.config.resend_interval,
                &mut outbox,
            );
            for message in outbox.drain(..) {
                remote.connection.queue(message);
            }
            if remote
                .connection
                .heartbeat_due(tick.now, tick.config.heartbeat_interval)
            {
                remote.connection.queue(ServerMessage::Heartbeat);
            }
        }

        let mut order: Vec<ClientId> = self.clients.keys().copied().collect();
        fastrand::shuffle(&mut order);
        for client in order {
            if let Some(remote) = self.clients.get_mut(&client) {
                let _ = remote.connection.flush(tick.sender, tick.config, tick.now);
            }
        }
    }

    /// Queues a client RPC to every client that has the entity spawned
    pub fn queue_rpc(&mut self, entity: EntityId, index: u16, args: &[u8]) -> usize {
        let mut sent = 0;
        for remote in self.clients.values_mut() {
            if remote.replicas.is_spawned(entity) {
                remote.connection.queue(ServerMessage::Rpc {
                    entity,
                    index,
                    args: args.to_vec(),
                });
                sent += 1;
            }
        }
        sent
    }

    /// Tells every client the server is going away and forgets them
    pub fn shutdown(&mut self, sender: &dyn PacketSender, config: &NetConfig, now: Duration) {
        for (client, mut remote) in std::mem::take(&mut self.clients) {
            debug!("closing connection to {}", client);
            remote.connection.queue(ServerMessage::Disconnect);
            let _ = remote.connection.flush(sender, config, now);
        }
        self.addresses.clear();
    }

    pub fn replica_count(&self, client: ClientId) -> usize {
        self.clients
            .get(&client)
            .map_or(0, |remote| remote.replicas.len())
    }
}
