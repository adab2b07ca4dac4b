use std::{collections::BTreeMap, time::Duration};

use log::{trace, warn};

use dawn_shared::{
    assign_role, messages::ServerMessage, sequence_greater_than, BitWriter, ClientId, Entity,
    EntityId, EntityOrigin, NetMode, RepError, RepSnapshot, SceneManager, Serde,
};

use crate::net::CNetData;

/// Unacknowledged updates kept per entity before falling back to full state
const MAX_PENDING_UPDATES: usize = 32;

fn due(last_sent: Option<Duration>, now: Duration, interval: Duration) -> bool {
    last_sent.map_or(true, |sent| now.saturating_sub(sent) >= interval)
}

enum Replica {
    /// Spawn sent, waiting for the ack. The message is resent unchanged so
    /// the acked state is known exactly.
    Spawning {
        message: ServerMessage,
        snapshot: RepSnapshot,
        last_sent: Option<Duration>,
    },
    Spawned {
        /// State the client acknowledged, `None` after falling back to full
        /// updates
        baseline: Option<RepSnapshot>,
        /// Updates sent but not acknowledged, oldest first
        pending: Vec<(u16, RepSnapshot)>,
        next_sequence: u16,
        last_sent: Option<Duration>,
    },
    Destroying {
        last_sent: Option<Duration>,
    },
    /// State outgrew a packet. Nothing more is sent until the entity dies.
    Oversized { spawned: bool },
}

/// Server-side replication state of every entity for one client
pub(crate) struct ClientReplicas {
    client: ClientId,
    max_message_bits: u32,
    replicas: BTreeMap<EntityId, Replica>,
}

impl ClientReplicas {
    pub fn new(client: ClientId, max_message_bits: u32) -> Self {
        Self {
            client,
            max_message_bits,
            replicas: BTreeMap::new(),
        }
    }

    fn check_size(&self, message: &ServerMessage) -> Result<(), RepError> {
        let bits = message.bit_length();
        if bits > self.max_message_bits {
            return Err(RepError::StateTooLarge {
                bits,
                max_bits: self.max_message_bits,
            });
        }
        Ok(())
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.replicas.contains_key(&entity)
    }

    /// True once the client acknowledged the spawn and until it is destroyed
    pub fn is_spawned(&self, entity: EntityId) -> bool {
        matches!(self.replicas.get(&entity), Some(Replica::Spawned { .. }))
    }

    /// True while the client is being told the entity is gone
    pub fn is_destroying(&self, entity: EntityId) -> bool {
        matches!(self.replicas.get(&entity), Some(Replica::Destroying { .. }))
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    /// Prepares the spawn of `entity` for this client. An entity whose state
    /// can't fit in a packet is recorded as oversized and never sent.
    pub fn begin_spawn(&mut self, entity: &Entity, net_data: &CNetData) -> Result<(), RepError> {
        let layout = net_data.layout();
        let role = assign_role(
            NetMode::Client,
            EntityOrigin::Replicated,
            net_data.owner(),
            Some(self.client),
        );
        let mut writer = BitWriter::new();
        layout.write_full(entity, &mut writer)?;
        let snapshot = layout.snapshot(entity)?;
        let message = ServerMessage::EntitySpawn {
            entity: entity.id(),
            entity_type: net_data.entity_type(),
            role,
            fingerprint: layout.fingerprint(),
            state: writer.to_vec(),
        };
        if let Err(error) = self.check_size(&message) {
            self.replicas
                .insert(entity.id(), Replica::Oversized { spawned: false });
            return Err(error);
        }
        trace!("spawning {} for {} as {:?}", entity.id(), self.client, role);
        self.replicas.insert(
            entity.id(),
            Replica::Spawning {
                message,
                snapshot,
                last_sent: None,
            },
        );
        Ok(())
    }

    /// Starts destroying every replica whose entity is not in `alive`
    pub fn retain_alive(&mut self, alive: impl Fn(EntityId) -> bool) {
        self.replicas.retain(|id, replica| {
            alive(*id) || !matches!(replica, Replica::Oversized { spawned: false })
        });
        for (id, replica) in self.replicas.iter_mut() {
            if matches!(replica, Replica::Destroying { .. }) || alive(*id) {
                continue;
            }
            trace!("destroying {} for {}", id, self.client);
            *replica = Replica::Destroying { last_sent: None };
        }
    }

    pub fn ack_spawn(&mut self, entity: EntityId) {
        let Some(replica) = self.replicas.get_mut(&entity) else {
            return;
        };
        if let Replica::Spawning { snapshot, .. } = replica {
            let baseline = std::mem::take(snapshot);
            *replica = Replica::Spawned {
                baseline: Some(baseline),
                pending: Vec::new(),
                next_sequence: 0,
                last_sent: None,
            };
        }
    }

    pub fn ack_update(&mut self, entity: EntityId, sequence: u16) {
        let Some(Replica::Spawned {
            baseline, pending, ..
        }) = self.replicas.get_mut(&entity)
        else {
            return;
        };
        let Some(position) = pending.iter().position(|(seq, _)| *seq == sequence) else {
            return;
        };
        let (_, snapshot) = pending.remove(position);
        *baseline = Some(snapshot);
        pending.retain(|(seq, _)| sequence_greater_than(*seq, sequence));
    }

    pub fn ack_destroy(&mut self, entity: EntityId) {
        if matches!(
            self.replicas.get(&entity),
            Some(Replica::Destroying { .. })
        ) {
            self.replicas.remove(&entity);
        }
    }

    /// Writes every spawn, update and destroy that is due
    pub fn collect_messages(
        &mut self,
        scene: &SceneManager,
        now: Duration,
        resend_interval: Duration,
        outbox: &mut Vec<ServerMessage>,
    ) {
        let max_message_bits = self.max_message_bits;
        let mut oversized = Vec::new();
        for (id, replica) in self.replicas.iter_mut() {
            match replica {
                Replica::Spawning {
                    message, last_sent, ..
                } => {
                    if due(*last_sent, now, resend_interval) {
                        outbox.push(message.clone());
                        *last_sent = Some(now);
                    }
                }
                Replica::Spawned {
                    baseline,
                    pending,
                    next_sequence,
                    last_sent,
                } => {
                    let Some(entity) = scene.entity(*id) else {
                        continue;
                    };
                    let Some(net_data) = entity.component::<CNetData>() else {
                        continue;
                    };
                    let layout = net_data.layout();
                    let current = match layout.snapshot(entity) {
                        Ok(current) => current,
                        Err(error) => {
                            warn!("cannot snapshot {}: {}", id, error);
                            continue;
                        }
                    };
                    let latest = pending.last().map(|(_, snapshot)| snapshot).or(baseline.as_ref());
                    let changed = latest != Some(&current);
                    let resend = !pending.is_empty() && due(*last_sent, now, resend_interval);
                    if !changed && !resend {
                        continue;
                    }

                    if pending.len() >= MAX_PENDING_UPDATES {
                        *baseline = None;
                        pending.clear();
                    }
                    let baselines: Vec<&RepSnapshot> = match baseline.as_ref() {
                        Some(baseline) => std::iter::once(baseline)
                            .chain(pending.iter().map(|(_, snapshot)| snapshot))
                            .collect(),
                        None => Vec::new(),
                    };
                    let mut writer = BitWriter::new();
                    let snapshot = match layout.write_delta_since(entity, &baselines, &mut writer)
                    {
                        Ok(snapshot) => snapshot,
                        Err(error) => {
                            warn!("cannot write update for {}: {}", id, error);
                            continue;
                        }
                    };
                    let message = ServerMessage::EntityUpdate {
                        entity: *id,
                        sequence: *next_sequence,
                        delta: writer.to_vec(),
                    };
                    let bits = message.bit_length();
                    if bits > max_message_bits {
                        warn!(
                            "no longer updating {} for {}: {} bit update exceeds {} bits",
                            id, self.client, bits, max_message_bits
                        );
                        oversized.push(*id);
                        continue;
                    }
                    pending.push((*next_sequence, snapshot));
                    *next_sequence = next_sequence.wrapping_add(1);
                    *last_sent = Some(now);
                    outbox.push(message);
                }
                Replica::Destroying { last_sent } => {
                    if due(*last_sent, now, resend_interval) {
                        outbox.push(ServerMessage::EntityDestroy { entity: *id });
                        *last_sent = Some(now);
                    }
                }
                Replica::Oversized { .. } => {}
            }
        }
        for id in oversized {
            self.replicas.insert(id, Replica::Oversized { spawned: true });
        }
    }
}
