use dawn_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::{ClientId, EntityId, EntityType, NetRole};

/// Why the server turned a connection request down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    ServerFull,
}

impl Serde for RejectReason {
    // one bit, set bit reserved
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            RejectReason::ServerFull => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            return Err(SerdeErr::InvalidValue {
                type_name: "reject reason",
            });
        }
        Ok(RejectReason::ServerFull)
    }

    fn bit_length(&self) -> u32 {
        1
    }
}

/// Messages sent from the server to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    ConnectAccept {
        client: ClientId,
    },
    ConnectReject {
        reason: RejectReason,
    },
    Disconnect,
    Heartbeat,
    /// Full state of a newly replicated entity, as written by its layout
    EntitySpawn {
        entity: EntityId,
        entity_type: EntityType,
        role: NetRole,
        fingerprint: u64,
        state: Vec<u8>,
    },
    /// Changed properties since the last state the client acknowledged
    EntityUpdate {
        entity: EntityId,
        sequence: u16,
        delta: Vec<u8>,
    },
    EntityDestroy {
        entity: EntityId,
    },
    Rpc {
        entity: EntityId,
        index: u16,
        args: Vec<u8>,
    },
}

impl ServerMessage {
    fn kind(&self) -> u8 {
        match self {
            ServerMessage::ConnectAccept { .. } => 0,
            ServerMessage::ConnectReject { .. } => 1,
            ServerMessage::Disconnect => 2,
            ServerMessage::Heartbeat => 3,
            ServerMessage::EntitySpawn { .. } => 4,
            ServerMessage::EntityUpdate { .. } => 5,
            ServerMessage::EntityDestroy { .. } => 6,
            ServerMessage::Rpc { .. } => 7,
        }
    }
}

impl Serde for ServerMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<3>::new(self.kind()).ser(writer);
        match self {
            ServerMessage::ConnectAccept { client } => client.ser(writer),
            ServerMessage::ConnectReject { reason } => reason.ser(writer),
            ServerMessage::Disconnect | ServerMessage::Heartbeat => {}
            ServerMessage::EntitySpawn {
                entity,
                entity_type,
                role,
                fingerprint,
                state,
            } => {
                entity.ser(writer);
                entity_type.ser(writer);
                role.ser(writer);
                fingerprint.ser(writer);
                state.ser(writer);
            }
            ServerMessage::EntityUpdate {
                entity,
                sequence,
                delta,
            } => {
                entity.ser(writer);
                sequence.ser(writer);
                delta.ser(writer);
            }
            ServerMessage::EntityDestroy { entity } => entity.ser(writer),
            ServerMessage::Rpc {
                entity,
                index,
                args,
            } => {
                entity.ser(writer);
                index.ser(writer);
                args.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let kind = UnsignedInteger::<3>::de(reader)?.get();
        let message = match kind {
            0 => ServerMessage::ConnectAccept {
                client: ClientId::de(reader)?,
            },
            1 => ServerMessage::ConnectReject {
                reason: RejectReason::de(reader)?,
            },
            2 => ServerMessage::Disconnect,
            3 => ServerMessage::Heartbeat,
            4 => ServerMessage::EntitySpawn {
                entity: EntityId::de(reader)?,
                entity_type: EntityType::de(reader)?,
                role: NetRole::de(reader)?,
                fingerprint: u64::de(reader)?,
                state: Vec::<u8>::de(reader)?,
            },
            5 => ServerMessage::EntityUpdate {
                entity: EntityId::de(reader)?,
                sequence: u16::de(reader)?,
                delta: Vec::<u8>::de(reader)?,
            },
            6 => ServerMessage::EntityDestroy {
                entity: EntityId::de(reader)?,
            },
            7 => ServerMessage::Rpc {
                entity: EntityId::de(reader)?,
                index: u16::de(reader)?,
                args: Vec::<u8>::de(reader)?,
            },
            _ => {
                return Err(SerdeErr::InvalidValue {
                    type_name: "ServerMessage",
                })
            }
        };
        Ok(message)
    }
}
