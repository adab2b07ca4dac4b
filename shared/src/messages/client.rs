use dawn_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::EntityId;

/// Messages sent from a client to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Connect,
    Disconnect,
    Heartbeat,
    SpawnAck {
        entity: EntityId,
    },
    UpdateAck {
        entity: EntityId,
        sequence: u16,
    },
    DestroyAck {
        entity: EntityId,
    },
    Rpc {
        entity: EntityId,
        index: u16,
        args: Vec<u8>,
    },
}

impl ClientMessage {
    fn kind(&self) -> u8 {
        match self {
            ClientMessage::Connect => 0,
            ClientMessage::Disconnect => 1,
            ClientMessage::Heartbeat => 2,
            ClientMessage::SpawnAck { .. } => 3,
            ClientMessage::UpdateAck { .. } => 4,
            ClientMessage::DestroyAck { .. } => 5,
            ClientMessage::Rpc { .. } => 6,
        }
    }
}

impl Serde for ClientMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<3>::new(self.kind()).ser(writer);
        match self {
            ClientMessage::Connect | ClientMessage::Disconnect | ClientMessage::Heartbeat => {}
            ClientMessage::SpawnAck { entity } | ClientMessage::DestroyAck { entity } => {
                entity.ser(writer);
            }
            ClientMessage::UpdateAck { entity, sequence } => {
                entity.ser(writer);
                sequence.ser(writer);
            }
            ClientMessage::Rpc {
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
            0 => ClientMessage::Connect,
            1 => ClientMessage::Disconnect,
            2 => ClientMessage::Heartbeat,
            3 => ClientMessage::SpawnAck {
                entity: EntityId::de(reader)?,
            },
            4 => ClientMessage::UpdateAck {
                entity: EntityId::de(reader)?,
                sequence: u16::de(reader)?,
            },
            5 => ClientMessage::DestroyAck {
                entity: EntityId::de(reader)?,
            },
            6 => ClientMessage::Rpc {
                entity: EntityId::de(reader)?,
                index: u16::de(reader)?,
                args: Vec::<u8>::de(reader)?,
            },
            _ => {
                return Err(SerdeErr::InvalidValue {
                    type_name: "ClientMessage",
                })
            }
        };
        Ok(message)
    }
}
