use std::fmt;

use dawn_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

/// Handle to an entity in a `SceneManager`.
///
/// Ids handed out by a server (or a standalone registry) keep the top bit
/// clear and are the cross-machine reference for an entity. Ids for entities
/// that only exist on a client have [`EntityId::LOCAL_BIT`] set, so they can
/// never collide with an id replicated from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const LOCAL_BIT: u64 = 1 << 63;

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// True if the id was allocated for a client-local entity
    pub const fn is_local(self) -> bool {
        self.0 & Self::LOCAL_BIT != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "local:{}", self.0 & !Self::LOCAL_BIT)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serde for EntityId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.0).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let raw = UnsignedVariableInteger::<7>::de(reader)?.get();
        u64::try_from(raw)
            .map(Self)
            .map_err(|_| SerdeErr::InvalidValue {
                type_name: "EntityId",
            })
    }

    fn bit_length(&self) -> u32 {
        UnsignedVariableInteger::<7>::new(self.0).bit_length()
    }
}

/// Stable identifier for a kind of networked entity, known to every
/// participant. Built from the kind's name with a 32-bit FNV-1a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(u32);

impl EntityType {
    /// Type of entities that were never meant to be replicated
    pub const NONE: EntityType = EntityType(0);

    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u32 = 0x811c_9dc5;
        let mut index = 0;
        while index < bytes.len() {
            hash ^= bytes[index] as u32;
            hash = hash.wrapping_mul(0x0100_0193);
            index += 1;
        }
        Self(hash)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Serde for EntityType {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        32
    }
}

/// Server-assigned identifier of a connected client, valid for the lifetime
/// of its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u16);

impl ClientId {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

impl Serde for ClientId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u16::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        16
    }
}
