use dawn_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::ClientId;

/// Authority role a participant holds over a replicated entity. Ordered so
/// that `role >= NetRole::Authority` reads as "may author changes".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetRole {
    None,
    SimulatedProxy,
    AuthoritativeProxy,
    Authority,
}

impl NetRole {
    /// Entities without net data are local-only and count as authoritative
    pub fn has_authority(role: Option<NetRole>) -> bool {
        match role {
            Some(role) => role >= NetRole::Authority,
            None => true,
        }
    }

    pub fn is_proxy(self) -> bool {
        matches!(self, NetRole::SimulatedProxy | NetRole::AuthoritativeProxy)
    }

    fn to_index(self) -> u8 {
        match self {
            NetRole::None => 0,
            NetRole::SimulatedProxy => 1,
            NetRole::AuthoritativeProxy => 2,
            NetRole::Authority => 3,
        }
    }
}

impl Serde for NetRole {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<2>::new(self.to_index()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<2>::de(reader)?.get() {
            0 => Ok(NetRole::None),
            1 => Ok(NetRole::SimulatedProxy),
            2 => Ok(NetRole::AuthoritativeProxy),
            3 => Ok(NetRole::Authority),
            _ => Err(SerdeErr::InvalidValue {
                type_name: "NetRole",
            }),
        }
    }

    fn bit_length(&self) -> u32 {
        2
    }
}

/// Which side of a session this participant is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetMode {
    None,
    Client,
    Server,
}

/// Where an entity came from, from the point of view of the participant
/// holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityOrigin {
    /// Spawned by this participant
    Local,
    /// Received over the wire
    Replicated,
}

/// Computes the role a participant holds over an entity.
///
/// `owner` is the client that owns the entity, if any, and `local_client` is
/// the id the server assigned to this participant (clients only).
pub fn assign_role(
    net_mode: NetMode,
    origin: EntityOrigin,
    owner: Option<ClientId>,
    local_client: Option<ClientId>,
) -> NetRole {
    match (origin, net_mode) {
        (EntityOrigin::Local, NetMode::Server) => NetRole::Authority,
        (EntityOrigin::Local, NetMode::None | NetMode::Client) => NetRole::None,
        (EntityOrigin::Replicated, NetMode::Client) => {
            if owner.is_some() && owner == local_client {
                NetRole::AuthoritativeProxy
            } else {
                NetRole::SimulatedProxy
            }
        }
        // a server never receives replicated entities
        (EntityOrigin::Replicated, NetMode::Server | NetMode::None) => NetRole::None,
    }
}
