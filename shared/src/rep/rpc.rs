use std::{
    any::{type_name, Any, TypeId},
    fmt,
    marker::PhantomData,
};

use dawn_serde::{BitReader, Serde};

use crate::rep::{property::short_type_name, ComponentKind, RepError};

/// Which side an RPC runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcDirection {
    /// Runs on the server, called by the entity's owner
    Server,
    /// Runs on clients, called by the server
    Client,
}

type InvokeFn = dyn Fn(&mut dyn Any, &mut BitReader) -> Result<(), RepError> + Send + Sync;

/// A remote procedure bound to a component handler
pub struct RpcProperty {
    name: &'static str,
    component: ComponentKind,
    direction: RpcDirection,
    arg_type: &'static str,
    invoke: Box<InvokeFn>,
}

impl RpcProperty {
    pub fn server<C: 'static, A: Serde + 'static>(name: &'static str, handler: fn(&mut C, A)) -> Self {
        Self::bind(name, RpcDirection::Server, handler)
    }

    pub fn client<C: 'static, A: Serde + 'static>(name: &'static str, handler: fn(&mut C, A)) -> Self {
        Self::bind(name, RpcDirection::Client, handler)
    }

    fn bind<C: 'static, A: Serde + 'static>(
        name: &'static str,
        direction: RpcDirection,
        handler: fn(&mut C, A),
    ) -> Self {
        let invoke = move |component: &mut dyn Any, reader: &mut BitReader| -> Result<(), RepError> {
            let component = component
                .downcast_mut::<C>()
                .ok_or(RepError::MissingComponent {
                    component: short_type_name(type_name::<C>()),
                })?;
            let args = A::de(reader)?;
            handler(component, args);
            Ok(())
        };

        Self {
            name,
            component: ComponentKind::of::<C>(),
            direction,
            arg_type: type_name::<A>(),
            invoke: Box::new(invoke),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn component(&self) -> ComponentKind {
        self.component
    }

    pub fn direction(&self) -> RpcDirection {
        self.direction
    }

    pub fn arg_type(&self) -> &'static str {
        self.arg_type
    }

    pub(crate) fn matches<C: 'static, A: 'static>(&self, name: &str) -> bool {
        self.component.type_id() == TypeId::of::<C>()
            && self.name == name
            && self.arg_type == type_name::<A>()
    }

    /// Decodes the arguments and runs the handler on `component`
    pub fn invoke(&self, component: &mut dyn Any, reader: &mut BitReader) -> Result<(), RepError> {
        (self.invoke)(component, reader)
    }
}

impl fmt::Debug for RpcProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcProperty")
            .field("component", &self.component.name())
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("args", &self.arg_type)
            .finish()
    }
}

/// Typed handle used to call an RPC declared on component `C` with
/// arguments `A`.
///
/// ```
/// # use dawn_shared::Rpc;
/// struct Turret;
/// const FIRE: Rpc<Turret, bool> = Rpc::new("fire");
/// assert_eq!(FIRE.name(), "fire");
/// ```
pub struct Rpc<C, A> {
    name: &'static str,
    phantom: PhantomData<fn(&mut C, A)>,
}

impl<C, A> Rpc<C, A> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            phantom: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<C, A> Clone for Rpc<C, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, A> Copy for Rpc<C, A> {}

impl<C, A> fmt::Debug for Rpc<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rpc({})", self.name)
    }
}
