use std::{
    any::{type_name, Any, TypeId},
    fmt,
};

use dawn_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::rep::RepError;

/// Identifies a component type at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKind {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    pub fn of<C: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: short_type_name(type_name::<C>()),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Strips the module path so names stay stable if a type moves modules
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let generic_start = full.find('<').unwrap_or(full.len());
    match full[..generic_start].rfind("::") {
        Some(index) => &full[index + 2..],
        None => full,
    }
}

type EncodeFn = dyn Fn(&dyn Any, &mut dyn BitWrite) -> Result<(), RepError> + Send + Sync;
type DecodeFn = dyn Fn(&mut dyn Any, &mut BitReader) -> Result<(), RepError> + Send + Sync;
type SkipFn = fn(&mut BitReader) -> Result<(), SerdeErr>;

/// A replicated field of a component, bound through a pair of accessors.
pub struct RepProperty {
    name: &'static str,
    component: ComponentKind,
    type_tag: &'static str,
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
    skip: SkipFn,
}

impl RepProperty {
    /// Binds field `name` of component `C`.
    ///
    /// ```
    /// # use dawn_shared::RepProperty;
    /// struct Health { current: u32 }
    /// let property = RepProperty::bind::<Health, u32>(
    ///     "current",
    ///     |health| &health.current,
    ///     |health| &mut health.current,
    /// );
    /// assert_eq!(property.name(), "current");
    /// ```
    pub fn bind<C: 'static, T: Serde + 'static>(
        name: &'static str,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> Self {
        let component = ComponentKind::of::<C>();
        let encode = move |component: &dyn Any, writer: &mut dyn BitWrite| -> Result<(), RepError> {
            let component = component
                .downcast_ref::<C>()
                .ok_or(RepError::MissingComponent {
                    component: short_type_name(type_name::<C>()),
                })?;
            get(component).ser(writer);
            Ok(())
        };
        let decode = move |component: &mut dyn Any, reader: &mut BitReader| -> Result<(), RepError> {
            let component = component
                .downcast_mut::<C>()
                .ok_or(RepError::MissingComponent {
                    component: short_type_name(type_name::<C>()),
                })?;
            *get_mut(component) = T::de(reader)?;
            Ok(())
        };

        Self {
            name,
            component,
            type_tag: type_name::<T>(),
            encode: Box::new(encode),
            decode: Box::new(decode),
            skip: |reader| T::de(reader).map(|_| ()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn component(&self) -> ComponentKind {
        self.component
    }

    pub fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    pub fn encode(&self, component: &dyn Any, writer: &mut dyn BitWrite) -> Result<(), RepError> {
        (self.encode)(component, writer)
    }

    pub fn decode(&self, component: &mut dyn Any, reader: &mut BitReader) -> Result<(), RepError> {
        (self.decode)(component, reader)
    }

    /// Reads past one encoded value without storing it
    pub fn skip(&self, reader: &mut BitReader) -> Result<(), RepError> {
        (self.skip)(reader)?;
        Ok(())
    }
}

impl fmt::Debug for RepProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepProperty")
            .field("component", &self.component.name)
            .field("name", &self.name)
            .field("type", &self.type_tag)
            .finish()
    }
}
