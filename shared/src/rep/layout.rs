use dawn_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    rep::{ComponentKind, RepError, RepProperty, RpcProperty},
    world::Entity,
};

/// Implemented by components that take part in replication
pub trait Replicate: 'static {
    fn rep_layout() -> RepLayout;
}

/// A set of replicated component types, implemented for tuples of up to
/// eight `Replicate` types
pub trait ReplicateSet {
    fn append_to(layout: &mut RepLayout);
}

macro_rules! impl_replicate_set {
    ($($component:ident),+) => {
        impl<$($component: Replicate),+> ReplicateSet for ($($component,)+) {
            fn append_to(layout: &mut RepLayout) {
                $( layout.append::<$component>(); )+
            }
        }
    };
}

impl_replicate_set!(A);
impl_replicate_set!(A, B);
impl_replicate_set!(A, B, C);
impl_replicate_set!(A, B, C, D);
impl_replicate_set!(A, B, C, D, E);
impl_replicate_set!(A, B, C, D, E, F);
impl_replicate_set!(A, B, C, D, E, F, G);
impl_replicate_set!(A, B, C, D, E, F, G, H);

/// Encoded value of every property of a layout, used as the baseline for
/// delta compression
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepSnapshot {
    values: Vec<Vec<u8>>,
}

impl RepSnapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.values.get(index).map(Vec::as_slice)
    }
}

/// Ordered list of the replicated properties and RPCs of an entity.
///
/// Every participant builds the layout for an entity type from the same
/// component list, so property order is the wire order.
#[derive(Debug, Default)]
pub struct RepLayout {
    components: Vec<ComponentKind>,
    properties: Vec<RepProperty>,
    rpcs: Vec<RpcProperty>,
    fingerprint: u64,
}

impl RepLayout {
    pub fn new() -> Self {
        let mut layout = Self::default();
        layout.refresh_fingerprint();
        layout
    }

    /// Composes the layouts of a tuple of components, in order
    ///
    /// ```ignore
    /// let layout = RepLayout::build::<(CNetTransform, CShipControls)>();
    /// ```
    pub fn build<T: ReplicateSet>() -> Self {
        let mut layout = Self::new();
        T::append_to(&mut layout);
        layout
    }

    pub fn with_property(mut self, property: RepProperty) -> Self {
        self.push_component(property.component());
        self.properties.push(property);
        self.refresh_fingerprint();
        self
    }

    pub fn with_rpc(mut self, rpc: RpcProperty) -> Self {
        self.push_component(rpc.component());
        self.rpcs.push(rpc);
        self.refresh_fingerprint();
        self
    }

    /// Appends the layout of component `C`
    pub fn append<C: Replicate>(&mut self) {
        let other = C::rep_layout();
        self.push_component(ComponentKind::of::<C>());
        for component in other.components {
            self.push_component(component);
        }
        self.properties.extend(other.properties);
        self.rpcs.extend(other.rpcs);
        self.refresh_fingerprint();
    }

    fn push_component(&mut self, component: ComponentKind) {
        if !self.components.contains(&component) {
            self.components.push(component);
        }
    }

    fn refresh_fingerprint(&mut self) {
        let mut hash = Fnv64::new();
        for component in &self.components {
            hash.write(component.name());
        }
        for property in &self.properties {
            hash.write(property.component().name());
            hash.write(property.name());
            hash.write(property.type_tag());
        }
        for rpc in &self.rpcs {
            hash.write(rpc.component().name());
            hash.write(rpc.name());
            hash.write(rpc.arg_type());
        }
        self.fingerprint = hash.finish();
    }

    pub fn components(&self) -> &[ComponentKind] {
        &self.components
    }

    pub fn properties(&self) -> &[RepProperty] {
        &self.properties
    }

    pub fn rpcs(&self) -> &[RpcProperty] {
        &self.rpcs
    }

    /// Hash of component names, field names, value types and RPC names
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Fails with `MissingComponent` for the first component the entity lacks
    pub fn check_components(&self, entity: &Entity) -> Result<(), RepError> {
        for component in &self.components {
            if entity.component_any(component.type_id()).is_none() {
                return Err(RepError::MissingComponent {
                    component: component.name(),
                });
            }
        }
        Ok(())
    }

    pub fn rpc_index<C: 'static, A: 'static>(&self, name: &str) -> Option<usize> {
        self.rpcs.iter().position(|rpc| rpc.matches::<C, A>(name))
    }

    pub fn rpc(&self, index: usize) -> Option<&RpcProperty> {
        self.rpcs.get(index)
    }

    fn encode_property(
        &self,
        property: &RepProperty,
        entity: &Entity,
        writer: &mut dyn BitWrite,
    ) -> Result<(), RepError> {
        let component = entity
            .component_any(property.component().type_id())
            .ok_or(RepError::MissingComponent {
                component: property.component().name(),
            })?;
        property.encode(component, writer)
    }

    fn decode_property(
        &self,
        property: &RepProperty,
        entity: &mut Entity,
        reader: &mut BitReader,
    ) -> Result<(), RepError> {
        let component = entity
            .component_any_mut(property.component().type_id())
            .ok_or(RepError::MissingComponent {
                component: property.component().name(),
            })?;
        property.decode(component, reader)
    }

    /// Writes every property in layout order
    pub fn write_full(&self, entity: &Entity, writer: &mut dyn BitWrite) -> Result<(), RepError> {
        for property in &self.properties {
            self.encode_property(property, entity, writer)?;
        }
        Ok(())
    }

    /// Reads every property in layout order into the entity's components.
    /// The whole buffer is checked first, so a malformed one changes nothing.
    pub fn read_full(&self, entity: &mut Entity, reader: &mut BitReader) -> Result<(), RepError> {
        self.check_components(entity)?;
        let mut scan = reader.clone();
        for property in &self.properties {
            property.skip(&mut scan)?;
        }
        for property in &self.properties {
            self.decode_property(property, entity, reader)?;
        }
        Ok(())
    }

    pub fn snapshot(&self, entity: &Entity) -> Result<RepSnapshot, RepError> {
        let mut values = Vec::with_capacity(self.properties.len());
        for property in &self.properties {
            let mut writer = BitWriter::with_capacity(16);
            self.encode_property(property, entity, &mut writer)?;
            values.push(writer.to_vec());
        }
        Ok(RepSnapshot { values })
    }

    /// Writes the properties whose value differs from `baseline` (all of them
    /// without one) and returns the snapshot the delta brings a reader up to.
    pub fn write_delta(
        &self,
        entity: &Entity,
        baseline: Option<&RepSnapshot>,
        writer: &mut dyn BitWrite,
    ) -> Result<RepSnapshot, RepError> {
        self.write_delta_since(entity, baseline.as_slice(), writer)
    }

    /// Like `write_delta`, for a reader whose state may be any one of
    /// `baselines`. A property is written if it differs from at least one of
    /// them, or always when `baselines` is empty.
    pub fn write_delta_since(
        &self,
        entity: &Entity,
        baselines: &[&RepSnapshot],
        writer: &mut dyn BitWrite,
    ) -> Result<RepSnapshot, RepError> {
        let current = self.snapshot(entity)?;
        for (index, property) in self.properties.iter().enumerate() {
            let value = current.get(index);
            let unchanged = !baselines.is_empty()
                && baselines
                    .iter()
                    .all(|baseline| baseline.get(index) == value);
            if unchanged {
                continue;
            }
            writer.write_bit(true);
            UnsignedVariableInteger::<4>::new(index as u64).ser(writer);
            self.encode_property(property, entity, writer)?;
        }
        writer.write_bit(false);
        Ok(current)
    }

    /// Applies a delta written by `write_delta`. Nothing is written to the
    /// entity unless the whole delta reads cleanly.
    pub fn read_delta(&self, entity: &mut Entity, reader: &mut BitReader) -> Result<(), RepError> {
        let mut scan = reader.clone();
        let mut changed = Vec::new();
        while scan.read_bit()? {
            let property = self.read_property_index(&mut scan)?;
            if entity.component_any(property.component().type_id()).is_none() {
                return Err(RepError::MissingComponent {
                    component: property.component().name(),
                });
            }
            property.skip(&mut scan)?;
            changed.push(property);
        }

        for property in changed {
            reader.read_bit()?;
            self.read_property_index(reader)?;
            self.decode_property(property, entity, reader)?;
        }
        reader.read_bit()?;
        Ok(())
    }

    fn read_property_index(&self, reader: &mut BitReader) -> Result<&RepProperty, RepError> {
        let index = UnsignedVariableInteger::<4>::de(reader)?.get();
        let property = usize::try_from(index)
            .ok()
            .and_then(|index| self.properties.get(index))
            .ok_or(SerdeErr::InvalidValue {
                type_name: "property index",
            })?;
        Ok(property)
    }

    /// Decodes `args` and runs RPC `index` against the entity
    pub fn invoke_rpc(
        &self,
        index: usize,
        entity: &mut Entity,
        args: &[u8],
    ) -> Result<(), RepError> {
        let rpc = self.rpcs.get(index).ok_or(RepError::UnknownRpcIndex {
            index: index as u64,
            count: self.rpcs.len(),
        })?;
        let component = entity
            .component_any_mut(rpc.component().type_id())
            .ok_or(RepError::MissingComponent {
                component: rpc.component().name(),
            })?;
        let mut reader = BitReader::new(args);
        rpc.invoke(component, &mut reader)
    }
}

struct Fnv64(u64);

impl Fnv64 {
    fn new() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }

    fn write(&mut self, text: &str) {
        for byte in text.bytes().chain(std::iter::once(0xff)) {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}
