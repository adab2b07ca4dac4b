use crate::{BitCounter, BitReader, BitWrite, SerdeErr};

/// A value that can be written to and read from a bit stream
pub trait Serde: Sized + Clone + PartialEq {
    /// Writes the value into an outgoing bit stream
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Reads a value out of an incoming bit stream
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits `ser` will write
    fn bit_length(&self) -> u32 {
        let mut counter = BitCounter::new();
        self.ser(&mut counter);
        counter.bits_needed()
    }
}
