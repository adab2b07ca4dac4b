use crate::BitWrite;

/// A BitWrite that records how many bits would be written, used to size
/// values and to check whether a message still fits in a packet.
pub struct BitCounter {
    start_bits: u32,
    current_bits: u32,
    max_bits: u32,
}

impl BitCounter {
    pub fn new() -> Self {
        Self::with_budget(0, u32::MAX)
    }

    pub fn with_budget(start_bits: u32, max_bits: u32) -> Self {
        Self {
            start_bits,
            current_bits: start_bits,
            max_bits,
        }
    }

    /// Bits counted since this counter was created
    pub fn bits_needed(&self) -> u32 {
        self.current_bits - self.start_bits
    }

    pub fn overflowed(&self) -> bool {
        self.current_bits > self.max_bits
    }
}

impl Default for BitCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitCounter {
    fn write_bit(&mut self, _: bool) {
        self.current_bits = self.current_bits.saturating_add(1);
    }

    fn write_byte(&mut self, _: u8) {
        self.current_bits = self.current_bits.saturating_add(8);
    }

    fn bits_written(&self) -> u32 {
        self.current_bits
    }
}
