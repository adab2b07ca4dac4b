use crate::SerdeErr;

#[derive(Clone)]
pub struct BitReader<'b> {
    buffer: &'b [u8],
    scratch: u8,
    scratch_index: u8,
    buffer_index: usize,
    bits_read: u32,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            scratch: 0,
            scratch_index: 0,
            buffer_index: 0,
            bits_read: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        if self.scratch_index == 0 {
            let Some(byte) = self.buffer.get(self.buffer_index) else {
                return Err(SerdeErr::UnexpectedEnd {
                    bits_read: self.bits_read,
                });
            };
            self.scratch = *byte;
            self.scratch_index = 8;
            self.buffer_index += 1;
        }

        let bit = self.scratch & 1 != 0;
        self.scratch >>= 1;
        self.scratch_index -= 1;
        self.bits_read += 1;

        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output = 0;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }

    pub fn bits_read(&self) -> u32 {
        self.bits_read
    }

    /// Upper bound on bits left, counting trailing padding in the last byte
    pub fn bits_remaining(&self) -> u32 {
        let unread_bytes = self.buffer.len().saturating_sub(self.buffer_index);
        (unread_bytes as u32) * 8 + u32::from(self.scratch_index)
    }
}
