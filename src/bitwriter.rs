use crate::marker::Marker;

/// Byte sink for the encoder. Header bytes go out verbatim; entropy-coded bits are packed
/// MSB-first and every emitted `0xFF` is followed by a stuffed `0x00`.
#[derive(Debug, Default)]
pub struct BitWriter {
    out: Vec<u8>,
    accumulator: u32,
    count: u32,
}

impl BitWriter {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        BitWriter {
            out: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Appends the low `n` bits of `value`. `n` is at most 16.
    pub(crate) fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 16);
        if n == 0 {
            return;
        }

        self.accumulator = (self.accumulator << n) | (value & ((1 << n) - 1));
        self.count += n;

        while self.count >= 8 {
            let byte = (self.accumulator >> (self.count - 8)) as u8;
            self.out.push(byte);
            if byte == Marker::GLOBAL as u8 {
                self.out.push(Marker::STUFF as u8);
            }
            self.count -= 8;
        }
        self.accumulator &= (1 << self.count) - 1;
    }

    /// Pads the pending partial byte with 1-bits.
    pub(crate) fn flush(&mut self) {
        if self.count > 0 {
            let pad = 8 - self.count;
            self.write_bits((1 << pad) - 1, pad);
        }
    }

    pub(crate) fn write_u16(&mut self, value: u16) {
        debug_assert_eq!(self.count, 0);
        self.out.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.count, 0);
        self.out.extend_from_slice(bytes);
    }

    pub(crate) fn write_marker(&mut self, marker: Marker) {
        self.write_u16(marker.to_u16());
    }

    /// Writes a marker followed by the length field and `payload`.
    pub(crate) fn write_segment(&mut self, marker: Marker, payload: &[u8]) {
        self.write_marker(marker);
        self.write_u16((payload.len() + 2) as u16);
        self.write_bytes(payload);
    }

    pub(crate) fn len(&self) -> usize {
        self.out.len()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_write_bits() -> Result<()> {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0b00001, 5);
        writer.write_bits(0b11, 2);
        writer.flush();

        assert_eq!(writer.into_bytes(), vec![0b1010_0001, 0b1111_1111, 0x00]);

        Ok(())
    }

    #[test]
    fn test_byte_stuffing() -> Result<()> {
        let mut writer = BitWriter::new();
        writer.write_bits(0xFFFF, 16);
        writer.write_bits(0x12, 8);

        assert_eq!(writer.len(), 5);
        assert_eq!(writer.into_bytes(), vec![0xFF, 0x00, 0xFF, 0x00, 0x12]);

        Ok(())
    }

    #[test]
    fn test_write_segment() -> Result<()> {
        let mut writer = BitWriter::with_capacity(8);
        writer.write_segment(Marker::DRI, &[0x00, 0x04]);

        assert_eq!(writer.into_bytes(), vec![0xFF, 0xDD, 0x00, 0x04, 0x00, 0x04]);

        Ok(())
    }
}
