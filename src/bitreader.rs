use log::trace;

use crate::error::{bad_image, JpegError, Result};
use crate::marker::Marker;
use crate::segment::Segment;

/// Byte and bit cursor over a caller-owned JPEG buffer.
///
/// Outside entropy-coded data the reader works byte-wise (`read_u8`, `read_u16`, `next_marker`,
/// `read_segment`). Inside a scan, bits are pulled MSB-first into a left-aligned 64-bit window;
/// the `0x00` stuffed after every literal `0xFF` is dropped on refill and the window never
/// extends past a real marker.
pub struct BitReader<'a> {
    pub(crate) data: &'a [u8],
    pub(crate) position: usize,
    bit_buffer: u64,
    bit_count: u32,
    hit_marker: bool,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            position: 0,
            bit_buffer: 0,
            bit_count: 0,
            hit_marker: false,
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.position).ok_or(JpegError::Truncated)?;
        self.position += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes([self.read_u8()?, self.read_u8()?]))
    }

    /// Reads a two-byte length and returns the chunk payload that follows it.
    pub(crate) fn read_segment(&mut self) -> Result<Segment<'a>> {
        let length = self.read_u16()? as usize;
        if length < 2 {
            return Err(bad_image(format!("segment length {length} is too short")));
        }

        let end = self.position + length - 2;
        let payload = self.data.get(self.position..end).ok_or(JpegError::Truncated)?;
        self.position = end;

        Ok(Segment::new(payload))
    }

    /// Scans forward to the next marker, skipping fill bytes (`0xFF` runs), stuffed zeros and
    /// stray data between chunks. Returns the raw low byte of the marker.
    pub(crate) fn next_marker(&mut self) -> Result<u8> {
        self.reset_bits();

        loop {
            if self.read_u8()? != Marker::GLOBAL as u8 {
                continue;
            }

            let mut code = self.read_u8()?;
            while code == Marker::GLOBAL as u8 {
                code = self.read_u8()?;
            }

            if code != Marker::STUFF as u8 {
                trace!("marker 0xFF{code:02X} at offset {}", self.position - Marker::SIZE);
                return Ok(code);
            }
        }
    }

    /// Discards buffered bits so the next read starts on a byte boundary.
    pub(crate) fn reset_bits(&mut self) {
        self.bit_buffer = 0;
        self.bit_count = 0;
        self.hit_marker = false;
    }

    fn fill(&mut self) {
        while self.bit_count <= 56 && !self.hit_marker {
            let Some(&byte) = self.data.get(self.position) else {
                break;
            };

            if byte == Marker::GLOBAL as u8 {
                match self.data.get(self.position + 1) {
                    None => break,
                    Some(&next) if next == Marker::STUFF as u8 => self.position += 2,
                    Some(_) => {
                        self.hit_marker = true;
                        break;
                    }
                }
            } else {
                self.position += 1;
            }

            self.bit_buffer |= (byte as u64) << (56 - self.bit_count);
            self.bit_count += 8;
        }
    }

    fn exhausted(&self) -> JpegError {
        match self.hit_marker {
            true => bad_image("unexpected marker inside entropy-coded data"),
            false => JpegError::Truncated,
        }
    }

    /// Returns the next `n` bits without consuming them. Bits past the end of the available
    /// data read as zero; `consume` reports the shortfall.
    pub(crate) fn peek_bits(&mut self, n: u32) -> u32 {
        debug_assert!(n > 0 && n <= 32);
        if self.bit_count < n {
            self.fill();
        }
        (self.bit_buffer >> (64 - n)) as u32
    }

    pub(crate) fn consume(&mut self, n: u32) -> Result<()> {
        if self.bit_count < n {
            self.fill();
            if self.bit_count < n {
                return Err(self.exhausted());
            }
        }
        self.bit_buffer <<= n;
        self.bit_count -= n;
        Ok(())
    }

    pub(crate) fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        let value = self.peek_bits(n);
        self.consume(n)?;
        Ok(value)
    }

    pub(crate) fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads `category` raw bits and sign-extends them: a leading zero bit marks a negative
    /// value, `raw - (2^category - 1)`.
    pub(crate) fn receive_extend(&mut self, category: u8) -> Result<i32> {
        if category == 0 {
            return Ok(0);
        }
        if category > 16 {
            return Err(bad_image(format!("coefficient category {category} out of range")));
        }
        let raw = self.read_bits(category as u32)? as i32;
        Ok(extend(raw, category))
    }
}

pub(crate) fn extend(raw: i32, category: u8) -> i32 {
    match raw < (1 << (category - 1)) {
        true => raw - ((1 << category) - 1),
        false => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_read_bits() -> Result<()> {
        let data = vec![4, 21, 69];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(8)?, 4);
        assert_eq!(reader.read_bits(3)?, 0b000);
        assert_eq!(reader.read_bits(5)?, 0b10101);
        assert!(!reader.read_bit()?);
        assert!(reader.read_bit()?);
        assert_eq!(reader.read_bits(6)?, 0b000101);

        assert!(matches!(reader.read_bit(), Err(JpegError::Truncated)));

        Ok(())
    }

    #[test]
    fn test_stuffed_bytes_are_skipped() -> Result<()> {
        let data = vec![0xFF, 0x00, 0xAB, 0xFF, 0x00];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(16)?, 0xFFAB);
        assert_eq!(reader.read_bits(8)?, 0xFF);

        Ok(())
    }

    #[test]
    fn test_marker_stops_bit_reads() -> Result<()> {
        let data = vec![0xA5, 0xFF, 0xD9];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(8)?, 0xA5);
        assert!(matches!(reader.read_bit(), Err(JpegError::BadImage(_))));
        assert_eq!(reader.next_marker()?, Marker::EOI as u8);

        Ok(())
    }

    #[test]
    fn test_truncated_mid_marker() -> Result<()> {
        let data = vec![0x12, 0xFF];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(8)?, 0x12);
        assert!(matches!(reader.read_bits(4), Err(JpegError::Truncated)));
        assert!(matches!(reader.next_marker(), Err(JpegError::Truncated)));

        Ok(())
    }

    #[test]
    fn test_next_marker_skips_fill() -> Result<()> {
        let data = vec![0x00, 0xFF, 0x00, 0xFF, 0xFF, 0xFF, 0xDB, 0x00, 0x03, 0x07];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.next_marker()?, Marker::DQT as u8);
        let mut segment = reader.read_segment()?;
        assert_eq!(segment.read_u8()?, 7);
        segment.finish()?;

        Ok(())
    }

    #[test]
    fn test_extend() -> Result<()> {
        let test_cases = vec![
            (0b0, 1, -1),
            (0b1, 1, 1),
            (0b00, 2, -3),
            (0b01, 2, -2),
            (0b10, 2, 2),
            (0b011, 3, -4),
            (0b100, 3, 4),
        ];

        for (raw, category, expected) in test_cases {
            assert_eq!(extend(raw, category), expected);
        }

        Ok(())
    }
}
