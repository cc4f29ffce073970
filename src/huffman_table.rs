use log::trace;

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::error::{bad_image, JpegError, Result};
use crate::segment::Segment;
use crate::standard_tables::*;

pub(crate) const MAX_CODE_LENGTH: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HuffmanClass {
    DC = 0,
    AC = 1,
}

impl HuffmanClass {
    fn from(tc: u8) -> Result<Self> {
        match tc {
            0 => Ok(HuffmanClass::DC),
            1 => Ok(HuffmanClass::AC),
            _ => Err(bad_image(format!("invalid Huffman table class {tc}"))),
        }
    }
}

/// The DHT wire form of a table: `counts[i]` codes of length `i + 1`, followed by their
/// symbols in code order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanSpec {
    pub counts: [u8; MAX_CODE_LENGTH],
    pub symbols: Vec<u8>,
}

impl HuffmanSpec {
    pub(crate) fn standard(class: HuffmanClass, chroma: bool) -> Self {
        let (counts, symbols): (&[u8; 16], &[u8]) = match (class, chroma) {
            (HuffmanClass::DC, false) => (&DC_LUMINANCE_COUNTS, &DC_LUMINANCE_SYMBOLS),
            (HuffmanClass::DC, true) => (&DC_CHROMINANCE_COUNTS, &DC_CHROMINANCE_SYMBOLS),
            (HuffmanClass::AC, false) => (&AC_LUMINANCE_COUNTS, &AC_LUMINANCE_SYMBOLS),
            (HuffmanClass::AC, true) => (&AC_CHROMINANCE_COUNTS, &AC_CHROMINANCE_SYMBOLS),
        };

        HuffmanSpec {
            counts: *counts,
            symbols: symbols.to_vec(),
        }
    }

    /// Canonical code assignment: consecutive values within a length, shifted left by one
    /// when moving to the next length. Yields `(symbol, code, length)` triples.
    pub(crate) fn canonical_codes(&self) -> Vec<(u8, u16, u8)> {
        let mut codes = Vec::with_capacity(self.symbols.len());
        let mut code = 0u32;
        let mut symbols = self.symbols.iter();

        for (i, &count) in self.counts.iter().enumerate() {
            for _ in 0..count {
                if let Some(&symbol) = symbols.next() {
                    codes.push((symbol, code as u16, (i + 1) as u8));
                }
                code += 1;
            }
            code <<= 1;
        }

        codes
    }

    fn validate(&self) -> Result<()> {
        let total: usize = self.counts.iter().map(|c| *c as usize).sum();
        if total != self.symbols.len() || total > 256 {
            return Err(bad_image("Huffman table symbol count mismatch"));
        }

        let mut code = 0u32;
        for (i, &count) in self.counts.iter().enumerate() {
            code += count as u32;
            if code > 1 << (i + 1) {
                return Err(bad_image("over-subscribed Huffman table"));
            }
            code <<= 1;
        }

        Ok(())
    }

    /// Appends `Tc/Th`, the 16 counts and the symbols to a DHT payload.
    pub(crate) fn write(&self, class: HuffmanClass, id: u8, payload: &mut Vec<u8>) {
        payload.push(((class as u8) << 4) | id);
        payload.extend_from_slice(&self.counts);
        payload.extend_from_slice(&self.symbols);
    }
}

/// Decode-side table: one bucket of symbols per code length plus the first canonical code of
/// each length, so a code is resolved by testing lengths 1..=16 in turn.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    pub(crate) class: HuffmanClass,
    pub(crate) id: u8,
    buckets: [Vec<u8>; MAX_CODE_LENGTH],
    first_code: [u32; MAX_CODE_LENGTH],
}

impl HuffmanTable {
    pub(crate) fn from_spec(class: HuffmanClass, id: u8, spec: &HuffmanSpec) -> Result<Self> {
        spec.validate()?;

        let mut buckets: [Vec<u8>; MAX_CODE_LENGTH] = Default::default();
        let mut first_code = [0u32; MAX_CODE_LENGTH];
        let mut code = 0u32;
        let mut offset = 0usize;

        for (i, &count) in spec.counts.iter().enumerate() {
            let count = count as usize;
            first_code[i] = code;
            buckets[i].extend_from_slice(&spec.symbols[offset..offset + count]);
            offset += count;
            code = (code + count as u32) << 1;
        }

        Ok(HuffmanTable {
            class,
            id,
            buckets,
            first_code,
        })
    }

    /// Parses every table carried by one DHT segment.
    pub(crate) fn parse_dht(segment: &mut Segment) -> Result<Vec<HuffmanTable>> {
        let mut tables = vec![];

        while !segment.is_empty() {
            let info = segment.read_u8()?;
            if info & 0xE0 != 0 {
                return Err(bad_image(format!("invalid DHT information byte {info:#04x}")));
            }

            let class = HuffmanClass::from(info >> 4)?;
            let id = info & 0x0F;
            if id > 3 {
                return Err(bad_image(format!("invalid Huffman table id {id}")));
            }

            let mut counts = [0u8; MAX_CODE_LENGTH];
            counts.copy_from_slice(segment.read_bytes(MAX_CODE_LENGTH)?);
            let total = counts.iter().map(|c| *c as usize).sum();
            let symbols = segment.read_bytes(total)?.to_vec();

            trace!("DHT {class:?} table {id}: {total} codes");
            tables.push(HuffmanTable::from_spec(class, id, &HuffmanSpec { counts, symbols })?);
        }

        Ok(tables)
    }

    pub(crate) fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let window = reader.peek_bits(MAX_CODE_LENGTH as u32);

        for (i, bucket) in self.buckets.iter().enumerate() {
            let length = i + 1;
            let code = window >> (MAX_CODE_LENGTH - length);
            let index = code.wrapping_sub(self.first_code[i]) as usize;

            if code >= self.first_code[i] && index < bucket.len() {
                reader.consume(length as u32)?;
                return Ok(bucket[index]);
            }
        }

        Err(bad_image(format!(
            "no {:?} Huffman code matches within {MAX_CODE_LENGTH} bits",
            self.class
        )))
    }
}

/// Encode-side lookup: `(code, length)` per symbol, length 0 for unassigned symbols.
#[derive(Debug, Clone)]
pub struct EncodeTable {
    codes: [(u16, u8); 256],
}

impl EncodeTable {
    pub(crate) fn from_spec(spec: &HuffmanSpec) -> Result<Self> {
        spec.validate()?;

        let mut codes = [(0u16, 0u8); 256];
        for (symbol, code, length) in spec.canonical_codes() {
            codes[symbol as usize] = (code, length);
        }

        Ok(EncodeTable { codes })
    }

    pub(crate) fn emit(&self, writer: &mut BitWriter, symbol: u8) -> Result<()> {
        match self.codes[symbol as usize] {
            (_, 0) => Err(JpegError::MissingHuffmanCode(symbol)),
            (code, length) => {
                writer.write_bits(code as u32, length as u32);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn mock_dht() -> Vec<u8> {
        let mut payload = vec![];
        HuffmanSpec::standard(HuffmanClass::DC, false).write(HuffmanClass::DC, 0, &mut payload);
        HuffmanSpec::standard(HuffmanClass::AC, true).write(HuffmanClass::AC, 1, &mut payload);
        payload
    }

    #[test]
    fn test_parse_dht() -> Result<()> {
        let payload = mock_dht();
        let mut segment = Segment::new(&payload);

        let tables = HuffmanTable::parse_dht(&mut segment)?;
        segment.finish()?;

        assert_eq!(tables.len(), 2);
        assert_eq!((tables[0].class, tables[0].id), (HuffmanClass::DC, 0));
        assert_eq!((tables[1].class, tables[1].id), (HuffmanClass::AC, 1));

        Ok(())
    }

    #[test]
    fn test_bad_dht_info_byte() -> Result<()> {
        let mut payload = mock_dht();
        payload[0] = 0x24;
        let mut segment = Segment::new(&payload);

        assert!(matches!(
            HuffmanTable::parse_dht(&mut segment),
            Err(JpegError::BadImage(_))
        ));

        payload[0] = 0x05;
        let mut segment = Segment::new(&payload);
        assert!(matches!(
            HuffmanTable::parse_dht(&mut segment),
            Err(JpegError::BadImage(_))
        ));

        Ok(())
    }

    #[test]
    fn test_canonical_codes() -> Result<()> {
        let spec = HuffmanSpec::standard(HuffmanClass::DC, false);
        let codes = spec.canonical_codes();

        assert_eq!(codes[0], (0, 0b00, 2));
        assert_eq!(codes[1], (1, 0b010, 3));
        assert_eq!(codes[5], (5, 0b110, 3));
        assert_eq!(codes[6], (6, 0b1110, 4));
        assert_eq!(codes[11], (11, 0b1_1111_1110, 9));

        Ok(())
    }

    #[test]
    fn test_decode_standard_codes() -> Result<()> {
        let spec = HuffmanSpec::standard(HuffmanClass::AC, false);
        let table = HuffmanTable::from_spec(HuffmanClass::AC, 0, &spec)?;
        let encoder = EncodeTable::from_spec(&spec)?;

        let symbols = [0x00, 0xF0, 0x01, 0xFA, 0x11, 0x62];
        let mut writer = BitWriter::new();
        for symbol in symbols {
            encoder.emit(&mut writer, symbol)?;
        }
        writer.flush();
        let bytes = writer.into_bytes();

        let mut reader = BitReader::new(&bytes);
        for symbol in symbols {
            assert_eq!(table.decode(&mut reader)?, symbol);
        }

        Ok(())
    }

    #[test]
    fn test_decode_miss() -> Result<()> {
        let spec = HuffmanSpec {
            counts: [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            symbols: vec![7],
        };
        let table = HuffmanTable::from_spec(HuffmanClass::DC, 0, &spec)?;

        let data = [0xFF, 0x00, 0xFF, 0x00];
        let mut reader = BitReader::new(&data);
        assert!(matches!(table.decode(&mut reader), Err(JpegError::BadImage(_))));

        Ok(())
    }

    #[test]
    fn test_missing_code() -> Result<()> {
        let encoder = EncodeTable::from_spec(&HuffmanSpec::standard(HuffmanClass::DC, false))?;
        let mut writer = BitWriter::new();

        assert!(matches!(
            encoder.emit(&mut writer, 0x40),
            Err(JpegError::MissingHuffmanCode(0x40))
        ));

        Ok(())
    }

    #[test]
    fn test_oversubscribed_table() -> Result<()> {
        let spec = HuffmanSpec {
            counts: [3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            symbols: vec![1, 2, 3],
        };

        assert!(matches!(
            HuffmanTable::from_spec(HuffmanClass::DC, 0, &spec),
            Err(JpegError::BadImage(_))
        ));

        Ok(())
    }
}
