use crate::bitwriter::BitWriter;
use crate::block::Block;
use crate::error::Result;
use crate::huffman_table::{EncodeTable, HuffmanClass, HuffmanSpec};
use crate::marker::Marker;

/// Table slots in DHT order: DC luma, AC luma, DC chroma, AC chroma.
pub(crate) const TABLE_SLOTS: usize = 4;

pub(crate) fn slot(class: HuffmanClass, chroma: bool) -> usize {
    match (class, chroma) {
        (HuffmanClass::DC, false) => 0,
        (HuffmanClass::AC, false) => 1,
        (HuffmanClass::DC, true) => 2,
        (HuffmanClass::AC, true) => 3,
    }
}

/// Receives the output of the block encoder. The gather pass counts symbols; the write pass
/// emits codes.
pub(crate) trait SymbolSink {
    fn symbol(&mut self, slot: usize, symbol: u8) -> Result<()>;
    fn bits(&mut self, value: u32, count: u32);
    fn restart(&mut self, index: u8);
}

/// Gather pass: symbol frequencies per table slot.
#[derive(Debug, Clone)]
pub(crate) struct FrequencyCounter {
    pub(crate) freqs: [[u32; 256]; TABLE_SLOTS],
}

impl FrequencyCounter {
    pub(crate) fn new() -> Self {
        FrequencyCounter {
            freqs: [[0; 256]; TABLE_SLOTS],
        }
    }
}

impl SymbolSink for FrequencyCounter {
    fn symbol(&mut self, slot: usize, symbol: u8) -> Result<()> {
        self.freqs[slot][symbol as usize] += 1;
        Ok(())
    }

    fn bits(&mut self, _value: u32, _count: u32) {}

    fn restart(&mut self, _index: u8) {}
}

/// Write pass: Huffman codes and raw bits into the output stream.
pub(crate) struct HuffmanWriter {
    writer: BitWriter,
    tables: Vec<EncodeTable>,
}

impl HuffmanWriter {
    pub(crate) fn new(writer: BitWriter, specs: &[HuffmanSpec]) -> Result<Self> {
        let tables = specs
            .iter()
            .map(EncodeTable::from_spec)
            .collect::<Result<Vec<_>>>()?;

        Ok(HuffmanWriter { writer, tables })
    }

    /// A writer over the Annex K example tables.
    #[cfg(test)]
    pub(crate) fn standard(writer: BitWriter) -> Result<Self> {
        Self::new(writer, &standard_specs())
    }

    /// Pads the last byte with 1-bits and hands the stream back.
    pub(crate) fn into_writer(mut self) -> BitWriter {
        self.writer.flush();
        self.writer
    }
}

pub(crate) fn standard_specs() -> Vec<HuffmanSpec> {
    vec![
        HuffmanSpec::standard(HuffmanClass::DC, false),
        HuffmanSpec::standard(HuffmanClass::AC, false),
        HuffmanSpec::standard(HuffmanClass::DC, true),
        HuffmanSpec::standard(HuffmanClass::AC, true),
    ]
}

impl SymbolSink for HuffmanWriter {
    fn symbol(&mut self, slot: usize, symbol: u8) -> Result<()> {
        self.tables[slot].emit(&mut self.writer, symbol)
    }

    fn bits(&mut self, value: u32, count: u32) {
        self.writer.write_bits(value, count);
    }

    fn restart(&mut self, index: u8) {
        self.writer.flush();
        self.writer.write_marker(Marker::restart(index));
    }
}

/// Number of bits needed for the magnitude of `value`.
pub(crate) fn category(value: i32) -> u32 {
    32 - value.unsigned_abs().leading_zeros()
}

/// The `category` extra bits of `value`: the value itself when positive, `value - 1` in
/// `category` bits when negative.
pub(crate) fn magnitude_bits(value: i32, category: u32) -> u32 {
    match value < 0 {
        true => (value - 1) as u32 & ((1 << category) - 1),
        false => value as u32,
    }
}

/// Encodes one zig-zag ordered block: the DC difference against `predictor`, then the AC
/// coefficients as (zero run, category) symbols, ending with EOB when the tail is zero.
pub(crate) fn encode_block<S: SymbolSink>(
    sink: &mut S,
    block: &Block,
    predictor: &mut i32,
    chroma: bool,
) -> Result<()> {
    let dc = block.0[0] as i32;
    let diff = dc - *predictor;
    *predictor = dc;

    let size = category(diff);
    sink.symbol(slot(HuffmanClass::DC, chroma), size as u8)?;
    sink.bits(magnitude_bits(diff, size), size);

    let ac_slot = slot(HuffmanClass::AC, chroma);
    let mut run = 0u8;
    for &coefficient in &block.0[1..] {
        if coefficient == 0 {
            run += 1;
            continue;
        }

        while run > 15 {
            sink.symbol(ac_slot, 0xF0)?;
            run -= 16;
        }

        let value = coefficient as i32;
        let size = category(value);
        sink.symbol(ac_slot, (run << 4) | size as u8)?;
        sink.bits(magnitude_bits(value, size), size);
        run = 0;
    }

    if run > 0 {
        sink.symbol(ac_slot, 0x00)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_category() -> Result<()> {
        let cases = [(0, 0), (1, 1), (-1, 1), (2, 2), (-3, 2), (4, 3), (255, 8), (-1024, 11), (2047, 11)];
        for (value, expected) in cases {
            assert_eq!(category(value), expected, "{value}");
        }

        assert_eq!(magnitude_bits(-1, 1), 0b0);
        assert_eq!(magnitude_bits(-3, 2), 0b00);
        assert_eq!(magnitude_bits(-2, 2), 0b01);
        assert_eq!(magnitude_bits(5, 3), 0b101);

        Ok(())
    }

    #[test]
    fn test_gather_counts_symbols() -> Result<()> {
        let mut block = Block::zeroed();
        block.0[0] = 12;
        block.0[1] = -3;
        block.0[20] = 1;

        let mut counter = FrequencyCounter::new();
        let mut predictor = 10;
        encode_block(&mut counter, &block, &mut predictor, true)?;

        let dc = &counter.freqs[slot(HuffmanClass::DC, true)];
        let ac = &counter.freqs[slot(HuffmanClass::AC, true)];
        assert_eq!(dc[2], 1);
        assert_eq!(ac[0x02], 1);
        assert_eq!(ac[0xF0], 1);
        assert_eq!(ac[0x21], 1);
        assert_eq!(ac[0x00], 1);
        assert_eq!(ac.iter().sum::<u32>(), 4);
        assert_eq!(predictor, 12);

        Ok(())
    }

    #[test]
    fn test_restart_flushes_with_ones() -> Result<()> {
        let mut writer = HuffmanWriter::standard(BitWriter::new())?;
        writer.bits(0b0, 1);
        writer.restart(3);

        let bytes = writer.into_writer().into_bytes();
        assert_eq!(bytes, vec![0x7F, 0xFF, 0xD3]);

        Ok(())
    }
}
