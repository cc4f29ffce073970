use log::debug;

use crate::bitreader::BitReader;
use crate::block::Block;
use crate::decoder::baseline::{decode_block, MAX_DC_CATEGORY};
use crate::decoder::{Restarts, ScanTables, Session};
use crate::error::{bad_image, Result};
use crate::frame_header::FrameHeader;
use crate::huffman_table::HuffmanTable;
use crate::mcu::McuLayout;
use crate::scan_header::{ScanHeader, ScanKind};

/// Entropy state carried from block to block within one scan.
#[derive(Debug)]
struct ScanState {
    predictors: Vec<i32>,

    /// Blocks still to skip under the current end-of-band run.
    eob_run: u32,
}

impl ScanState {
    fn reset(&mut self) {
        self.predictors.fill(0);
        self.eob_run = 0;
    }
}

/// First DC scan: the difference is decoded as in a sequential scan and the coefficient is
/// stored scaled by `2^al`.
pub(crate) fn decode_dc_first(
    reader: &mut BitReader,
    table: &HuffmanTable,
    predictor: &mut i32,
    block: &mut Block,
    al: u8,
) -> Result<()> {
    let category = table.decode(reader)?;
    if category > MAX_DC_CATEGORY {
        return Err(bad_image(format!("DC category {category} out of range")));
    }
    *predictor = predictor.wrapping_add(reader.receive_extend(category)?);
    block.0[0] = (*predictor << al) as i16;
    Ok(())
}

/// DC refinement: one raw bit per block, at position `al`.
pub(crate) fn decode_dc_refine(reader: &mut BitReader, block: &mut Block, al: u8) -> Result<()> {
    if reader.read_bit()? {
        block.0[0] |= 1 << al;
    }
    Ok(())
}

/// Reads the extra bits of an end-of-band symbol with run field `r`: the run covers
/// `2^r + bits` blocks, this one included.
fn read_eob_run(reader: &mut BitReader, r: u8) -> Result<u32> {
    let mut run = 1u32 << r;
    if r > 0 {
        run += reader.read_bits(r as u32)?;
    }
    Ok(run)
}

/// First AC scan over the band `ss..=se` of one block.
pub(crate) fn decode_ac_first(
    reader: &mut BitReader,
    table: &HuffmanTable,
    block: &mut Block,
    (ss, se): (usize, usize),
    al: u8,
    eob_run: &mut u32,
) -> Result<()> {
    if *eob_run > 0 {
        *eob_run -= 1;
        return Ok(());
    }

    let mut k = ss;
    while k <= se {
        let symbol = table.decode(reader)?;
        let (r, s) = (symbol >> 4, symbol & 0x0F);

        if s == 0 {
            if r == 15 {
                k += 16;
                continue;
            }
            *eob_run = read_eob_run(reader, r)? - 1;
            break;
        }

        k += r as usize;
        if k > se {
            return Err(bad_image("AC run passes the end of the spectral band"));
        }
        block.0[k] = (reader.receive_extend(s)? << al) as i16;
        k += 1;
    }

    Ok(())
}

/// Applies one correction bit to an already non-zero coefficient.
fn refine_nonzero(reader: &mut BitReader, coefficient: &mut i16, p1: i16) -> Result<()> {
    if reader.read_bit()? && *coefficient & p1 == 0 {
        match *coefficient >= 0 {
            true => *coefficient = coefficient.wrapping_add(p1),
            false => *coefficient = coefficient.wrapping_sub(p1),
        }
    }
    Ok(())
}

/// AC refinement over the band `ss..=se` of one block. Coefficients that are already non-zero
/// get a correction bit each; zero runs count only still-zero positions, and a newly non-zero
/// coefficient takes `±2^al` from its sign bit.
pub(crate) fn decode_ac_refine(
    reader: &mut BitReader,
    table: &HuffmanTable,
    block: &mut Block,
    (ss, se): (usize, usize),
    al: u8,
    eob_run: &mut u32,
) -> Result<()> {
    let p1 = 1i16 << al;
    let mut k = ss;

    if *eob_run == 0 {
        while k <= se {
            let symbol = table.decode(reader)?;
            let (mut r, s) = (symbol >> 4, symbol & 0x0F);

            let value = match s {
                0 if r != 15 => {
                    *eob_run = read_eob_run(reader, r)?;
                    break;
                }
                0 => 0,
                1 => match reader.read_bit()? {
                    true => p1,
                    false => -p1,
                },
                _ => return Err(bad_image(format!("refinement symbol {symbol:#04x} has size {s}"))),
            };

            while k <= se {
                let coefficient = &mut block.0[k];
                if *coefficient != 0 {
                    refine_nonzero(reader, coefficient, p1)?;
                } else {
                    if r == 0 {
                        break;
                    }
                    r -= 1;
                }
                k += 1;
            }

            if value != 0 {
                if k > se {
                    return Err(bad_image("refinement run passes the end of the spectral band"));
                }
                block.0[k] = value;
            }
            k += 1;
        }
    }

    if *eob_run > 0 {
        while k <= se {
            if block.0[k] != 0 {
                refine_nonzero(reader, &mut block.0[k], p1)?;
            }
            k += 1;
        }
        *eob_run -= 1;
    }

    Ok(())
}

/// Decodes one scan into the coefficient store: any progressive scan, or a sequential scan of a
/// frame whose components are spread over several scans.
pub(super) fn decode_scan(
    session: &mut Session,
    frame: &FrameHeader,
    scan: &ScanHeader,
    tables: &ScanTables,
) -> Result<()> {
    let components: Vec<usize> = scan.components.iter().map(|c| c.component).collect();
    let layout = McuLayout::for_scan(frame, &components);
    let kind = scan.kind();
    let band = (
        scan.start_of_spectral_selection as usize,
        scan.end_of_spectral_selection as usize,
    );
    let al = scan.successive_approx_low;
    debug!(
        "{kind:?} scan: {}x{} MCUs of {} blocks",
        layout.mcus_x,
        layout.mcus_y,
        layout.blocks.len()
    );

    let store = session
        .store
        .as_mut()
        .ok_or_else(|| bad_image("no coefficient store for a buffered scan"))?;
    let reader = &mut session.reader;

    let mut state = ScanState {
        predictors: vec![0; frame.components.len()],
        eob_run: 0,
    };
    let mut restarts = Restarts::new(session.restart_interval);

    for my in 0..layout.mcus_y {
        for mx in 0..layout.mcus_x {
            if restarts.before_mcu(reader, my * layout.mcus_x + mx)? {
                state.reset();
            }

            for entry in &layout.blocks {
                let c = entry.component;
                let (row, col) = layout.block_position(mx, my, entry);
                let block = store.block_mut(c, row, col);

                match kind {
                    ScanKind::Sequential => decode_block(
                        reader,
                        tables.dc(c)?,
                        tables.ac(c)?,
                        &mut state.predictors[c],
                        block,
                    )?,
                    ScanKind::DcFirst => {
                        decode_dc_first(reader, tables.dc(c)?, &mut state.predictors[c], block, al)?
                    }
                    ScanKind::DcRefine => decode_dc_refine(reader, block, al)?,
                    ScanKind::AcFirst => {
                        decode_ac_first(reader, tables.ac(c)?, block, band, al, &mut state.eob_run)?
                    }
                    ScanKind::AcRefine => {
                        decode_ac_refine(reader, tables.ac(c)?, block, band, al, &mut state.eob_run)?
                    }
                }
            }
        }

        session.progress.update(reader.position, reader.data.len());
    }

    Ok(())
}
