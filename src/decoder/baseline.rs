use log::debug;

use crate::assembler::{assemble, Plane};
use crate::bitreader::BitReader;
use crate::block::{unzigzag, Block};
use crate::decoder::{Restarts, ScanTables, Session};
use crate::error::{bad_image, Result};
use crate::frame_header::FrameHeader;
use crate::huffman_table::HuffmanTable;
use crate::image::Image;
use crate::mcu::McuLayout;
use crate::scan_header::ScanHeader;

/// Largest DC difference category for 8-bit samples.
pub(crate) const MAX_DC_CATEGORY: u8 = 11;

/// Decodes one full-band block into `block`, in zig-zag order. `predictor` holds the previous
/// DC value of the same component and is updated.
pub(crate) fn decode_block(
    reader: &mut BitReader,
    dc: &HuffmanTable,
    ac: &HuffmanTable,
    predictor: &mut i32,
    block: &mut Block,
) -> Result<()> {
    let category = dc.decode(reader)?;
    if category > MAX_DC_CATEGORY {
        return Err(bad_image(format!("DC category {category} out of range")));
    }
    *predictor = predictor.wrapping_add(reader.receive_extend(category)?);
    block.0[0] = *predictor as i16;

    let mut k = 1;
    while k < Block::LEN {
        let symbol = ac.decode(reader)?;
        let (run, category) = ((symbol >> 4) as usize, symbol & 0x0F);

        if category == 0 {
            match run {
                15 => {
                    k += 16;
                    continue;
                }
                _ => break,
            }
        }

        k += run;
        if k >= Block::LEN {
            return Err(bad_image("AC run passes the end of the block"));
        }
        block.0[k] = reader.receive_extend(category)? as i16;
        k += 1;
    }

    Ok(())
}

/// Decodes the single interleaved scan of a sequential frame, transforming and writing out each
/// MCU row as soon as it is complete.
pub(super) fn decode_scan(
    session: &mut Session,
    frame: &FrameHeader,
    scan: &ScanHeader,
    tables: &ScanTables,
) -> Result<()> {
    let components: Vec<usize> = scan.components.iter().map(|c| c.component).collect();
    let layout = McuLayout::for_scan(frame, &components);
    let dequant = session.dequant_tables(frame)?;
    debug!(
        "streaming scan: {}x{} MCUs of {} blocks",
        layout.mcus_x,
        layout.mcus_y,
        layout.blocks.len()
    );

    let mut image = Image::new(
        frame.image_width,
        frame.image_height,
        Session::native_format(frame),
    )?;
    let mut planes = frame
        .components
        .iter()
        .map(|c| {
            Plane::new(
                layout.mcus_x * c.horizontal_sampling * Block::WIDTH,
                c.vertical_sampling * Block::WIDTH,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let (_, mcu_height) = frame.mcu_size();
    let mut predictors = vec![0i32; frame.components.len()];
    let mut restarts = Restarts::new(session.restart_interval);

    for my in 0..layout.mcus_y {
        for mx in 0..layout.mcus_x {
            if restarts.before_mcu(&mut session.reader, my * layout.mcus_x + mx)? {
                predictors.fill(0);
            }

            for entry in &layout.blocks {
                let c = entry.component;
                let mut block = Block::zeroed();
                decode_block(
                    &mut session.reader,
                    tables.dc(c)?,
                    tables.ac(c)?,
                    &mut predictors[c],
                    &mut block,
                )?;

                let samples = session.kernels.idct(&unzigzag(&block), &dequant[c]);
                let block_col = mx * frame.components[c].horizontal_sampling + entry.dx;
                planes[c].store_block(entry.dy, block_col, &samples);
            }
        }

        let rows = my * mcu_height..((my + 1) * mcu_height).min(frame.image_height);
        assemble(frame, &planes, my, rows, &mut image, session.kernels);
        session.report_progress();
    }

    session.image = Some(image);
    Ok(())
}
