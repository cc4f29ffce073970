use log::debug;
use rayon::prelude::*;

use crate::assembler::{write_block, Plane};
use crate::block::{unzigzag, Block};
use crate::dispatch::Kernels;
use crate::error::Result;
use crate::frame_header::FrameHeader;

/// Quantized coefficients of one component, zig-zag ordered, one block per tile.
#[derive(Debug)]
struct ComponentCoefficients {
    rows: usize,
    cols: usize,
    blocks: Vec<Block>,
}

/// Every coefficient block of the frame, addressed as `[component][block_row][block_col]`.
/// Scans refine it in place; it is turned into samples once, at end of image.
#[derive(Debug)]
pub(crate) struct CoefficientStore {
    components: Vec<ComponentCoefficients>,
}

impl CoefficientStore {
    pub(crate) fn new(frame: &FrameHeader) -> Result<Self> {
        let mut components = Vec::with_capacity(frame.components.len());

        for index in 0..frame.components.len() {
            let (cols, rows) = frame.component_blocks(index);

            let mut blocks = Vec::new();
            blocks.try_reserve_exact(rows * cols)?;
            blocks.resize(rows * cols, Block::zeroed());

            components.push(ComponentCoefficients { rows, cols, blocks });
        }

        debug!(
            "coefficient store: {} blocks",
            components.iter().map(|c| c.blocks.len()).sum::<usize>()
        );

        Ok(CoefficientStore { components })
    }

    /// The block at `(row, col)` of `component`; positions come from the scan's MCU layout,
    /// which never leaves the component's block grid.
    pub(crate) fn block_mut(&mut self, component: usize, row: usize, col: usize) -> &mut Block {
        let c = &mut self.components[component];
        debug_assert!(row < c.rows && col < c.cols);
        &mut c.blocks[row * c.cols + col]
    }

    /// Runs the inverse DCT over every stored block, one band of block rows per task.
    pub(crate) fn inverse_transform(
        &self,
        dequant: &[[i32; 64]],
        kernels: &dyn Kernels,
    ) -> Result<Vec<Plane>> {
        let mut planes = Vec::with_capacity(self.components.len());

        for (c, table) in self.components.iter().zip(dequant.iter()) {
            let mut plane = Plane::new(c.cols * Block::WIDTH, c.rows * Block::WIDTH)?;
            let width = plane.width;

            plane
                .data
                .par_chunks_mut(width * Block::WIDTH)
                .zip(c.blocks.par_chunks(c.cols))
                .for_each(|(band, blocks)| {
                    for (col, block) in blocks.iter().enumerate() {
                        let samples = kernels.idct(&unzigzag(block), table);
                        write_block(band, width, col, &samples);
                    }
                });

            planes.push(plane);
        }

        Ok(planes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::CodingProcess;
    use crate::dispatch::ScalarKernels;
    use crate::quantization_table::QuantizationTable;
    use crate::segment::Segment;
    use anyhow::Result;

    #[test]
    fn test_store_geometry_and_transform() -> Result<()> {
        let payload = [8, 0, 9, 0, 17, 3, 1, 0x21, 0, 2, 0x11, 0, 3, 0x11, 0];
        let frame = FrameHeader::parse(CodingProcess::ProgressiveDct, &mut Segment::new(&payload))?;
        let mut store = CoefficientStore::new(&frame)?;

        assert_eq!((store.components[0].rows, store.components[0].cols), (2, 4));
        assert_eq!((store.components[2].rows, store.components[2].cols), (2, 2));

        store.block_mut(0, 1, 3).0[0] = 80;

        let table = QuantizationTable::from(0, &[1u8; 64])?;
        let planes = store.inverse_transform(&[table.dequant; 3], &ScalarKernels)?;

        assert_eq!((planes[0].width, planes[0].data.len()), (32, 32 * 16));
        assert_eq!(planes[0].row(8)[24], 138);
        assert_eq!(planes[0].row(15)[31], 138);
        assert_eq!(planes[0].row(7)[24], 128);
        assert_eq!(planes[1].row(0)[0], 128);

        Ok(())
    }
}
