use crate::block::Block;
use crate::frame_header::FrameHeader;

/// One block of an MCU: which component it belongs to and where it sits inside the MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct McuBlock {
    pub(crate) component: usize,
    pub(crate) dx: usize,
    pub(crate) dy: usize,
}

/// Block layout of one scan's MCUs, derived from the sampling factors and the scan's component
/// set.
///
/// An interleaved scan (more than one component) uses the frame's MCU grid with `Hi x Vi`
/// blocks per component per MCU. A single-component scan visits that component's blocks one at
/// a time over its own, rounded-up block grid.
#[derive(Debug, Clone)]
pub(crate) struct McuLayout {
    pub(crate) mcus_x: usize,
    pub(crate) mcus_y: usize,
    pub(crate) blocks: Vec<McuBlock>,

    /// Block columns and rows spanned by one MCU, per frame component.
    span: Vec<(usize, usize)>,
}

impl McuLayout {
    pub(crate) fn for_scan(frame: &FrameHeader, components: &[usize]) -> Self {
        let mut span = vec![(1, 1); frame.components.len()];

        if let [only] = components {
            let (width, height) = frame.component_size(*only);
            return McuLayout {
                mcus_x: width.div_ceil(Block::WIDTH),
                mcus_y: height.div_ceil(Block::WIDTH),
                blocks: vec![McuBlock {
                    component: *only,
                    dx: 0,
                    dy: 0,
                }],
                span,
            };
        }

        let (mcus_x, mcus_y) = frame.mcus();
        let mut blocks = vec![];
        for &component in components {
            let c = &frame.components[component];
            span[component] = (c.horizontal_sampling, c.vertical_sampling);

            for dy in 0..c.vertical_sampling {
                for dx in 0..c.horizontal_sampling {
                    blocks.push(McuBlock { component, dx, dy });
                }
            }
        }

        McuLayout {
            mcus_x,
            mcus_y,
            blocks,
            span,
        }
    }

    /// Block row and column, within its component's block grid, of `block` in MCU `(mx, my)`.
    pub(crate) fn block_position(&self, mx: usize, my: usize, block: &McuBlock) -> (usize, usize) {
        let (h, v) = self.span[block.component];
        (my * v + block.dy, mx * h + block.dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::CodingProcess;
    use crate::segment::Segment;
    use anyhow::Result;

    fn frame(width: u16, height: u16, luma: u8) -> Result<FrameHeader> {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.extend([3, 1, luma, 0, 2, 0x11, 1, 3, 0x11, 1]);

        Ok(FrameHeader::parse(CodingProcess::BaselineDct, &mut Segment::new(&payload))?)
    }

    #[test]
    fn test_interleaved_411_layout() -> Result<()> {
        let frame = frame(40, 20, 0x22)?;
        let layout = McuLayout::for_scan(&frame, &[0, 1, 2]);

        assert_eq!((layout.mcus_x, layout.mcus_y), (3, 2));
        assert_eq!(layout.blocks.len(), 6);
        assert_eq!(layout.blocks[3], McuBlock { component: 0, dx: 1, dy: 1 });
        assert_eq!(layout.blocks[5].component, 2);

        assert_eq!(layout.block_position(2, 1, &layout.blocks[3]), (3, 5));
        assert_eq!(layout.block_position(2, 1, &layout.blocks[4]), (1, 2));

        Ok(())
    }

    #[test]
    fn test_non_interleaved_layout() -> Result<()> {
        let frame = frame(40, 20, 0x21)?;

        let luma = McuLayout::for_scan(&frame, &[0]);
        assert_eq!((luma.mcus_x, luma.mcus_y), (5, 3));
        assert_eq!(luma.block_position(4, 2, &luma.blocks[0]), (2, 4));

        let chroma = McuLayout::for_scan(&frame, &[1]);
        assert_eq!((chroma.mcus_x, chroma.mcus_y), (3, 3));
        assert_eq!(chroma.block_position(2, 1, &chroma.blocks[0]), (1, 2));

        Ok(())
    }
}
