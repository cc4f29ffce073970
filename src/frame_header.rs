use log::debug;

use crate::block::Block;
use crate::coding::CodingProcess;
use crate::error::{bad_image, JpegError, Result};
use crate::segment::Segment;

#[derive(Debug, Clone)]
pub(crate) struct FrameHeader {
    pub(crate) process: CodingProcess,

    /// Y: Number of lines -- Specifies the maximum number of lines in the source image. This shall
    /// be equal to the number of lines in the component with the maximum number of vertical samples.
    pub(crate) image_height: usize,

    /// X: Number of samples per line -- Specifies the maximum number of samples per line in the
    /// source image. This shall be equal to the number of samples per line in the component with
    /// the maximum number of horizontal samples.
    pub(crate) image_width: usize,

    /// One entry per frame component specification (Ci, Hi, Vi, Tqi), in frame order. Holds one
    /// (grayscale) or three (YCbCr) components.
    pub(crate) components: Vec<Component>,
}

/// One of the two-dimensional arrays which comprise an image
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Component {
    /// Ci: Assigns a unique label to the ith component in the sequence of frame component specification
    /// parameters. These values shall be used in the scan headers to identify the components in the
    /// scan.
    pub(crate) component_id: u8,

    /// Hi: Specifies the relationship between the component horizontal dimension and `image_width`
    /// ; also specifies the number of horizontal data units of component Ci in each MCU,
    /// when more than one component is encoded in a scan.
    pub(crate) horizontal_sampling: usize,

    /// Vi: Specifies the relationship between the component vertical dimension and `image_height`
    /// ; also specifies the number of vertical data units of component Ci in each MCU, when more
    /// than one component is encoded in a scan.
    pub(crate) vertical_sampling: usize,

    /// Tqi: Specifies one of four possible quantization destinations from which the quantization table
    /// to use for dequantization of DCT coefficients of component Ci is retrieved. If the decoding
    /// process uses the dequantization process, this table shall have been installed in this
    /// destination by the time the decoder is ready to decode the scan(s) containing component Ci.
    pub(crate) qt_table_id: u8,
}

impl Component {
    pub(crate) fn from(component_id: u8, horizontal: usize, vertical: usize, qt_table_id: u8) -> Self {
        Component {
            component_id,
            horizontal_sampling: horizontal,
            vertical_sampling: vertical,
            qt_table_id,
        }
    }
}

/// Luma sampling factors the MCU assembler knows how to reconstruct.
const LUMA_SAMPLING: [(usize, usize); 4] = [(1, 1), (2, 1), (1, 2), (2, 2)];

impl FrameHeader {
    pub(crate) fn parse(process: CodingProcess, segment: &mut Segment) -> Result<Self> {
        let precision = segment.read_u8()?;
        if precision != 8 {
            return Err(JpegError::Unsupported(format!("{precision}-bit sample precision")));
        }

        let image_height = segment.read_u16()? as usize;
        let image_width = segment.read_u16()? as usize;
        if image_width == 0 {
            return Err(bad_image("frame width is zero"));
        }
        if image_height == 0 {
            return Err(JpegError::Unsupported("height defined by a DNL marker".to_string()));
        }

        let count = segment.read_u8()?;
        if count != 1 && count != 3 {
            return Err(JpegError::Unsupported(format!("{count} image components")));
        }

        let mut components: Vec<Component> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = segment.read_u8()?;
            let sampling = segment.read_u8()?;
            let qt_table_id = segment.read_u8()?;

            if components.iter().any(|c| c.component_id == id) {
                return Err(bad_image(format!("duplicate component id {id}")));
            }
            if qt_table_id > 3 {
                return Err(bad_image(format!("invalid quantization table id {qt_table_id}")));
            }

            let (h, v) = ((sampling >> 4) as usize, (sampling & 0x0F) as usize);
            if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
                return Err(bad_image(format!("invalid sampling factors {h}x{v}")));
            }

            components.push(Component::from(id, h, v, qt_table_id));
        }

        let mut frame = FrameHeader {
            process,
            image_height,
            image_width,
            components,
        };
        frame.check_sampling()?;

        debug!(
            "{:?} frame {}x{}, {} component(s), luma sampling {}x{}",
            frame.process,
            frame.image_width,
            frame.image_height,
            frame.components.len(),
            frame.components[0].horizontal_sampling,
            frame.components[0].vertical_sampling
        );

        Ok(frame)
    }

    fn check_sampling(&mut self) -> Result<()> {
        if let [only] = self.components.as_mut_slice() {
            // a lone component is always coded non-interleaved, so its factors carry no meaning
            only.horizontal_sampling = 1;
            only.vertical_sampling = 1;
            return Ok(());
        }

        let luma = &self.components[0];
        let luma_sampling = (luma.horizontal_sampling, luma.vertical_sampling);
        if !LUMA_SAMPLING.contains(&luma_sampling) {
            return Err(JpegError::Unsupported(format!(
                "luma sampling {}x{}",
                luma_sampling.0, luma_sampling.1
            )));
        }

        if self.components[1..]
            .iter()
            .any(|c| c.horizontal_sampling != 1 || c.vertical_sampling != 1)
        {
            return Err(JpegError::Unsupported("subsampled luma or oversampled chroma".to_string()));
        }

        Ok(())
    }

    /// Appends the SOF payload for this frame.
    pub(crate) fn write(&self, payload: &mut Vec<u8>) {
        payload.push(8);
        payload.extend_from_slice(&(self.image_height as u16).to_be_bytes());
        payload.extend_from_slice(&(self.image_width as u16).to_be_bytes());
        payload.push(self.components.len() as u8);

        for c in &self.components {
            payload.push(c.component_id);
            payload.push(((c.horizontal_sampling as u8) << 4) | c.vertical_sampling as u8);
            payload.push(c.qt_table_id);
        }
    }

    pub(crate) fn is_grayscale(&self) -> bool {
        self.components.len() == 1
    }

    pub(crate) fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.component_id == id)
    }

    pub(crate) fn max_horizontal(&self) -> usize {
        self.components.iter().map(|c| c.horizontal_sampling).max().unwrap_or(1)
    }

    pub(crate) fn max_vertical(&self) -> usize {
        self.components.iter().map(|c| c.vertical_sampling).max().unwrap_or(1)
    }

    /// Width and height in pixels of one interleaved MCU.
    pub(crate) fn mcu_size(&self) -> (usize, usize) {
        (self.max_horizontal() * Block::WIDTH, self.max_vertical() * Block::WIDTH)
    }

    /// Interleaved MCU grid covering the whole image.
    pub(crate) fn mcus(&self) -> (usize, usize) {
        let (mcu_width, mcu_height) = self.mcu_size();
        (
            self.image_width.div_ceil(mcu_width),
            self.image_height.div_ceil(mcu_height),
        )
    }

    /// Samples per line and lines of component `index`, before padding to whole blocks.
    pub(crate) fn component_size(&self, index: usize) -> (usize, usize) {
        let c = &self.components[index];
        (
            (self.image_width * c.horizontal_sampling).div_ceil(self.max_horizontal()),
            (self.image_height * c.vertical_sampling).div_ceil(self.max_vertical()),
        )
    }

    /// Block columns and rows stored for component `index`: the interleaved MCU grid, which
    /// also covers every block a non-interleaved scan of that component visits.
    pub(crate) fn component_blocks(&self, index: usize) -> (usize, usize) {
        let c = &self.components[index];
        let (mcus_x, mcus_y) = self.mcus();
        (mcus_x * c.horizontal_sampling, mcus_y * c.vertical_sampling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn sof(width: u16, height: u16, components: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.push(components.len() as u8);
        for &(id, sampling, tq) in components {
            payload.extend([id, sampling, tq]);
        }
        payload
    }

    #[test]
    fn test_parse_422_frame() -> Result<()> {
        let payload = sof(33, 17, &[(1, 0x21, 0), (2, 0x11, 1), (3, 0x11, 1)]);
        let mut segment = Segment::new(&payload);

        let frame = FrameHeader::parse(CodingProcess::BaselineDct, &mut segment)?;
        segment.finish()?;

        assert_eq!(frame.mcu_size(), (16, 8));
        assert_eq!(frame.mcus(), (3, 3));
        assert_eq!(frame.component_size(0), (33, 17));
        assert_eq!(frame.component_size(1), (17, 17));
        assert_eq!(frame.component_blocks(0), (6, 3));
        assert_eq!(frame.component_blocks(1), (3, 3));
        assert_eq!(frame.component_index(3), Some(2));

        let mut written = vec![];
        frame.write(&mut written);
        assert_eq!(written, payload);

        Ok(())
    }

    #[test]
    fn test_grayscale_sampling_is_ignored() -> Result<()> {
        let payload = sof(9, 9, &[(1, 0x22, 0)]);
        let frame = FrameHeader::parse(CodingProcess::ProgressiveDct, &mut Segment::new(&payload))?;

        assert!(frame.is_grayscale());
        assert_eq!(frame.mcus(), (2, 2));

        Ok(())
    }

    #[test]
    fn test_rejected_frames() -> Result<()> {
        let cases = [
            sof(8, 8, &[(1, 0x11, 0), (2, 0x11, 0)]),
            sof(8, 8, &[(1, 0x31, 0), (2, 0x11, 0), (3, 0x11, 0)]),
            sof(8, 8, &[(1, 0x22, 0), (2, 0x21, 0), (3, 0x11, 0)]),
            sof(8, 0, &[(1, 0x11, 0)]),
        ];
        for payload in cases {
            assert!(matches!(
                FrameHeader::parse(CodingProcess::BaselineDct, &mut Segment::new(&payload)),
                Err(JpegError::Unsupported(_))
            ));
        }

        let mut twelve_bit = sof(8, 8, &[(1, 0x11, 0)]);
        twelve_bit[0] = 12;
        assert!(matches!(
            FrameHeader::parse(CodingProcess::BaselineDct, &mut Segment::new(&twelve_bit)),
            Err(JpegError::Unsupported(_))
        ));

        let bad = [
            sof(0, 8, &[(1, 0x11, 0)]),
            sof(8, 8, &[(1, 0x11, 4)]),
            sof(8, 8, &[(1, 0x11, 0), (1, 0x11, 0), (3, 0x11, 0)]),
            sof(8, 8, &[(1, 0x01, 0)]),
        ];
        for payload in bad {
            assert!(matches!(
                FrameHeader::parse(CodingProcess::BaselineDct, &mut Segment::new(&payload)),
                Err(JpegError::BadImage(_))
            ));
        }

        Ok(())
    }
}
