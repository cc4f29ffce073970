use log::debug;

use crate::coding::CodingProcess;
use crate::error::{bad_image, Result};
use crate::frame_header::FrameHeader;
use crate::segment::Segment;

#[derive(Debug, Clone)]
pub(crate) struct ScanHeader {
    pub(crate) components: Vec<ScanComponentSelector>,

    /// Ss: In DCT modes of operation, this parameter specifies the first DCT coefficient in each
    /// block in zig-zag order which shall be coded in the scan. This parameter is set to zero for
    /// sequential DCT processes.
    pub(crate) start_of_spectral_selection: u8,

    /// Se: Specifies the last DCT coefficient in each block in zig-zag order which shall be coded
    /// in the scan. This parameter shall be set to 63 for sequential DCT processes.
    pub(crate) end_of_spectral_selection: u8,

    /// Ah: This parameter specifies the point transform used in the preceding scan (the successive
    /// approximation bit position low in the preceding scan) for the band of coefficients
    /// specified by Ss and Se. This parameter shall be set to zero for the first scan of each
    /// band of coefficients.
    pub(crate) successive_approx_high: u8,

    /// Al: Specifies the point transform, the bit position low, used before coding the band of
    /// coefficients specified by Ss and Se. This parameter shall be set to zero for sequential
    /// DCT processes.
    pub(crate) successive_approx_low: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScanComponentSelector {
    /// Index into the frame's component list of the component selected by Csj.
    pub(crate) component: usize,

    /// Tdj: Specifies one of four possible DC entropy coding table destinations from which the
    /// entropy table needed for decoding of the DC coefficients of component selector j is
    /// retrieved.
    pub(crate) dc_destination_id: u8,

    /// Taj: Specifies one of four possible AC entropy coding table destinations from which the
    /// entropy table needed for decoding of the AC coefficients of component selector j is
    /// retrieved.
    pub(crate) ac_destination_id: u8,
}

/// The four kinds of progressive scan, plus the single full-band scan of a sequential frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ScanKind {
    Sequential,
    DcFirst,
    DcRefine,
    AcFirst,
    AcRefine,
}

impl ScanHeader {
    pub(crate) fn parse(frame: &FrameHeader, segment: &mut Segment) -> Result<Self> {
        let count = segment.read_u8()? as usize;
        if count == 0 || count > frame.components.len() {
            return Err(bad_image(format!("scan selects {count} components")));
        }

        let mut components: Vec<ScanComponentSelector> = Vec::with_capacity(count);
        for _ in 0..count {
            let id = segment.read_u8()?;
            let tables = segment.read_u8()?;

            let component = frame
                .component_index(id)
                .ok_or_else(|| bad_image(format!("scan selects unknown component {id}")))?;
            if components.iter().any(|c| c.component == component) {
                return Err(bad_image(format!("scan selects component {id} twice")));
            }

            let (dc_destination_id, ac_destination_id) = (tables >> 4, tables & 0x0F);
            if dc_destination_id > 3 || ac_destination_id > 3 {
                return Err(bad_image(format!("invalid Huffman table selector {tables:#04x}")));
            }

            components.push(ScanComponentSelector {
                component,
                dc_destination_id,
                ac_destination_id,
            });
        }

        let start_of_spectral_selection = segment.read_u8()?;
        let end_of_spectral_selection = segment.read_u8()?;
        let approximation = segment.read_u8()?;

        let scan = ScanHeader {
            components,
            start_of_spectral_selection,
            end_of_spectral_selection,
            successive_approx_high: approximation >> 4,
            successive_approx_low: approximation & 0x0F,
        };
        scan.validate(frame.process)?;

        debug!(
            "scan: {} component(s), Ss={} Se={} Ah={} Al={}",
            scan.components.len(),
            scan.start_of_spectral_selection,
            scan.end_of_spectral_selection,
            scan.successive_approx_high,
            scan.successive_approx_low
        );

        Ok(scan)
    }

    fn validate(&self, process: CodingProcess) -> Result<()> {
        let (ss, se) = (self.start_of_spectral_selection, self.end_of_spectral_selection);
        let (ah, al) = (self.successive_approx_high, self.successive_approx_low);

        if !process.is_progressive() {
            return match (ss, se, ah, al) {
                (0, 63, 0, 0) => Ok(()),
                _ => Err(bad_image(format!(
                    "sequential scan with Ss={ss} Se={se} Ah={ah} Al={al}"
                ))),
            };
        }

        if ss > se || se > 63 {
            return Err(bad_image(format!("invalid spectral selection {ss}..={se}")));
        }
        if ss == 0 && se != 0 {
            return Err(bad_image("progressive DC scan includes AC coefficients"));
        }
        if ss > 0 && self.components.len() != 1 {
            return Err(bad_image("progressive AC scan with more than one component"));
        }
        if (ah != 0 && ah != al + 1) || al > 13 {
            return Err(bad_image(format!("invalid successive approximation Ah={ah} Al={al}")));
        }

        Ok(())
    }

    pub(crate) fn kind(&self) -> ScanKind {
        match (
            self.end_of_spectral_selection == 63 && self.start_of_spectral_selection == 0,
            self.start_of_spectral_selection == 0,
            self.successive_approx_high == 0,
        ) {
            (true, _, _) => ScanKind::Sequential,
            (false, true, true) => ScanKind::DcFirst,
            (false, true, false) => ScanKind::DcRefine,
            (false, false, true) => ScanKind::AcFirst,
            (false, false, false) => ScanKind::AcRefine,
        }
    }

    /// Appends the SOS payload for this scan, given the frame's component ids.
    pub(crate) fn write(&self, frame: &FrameHeader, payload: &mut Vec<u8>) {
        payload.push(self.components.len() as u8);
        for c in &self.components {
            payload.push(frame.components[c.component].component_id);
            payload.push((c.dc_destination_id << 4) | c.ac_destination_id);
        }
        payload.push(self.start_of_spectral_selection);
        payload.push(self.end_of_spectral_selection);
        payload.push((self.successive_approx_high << 4) | self.successive_approx_low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JpegError;
    use anyhow::Result;

    fn frame(process: CodingProcess) -> Result<FrameHeader> {
        let payload = [8, 0, 16, 0, 16, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1];
        Ok(FrameHeader::parse(process, &mut Segment::new(&payload))?)
    }

    fn parse(frame: &FrameHeader, payload: &[u8]) -> crate::error::Result<ScanHeader> {
        ScanHeader::parse(frame, &mut Segment::new(payload))
    }

    #[test]
    fn test_baseline_scan() -> Result<()> {
        let frame = frame(CodingProcess::BaselineDct)?;
        let payload = [3, 1, 0x00, 2, 0x11, 3, 0x11, 0, 63, 0];

        let scan = parse(&frame, &payload)?;
        assert_eq!(scan.kind(), ScanKind::Sequential);
        assert_eq!(scan.components[2].component, 2);
        assert_eq!(scan.components[1].ac_destination_id, 1);

        let mut written = vec![];
        scan.write(&frame, &mut written);
        assert_eq!(written, payload);

        assert!(parse(&frame, &[1, 1, 0x00, 0, 5, 0]).is_err());
        assert!(parse(&frame, &[1, 9, 0x00, 0, 63, 0]).is_err());
        assert!(parse(&frame, &[2, 1, 0x00, 1, 0x00, 0, 63, 0]).is_err());
        assert!(parse(&frame, &[1, 1, 0x40, 0, 63, 0]).is_err());

        Ok(())
    }

    #[test]
    fn test_progressive_scan_kinds() -> Result<()> {
        let frame = frame(CodingProcess::ProgressiveDct)?;

        assert_eq!(parse(&frame, &[3, 1, 0, 2, 0, 3, 0, 0, 0, 0x01])?.kind(), ScanKind::DcFirst);
        assert_eq!(parse(&frame, &[1, 2, 0, 0, 0, 0x10])?.kind(), ScanKind::DcRefine);
        assert_eq!(parse(&frame, &[1, 1, 0, 1, 5, 0x02])?.kind(), ScanKind::AcFirst);
        assert_eq!(parse(&frame, &[1, 1, 0, 6, 63, 0x21])?.kind(), ScanKind::AcRefine);

        Ok(())
    }

    #[test]
    fn test_progressive_scan_validation() -> Result<()> {
        let frame = frame(CodingProcess::ProgressiveDct)?;

        let invalid: [&[u8]; 5] = [
            &[1, 1, 0, 0, 5, 0],
            &[1, 1, 0, 6, 5, 0],
            &[2, 1, 0, 2, 0, 1, 5, 0],
            &[1, 1, 0, 1, 5, 0x31],
            &[1, 1, 0, 1, 64, 0],
        ];
        for payload in invalid {
            assert!(matches!(parse(&frame, payload), Err(JpegError::BadImage(_))));
        }

        Ok(())
    }
}
