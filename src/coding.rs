use crate::error::{JpegError, Result};
use crate::marker::Marker;

/// The DCT coding processes this codec handles, both with Huffman entropy coding and 8-bit
/// samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CodingProcess {
    /// SOF0: every scan codes the full spectral band at full precision.
    BaselineDct,

    /// SOF2: spectral selection and successive approximation spread over several scans.
    ProgressiveDct,
}

impl CodingProcess {
    pub(crate) fn from_marker(marker: Marker) -> Result<Self> {
        match marker {
            Marker::SOF0 => Ok(CodingProcess::BaselineDct),
            Marker::SOF2 => Ok(CodingProcess::ProgressiveDct),
            other => Err(JpegError::Unsupported(format!(
                "coding process of frame marker {other:?}"
            ))),
        }
    }

    pub(crate) fn is_progressive(&self) -> bool {
        *self == CodingProcess::ProgressiveDct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_from_marker() -> Result<()> {
        assert_eq!(CodingProcess::from_marker(Marker::SOF0)?, CodingProcess::BaselineDct);
        assert!(CodingProcess::from_marker(Marker::SOF2)?.is_progressive());

        for marker in [Marker::SOF1, Marker::SOF3, Marker::SOF9, Marker::SOF15] {
            assert!(matches!(
                CodingProcess::from_marker(marker),
                Err(JpegError::Unsupported(_))
            ));
        }

        Ok(())
    }
}
