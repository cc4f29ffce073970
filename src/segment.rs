use crate::error::{bad_image, Result};

/// Cursor over the payload of one marker segment. Reads are bounded by the declared length:
/// running past it, or leaving bytes unread at `finish`, means the length field and the
/// content disagree.
#[derive(Debug, Clone)]
pub(crate) struct Segment<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Segment<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Segment { data, cursor: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.cursor)
            .ok_or_else(|| bad_image("segment content overruns its declared length"))?;
        self.cursor += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes([self.read_u8()?, self.read_u8()?]))
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self
            .data
            .get(self.cursor..self.cursor + n)
            .ok_or_else(|| bad_image("segment content overruns its declared length"))?;
        self.cursor += n;
        Ok(bytes)
    }

    /// Consumes the rest of the payload; used for chunks whose content is ignored.
    pub(crate) fn skip_rest(&mut self) {
        self.cursor = self.data.len();
    }

    pub(crate) fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(bad_image(format!(
                "segment declares {n} more bytes than its content uses"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JpegError;
    use anyhow::Result;

    #[test]
    fn test_exact_consumption() -> Result<()> {
        let data = [0x01, 0x02, 0x03];
        let mut segment = Segment::new(&data);

        assert_eq!(segment.read_u16()?, 0x0102);
        assert_eq!(segment.remaining(), 1);
        assert!(matches!(segment.read_bytes(2), Err(JpegError::BadImage(_))));
        assert_eq!(segment.read_bytes(1)?, &[0x03]);
        assert!(segment.is_empty());
        segment.finish()?;

        Ok(())
    }

    #[test]
    fn test_leftover_bytes() -> Result<()> {
        let data = [0x01, 0x02];
        let mut segment = Segment::new(&data);
        segment.read_u8()?;

        assert!(matches!(segment.finish(), Err(JpegError::BadImage(_))));

        Ok(())
    }
}
