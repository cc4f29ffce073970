use log::{debug, warn};

use crate::error::{JpegError, Result};
use crate::segment::Segment;

pub(crate) const JFIF_SIGNATURE: &[u8] = b"JFIF\0";
pub(crate) const EXIF_SIGNATURE: &[u8] = b"Exif\0";
pub(crate) const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

fn starts_with(segment: &Segment, signature: &[u8]) -> Result<bool> {
    let mut probe = segment.clone();
    if probe.remaining() < signature.len() {
        return Ok(false);
    }
    Ok(probe.read_bytes(signature.len())? == signature)
}

/// Validates the first APP0 chunk: it must carry a JFIF 1.x header.
pub(crate) fn check_app0(segment: &mut Segment) -> Result<()> {
    if !starts_with(segment, JFIF_SIGNATURE)? {
        return Err(JpegError::NotJpeg("APP0 chunk without a JFIF signature".to_string()));
    }

    segment.read_bytes(JFIF_SIGNATURE.len())?;
    let major = segment.read_u8()?;
    let minor = segment.read_u8()?;
    if major != 1 {
        return Err(JpegError::Unsupported(format!("JFIF version {major}.{minor:02}")));
    }

    debug!("JFIF {major}.{minor:02}");
    segment.skip_rest();
    Ok(())
}

/// Validates the first APP1 chunk by signature only; its content is not interpreted.
pub(crate) fn check_app1(segment: &mut Segment) -> Result<()> {
    if starts_with(segment, EXIF_SIGNATURE)? {
        debug!("Exif chunk, {} bytes", segment.len());
    } else if starts_with(segment, XMP_SIGNATURE)? {
        warn!("skipping XMP chunk");
    } else {
        return Err(JpegError::NotJpeg("APP1 chunk without an Exif signature".to_string()));
    }

    segment.skip_rest();
    Ok(())
}

/// APP0 payload for JFIF 1.01 with no density units, a 1:1 aspect ratio and no thumbnail.
pub(crate) fn app0_payload() -> Vec<u8> {
    let mut payload = JFIF_SIGNATURE.to_vec();
    payload.extend([1, 1, 0, 0, 1, 0, 1, 0, 0]);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_app0_round_trip() -> Result<()> {
        let payload = app0_payload();
        assert_eq!(payload.len(), 14);

        let mut segment = Segment::new(&payload);
        check_app0(&mut segment)?;
        segment.finish()?;

        Ok(())
    }

    #[test]
    fn test_app0_errors() -> Result<()> {
        let mut payload = app0_payload();
        payload[5] = 2;
        assert!(matches!(
            check_app0(&mut Segment::new(&payload)),
            Err(JpegError::Unsupported(_))
        ));

        assert!(matches!(
            check_app0(&mut Segment::new(b"JFXX\0\x10")),
            Err(JpegError::NotJpeg(_))
        ));
        assert!(matches!(
            check_app0(&mut Segment::new(b"JF")),
            Err(JpegError::NotJpeg(_))
        ));

        Ok(())
    }

    #[test]
    fn test_app1_signatures() -> Result<()> {
        let mut exif = Segment::new(b"Exif\0\0MM\0*");
        check_app1(&mut exif)?;
        exif.finish()?;

        check_app1(&mut Segment::new(XMP_SIGNATURE))?;

        assert!(matches!(
            check_app1(&mut Segment::new(b"Photoshop 3.0\0")),
            Err(JpegError::NotJpeg(_))
        ));

        Ok(())
    }
}
