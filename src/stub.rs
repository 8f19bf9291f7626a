//! Placeholder writer used when the crate is built without rendering support.
//!
//! The file produced here is a bare PNG signature followed by an IHDR chunk
//! header. It has no CRC, no image data and no end chunk, so no decoder will
//! accept it. It only marks where a real icon belongs.

use crate::error::RenderError;
use crate::icon_gen::{IconKind, IconReport, IconSpec};
use crate::render::IconRenderer;
use std::fs;
use tracing::warn;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Length of every placeholder file.
pub const STUB_LEN: usize = 29;

/// How the width and height fields of the placeholder IHDR are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderEncoding {
    /// Three zero bytes followed by the low byte of the size. Sizes of 256 and
    /// above are truncated and the header no longer matches the file name.
    #[default]
    Legacy,
    /// Proper 4-byte big-endian dimensions.
    BigEndian,
}

impl HeaderEncoding {
    fn dimension(self, size: u32) -> [u8; 4] {
        match self {
            HeaderEncoding::Legacy => [0x00, 0x00, 0x00, size as u8],
            HeaderEncoding::BigEndian => size.to_be_bytes(),
        }
    }
}

/// Build the placeholder bytes for a square icon of `size` pixels.
pub fn stub_bytes(size: u32, encoding: HeaderEncoding) -> [u8; STUB_LEN] {
    let dim = encoding.dimension(size);

    let mut out = [0u8; STUB_LEN];
    out[..8].copy_from_slice(&PNG_SIGNATURE);
    // IHDR chunk length and type
    out[8..12].copy_from_slice(&[0x00, 0x00, 0x00, 0x0D]);
    out[12..16].copy_from_slice(b"IHDR");
    out[16..20].copy_from_slice(&dim);
    out[20..24].copy_from_slice(&dim);
    // bit depth 8, RGBA, deflate, adaptive filter, no interlace
    out[24..29].copy_from_slice(&[0x08, 0x06, 0x00, 0x00, 0x00]);
    out
}

/// Read back the width field of a placeholder, if the bytes look like one.
pub fn stub_width(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 20 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    Some(u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]))
}

#[derive(Debug, Default, Clone)]
pub struct StubRenderer {
    encoding: HeaderEncoding,
}

impl StubRenderer {
    pub fn new(encoding: HeaderEncoding) -> Self {
        Self { encoding }
    }
}

impl IconRenderer for StubRenderer {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn continues_on_error(&self) -> bool {
        true
    }

    fn render(&self, spec: &IconSpec) -> Result<IconReport, RenderError> {
        let bytes = stub_bytes(spec.size(), self.encoding);
        fs::write(spec.output_path(), bytes)
            .map_err(|err| RenderError::io(spec.output_path(), err))?;

        warn!(
            "Created placeholder {} (build with the `render` feature for a real icon)",
            spec.output_path().display()
        );

        Ok(IconReport {
            size: spec.size(),
            path: spec.output_path().to_path_buf(),
            bytes_written: bytes.len() as u64,
            kind: IconKind::Placeholder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_layout() {
        let bytes = stub_bytes(48, HeaderEncoding::Legacy);
        assert_eq!(bytes.len(), 29);
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
        assert_eq!(&bytes[12..16], b"IHDR");
        assert_eq!(&bytes[16..20], &[0, 0, 0, 48]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 48]);
        assert_eq!(&bytes[24..], &[8, 6, 0, 0, 0]);
    }

    #[test]
    fn test_encodings_agree_below_256() {
        for size in [1, 16, 48, 128, 255] {
            assert_eq!(
                stub_bytes(size, HeaderEncoding::Legacy),
                stub_bytes(size, HeaderEncoding::BigEndian)
            );
        }
    }

    #[test]
    fn test_stub_width() {
        let bytes = stub_bytes(1024, HeaderEncoding::BigEndian);
        assert_eq!(stub_width(&bytes), Some(1024));
        assert_eq!(stub_width(b"not a png"), None);
    }
}
