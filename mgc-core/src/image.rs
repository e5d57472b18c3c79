use std::path::Path;

use crate::error::{CompileError, ErrorKind, Result};
use crate::translate::Segment;

/// Total size of a Melee save container.
pub const DEFAULT_IMAGE_SIZE: usize = 0x16040;

/// The earliest offset that holds save data rather than container metadata.
pub const DATA_START_OFFSET: usize = 0x2060;

/// The fixed-length output buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    bytes: Vec<u8>,
}

impl Image {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Start from an existing container file.
    pub fn from_template(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CompileError::new(ErrorKind::FileNotFound {
                    path: path.to_path_buf(),
                })
            } else {
                CompileError::new(ErrorKind::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        })?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Whether `segment` lies completely inside the image.
    pub fn contains(&self, segment: &Segment) -> bool {
        segment
            .offset
            .checked_add(segment.len)
            .is_some_and(|end| end <= self.bytes.len())
    }

    /// Zero everything from `offset` to the end.
    pub fn clear_from(&mut self, offset: usize) {
        if offset < self.bytes.len() {
            self.bytes[offset..].fill(0);
        }
    }

    /// Copy `data` into the segments in order. Callers check bounds first.
    pub(crate) fn scatter(&mut self, segments: &[Segment], data: &[u8]) {
        let mut consumed = 0;
        for segment in segments {
            self.bytes[segment.offset..segment.end()]
                .copy_from_slice(&data[consumed..consumed + segment.len]);
            consumed += segment.len;
        }
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_splits_data() {
        let mut image = Image::new(16);
        image.scatter(&[Segment::new(2, 2), Segment::new(10, 3)], &[1, 2, 3, 4, 5]);
        assert_eq!(image.as_bytes()[2..4], [1, 2]);
        assert_eq!(image.as_bytes()[10..13], [3, 4, 5]);
    }

    #[test]
    fn bounds() {
        let image = Image::new(16);
        assert!(image.contains(&Segment::new(12, 4)));
        assert!(!image.contains(&Segment::new(13, 4)));
        assert!(!image.contains(&Segment::new(usize::MAX, 2)));
    }

    #[test]
    fn clear_from_keeps_header() {
        let mut image = Image::from_bytes(vec![0xFF; 8]);
        image.clear_from(4);
        assert_eq!(image.as_bytes(), &[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]);
        image.clear_from(100);
        assert_eq!(image.len(), 8);
    }
}
