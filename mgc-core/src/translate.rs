//! Translation from logical `!loc` addresses to image offsets.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, ErrorKind, Result};

/// A contiguous `(offset, len)` range inside the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub offset: usize,
    pub len: usize,
}

impl Segment {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte, saturating at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.len)
    }

    /// Whether both ranges share at least one byte.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.len > 0 && other.len > 0 && self.offset < other.end() && other.offset < self.end()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("address 0x{address:08X} is outside the addressable space")]
    Unmapped { address: u64 },
}

pub trait AddressTranslator {
    /// Map `len` bytes starting at `address` to image segments.
    ///
    /// The returned segment lengths sum to `len`, in source order.
    fn translate(&self, address: u32, len: usize) -> std::result::Result<Vec<Segment>, TranslateError>;
}

/// Maps an address to the same image offset, up to `limit`.
#[derive(Clone, Copy, Debug)]
pub struct IdentityTranslator {
    limit: usize,
}

impl IdentityTranslator {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl AddressTranslator for IdentityTranslator {
    fn translate(&self, address: u32, len: usize) -> std::result::Result<Vec<Segment>, TranslateError> {
        let start = address as usize;
        if len == 0 {
            return Ok(Vec::new());
        }
        if start >= self.limit {
            return Err(TranslateError::Unmapped { address: start as u64 });
        }
        if start + len > self.limit {
            return Err(TranslateError::Unmapped {
                address: self.limit as u64,
            });
        }
        Ok(vec![Segment::new(start, len)])
    }
}

/// One logical range and the image offset it starts at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub address: u32,
    pub length: u32,
    pub offset: usize,
}

impl Region {
    fn end(&self) -> u64 {
        self.address as u64 + self.length as u64
    }

    fn contains(&self, address: u64) -> bool {
        address >= self.address as u64 && address < self.end()
    }
}

/// A table of logical regions; writes crossing a region boundary are split.
///
/// ```yaml
/// regions:
///   - { address: 2147483648, length: 8128, offset: 8288 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMap {
    regions: Vec<Region>,
}

impl RegionMap {
    /// Regions must not overlap and must end inside the addressable image range.
    pub fn new(mut regions: Vec<Region>) -> Result<Self> {
        regions.sort_by_key(|r| r.address);
        if let Some(r) = regions
            .iter()
            .find(|r| r.offset.checked_add(r.length as usize).is_none())
        {
            return Err(CompileError::new(ErrorKind::AddressMap(format!(
                "region at 0x{:08X} maps past the end of the address space (offset 0x{:X})",
                r.address, r.offset
            ))));
        }
        for pair in regions.windows(2) {
            if pair[0].end() > pair[1].address as u64 {
                return Err(CompileError::new(ErrorKind::AddressMap(format!(
                    "regions at 0x{:08X} and 0x{:08X} overlap",
                    pair[0].address, pair[1].address
                ))));
            }
        }
        Ok(Self { regions })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let map: RegionMap = serde_yaml::from_str(text)
            .map_err(|e| CompileError::new(ErrorKind::AddressMap(e.to_string())))?;
        Self::new(map.regions)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CompileError::new(ErrorKind::FileNotFound { path: path.to_path_buf() })
            } else {
                CompileError::new(ErrorKind::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl AddressTranslator for RegionMap {
    fn translate(&self, address: u32, len: usize) -> std::result::Result<Vec<Segment>, TranslateError> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut cursor = address as u64;
        let mut remaining = len as u64;
        while remaining > 0 {
            let region = self
                .regions
                .iter()
                .find(|r| r.contains(cursor))
                .ok_or(TranslateError::Unmapped { address: cursor })?;
            let take = remaining.min(region.end() - cursor);
            let offset = usize::try_from(cursor - region.address as u64)
                .ok()
                .and_then(|delta| region.offset.checked_add(delta))
                .ok_or(TranslateError::Unmapped { address: cursor })?;
            match segments.last_mut() {
                Some(last) if last.end() == offset => last.len += take as usize,
                _ => segments.push(Segment::new(offset, take as usize)),
            }
            cursor += take;
            remaining -= take;
        }
        Ok(segments)
    }
}
