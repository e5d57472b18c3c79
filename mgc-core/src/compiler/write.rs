use crate::error::{display_name, CompileError, ErrorKind, Result, SourceLocation};
use crate::translate::Segment;

use super::{Mode, Session, WriteRecord};

impl Session<'_> {
    /// Emit `data` at the active cursor and advance it.
    ///
    /// Nothing is mutated unless every destination segment fits in the image.
    pub(super) fn write_data(&mut self, data: &[u8], location: &SourceLocation) -> Result<()> {
        let len = data.len();
        let segments = match self.cursors.mode {
            Mode::Raw => {
                self.sink.debug(format!("Writing 0x{:x} bytes in gci mode:", len), Some(location));
                let segment = Segment::new(self.cursors.raw, len);
                if !self.image.contains(&segment) {
                    return Err(CompileError::new(ErrorKind::OutOfBounds {
                        offset: self.cursors.raw,
                        len,
                        size: self.image.len(),
                    })
                    .at(location));
                }
                if len == 0 { Vec::new() } else { vec![segment] }
            }
            Mode::Location => {
                self.sink.debug(format!("Writing 0x{:x} bytes in loc mode:", len), Some(location));
                let segments = self
                    .translator
                    .translate(self.cursors.location, len)
                    .map_err(|e| CompileError::new(e).at(location))?;
                if let Some(bad) = segments.iter().find(|s| !self.image.contains(s)) {
                    return Err(CompileError::new(ErrorKind::OutOfBounds {
                        offset: bad.offset,
                        len: bad.len,
                        size: self.image.len(),
                    })
                    .at(location));
                }
                segments
            }
        };
        let mapped: usize = segments.iter().map(|s| s.len).sum();
        if mapped != len {
            return Err(CompileError::new(ErrorKind::Internal(format!(
                "translator mapped 0x{:x} of 0x{:x} bytes",
                mapped, len
            )))
            .at(location));
        }

        match self.cursors.mode {
            Mode::Raw => self.cursors.raw += len,
            Mode::Location => {
                let end = self.cursors.location as u64 + len as u64;
                self.cursors.location = u32::try_from(end).map_err(|_| {
                    CompileError::new(ErrorKind::CursorRange { value: end as i128 }).at(location)
                })?;
            }
        }

        if segments.is_empty() {
            return Ok(());
        }
        self.check_write_history(&segments, location);
        for segment in &segments {
            self.sink.debug(
                format!("        0x{:x} bytes to 0x{:x}", segment.len, segment.offset),
                Some(location),
            );
        }
        self.image.scatter(&segments, data);
        self.history.push(WriteRecord {
            segments,
            location: location.clone(),
        });
        Ok(())
    }

    /// Warn once if any segment hits bytes already written in this pass.
    fn check_write_history(&mut self, segments: &[Segment], location: &SourceLocation) {
        for segment in segments {
            for record in &self.history {
                if let Some(prior) = record.segments.iter().find(|prior| prior.overlaps(segment)) {
                    let message = format!(
                        "GCI location 0x{:x} was already written to by {} (Line {}) and is being overwritten",
                        prior.offset.max(segment.offset),
                        display_name(&record.location.path),
                        record.location.line
                    );
                    self.sink.warn(message, Some(location));
                    return;
                }
            }
        }
    }
}
