use std::fmt;
use std::path::{Path, PathBuf};

use crate::translate::TranslateError;
use crate::types::OperandError;

/// A script path plus a 1-based line number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", display_name(&self.path), self.line)
    }
}

/// Short name used in messages: the file name when there is one.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("unable to read {}: {reason}", path.display())]
    FileUnreadable { path: PathBuf, reason: String },

    #[error(transparent)]
    OperandSyntax(#[from] OperandError),

    #[error("attempting to write 0x{len:X} bytes at 0x{offset:X}, past the end of the image (size 0x{size:X})")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error(transparent)]
    Translation(#[from] TranslateError),

    #[error("cursor moved outside the address space: {value}")]
    CursorRange { value: i128 },

    #[error("MGC files are sourcing each other in an infinite loop: {}", display_name(path))]
    InclusionCycle { path: PathBuf },

    #[error("scripts are nested more than {limit} levels deep")]
    InclusionDepth { limit: usize },

    #[error("invalid address map: {0}")]
    AddressMap(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A fatal compile failure.
///
/// Carries the innermost script location and, for failures inside included
/// scripts, every enclosing include site from the inside out.
#[derive(Debug)]
pub struct CompileError {
    kind: ErrorKind,
    location: Option<SourceLocation>,
    trace: Vec<SourceLocation>,
}

impl CompileError {
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        Self {
            kind: kind.into(),
            location: None,
            trace: Vec::new(),
        }
    }

    /// Attach the innermost location. An already attached location wins.
    pub fn at(mut self, location: &SourceLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        self
    }

    /// Record an enclosing include site while unwinding.
    pub fn included_from(mut self, site: &SourceLocation) -> Self {
        if self.location.as_ref() != Some(site) && self.trace.last() != Some(site) {
            self.trace.push(site.clone());
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn trace(&self) -> &[SourceLocation] {
        &self.trace
    }
}

impl From<ErrorKind> for CompileError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<OperandError> for CompileError {
    fn from(err: OperandError) -> Self {
        Self::new(err)
    }
}

impl From<TranslateError> for CompileError {
    fn from(err: TranslateError) -> Self {
        Self::new(err)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "{}", self.kind)?;
        for site in &self.trace {
            write!(f, "\n    included from {}", site)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
