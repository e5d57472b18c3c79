//! This crate implements the core functionality of the MGC compiler
//!
//! This mostly includes operand typing, script loading, address translation and
//! the compilation engine that assembles a save-file container image.

#![allow(clippy::uninlined_format_args)]

pub mod asm;
pub mod compiler;
pub mod diag;
pub mod error;
pub mod format;
pub mod image;
pub mod registry;
pub mod translate;
pub mod types;

pub use compiler::{Compiled, CompileOptions, Compiler, Cursors, Mode};
pub use diag::{CollectingSink, Diagnostic, DiagnosticSink, Level, LogSink};
pub use error::{CompileError, ErrorKind, Result, SourceLocation};
pub use image::Image;
pub use translate::{AddressTranslator, IdentityTranslator, RegionMap, Segment};
