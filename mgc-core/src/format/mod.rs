//! Loaded file formats: MGC scripts, Gecko code lists and binary blobs.

mod codelist;
mod line;
mod script;

pub use codelist::{BinaryFile, CodeList};
pub use line::{parse_line, Command, Op};
pub use script::{FileKind, ScriptFile, ScriptLine};
