use std::path::{Path, PathBuf};

use crate::error::{CompileError, Result, SourceLocation};
use crate::types;

/// A Gecko code list decoded to raw code bytes.
///
/// `$` lines name a code and `*` lines are notes; both are skipped along with
/// blank lines. Every other line holds code words in hex.
#[derive(Clone, Debug)]
pub struct CodeList {
    path: PathBuf,
    data: Vec<u8>,
}

impl CodeList {
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let mut data = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('$') || line.starts_with('*') {
                continue;
            }
            let bytes = types::hex_string(line)
                .map_err(|e| CompileError::new(e).at(&SourceLocation::new(&path, i + 1)))?;
            data.extend(bytes);
        }
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A binary file embedded verbatim.
#[derive(Clone, Debug)]
pub struct BinaryFile {
    path: PathBuf,
    data: Vec<u8>,
}

impl BinaryFile {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn skips_names_and_notes() {
        let text = "$Infinite Jumps [author]\n*Lets you jump forever\n04123456 00000001\n\nC2000010 00000001\n";
        let list = CodeList::parse("codes.txt", text).unwrap();
        assert_eq!(types::to_hex(list.data()), "0412345600000001C200001000000001");
    }

    #[test]
    fn bad_code_line_reports_its_line() {
        let err = CodeList::parse("codes.txt", "$Name\n0412345 00000001\n").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OperandSyntax(_)));
        assert_eq!(err.location().map(|l| l.line), Some(2));
    }
}
