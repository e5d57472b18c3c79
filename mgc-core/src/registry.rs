//! In-memory registry of every file a compile needs.
//!
//! All files are loaded up front by walking the references of each script
//! from the root. Interpretation then only looks files up.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use crate::asm::BlockAssembler;
use crate::diag::DiagnosticSink;
use crate::error::{display_name, CompileError, ErrorKind, Result, SourceLocation};
use crate::format::{BinaryFile, CodeList, FileKind, ScriptFile};

#[derive(Default)]
pub struct FileRegistry {
    scripts: HashMap<PathBuf, Rc<ScriptFile>>,
    binaries: HashMap<PathBuf, Rc<BinaryFile>>,
    codelists: HashMap<PathBuf, Rc<CodeList>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: FileKind, path: &Path) -> bool {
        match kind {
            FileKind::Script => self.scripts.contains_key(path),
            FileKind::Binary => self.binaries.contains_key(path),
            FileKind::CodeList => self.codelists.contains_key(path),
        }
    }

    pub fn script(&self, path: &Path) -> Option<Rc<ScriptFile>> {
        self.scripts.get(path).cloned()
    }

    pub fn binary(&self, path: &Path) -> Option<Rc<BinaryFile>> {
        self.binaries.get(path).cloned()
    }

    pub fn codelist(&self, path: &Path) -> Option<Rc<CodeList>> {
        self.codelists.get(path).cloned()
    }

    /// Register a script that does not come from disk.
    pub fn insert_script(&mut self, script: ScriptFile) {
        self.scripts
            .insert(script.path().to_path_buf(), Rc::new(script));
    }

    /// Load one file unless it is already present. Returns whether it was read.
    pub fn load(
        &mut self,
        path: &Path,
        kind: FileKind,
        assembler: &dyn BlockAssembler,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<bool> {
        if self.contains(kind, path) {
            return Ok(false);
        }
        match kind {
            FileKind::Script => {
                log_loading(sink, "MGC file", path);
                let text = read_text(path, "make sure it's a text file")?;
                self.insert_script(ScriptFile::parse(path, &text, assembler));
            }
            FileKind::Binary => {
                log_loading(sink, "binary file", path);
                let data = read_bytes(path)?;
                self.binaries
                    .insert(path.to_path_buf(), Rc::new(BinaryFile::new(path, data)));
            }
            FileKind::CodeList => {
                log_loading(sink, "Gecko codelist file", path);
                let text = read_text(path, "make sure it's a text file")?;
                let list = CodeList::parse(path, &text)?;
                self.codelists.insert(path.to_path_buf(), Rc::new(list));
            }
        }
        Ok(true)
    }

    /// Load `root` and, transitively, every file it references.
    ///
    /// Each referenced path resolves against the directory of the script that
    /// names it. A failed load reports the referencing line.
    pub fn load_all(
        &mut self,
        root: &Path,
        assembler: &dyn BlockAssembler,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()> {
        let mut pending: VecDeque<(PathBuf, FileKind, Option<SourceLocation>)> = VecDeque::new();
        let mut seen: HashSet<(FileKind, PathBuf)> = HashSet::new();
        pending.push_back((normalize(root), FileKind::Script, None));

        while let Some((path, kind, referenced_at)) = pending.pop_front() {
            if !seen.insert((kind, path.clone())) {
                continue;
            }
            self.load(&path, kind, assembler, sink).map_err(|e| match &referenced_at {
                Some(site) => e.at(site),
                None => e,
            })?;
            if kind != FileKind::Script {
                continue;
            }
            let Some(script) = self.script(&path) else {
                continue;
            };
            for (ref_kind, relative, line) in script.references() {
                pending.push_back((
                    resolve(script.directory(), relative),
                    ref_kind,
                    Some(SourceLocation::new(&path, line)),
                ));
            }
        }
        Ok(())
    }
}

fn log_loading(sink: &mut dyn DiagnosticSink, what: &str, path: &Path) {
    sink.emit(crate::diag::Diagnostic::new(
        crate::diag::Level::Info,
        format!("Loading {} {}", what, display_name(path)),
        None,
    ));
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CompileError::new(ErrorKind::FileNotFound {
                path: path.to_path_buf(),
            })
        } else {
            CompileError::new(ErrorKind::FileUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    })
}

fn read_text(path: &Path, hint: &str) -> Result<String> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes).map_err(|_| {
        CompileError::new(ErrorKind::FileUnreadable {
            path: path.to_path_buf(),
            reason: hint.to_string(),
        })
    })
}

/// Resolve `relative` against `base` and normalize the result.
pub fn resolve(base: &Path, relative: &str) -> PathBuf {
    normalize(&base.join(relative))
}

/// Make `path` absolute and collapse `.` and `..` without touching the disk.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::HexBlockAssembler;
    use crate::diag::CollectingSink;
    use std::fs;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn create_temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("target")
            .join(format!("test-{label}-{}-{nanos}", process::id()));
        fs::create_dir_all(&dir).expect("Create temp dir");
        dir
    }

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(
            normalize(Path::new("/mods/lib/../main/./root.mgc")),
            PathBuf::from("/mods/main/root.mgc")
        );
        assert_eq!(resolve(Path::new("/mods/lib"), "../data.bin"), PathBuf::from("/mods/data.bin"));
        assert!(normalize(Path::new("rel.mgc")).is_absolute());
    }

    #[test]
    fn discovers_files_relative_to_including_script() {
        let dir = create_temp_dir("registry-discover");
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::write(dir.join("root.mgc"), "!src lib/child.mgc\n").unwrap();
        fs::write(dir.join("lib/child.mgc"), "!file blob.bin\n!geckocodelist codes.txt\n").unwrap();
        fs::write(dir.join("lib/blob.bin"), [1u8, 2, 3]).unwrap();
        fs::write(dir.join("lib/codes.txt"), "$Code\n04000000 00000001\n").unwrap();

        let mut registry = FileRegistry::new();
        let mut sink = CollectingSink::default();
        registry
            .load_all(&dir.join("root.mgc"), &HexBlockAssembler, &mut sink)
            .unwrap();

        assert!(registry.contains(FileKind::Script, &dir.join("lib/child.mgc")));
        assert_eq!(registry.binary(&dir.join("lib/blob.bin")).unwrap().data(), &[1, 2, 3]);
        assert_eq!(registry.codelist(&dir.join("lib/codes.txt")).unwrap().data().len(), 8);
        assert_eq!(sink.diagnostics.len(), 4);
    }

    #[test]
    fn cyclic_references_terminate() {
        let dir = create_temp_dir("registry-cycle");
        fs::write(dir.join("a.mgc"), "!src b.mgc\n!src a.mgc\n").unwrap();
        fs::write(dir.join("b.mgc"), "!src a.mgc\n").unwrap();

        let mut registry = FileRegistry::new();
        let mut sink = CollectingSink::default();
        registry
            .load_all(&dir.join("a.mgc"), &HexBlockAssembler, &mut sink)
            .unwrap();
        assert_eq!(sink.diagnostics.len(), 2);
    }

    #[test]
    fn load_is_idempotent() {
        let dir = create_temp_dir("registry-idempotent");
        let path = dir.join("one.mgc");
        fs::write(&path, "AA\n").unwrap();

        let mut registry = FileRegistry::new();
        let mut sink = CollectingSink::default();
        assert!(registry.load(&path, FileKind::Script, &HexBlockAssembler, &mut sink).unwrap());
        assert!(!registry.load(&path, FileKind::Script, &HexBlockAssembler, &mut sink).unwrap());
    }

    #[test]
    fn missing_reference_reports_including_line() {
        let dir = create_temp_dir("registry-missing");
        fs::write(dir.join("root.mgc"), "AA\n\n!file nowhere.bin\n").unwrap();

        let mut registry = FileRegistry::new();
        let mut sink = CollectingSink::default();
        let err = registry
            .load_all(&dir.join("root.mgc"), &HexBlockAssembler, &mut sink)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FileNotFound { path } if path.ends_with("nowhere.bin")));
        assert_eq!(err.location().map(|l| l.line), Some(3));
    }

    #[test]
    fn binary_script_is_unreadable() {
        let dir = create_temp_dir("registry-binary-script");
        let path = dir.join("bad.mgc");
        fs::write(&path, [0xFFu8, 0xFE, 0x00]).unwrap();

        let mut registry = FileRegistry::new();
        let mut sink = CollectingSink::default();
        let err = registry
            .load(&path, FileKind::Script, &HexBlockAssembler, &mut sink)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FileUnreadable { .. }));
    }
}
