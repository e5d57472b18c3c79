//! The compilation engine.
//!
//! A [`Compiler`] holds the pluggable pieces (address translation, block
//! assembly) and the options; every call to [`Compiler::compile`] runs one or
//! two independent [`Session`]s that own the image, the cursors, the include
//! stack and the write history.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::asm::{BlockAssembler, HexBlockAssembler};
use crate::diag::{DiagnosticSink, FilteredSink};
use crate::error::{display_name, CompileError, ErrorKind, Result, SourceLocation};
use crate::format::{Command, FileKind, Op, ScriptFile};
use crate::image::{Image, DATA_START_OFFSET};
use crate::registry::{self, FileRegistry};
use crate::translate::{AddressTranslator, IdentityTranslator, Segment};
use crate::types::{self, OperandError};

mod write;


pub const MAX_INCLUDE_DEPTH: usize = 64;

const INIT_SCRIPT: &str = include_str!("../init/init_image.mgc");
const INIT_SCRIPT_PATH: &str = "/<builtin>/init_image.mgc";

#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Skip the baseline pass (`--noclean`).
    pub skip_initialization: bool,
    /// Drop info and warning diagnostics (`--silent`).
    pub suppress_output: bool,
    /// Emit per-write debug diagnostics (`--debug`).
    pub verbose_diagnostics: bool,
    pub max_include_depth: usize,
    /// Replaces the built-in baseline script.
    pub init_script: Option<PathBuf>,
    /// The baseline pass zeroes the image from here on.
    pub clear_from: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            skip_initialization: false,
            suppress_output: false,
            verbose_diagnostics: false,
            max_include_depth: MAX_INCLUDE_DEPTH,
            init_script: None,
            clear_from: DATA_START_OFFSET,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Writes go through the address translator (`!loc`).
    #[default]
    Location,
    /// Writes land directly at an image offset (`!gci`).
    Raw,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursors {
    pub mode: Mode,
    pub location: u32,
    pub raw: usize,
}

/// A finished compile.
#[derive(Clone, Debug)]
pub struct Compiled {
    pub image: Image,
    /// Cursor state after the last line of the root script.
    pub cursors: Cursors,
}

pub struct Compiler {
    translator: Option<Box<dyn AddressTranslator>>,
    assembler: Box<dyn BlockAssembler>,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            translator: None,
            assembler: Box::new(HexBlockAssembler),
            options,
        }
    }

    /// Without a translator, `!loc` addresses map to the same image offset.
    pub fn with_translator(mut self, translator: Box<dyn AddressTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_assembler(mut self, assembler: Box<dyn BlockAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile `root` on top of `image`.
    pub fn compile(
        &self,
        root: impl AsRef<Path>,
        mut image: Image,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Compiled> {
        let identity = IdentityTranslator::new(image.len());
        let translator: &dyn AddressTranslator = match &self.translator {
            Some(t) => t.as_ref(),
            None => &identity,
        };

        if !self.options.skip_initialization {
            FilteredSink::new(sink, self.options.suppress_output, false).info("Initializing GCI", None);
            image.clear_from(self.options.clear_from);
            let init_options = CompileOptions {
                skip_initialization: true,
                suppress_output: true,
                verbose_diagnostics: false,
                ..self.options.clone()
            };
            let mut session = Session::new(image, translator, self.assembler.as_ref(), sink, &init_options);
            match &self.options.init_script {
                Some(path) => session.compile_root(path)?,
                None => session.compile_builtin(INIT_SCRIPT_PATH, INIT_SCRIPT)?,
            }
            image = session.finish().image;
        }

        let mut session = Session::new(image, translator, self.assembler.as_ref(), sink, &self.options);
        session.compile_root(root.as_ref())?;
        Ok(session.finish())
    }
}

struct WriteRecord {
    segments: Vec<Segment>,
    location: SourceLocation,
}

/// State of one compile pass.
pub(crate) struct Session<'a> {
    image: Image,
    translator: &'a dyn AddressTranslator,
    assembler: &'a dyn BlockAssembler,
    sink: FilteredSink<'a>,
    max_depth: usize,
    registry: FileRegistry,
    cursors: Cursors,
    stack: Vec<PathBuf>,
    history: Vec<WriteRecord>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        image: Image,
        translator: &'a dyn AddressTranslator,
        assembler: &'a dyn BlockAssembler,
        sink: &'a mut dyn DiagnosticSink,
        options: &CompileOptions,
    ) -> Self {
        Self {
            image,
            translator,
            assembler,
            sink: FilteredSink::new(sink, options.suppress_output, options.verbose_diagnostics),
            max_depth: options.max_include_depth,
            registry: FileRegistry::new(),
            cursors: Cursors::default(),
            stack: Vec::new(),
            history: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Compiled {
        Compiled {
            image: self.image,
            cursors: self.cursors,
        }
    }

    pub(crate) fn compile_root(&mut self, root: &Path) -> Result<()> {
        let root = registry::normalize(root);
        self.registry.load_all(&root, self.assembler, &mut self.sink)?;
        self.compile_file(&root, None)
    }

    pub(crate) fn compile_builtin(&mut self, path: &str, text: &str) -> Result<()> {
        let script = ScriptFile::parse(path, text, self.assembler);
        let path = script.path().to_path_buf();
        self.registry.insert_script(script);
        self.compile_file(&path, None)
    }

    fn compile_file(&mut self, path: &Path, from: Option<&SourceLocation>) -> Result<()> {
        self.sink.info(format!("Compiling {}", display_name(path)), from);
        let located = |e: CompileError| match from {
            Some(site) => e.at(site),
            None => e,
        };

        if self.stack.iter().any(|p| p == path) {
            return Err(located(CompileError::new(ErrorKind::InclusionCycle {
                path: path.to_path_buf(),
            })));
        }
        if self.stack.len() >= self.max_depth {
            return Err(located(CompileError::new(ErrorKind::InclusionDepth {
                limit: self.max_depth,
            })));
        }
        let script = self.registry.script(path).ok_or_else(|| {
            located(CompileError::new(ErrorKind::Internal(format!(
                "{} was not loaded before compiling",
                path.display()
            ))))
        })?;

        self.stack.push(path.to_path_buf());
        let result = self.run_script(&script);
        self.stack.pop();
        result
    }

    fn run_script(&mut self, script: &Rc<ScriptFile>) -> Result<()> {
        for line in script.lines() {
            let location = SourceLocation::new(script.path(), line.number);
            for op in &line.ops {
                self.dispatch(script, op, &location)?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, script: &ScriptFile, op: &Op, location: &SourceLocation) -> Result<()> {
        match op {
            Op::Binary(text) | Op::Hex(text) => {
                let data = types::data(text).map_err(|e| CompileError::new(e).at(location))?;
                self.write_data(&data, location)
            }
            Op::Command(command) => self.command(script, command, location),
            Op::Warning(message) => {
                self.sink.warn(message.clone(), Some(location));
                Ok(())
            }
            Op::Error(e) => Err(CompileError::new(e.clone()).at(location)),
        }
    }

    fn command(&mut self, script: &ScriptFile, command: &Command, location: &SourceLocation) -> Result<()> {
        match command {
            Command::Loc(address) => {
                self.cursors.mode = Mode::Location;
                self.cursors.location = *address;
            }
            Command::Gci(address) => {
                self.cursors.mode = Mode::Raw;
                self.cursors.raw = *address as usize;
            }
            Command::Add(amount) => self.advance(*amount).map_err(|e| e.at(location))?,
            Command::Src(relative) => {
                let path = registry::resolve(script.directory(), relative);
                if !self.registry.contains(FileKind::Script, &path) {
                    return Err(not_loaded(&path).at(location));
                }
                self.compile_file(&path, Some(location))
                    .map_err(|e| e.included_from(location))?;
            }
            Command::File(relative) => {
                let path = registry::resolve(script.directory(), relative);
                let file = self
                    .registry
                    .binary(&path)
                    .ok_or_else(|| not_loaded(&path).at(location))?;
                self.write_data(file.data(), location)?;
            }
            Command::GeckoCodelist(relative) => {
                let path = registry::resolve(script.directory(), relative);
                let list = self
                    .registry
                    .codelist(&path)
                    .ok_or_else(|| not_loaded(&path).at(location))?;
                self.write_data(list.data(), location)?;
            }
            Command::String(text) => {
                if !text.is_ascii() {
                    return Err(CompileError::new(OperandError::NonAscii).at(location));
                }
                self.write_data(text.as_bytes(), location)?;
            }
            Command::Asm(index) | Command::C2 { block: index, .. } => {
                let block = script.block(*index).ok_or_else(|| {
                    CompileError::new(ErrorKind::Internal(format!(
                        "assembly block {} is missing from {}",
                        index,
                        display_name(script.path())
                    )))
                    .at(location)
                })?;
                self.sink.debug(format!("Assembly block {}: {}", index, types::to_hex(block)), Some(location));
                self.write_data(block, location)?;
            }
            Command::AsmEnd => self.sink.warn("!asmend is used without a !asm preceding it", Some(location)),
            Command::C2End => self.sink.warn("!c2end is used without a !c2 preceding it", Some(location)),
            Command::Begin => self.sink.warn("!begin is used more than once; ignoring this one", Some(location)),
            Command::End => self.sink.warn("!end is used more than once; ignoring this one", Some(location)),
            Command::Echo(text) => self.sink.info(text.clone(), None),
            Command::AsmBlock | Command::C2Block(_) => {
                return Err(CompileError::new(ErrorKind::Internal(
                    "assembly block opener survived script loading".to_string(),
                ))
                .at(location));
            }
        }
        Ok(())
    }

    /// Move the active cursor by `amount`.
    fn advance(&mut self, amount: i64) -> Result<()> {
        match self.cursors.mode {
            Mode::Location => {
                let value = self.cursors.location as i128 + amount as i128;
                self.cursors.location =
                    u32::try_from(value).map_err(|_| CompileError::new(ErrorKind::CursorRange { value }))?;
            }
            Mode::Raw => {
                let value = self.cursors.raw as i128 + amount as i128;
                self.cursors.raw =
                    usize::try_from(value).map_err(|_| CompileError::new(ErrorKind::CursorRange { value }))?;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn cursors(&self) -> Cursors {
        self.cursors
    }
}

fn not_loaded(path: &Path) -> CompileError {
    CompileError::new(ErrorKind::Internal(format!(
        "{} was referenced but never loaded",
        path.display()
    )))
}
