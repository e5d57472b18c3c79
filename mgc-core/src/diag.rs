//! Compile diagnostics.
//!
//! Fatal problems are returned as [`CompileError`](crate::CompileError);
//! everything else goes through a [`DiagnosticSink`].

use std::fmt;

use crate::error::SourceLocation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Debug,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>, location: Option<&SourceLocation>) -> Self {
        Self {
            level,
            message: message.into(),
            location: location.cloned(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            Level::Info => log::info!("{}", diagnostic),
            Level::Warning => log::warn!("{}", diagnostic),
            Level::Debug => log::debug!("{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Clone, Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.level == Level::Warning)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Applies the silent/debug switches of one compile pass.
pub(crate) struct FilteredSink<'a> {
    inner: &'a mut dyn DiagnosticSink,
    silent: bool,
    verbose: bool,
}

impl<'a> FilteredSink<'a> {
    pub(crate) fn new(inner: &'a mut dyn DiagnosticSink, silent: bool, verbose: bool) -> Self {
        Self {
            inner,
            silent,
            verbose,
        }
    }

    pub(crate) fn info(&mut self, message: impl Into<String>, location: Option<&SourceLocation>) {
        self.emit(Diagnostic::new(Level::Info, message, location));
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, location: Option<&SourceLocation>) {
        self.emit(Diagnostic::new(Level::Warning, message, location));
    }

    pub(crate) fn debug(&mut self, message: impl Into<String>, location: Option<&SourceLocation>) {
        if self.verbose {
            self.emit(Diagnostic::new(Level::Debug, message, location));
        }
    }
}

impl DiagnosticSink for FilteredSink<'_> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let suppressed = match diagnostic.level {
            Level::Debug => !self.verbose,
            Level::Info | Level::Warning => self.silent,
        };
        if !suppressed {
            self.inner.emit(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_levels() {
        let mut collected = CollectingSink::default();
        {
            let mut sink = FilteredSink::new(&mut collected, false, false);
            sink.info("hello", None);
            sink.warn("careful", None);
            sink.debug("noise", None);
        }
        assert_eq!(collected.diagnostics.len(), 2);
        assert_eq!(collected.warnings().count(), 1);

        let mut collected = CollectingSink::default();
        {
            let mut sink = FilteredSink::new(&mut collected, true, true);
            sink.info("hello", None);
            sink.warn("careful", None);
            sink.debug("noise", None);
        }
        assert_eq!(collected.diagnostics.len(), 1);
        assert_eq!(collected.diagnostics[0].level, Level::Debug);
    }

    #[test]
    fn display_with_location() {
        let location = SourceLocation::new("/mods/root.mgc", 7);
        let d = Diagnostic::new(Level::Warning, "overwrite", Some(&location));
        assert_eq!(d.to_string(), "root.mgc (line 7): overwrite");
    }
}
