use crate::identity::IdentityKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

impl DiagnosticLevel {
    fn label(self) -> &'static str {
        match self {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
        }
    }
}

/// A caller-visible report about a cache operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// Key of the entry the report is about, if any
    pub key: Option<IdentityKey>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, key: Option<IdentityKey>, message: impl Into<String>) -> Self {
        Self {
            level,
            key,
            message: message.into(),
        }
    }
}

/// Sink for construction failures, disposal faults and reload drops
pub trait DiagnosticHandler: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    fn error(&self, key: Option<IdentityKey>, message: &str) {
        self.report(Diagnostic::new(DiagnosticLevel::Error, key, message));
    }

    fn warning(&self, key: Option<IdentityKey>, message: &str) {
        self.report(Diagnostic::new(DiagnosticLevel::Warning, key, message));
    }

    fn info(&self, key: Option<IdentityKey>, message: &str) {
        self.report(Diagnostic::new(DiagnosticLevel::Info, key, message));
    }

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn error_count(&self) -> usize;
    fn warning_count(&self) -> usize;
}

/// Prints each report to stderr and keeps only the counts
pub struct ConsoleDiagnosticHandler {
    pretty: bool,
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

impl ConsoleDiagnosticHandler {
    pub fn new(pretty: bool) -> Self {
        Self {
            pretty,
            errors: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        }
    }
}

impl DiagnosticHandler for ConsoleDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        let subject = diagnostic
            .key
            .map(|key| key.to_string())
            .unwrap_or_else(|| "cache".to_string());
        let level = diagnostic.level.label();

        if self.pretty {
            eprintln!("\x1b[1m{}\x1b[0m [{}]: {}", level, subject, diagnostic.message);
        } else {
            eprintln!("{} [{}]: {}", level, subject, diagnostic.message);
        }

        match diagnostic.level {
            DiagnosticLevel::Error => self.errors.fetch_add(1, Ordering::Relaxed),
            DiagnosticLevel::Warning => self.warnings.fetch_add(1, Ordering::Relaxed),
            DiagnosticLevel::Info => 0,
        };
    }

    fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }
}

/// Keeps every report without printing
#[derive(Default)]
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics
            .lock()
            .map(|d| d.iter().filter(|d| d.level == level).count())
            .unwrap_or(0)
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }

    fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    fn warning_count(&self) -> usize {
        self.count(DiagnosticLevel::Warning)
    }
}
