//! Structured conversion diagnostics.
//!
//! Analyzers report advisory and contract conditions through a sink rather
//! than aborting on the first oddity: warnings drop the offending rule and
//! processing continues, errors abort the rule set (the analyzer also
//! returns an error). Every record is mirrored to the `log` crate.

use log::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One reported condition: a stable code plus a formatted message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct DiagnosticSink {
    events: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> DiagnosticSink {
        DiagnosticSink::default()
    }

    pub fn warning(&mut self, code: &'static str, message: String) {
        warn!(target: "gsub2morx", "{}: {}", code, message);
        self.events.push(Diagnostic {
            severity: Severity::Warning,
            code,
            message,
        });
    }

    pub fn error(&mut self, code: &'static str, message: String) {
        error!(target: "gsub2morx", "{}: {}", code, message);
        self.events.push(Diagnostic {
            severity: Severity::Error,
            code,
            message,
        });
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn has_errors(&self) -> bool {
        self.events
            .iter()
            .any(|event| event.severity == Severity::Error)
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.events)
    }
}
