//! Diagnostics collector
//!
//! Central sink for every finding produced during a conversion run. Entries
//! are appended and never edited; identical diagnostics coming from different
//! files are kept on purpose because they are file-scoped.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCategory {
    Parse,
    Rule,
    Component,
    Routing,
    DataFetching,
    Api,
    Middleware,
    Dependency,
    Config,
    Io,
    Internal,
}

impl DiagnosticCategory {
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticCategory::Parse => "parse",
            DiagnosticCategory::Rule => "rule",
            DiagnosticCategory::Component => "component",
            DiagnosticCategory::Routing => "routing",
            DiagnosticCategory::DataFetching => "data-fetching",
            DiagnosticCategory::Api => "api",
            DiagnosticCategory::Middleware => "middleware",
            DiagnosticCategory::Dependency => "dependency",
            DiagnosticCategory::Config => "config",
            DiagnosticCategory::Io => "io",
            DiagnosticCategory::Internal => "internal",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub category: DiagnosticCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(
        code: &str,
        severity: Severity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            severity,
            category,
            message: message.into(),
            file: None,
            line: None,
            suggestion: None,
        }
    }

    pub fn critical(code: &str, category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Critical, category, message)
    }

    pub fn warning(code: &str, category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, category, message)
    }

    pub fn info(code: &str, category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, category, message)
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    fn sort_key(&self) -> (Option<&str>, Option<usize>, &str, &str) {
        (self.file.as_deref(), self.line, self.code.as_str(), self.message.as_str())
    }

    /// Attaches the file only when the diagnostic does not carry one yet.
    pub fn scoped_to(mut self, file: &str) -> Self {
        if self.file.is_none() {
            self.file = Some(file.to_string());
        }
        self
    }
}

/// Append-only, thread-safe diagnostic sink shared by all batch members.
#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, diagnostic: Diagnostic) {
        // A poisoned lock still holds every diagnostic appended so far.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(diagnostic);
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.extend(diagnostics);
    }

    pub fn all_of(&self, severity: Severity) -> Vec<Diagnostic> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|d| d.severity == severity)
            .cloned()
            .collect()
    }

    pub fn has_critical(&self) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().any(|d| d.severity == Severity::Critical)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry ordered by file, line and code, so the result does not
    /// depend on which batch member finished first. Run-level entries come first.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone();
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        entries
    }
}
