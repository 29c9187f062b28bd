use std::fmt;

use crate::ast::SourceSpan;
use crate::source::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    TypeInferenceFailure,
    NonExhaustiveMatch,
    InvalidGuard,
    InvalidSumTypeUsage,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorCategory::TypeInferenceFailure => "type-inference-failure",
            ErrorCategory::NonExhaustiveMatch => "non-exhaustive-match",
            ErrorCategory::InvalidGuard => "invalid-guard",
            ErrorCategory::InvalidSumTypeUsage => "invalid-sum-type-usage",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub category: ErrorCategory,
    pub message: String,
    pub level: DiagnosticLevel,
    pub span: Option<SourceSpan>,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Renders as `file:line:col: category: message`, followed by an
    /// indented hint line when a hint exists.
    pub fn render(&self, file: &SourceFile) -> String {
        let name = file.display_name();
        let mut out = match self.span {
            Some(span) => oolong_support::format_positioned_error(
                &name,
                span.line,
                span.column,
                self.category,
                &self.message,
            ),
            None => oolong_support::format_unpositioned_error(&name, self.category, &self.message),
        };
        if let Some(hint) = &self.hint {
            out.push('\n');
            out.push_str(&oolong_support::format_hint(hint));
        }
        out
    }
}

/// Append-only sink for one compilation unit, drained once by the driver.
/// Reporting never aborts the pass; the offending node is simply left
/// untransformed by the caller.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push_error<S: Into<String>>(
        &mut self,
        category: ErrorCategory,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.entries.push(Diagnostic {
            category,
            message: message.into(),
            level: DiagnosticLevel::Error,
            span,
            hint: None,
        });
    }

    pub fn push_error_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        category: ErrorCategory,
        message: S,
        span: Option<SourceSpan>,
        hint: H,
    ) {
        self.entries.push(Diagnostic {
            category,
            message: message.into(),
            level: DiagnosticLevel::Error,
            span,
            hint: Some(hint.into()),
        });
    }

    pub fn push_warning<S: Into<String>>(
        &mut self,
        category: ErrorCategory,
        message: S,
        span: Option<SourceSpan>,
    ) {
        self.entries.push(Diagnostic {
            category,
            message: message.into(),
            level: DiagnosticLevel::Warning,
            span,
            hint: None,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
            .count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    pub fn render_all(&self, file: &SourceFile) -> String {
        self.entries
            .iter()
            .map(|diagnostic| diagnostic.render(file))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
