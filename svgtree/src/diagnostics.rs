// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{SourceBuffer, Span};

/// Diagnostic severity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[allow(missing_docs)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A stable diagnostic code.
///
/// The string form returned by [`DiagnosticCode::as_str`] is part of the public API
/// and never changes, so tools can filter by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DiagnosticCode {
    /// Malformed markup.
    XmlSyntax,
    /// A namespace prefix without a declaration.
    UnresolvedPrefix,
    /// An attribute that is unknown or not allowed on the element.
    AttributeNotAllowed,
    /// An attribute or property value that cannot be parsed.
    InvalidValue,
    /// An `id` already used by a previous element.
    DuplicateId,
    /// A reference to a missing element or to an element of a wrong kind.
    DanglingReference,
    /// A recursive reference.
    ReferenceCycle,
    /// An external resource that cannot be loaded.
    ResourceNotFound,
    /// Too many instances were expanded.
    InstanceLimit,
    /// Too many elements in a document.
    ElementLimit,
    /// A feature that is recognized but not supported.
    Unsupported,
}

impl DiagnosticCode {
    /// Returns a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::XmlSyntax => "xml-syntax",
            DiagnosticCode::UnresolvedPrefix => "unresolved-prefix",
            DiagnosticCode::AttributeNotAllowed => "attribute-not-allowed",
            DiagnosticCode::InvalidValue => "invalid-value",
            DiagnosticCode::DuplicateId => "duplicate-id",
            DiagnosticCode::DanglingReference => "dangling-reference",
            DiagnosticCode::ReferenceCycle => "reference-cycle",
            DiagnosticCode::ResourceNotFound => "resource-not-found",
            DiagnosticCode::InstanceLimit => "instance-limit",
            DiagnosticCode::ElementLimit => "element-limit",
            DiagnosticCode::Unsupported => "unsupported",
        }
    }

    /// Returns the severity this code is usually reported with.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::XmlSyntax
            | DiagnosticCode::UnresolvedPrefix
            | DiagnosticCode::DanglingReference
            | DiagnosticCode::ReferenceCycle
            | DiagnosticCode::InstanceLimit
            | DiagnosticCode::ElementLimit => Severity::Error,
            DiagnosticCode::AttributeNotAllowed
            | DiagnosticCode::InvalidValue
            | DiagnosticCode::DuplicateId
            | DiagnosticCode::ResourceNotFound => Severity::Warning,
            DiagnosticCode::Unsupported => Severity::Info,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single diagnostic record.
#[derive(Clone, PartialEq, Debug)]
pub struct Diagnostic {
    /// A stable code.
    pub code: DiagnosticCode,
    /// Severity.
    pub severity: Severity,
    /// A human-readable message.
    pub message: String,
    /// Source span, when known.
    pub span: Option<Span>,
}

impl Diagnostic {
    /// Creates a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Option<Span>) -> Self {
        Diagnostic {
            code,
            severity: code.default_severity(),
            message: message.into(),
            span,
        }
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Formats the diagnostic with a row/column position resolved against `source`.
    pub fn display_with<'a>(&'a self, source: &'a SourceBuffer) -> impl std::fmt::Display + 'a {
        DisplayWithSource { diag: self, source }
    }

    pub(crate) fn log(&self) {
        match self.severity {
            Severity::Error | Severity::Warning => log::warn!("{}", self),
            Severity::Info => log::debug!("{}", self),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.message)
    }
}

struct DisplayWithSource<'a> {
    diag: &'a Diagnostic,
    source: &'a SourceBuffer,
}

impl std::fmt::Display for DisplayWithSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.diag.span {
            Some(span) => write!(
                f,
                "{}: {}",
                self.source.text_pos(span.start as usize),
                self.diag
            ),
            None => write!(f, "{}", self.diag),
        }
    }
}

/// An ordered diagnostics collector.
#[derive(Clone, Default, Debug)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends and logs a diagnostic.
    pub fn push(&mut self, diag: Diagnostic) {
        diag.log();
        self.list.push(diag);
    }

    /// A shorthand for `push(Diagnostic::new(..))`.
    pub fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic::new(code, message, span));
    }

    /// Returns the collected diagnostics.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.list
    }

    /// Checks that any of the diagnostics has an `Error` severity.
    pub fn has_errors(&self) -> bool {
        self.list.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns the number of diagnostics with a specified code.
    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.list.iter().filter(|d| d.code == code).count()
    }

    /// Consumes the collector.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.list
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.list.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(DiagnosticCode::UnresolvedPrefix.as_str(), "unresolved-prefix");
        assert_eq!(
            DiagnosticCode::AttributeNotAllowed.as_str(),
            "attribute-not-allowed"
        );
        assert_eq!(
            DiagnosticCode::DanglingReference.as_str(),
            "dangling-reference"
        );
    }

    #[test]
    fn display_with_position() {
        let source = SourceBuffer::new("<svg>\n<rect foo='1'/>");
        let diag = Diagnostic::new(
            DiagnosticCode::AttributeNotAllowed,
            "'foo' is not allowed on 'rect'",
            Some(Span::new(12, 15)),
        );
        assert_eq!(
            diag.display_with(&source).to_string(),
            "2:7: warning [attribute-not-allowed]: 'foo' is not allowed on 'rect'"
        );
    }
}
