use serde::Serialize;

/// Warnings and errors produced by composition.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Is any of the diagnostics fatal, i.e. a hard error?
    pub fn any_fatal(&self) -> bool {
        self.0.iter().any(|diagnostic| diagnostic.is_fatal)
    }

    /// Is there any diagnostic warning or error
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate all diagnostics, in the order they were produced.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Iterate non-fatal diagnostics.
    pub fn iter_warnings(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|diagnostic| !diagnostic.is_fatal)
            .map(|diagnostic| diagnostic.message.as_str())
    }

    /// Iterate fatal diagnostics.
    pub fn iter_errors(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|diagnostic| diagnostic.is_fatal)
            .map(|diagnostic| diagnostic.message.as_str())
    }

    /// Iterate over all diagnostic messages.
    pub fn iter_messages(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|diagnostic| diagnostic.message.as_str())
    }

    pub(crate) fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0)
    }

    pub(crate) fn push_fatal(&mut self, kind: DiagnosticKind, message: String) {
        self.0.push(Diagnostic {
            message,
            kind,
            is_fatal: true,
        });
    }

    pub(crate) fn push_warning(&mut self, message: String) {
        self.0.push(Diagnostic {
            message,
            kind: DiagnosticKind::Warning,
            is_fatal: false,
        });
    }
}

impl From<crate::InputError> for Diagnostics {
    fn from(error: crate::InputError) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push_fatal(error.kind(), error.to_string());
        diagnostics
    }
}

/// A composition diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    message: String,
    kind: DiagnosticKind,
    /// Should this diagnostic be interpreted as a composition failure?
    is_fatal: bool,
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn is_fatal(&self) -> bool {
        self.is_fatal
    }
}

/// Which stage of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// Malformed input: empty subgraph list, missing or duplicate names.
    InvalidInput,
    /// A subgraph schema that does not parse.
    Syntax,
    /// Unsupported router compatibility version.
    Version,
    /// Directive or definition errors local to one subgraph.
    Normalization,
    /// Conflicts between subgraphs.
    Merge,
    /// Fields that cannot be reached from any root field.
    Resolvability,
    /// Non-blocking advisories.
    Warning,
}
