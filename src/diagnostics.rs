//! Diagnostic channel for recoverable load problems.
//!
//! Everything short of a document error is recorded here instead of aborting
//! the load. Each entry is also mirrored to the `log` facade as it is pushed.

use log::{debug, warn};
use serde::Serialize;
use std::fmt;

/// Configuration section a diagnostic was raised from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Document,
    Records,
    Clocks,
    TimeSeries,
    Links,
    Model,
    Simulation,
    Zones,
    Save,
    Elements,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Document => "document",
            Section::Records => "records",
            Section::Clocks => "clocks",
            Section::TimeSeries => "timeseries",
            Section::Links => "links",
            Section::Model => "model",
            Section::Simulation => "simulation",
            Section::Zones => "zones",
            Section::Save => "save",
            Section::Elements => "elements",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An entity could not be built and was skipped
    EntityConstruction,
    /// A named reference did not resolve; the relationship was left unattached
    UnresolvedReference,
    /// A binding targeted an element without the matching capability
    CapabilityMismatch,
    /// A link named an existing series the dependent cannot take
    RejectedLink,
    /// A name was declared more than once in the same namespace
    DuplicateName,
    /// Anything else worth telling the user about
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub section: Section,
    pub kind: DiagnosticKind,
    /// The entity the diagnostic is about
    pub subject: String,
    /// The name that failed to resolve, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub message: String,
}

/// Per-kind counts for callers that want a strict mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub skipped_entities: usize,
    pub unresolved_references: usize,
    pub skipped_bindings: usize,
    pub rejected_links: usize,
    pub duplicate_names: usize,
    pub warnings: usize,
}

impl LoadSummary {
    /// True if nothing the document declared was dropped.
    pub fn is_clean(&self) -> bool {
        self.skipped_entities == 0
            && self.unresolved_references == 0
            && self.skipped_bindings == 0
            && self.rejected_links == 0
    }
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::CapabilityMismatch => {
                debug!("[{}] {}", diagnostic.section, diagnostic.message)
            }
            _ => warn!("[{}] {}", diagnostic.section, diagnostic.message),
        }
        self.entries.push(diagnostic);
    }

    pub fn entity_error(&mut self, section: Section, subject: &str, message: impl Into<String>) {
        self.push(Diagnostic {
            section,
            kind: DiagnosticKind::EntityConstruction,
            subject: subject.to_string(),
            reference: None,
            message: message.into(),
        });
    }

    pub fn unresolved(
        &mut self,
        section: Section,
        subject: &str,
        reference: &str,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            section,
            kind: DiagnosticKind::UnresolvedReference,
            subject: subject.to_string(),
            reference: Some(reference.to_string()),
            message: message.into(),
        });
    }

    pub fn rejected_link(
        &mut self,
        section: Section,
        subject: &str,
        reference: &str,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            section,
            kind: DiagnosticKind::RejectedLink,
            subject: subject.to_string(),
            reference: Some(reference.to_string()),
            message: message.into(),
        });
    }

    pub fn capability_mismatch(&mut self, subject: &str, message: impl Into<String>) {
        self.push(Diagnostic {
            section: Section::Elements,
            kind: DiagnosticKind::CapabilityMismatch,
            subject: subject.to_string(),
            reference: None,
            message: message.into(),
        });
    }

    pub fn duplicate(&mut self, section: Section, subject: &str, message: impl Into<String>) {
        self.push(Diagnostic {
            section,
            kind: DiagnosticKind::DuplicateName,
            subject: subject.to_string(),
            reference: None,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, section: Section, subject: &str, message: impl Into<String>) {
        self.push(Diagnostic {
            section,
            kind: DiagnosticKind::Warning,
            subject: subject.to_string(),
            reference: None,
            message: message.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Diagnostics whose unresolved reference is `name`
    pub fn referencing<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries
            .iter()
            .filter(move |d| d.reference.as_deref() == Some(name))
    }

    pub fn summary(&self) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for d in &self.entries {
            match (d.kind, d.section) {
                (DiagnosticKind::CapabilityMismatch, _) => summary.skipped_bindings += 1,
                (DiagnosticKind::EntityConstruction, Section::Elements) => {
                    summary.skipped_bindings += 1
                }
                (DiagnosticKind::EntityConstruction, _) => summary.skipped_entities += 1,
                (DiagnosticKind::UnresolvedReference, _) => summary.unresolved_references += 1,
                (DiagnosticKind::RejectedLink, _) => summary.rejected_links += 1,
                (DiagnosticKind::DuplicateName, _) => summary.duplicate_names += 1,
                (DiagnosticKind::Warning, _) => summary.warnings += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.entity_error(Section::Records, "hist", "missing path");
        diagnostics.unresolved(Section::Links, "total", "b", "cannot locate b");
        diagnostics.capability_mismatch("J1", "J1 does not accept boundaryhead");
        diagnostics.entity_error(Section::Elements, "J2", "missing parameter");
        diagnostics.rejected_link(Section::Links, "k", "raw", "k takes no source");
        diagnostics.duplicate(Section::Clocks, "5min", "clock 5min declared twice");
        diagnostics.warning(Section::Save, "save", "no state record");

        let summary = diagnostics.summary();
        assert_eq!(summary.skipped_entities, 1);
        assert_eq!(summary.unresolved_references, 1);
        assert_eq!(summary.skipped_bindings, 2);
        assert_eq!(summary.rejected_links, 1);
        assert_eq!(summary.duplicate_names, 1);
        assert_eq!(summary.warnings, 1);
        assert!(!summary.is_clean());
        assert_eq!(diagnostics.len(), 7);
    }

    #[test]
    fn test_rejected_link_is_not_a_skipped_entity() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.rejected_link(Section::Links, "k", "raw", "k takes no source");

        let summary = diagnostics.summary();
        assert_eq!(summary.skipped_entities, 0);
        assert_eq!(summary.rejected_links, 1);
        assert!(!summary.is_clean());
        assert_eq!(diagnostics.referencing("raw").count(), 1);
    }

    #[test]
    fn test_referencing() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.unresolved(Section::Links, "total", "b", "cannot locate b");
        diagnostics.unresolved(Section::Links, "avg", "raw", "cannot locate raw");

        let hits: Vec<_> = diagnostics.referencing("b").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subject, "total");
        assert_eq!(diagnostics.of_kind(DiagnosticKind::UnresolvedReference).count(), 2);
    }

    #[test]
    fn test_warnings_keep_summary_clean() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning(Section::Document, "version", "version mismatch");
        assert!(diagnostics.summary().is_clean());
    }
}
