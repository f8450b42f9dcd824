//! Name tables shared by the record, clock and time-series sections.

use crate::diagnostics::{Diagnostics, Section};
use std::collections::BTreeMap;

/// What to do when a list declares the same name twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// The later declaration replaces the earlier one
    #[default]
    LastWins,
    /// The later declaration is skipped
    Reject,
}

impl DuplicatePolicy {
    /// Decide whether a declaration of `name` may enter a table that may already hold it.
    /// Duplicates are always reported, whichever way the decision goes.
    pub fn admit(
        self,
        already_declared: bool,
        section: Section,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        if !already_declared {
            return true;
        }
        match self {
            DuplicatePolicy::LastWins => {
                diagnostics.duplicate(
                    section,
                    name,
                    format!("{} '{}' declared more than once; using the last declaration", section, name),
                );
                true
            }
            DuplicatePolicy::Reject => {
                diagnostics.duplicate(
                    section,
                    name,
                    format!("{} '{}' declared more than once; keeping the first declaration", section, name),
                );
                false
            }
        }
    }
}

/// Insert into a name-keyed table under the given policy. Returns true if inserted.
pub fn insert_named<T>(
    table: &mut BTreeMap<String, T>,
    name: String,
    value: T,
    policy: DuplicatePolicy,
    section: Section,
    diagnostics: &mut Diagnostics,
) -> bool {
    if policy.admit(table.contains_key(&name), section, &name, diagnostics) {
        table.insert(name, value);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    #[test]
    fn test_last_wins() {
        let mut table = BTreeMap::new();
        let mut diagnostics = Diagnostics::new();
        let policy = DuplicatePolicy::LastWins;

        assert!(insert_named(&mut table, "a".into(), 1, policy, Section::Clocks, &mut diagnostics));
        assert!(insert_named(&mut table, "a".into(), 2, policy, Section::Clocks, &mut diagnostics));
        assert_eq!(table["a"], 2);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::DuplicateName).count(), 1);
    }

    #[test]
    fn test_reject() {
        let mut table = BTreeMap::new();
        let mut diagnostics = Diagnostics::new();
        let policy = DuplicatePolicy::Reject;

        assert!(insert_named(&mut table, "a".into(), 1, policy, Section::Clocks, &mut diagnostics));
        assert!(!insert_named(&mut table, "a".into(), 2, policy, Section::Clocks, &mut diagnostics));
        assert_eq!(table["a"], 1);
        assert_eq!(diagnostics.len(), 1);
    }
}
