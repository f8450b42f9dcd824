//! Periodic clocks that time series are sampled on.

use crate::config_tree::{SettingList, SettingError};
use crate::diagnostics::{Diagnostics, Section};
use crate::names::{insert_named, DuplicatePolicy};
use crate::utils::duration::seconds_from_setting;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;

pub type ClockTable = BTreeMap<String, Rc<Clock>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clock {
    pub name: String,
    /// Period in seconds
    pub period: u64,
}

/// Build every clock in the `clocks` list.
pub fn build_clocks(
    list: &SettingList<'_>,
    policy: DuplicatePolicy,
    diagnostics: &mut Diagnostics,
) -> ClockTable {
    let mut table = ClockTable::new();

    for (index, entry) in list.iter().enumerate() {
        let clock = entry.get::<String>("name").and_then(|name| {
            let period = seconds_from_setting(&entry, "period")?;
            Ok::<_, SettingError>(Clock { name, period })
        });

        match clock {
            Ok(clock) => {
                insert_named(&mut table, clock.name.clone(), Rc::new(clock), policy, Section::Clocks, diagnostics);
            }
            Err(e) => {
                let subject = entry
                    .get::<String>("name")
                    .unwrap_or_else(|_| format!("Clock {}", index));
                diagnostics.entity_error(
                    Section::Clocks,
                    &subject,
                    format!("could not create clock {}: {}", subject, e),
                );
            }
        }
    }

    info!("Built {} clock(s)", table.len());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_tree::ConfigTree;

    #[test]
    fn test_build_clocks() {
        let doc = r#"
clocks:
  - name: "5min"
    period: 300
  - name: hourly
    period: "1h"
  - name: broken
"#;
        let tree = ConfigTree::parse(doc, "config.yaml").unwrap();
        let list = tree.root().get_list("clocks").unwrap();
        let mut diagnostics = Diagnostics::new();
        let clocks = build_clocks(&list, DuplicatePolicy::LastWins, &mut diagnostics);

        assert_eq!(clocks.len(), 2);
        assert_eq!(clocks["5min"].period, 300);
        assert_eq!(clocks["hourly"].period, 3600);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().subject, "broken");
    }

    #[test]
    fn test_duplicate_clock_last_wins() {
        let doc = r#"
clocks:
  - name: fast
    period: 60
  - name: fast
    period: 30
"#;
        let tree = ConfigTree::parse(doc, "config.yaml").unwrap();
        let list = tree.root().get_list("clocks").unwrap();
        let mut diagnostics = Diagnostics::new();
        let clocks = build_clocks(&list, DuplicatePolicy::LastWins, &mut diagnostics);

        assert_eq!(clocks["fast"].period, 30);
    }
}
