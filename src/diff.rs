//! Added/removed report between two string sets.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

pub fn diff(previous: &BTreeSet<String>, current: &BTreeSet<String>) -> DiffReport {
    let mut added: Vec<String> = current.difference(previous).cloned().collect();
    let mut removed: Vec<String> = previous.difference(current).cloned().collect();
    added.sort();
    removed.sort();
    DiffReport { added, removed }
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<{} added>", self.added.len())?;
        for line in &self.added {
            writeln!(f, "{line}")?;
        }
        writeln!(f)?;
        writeln!(f, "<{} removed>", self.removed.len())?;
        for line in &self.removed {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
