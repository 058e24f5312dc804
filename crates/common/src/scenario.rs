//! Scenario expansion
//!
//! Walks encryption → backup → partitioner in catalog order and turns every
//! combination into concrete scenarios:
//!
//! - redundant backup: one 2-disk pairing `[p0, p1]` and one 4-disk pairing
//!   `[p0, p1, p1, p0]`
//! - anything else: one scenario per provider, then one with every provider
//!
//! The redundant branch is still emitted once per partitioner even though the
//! pairings do not depend on it. Run indices printed by `--list` rely on that
//! exact sequence.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{Catalog, OptionChoice};

/// One fully parameterized end-to-end run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    /// Position in the expanded list
    pub index: usize,
    pub name: String,
    pub encryption: OptionChoice,
    pub backup: OptionChoice,
    pub partitioner: OptionChoice,
    /// Providers to attach, in attach order. May repeat.
    pub disks: Vec<String>,
}

impl Scenario {
    pub fn new(
        index: usize,
        encryption: &OptionChoice,
        backup: &OptionChoice,
        partitioner: &OptionChoice,
        disks: Vec<String>,
    ) -> Self {
        let name = scenario_name(encryption, backup, partitioner, &disks);
        Self {
            index,
            name,
            encryption: encryption.clone(),
            backup: backup.clone(),
            partitioner: partitioner.clone(),
            disks,
        }
    }

    /// Parameter tuple that identifies the scenario regardless of index
    pub fn key(&self) -> (&str, &str, &str, &[String]) {
        (
            &self.encryption.name,
            &self.backup.name,
            &self.partitioner.name,
            &self.disks,
        )
    }

    /// Volume name safe to type into the console's name field.
    ///
    /// Only ASCII alphanumerics and `_` survive; everything else collapses
    /// into `_`. The index keeps names unique across the run.
    pub fn volume_name(&self) -> String {
        let raw = format!(
            "e2e_{:03}_{}_{}_{}",
            self.index, self.encryption.name, self.backup.name, self.partitioner.name
        );
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.name)
    }
}

fn scenario_name(
    encryption: &OptionChoice,
    backup: &OptionChoice,
    partitioner: &OptionChoice,
    disks: &[String],
) -> String {
    format!(
        "encryption={} backup={} partitioner={} disks=[{}]",
        encryption.name,
        backup.name,
        partitioner.name,
        disks.join(", ")
    )
}

impl Catalog {
    /// Expand the catalog into the ordered scenario list.
    ///
    /// Pure and deterministic; calling it twice yields the same sequence.
    pub fn expand(&self) -> Vec<Scenario> {
        let providers = self.providers();
        let mut scenarios = Vec::with_capacity(self.scenario_count());

        for encryption in self.encryption().iter() {
            for backup in self.backup().iter() {
                for partitioner in self.partitioner().iter() {
                    let mut emit = |disks: Vec<String>| {
                        let index = scenarios.len();
                        scenarios.push(Scenario::new(index, encryption, backup, partitioner, disks));
                    };

                    if self.is_redundant(backup) {
                        // Catalog::new guarantees two providers here
                        let (first, second) = (&providers[0], &providers[1]);
                        emit(vec![first.clone(), second.clone()]);
                        emit(vec![first.clone(), second.clone(), second.clone(), first.clone()]);
                    } else {
                        for provider in providers {
                            emit(vec![provider.clone()]);
                        }
                        emit(providers.to_vec());
                    }
                }
            }
        }

        scenarios
    }
}
