//! Volume option catalog
//!
//! The three option axes a DCFS volume can be created with, plus the provider
//! kinds a disk can be backed by. Groups are ordered lists rather than maps so
//! that expansion order follows declaration order exactly.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{CatalogError, Result};

/// Which axis an option group describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Encryption,
    Backup,
    Partitioner,
    Providers,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Encryption => write!(f, "encryption"),
            GroupKind::Backup => write!(f, "backup"),
            GroupKind::Partitioner => write!(f, "partitioner"),
            GroupKind::Providers => write!(f, "providers"),
        }
    }
}

/// A named choice and the dropdown position the console renders it at.
///
/// `token` counts from the end of the option list: `-1` is the last entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub token: i32,
}

impl OptionChoice {
    pub fn new(name: impl Into<String>, token: i32) -> Self {
        Self {
            name: name.into(),
            token,
        }
    }
}

impl fmt::Display for OptionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered list of choices for one axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub kind: GroupKind,
    pub choices: Vec<OptionChoice>,
}

impl OptionGroup {
    pub fn new(kind: GroupKind, choices: Vec<OptionChoice>) -> Self {
        Self { kind, choices }
    }

    /// Build a group from `(name, token)` pairs
    pub fn from_pairs(kind: GroupKind, pairs: &[(&str, i32)]) -> Self {
        Self::new(
            kind,
            pairs
                .iter()
                .map(|(name, token)| OptionChoice::new(*name, *token))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionChoice> {
        self.choices.iter()
    }

    /// Look up a choice by display name
    pub fn get(&self, name: &str) -> Option<&OptionChoice> {
        self.choices.iter().find(|c| c.name == name)
    }

    fn validate(&self) -> Result<()> {
        if self.choices.is_empty() {
            return Err(CatalogError::EmptyGroup(self.kind));
        }
        ensure_unique(self.kind, self.choices.iter().map(|c| c.name.as_str()))
    }
}

/// Encryption enabled
pub const ENCRYPTION_ON: &str = "on";
/// Encryption disabled
pub const ENCRYPTION_OFF: &str = "off";
/// Redundant backup mode that expands into multi-disk pairings
pub const BACKUP_RAID10: &str = "RAID10";
/// No backup
pub const BACKUP_OFF: &str = "off";
pub const PARTITIONER_BALANCED: &str = "balanced";
pub const PARTITIONER_PRIORITY: &str = "priority";
pub const PARTITIONER_THROUGHPUT: &str = "throughput";

pub const PROVIDER_SFTP: &str = "SFTP drive";
pub const PROVIDER_FTP: &str = "FTP drive";
pub const PROVIDER_GDRIVE: &str = "GoogleDrive";

/// Everything the scenario expander reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    encryption: OptionGroup,
    backup: OptionGroup,
    partitioner: OptionGroup,
    providers: Vec<String>,
    redundant_backup: Option<String>,
}

impl Catalog {
    /// Build a catalog, rejecting inputs the expander cannot honour.
    ///
    /// `redundant_backup` names the backup choice that expands into disk
    /// pairings instead of one scenario per provider. `None` disables that
    /// branch entirely.
    pub fn new(
        encryption: OptionGroup,
        backup: OptionGroup,
        partitioner: OptionGroup,
        providers: Vec<String>,
        redundant_backup: Option<String>,
    ) -> Result<Self> {
        encryption.validate()?;
        backup.validate()?;
        partitioner.validate()?;

        if providers.is_empty() {
            return Err(CatalogError::EmptyGroup(GroupKind::Providers));
        }
        ensure_unique(GroupKind::Providers, providers.iter().map(String::as_str))?;
        // with a single provider the "every provider" scenario repeats the per-provider one
        if providers.len() < 2 {
            return Err(CatalogError::NotEnoughProviders(providers.len()));
        }

        if let Some(mode) = &redundant_backup {
            if backup.get(mode).is_none() {
                return Err(CatalogError::UnknownRedundantMode(mode.clone()));
            }
        }

        Ok(Self {
            encryption,
            backup,
            partitioner,
            providers,
            redundant_backup,
        })
    }

    /// The catalog the DCFS console ships with
    pub fn dcfs() -> Self {
        Self {
            encryption: OptionGroup::from_pairs(
                GroupKind::Encryption,
                &[(ENCRYPTION_ON, -2), (ENCRYPTION_OFF, -1)],
            ),
            backup: OptionGroup::from_pairs(
                GroupKind::Backup,
                &[(BACKUP_RAID10, -2), (BACKUP_OFF, -1)],
            ),
            partitioner: OptionGroup::from_pairs(
                GroupKind::Partitioner,
                &[
                    (PARTITIONER_BALANCED, -3),
                    (PARTITIONER_PRIORITY, -2),
                    (PARTITIONER_THROUGHPUT, -1),
                ],
            ),
            providers: vec![
                PROVIDER_SFTP.to_string(),
                PROVIDER_FTP.to_string(),
                PROVIDER_GDRIVE.to_string(),
            ],
            redundant_backup: Some(BACKUP_RAID10.to_string()),
        }
    }

    /// Same option groups, different provider list
    pub fn with_providers(self, providers: Vec<String>) -> Result<Self> {
        Self::new(
            self.encryption,
            self.backup,
            self.partitioner,
            providers,
            self.redundant_backup,
        )
    }

    pub fn encryption(&self) -> &OptionGroup {
        &self.encryption
    }

    pub fn backup(&self) -> &OptionGroup {
        &self.backup
    }

    pub fn partitioner(&self) -> &OptionGroup {
        &self.partitioner
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn redundant_backup(&self) -> Option<&str> {
        self.redundant_backup.as_deref()
    }

    /// Whether `backup` is the designated redundant mode
    pub fn is_redundant(&self, backup: &OptionChoice) -> bool {
        self.redundant_backup.as_deref() == Some(backup.name.as_str())
    }

    /// Number of scenarios [`Catalog::expand`](crate::scenario) will emit
    pub fn scenario_count(&self) -> usize {
        let per_partitioner: usize = self
            .backup
            .iter()
            .map(|b| {
                if self.is_redundant(b) {
                    2
                } else {
                    self.providers.len() + 1
                }
            })
            .sum();
        self.encryption.len() * self.partitioner.len() * per_partitioner
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::dcfs()
    }
}

/// Characters that delimit fields in a scenario name
pub const RESERVED_CHARS: &str = "=,[]";

fn ensure_unique<'a>(group: GroupKind, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.contains(|c| RESERVED_CHARS.contains(c)) {
            return Err(CatalogError::ReservedCharacter {
                group,
                name: name.to_string(),
                reserved: RESERVED_CHARS,
            });
        }
        if !seen.insert(name) {
            return Err(CatalogError::Duplicate {
                group,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn providers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dcfs_catalog_is_valid() {
        let c = Catalog::dcfs();
        let rebuilt = Catalog::new(
            c.encryption().clone(),
            c.backup().clone(),
            c.partitioner().clone(),
            c.providers().to_vec(),
            c.redundant_backup().map(String::from),
        )
        .unwrap();
        assert_eq!(rebuilt, c);
    }

    #[test]
    fn test_groups_keep_declaration_order() {
        let c = Catalog::default();
        let names: Vec<&str> = c.partitioner().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["balanced", "priority", "throughput"]);
        assert_eq!(c.partitioner().get("balanced").unwrap().token, -3);
    }

    #[test]
    fn test_empty_group_rejected() {
        let c = Catalog::dcfs();
        let err = Catalog::new(
            OptionGroup::new(GroupKind::Encryption, vec![]),
            c.backup().clone(),
            c.partitioner().clone(),
            c.providers().to_vec(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::EmptyGroup(GroupKind::Encryption));
    }

    #[test]
    fn test_empty_providers_rejected() {
        let err = Catalog::dcfs().with_providers(vec![]).unwrap_err();
        assert_eq!(err, CatalogError::EmptyGroup(GroupKind::Providers));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let err = Catalog::dcfs()
            .with_providers(providers(&["SFTP drive", "SFTP drive"]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { group: GroupKind::Providers, .. }));
    }

    #[test]
    fn test_duplicate_choice_rejected() {
        let c = Catalog::dcfs();
        let err = Catalog::new(
            c.encryption().clone(),
            c.backup().clone(),
            OptionGroup::from_pairs(GroupKind::Partitioner, &[("balanced", -2), ("balanced", -1)]),
            c.providers().to_vec(),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::Duplicate {
                group: GroupKind::Partitioner,
                name: "balanced".to_string()
            }
        );
    }

    #[test]
    fn test_single_provider_rejected_with_redundant_mode() {
        let err = Catalog::dcfs()
            .with_providers(providers(&["SFTP drive"]))
            .unwrap_err();
        assert_eq!(err, CatalogError::NotEnoughProviders(1));
    }

    #[test]
    fn test_single_provider_rejected_without_redundant_mode() {
        let c = Catalog::dcfs();
        let err = Catalog::new(
            c.encryption().clone(),
            c.backup().clone(),
            c.partitioner().clone(),
            providers(&["SFTP drive"]),
            None,
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::NotEnoughProviders(1));
    }

    #[test]
    fn test_two_providers_without_redundant_mode() {
        let c = Catalog::dcfs();
        let catalog = Catalog::new(
            c.encryption().clone(),
            c.backup().clone(),
            c.partitioner().clone(),
            providers(&["SFTP drive", "FTP drive"]),
            None,
        )
        .unwrap();
        assert_eq!(catalog.scenario_count(), 2 * 3 * (3 + 3));
    }

    #[test]
    fn test_reserved_characters_rejected() {
        let err = Catalog::dcfs()
            .with_providers(providers(&["a, b", "c"]))
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::ReservedCharacter {
                group: GroupKind::Providers,
                name: "a, b".to_string(),
                reserved: RESERVED_CHARS,
            }
        );

        let c = Catalog::dcfs();
        let err = Catalog::new(
            OptionGroup::from_pairs(GroupKind::Encryption, &[("on=yes", -1)]),
            c.backup().clone(),
            c.partitioner().clone(),
            c.providers().to_vec(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::ReservedCharacter { group: GroupKind::Encryption, .. }));
    }

    #[test]
    fn test_unknown_redundant_mode_rejected() {
        let c = Catalog::dcfs();
        let err = Catalog::new(
            c.encryption().clone(),
            c.backup().clone(),
            c.partitioner().clone(),
            c.providers().to_vec(),
            Some("RAID1".to_string()),
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::UnknownRedundantMode("RAID1".to_string()));
    }

    #[test]
    fn test_scenario_count_for_dcfs_catalog() {
        // 2 encryption x 3 partitioner x (RAID10: 2 + off: 3 providers + 1)
        assert_eq!(Catalog::dcfs().scenario_count(), 36);
    }
}
