//! Error types for catalog construction

use thiserror::Error;

use crate::catalog::GroupKind;

/// Result type alias using [`CatalogError`]
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Rejected option catalogs.
///
/// Expansion itself never fails; every precondition is checked when the
/// catalog is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Empty option group: {0}")]
    EmptyGroup(GroupKind),

    #[error("Duplicate entry '{name}' in {group}")]
    Duplicate { group: GroupKind, name: String },

    #[error("Redundant backup mode '{0}' is not in the backup group")]
    UnknownRedundantMode(String),

    #[error("At least 2 providers are required, got {0}")]
    NotEnoughProviders(usize),

    #[error("Name '{name}' in {group} contains one of the reserved characters {reserved:?}")]
    ReservedCharacter {
        group: GroupKind,
        name: String,
        reserved: &'static str,
    },
}
