//! DCFS end-to-end common library
//!
//! The option catalog a DCFS volume can be created with and the expander that
//! turns it into the ordered list of end-to-end scenarios. Nothing in here
//! touches a browser or a database.

pub mod catalog;
pub mod error;
pub mod scenario;

pub use catalog::{Catalog, GroupKind, OptionChoice, OptionGroup};
pub use error::{CatalogError, Result};
pub use scenario::Scenario;
