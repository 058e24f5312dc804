//! DCFS E2E Test Framework
//!
//! Browser-driven end-to-end tests for the DCFS web console. Every step taken
//! in the browser is cross-checked against the backend's MySQL database.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SuiteRunner (one session per test)         │
//! │    ├── user suite:  register, update, verify, delete        │
//! │    ├── disk suite:  volume + SFTP disk lifecycle            │
//! │    └── scenarios:   Catalog::expand() -> ScenarioRunner     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    create volume → attach disks → upload → download →       │
//! │    compare → delete files → delete volume                   │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  Frontend (trait)            │  StateStore (trait)          │
//! │    DcfsUi over thirtyfour    │    MysqlStore over           │
//! │    WebDriver                 │    mysql_async               │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```

pub mod browser;
pub mod config;
pub mod db;
pub mod error;
pub mod frontend;
pub mod logging;
pub mod payload;
pub mod readiness;
pub mod report;
pub mod runner;
pub mod selectors;
pub mod store;
pub mod suite;
pub mod ui;

pub use config::{E2eConfig, Overrides};
pub use db::MysqlStore;
pub use error::{E2eError, E2eResult};
pub use frontend::{Frontend, Launcher};
pub use runner::{RunSettings, ScenarioRunner, TestResult, TestSuiteResult};
pub use store::StateStore;
pub use suite::{Suite, SuiteRunner};
pub use ui::{DcfsLauncher, DcfsUi};
