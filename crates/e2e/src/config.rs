//! Run configuration
//!
//! Values are layered: built-in defaults, then the defaults file
//! (`defaults.json`, or YAML by extension), then command-line overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use dcfs_common::Catalog;

use crate::error::{E2eError, E2eResult};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULTS_FILE: &str = "defaults.json";

/// Fully resolved configuration for one run
#[derive(Debug, Clone, Serialize)]
pub struct E2eConfig {
    /// Console URL the browser opens
    pub front_url: String,

    /// API URL, only used for readiness reporting
    pub back_url: String,

    /// WebDriver endpoint (chromedriver, selenium)
    pub webdriver_url: String,

    pub headless: bool,
    pub debug: bool,

    pub database: DatabaseConfig,

    /// Account the scenarios and disk suite run as
    pub root: Credentials,

    /// Account the user suite registers, edits and deletes
    pub test_account: TestAccount,

    /// Directory holding the reference payloads (generated when missing)
    pub payload_dir: PathBuf,

    /// Browser download directory
    pub download_dir: PathBuf,

    /// Where `test-results.json` is written
    pub output_dir: PathBuf,

    /// Free space typed into the disk form, in GB
    pub disk_free_space_gb: u32,

    pub waits: WaitConfig,

    /// Provider list the scenario matrix expands over. `None` keeps the
    /// console's built-in list.
    pub scenario_providers: Option<Vec<String>>,

    /// Provider name → how to attach a disk of that kind
    pub providers: BTreeMap<String, ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub address: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 3306,
            user: "dcfs".to_string(),
            password: String::new(),
            name: "dcfs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Password the account is switched to by the update step
    pub new_password: String,
}

impl Default for TestAccount {
    fn default() -> Self {
        Self {
            first_name: "First Name".to_string(),
            last_name: "Last Name".to_string(),
            email: "email@email.com".to_string(),
            password: "password".to_string(),
            new_password: "password2".to_string(),
        }
    }
}

/// Bounded waits on asynchronous console state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaitConfig {
    /// Page and dialog loads
    pub page_load_secs: u64,

    /// Upload and download progress indicators, and the download landing on disk
    pub transfer_secs: u64,

    /// Fixed pause after a click that triggers an animation
    pub settle_ms: u64,

    /// Pause after submitting a disk form
    pub disk_settle_secs: u64,

    pub poll_interval_ms: u64,

    /// Treat an expired wait as a failure instead of logging and continuing
    pub strict: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            page_load_secs: 5,
            transfer_secs: 1000,
            settle_ms: 1000,
            disk_settle_secs: 10,
            poll_interval_ms: 250,
            strict: true,
        }
    }
}

impl WaitConfig {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn transfer(&self) -> Duration {
        Duration::from_secs(self.transfer_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn disk_settle(&self) -> Duration {
        Duration::from_secs(self.disk_settle_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// How a disk of a given provider kind gets attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// Filled into the console's disk form (SFTP, FTP)
    Form(FormCredentials),

    /// Inserted straight into the database; OAuth consent cannot be scripted
    Oauth {
        /// Credentials blob as the backend stores it
        credentials: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormCredentials {
    pub login: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_remote_path")]
    pub path: String,
}

fn default_remote_path() -> String {
    "/".to_string()
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            front_url: "http://localhost:8080".to_string(),
            back_url: "http://localhost:8081".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            debug: false,
            database: DatabaseConfig::default(),
            root: Credentials {
                email: "root@root.com".to_string(),
                password: "password".to_string(),
            },
            test_account: TestAccount::default(),
            payload_dir: PathBuf::from("."),
            download_dir: PathBuf::from("downloads"),
            output_dir: PathBuf::from("test-results"),
            disk_free_space_gb: 15,
            waits: WaitConfig::default(),
            scenario_providers: None,
            providers: BTreeMap::new(),
        }
    }
}

/// Shape of the defaults file. Every key is optional; the flat database keys
/// match the files the suite has always been shipped with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsFile {
    pub front_url: Option<String>,
    pub back_url: Option<String>,
    pub webdriver_url: Option<String>,
    pub headless: Option<bool>,
    pub debug: Option<bool>,
    pub database_address: Option<String>,
    pub database_port: Option<u16>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub database_name: Option<String>,
    pub root_email: Option<String>,
    pub root_password: Option<String>,
    pub test_account: Option<TestAccount>,
    pub payload_dir: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub disk_free_space_gb: Option<u32>,
    pub waits: Option<WaitConfig>,
    pub scenario_providers: Option<Vec<String>>,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl DefaultsFile {
    /// Parse a defaults file, picking the format by extension
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            _ => Ok(serde_json::from_str(&content)?),
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub front_url: Option<String>,
    pub back_url: Option<String>,
    pub webdriver_url: Option<String>,
    pub headless: Option<bool>,
    pub debug: bool,
    pub db_address: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_name: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub lenient_waits: bool,
}

impl E2eConfig {
    /// Resolve the configuration for a run.
    ///
    /// An explicit `path` must exist; without one, [`DEFAULTS_FILE`] is read
    /// when present in the working directory.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> E2eResult<Self> {
        let mut config = Self::default();

        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULTS_FILE)).filter(|p| p.exists()),
        };
        if let Some(file) = file {
            debug!("Reading defaults from {}", file.display());
            config.apply_file(DefaultsFile::from_file(&file)?);
        }

        config.apply_overrides(overrides);
        debug!(
            "Will test backend at {} and frontend at {}, headless: {}",
            config.back_url, config.front_url, config.headless
        );
        Ok(config)
    }

    pub fn apply_file(&mut self, file: DefaultsFile) {
        set(&mut self.front_url, file.front_url);
        set(&mut self.back_url, file.back_url);
        set(&mut self.webdriver_url, file.webdriver_url);
        set(&mut self.headless, file.headless);
        set(&mut self.debug, file.debug);
        set(&mut self.database.address, file.database_address);
        set(&mut self.database.port, file.database_port);
        set(&mut self.database.user, file.database_user);
        set(&mut self.database.password, file.database_password);
        set(&mut self.database.name, file.database_name);
        set(&mut self.root.email, file.root_email);
        set(&mut self.root.password, file.root_password);
        set(&mut self.test_account, file.test_account);
        set(&mut self.payload_dir, file.payload_dir);
        set(&mut self.download_dir, file.download_dir);
        set(&mut self.output_dir, file.output_dir);
        set(&mut self.disk_free_space_gb, file.disk_free_space_gb);
        set(&mut self.waits, file.waits);
        if file.scenario_providers.is_some() {
            self.scenario_providers = file.scenario_providers;
        }
        self.providers.extend(file.providers);
    }

    pub fn apply_overrides(&mut self, o: &Overrides) {
        set(&mut self.front_url, o.front_url.clone());
        set(&mut self.back_url, o.back_url.clone());
        set(&mut self.webdriver_url, o.webdriver_url.clone());
        set(&mut self.headless, o.headless);
        set(&mut self.database.address, o.db_address.clone());
        set(&mut self.database.port, o.db_port);
        set(&mut self.database.user, o.db_user.clone());
        set(&mut self.database.password, o.db_password.clone());
        set(&mut self.database.name, o.db_name.clone());
        set(&mut self.output_dir, o.output_dir.clone());
        if o.debug {
            self.debug = true;
        }
        if o.lenient_waits {
            self.waits.strict = false;
        }
    }

    /// Catalog the scenario matrix is expanded from
    pub fn catalog(&self) -> E2eResult<Catalog> {
        let catalog = Catalog::dcfs();
        match &self.scenario_providers {
            Some(providers) => Ok(catalog.with_providers(providers.clone())?),
            None => Ok(catalog),
        }
    }

    /// Attach settings for a provider, failing when none are configured
    pub fn provider(&self, name: &str) -> E2eResult<&ProviderSettings> {
        self.providers.get(name).ok_or_else(|| {
            E2eError::Config(format!("no credentials configured for provider '{}'", name))
        })
    }

    /// Check every provider the catalog can attach has settings
    pub fn validate_providers(&self, catalog: &Catalog) -> E2eResult<()> {
        let missing: Vec<&str> = catalog
            .providers()
            .iter()
            .filter(|p| !self.providers.contains_key(p.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(E2eError::Config(format!(
                "no credentials configured for provider(s): {}",
                missing.join(", ")
            )))
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}
