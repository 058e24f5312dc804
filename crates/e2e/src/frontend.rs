//! What the runner needs from the console UI

use async_trait::async_trait;
use std::path::Path;

use dcfs_common::{OptionChoice, Scenario};

use crate::config::{FormCredentials, TestAccount};
use crate::error::E2eResult;

/// Volume form contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRequest {
    pub name: String,
    pub encryption: OptionChoice,
    pub backup: OptionChoice,
    pub partitioner: OptionChoice,
}

impl VolumeRequest {
    pub fn for_scenario(scenario: &Scenario) -> Self {
        Self {
            name: scenario.volume_name(),
            encryption: scenario.encryption.clone(),
            backup: scenario.backup.clone(),
            partitioner: scenario.partitioner.clone(),
        }
    }
}

/// Disk form contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskRequest {
    pub name: String,
    pub volume: String,
    pub provider: String,
    pub free_space_gb: u32,
    pub credentials: FormCredentials,
}

/// Names shown in the account panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNames {
    pub first_name: String,
    pub last_name: String,
}

/// Console actions, one browser session per implementor
#[async_trait]
pub trait Frontend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> E2eResult<()>;
    async fn logout(&self) -> E2eResult<()>;
    async fn page_contains(&self, text: &str) -> E2eResult<bool>;

    async fn register(&self, account: &TestAccount) -> E2eResult<()>;

    /// Change names and password from the account panel
    async fn update_account(
        &self,
        names: &AccountNames,
        current_password: &str,
        new_password: &str,
    ) -> E2eResult<()>;

    async fn read_account(&self) -> E2eResult<AccountNames>;

    async fn create_volume(&self, request: &VolumeRequest) -> E2eResult<()>;
    async fn delete_volume(&self, name: &str) -> E2eResult<()>;

    async fn create_disk(&self, request: &DiskRequest) -> E2eResult<()>;
    async fn delete_disk(&self, name: &str) -> E2eResult<()>;

    /// Upload a local file into `volume`
    async fn upload(&self, volume: &str, path: &Path) -> E2eResult<()>;

    /// Download a file of the currently open volume
    async fn download(&self, file_name: &str) -> E2eResult<()>;

    async fn delete_file(&self, file_name: &str) -> E2eResult<()>;

    /// End the session
    async fn close(&self) -> E2eResult<()>;
}

/// Opens a fresh [`Frontend`] session per test
#[async_trait]
pub trait Launcher: Send + Sync {
    type Frontend: Frontend;

    async fn launch(&self) -> E2eResult<Self::Frontend>;
}
