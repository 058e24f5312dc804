//! What the runner needs from the backend database

use async_trait::async_trait;

use crate::error::E2eResult;

/// Disk row inserted directly, for providers whose consent flow cannot be driven
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededDisk {
    pub name: String,
    pub volume_uuid: String,
    pub provider: String,
    pub credentials: String,
    pub free_space_gb: u32,
}

/// Read and repair access to the console's state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// UUID of the live volume called `name`
    async fn volume_uuid(&self, name: &str) -> E2eResult<Option<String>>;

    async fn disk_count(&self, volume_uuid: &str) -> E2eResult<usize>;
    async fn disk_exists(&self, name: &str) -> E2eResult<bool>;
    async fn file_exists(&self, volume_uuid: &str, name: &str) -> E2eResult<bool>;
    async fn user_exists(&self, email: &str) -> E2eResult<bool>;

    async fn seed_disk(&self, disk: &SeededDisk) -> E2eResult<()>;

    /// Returns the number of rows removed
    async fn delete_user(&self, email: &str) -> E2eResult<u64>;

    /// Remove a volume with its disks and files, whatever state they are in
    async fn purge_volume(&self, volume_uuid: &str) -> E2eResult<()>;
}
