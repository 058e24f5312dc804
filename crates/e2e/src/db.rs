//! MySQL access to the DCFS backend's state

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Pool, TxOpts};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{E2eError, E2eResult};
use crate::store::{SeededDisk, StateStore};

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Connection pool against the backend database
pub struct MysqlStore {
    pool: Pool,
    /// Account seeded disks are attributed to
    owner_email: String,
}

impl MysqlStore {
    pub fn new(config: &DatabaseConfig, owner_email: impl Into<String>) -> Self {
        let opts = OptsBuilder::default()
            .ip_or_hostname(config.address.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.name.clone()));

        Self {
            pool: Pool::new(opts),
            owner_email: owner_email.into(),
        }
    }

    async fn conn(&self) -> E2eResult<Conn> {
        Ok(self.pool.get_conn().await?)
    }

    /// Fail early when the database is unreachable
    pub async fn ping(&self) -> E2eResult<()> {
        let mut conn = self.conn().await?;
        conn.ping().await?;
        info!("Database reachable");
        Ok(())
    }

    pub async fn disconnect(self) -> E2eResult<()> {
        self.pool.disconnect().await?;
        Ok(())
    }

    async fn count(&self, query: &str, params: impl Into<mysql_async::Params> + Send) -> E2eResult<u64> {
        let mut conn = self.conn().await?;
        let count: Option<u64> = conn.exec_first(query, params).await?;
        Ok(count.unwrap_or(0))
    }
}

#[async_trait]
impl StateStore for MysqlStore {
    async fn volume_uuid(&self, name: &str) -> E2eResult<Option<String>> {
        let mut conn = self.conn().await?;
        let uuid: Option<String> = conn
            .exec_first(
                "SELECT uuid FROM volumes WHERE name = ? AND deleted_at IS NULL",
                (name,),
            )
            .await?;
        Ok(uuid)
    }

    async fn disk_count(&self, volume_uuid: &str) -> E2eResult<usize> {
        let n = self
            .count("SELECT COUNT(*) FROM disks WHERE volume_uuid = ?", (volume_uuid,))
            .await?;
        Ok(n as usize)
    }

    async fn disk_exists(&self, name: &str) -> E2eResult<bool> {
        Ok(self.count("SELECT COUNT(*) FROM disks WHERE name = ?", (name,)).await? > 0)
    }

    async fn file_exists(&self, volume_uuid: &str, name: &str) -> E2eResult<bool> {
        let n = self
            .count(
                "SELECT COUNT(*) FROM files WHERE volume_uuid = ? AND name = ? AND deleted_at IS NULL",
                (volume_uuid, name),
            )
            .await?;
        Ok(n > 0)
    }

    async fn user_exists(&self, email: &str) -> E2eResult<bool> {
        Ok(self.count("SELECT COUNT(*) FROM users WHERE email = ?", (email,)).await? > 0)
    }

    async fn seed_disk(&self, disk: &SeededDisk) -> E2eResult<()> {
        let mut conn = self.conn().await?;

        let provider_uuid: String = conn
            .exec_first("SELECT uuid FROM providers WHERE name = ?", (&disk.provider,))
            .await?
            .ok_or_else(|| E2eError::Config(format!("unknown provider '{}'", disk.provider)))?;
        let user_uuid: String = conn
            .exec_first("SELECT uuid FROM users WHERE email = ?", (&self.owner_email,))
            .await?
            .ok_or_else(|| E2eError::Config(format!("unknown user '{}'", self.owner_email)))?;

        conn.exec_drop(
            "INSERT INTO disks (uuid, user_uuid, volume_uuid, provider_uuid, credentials, name, free_space) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                user_uuid,
                &disk.volume_uuid,
                provider_uuid,
                &disk.credentials,
                &disk.name,
                u64::from(disk.free_space_gb) * BYTES_PER_GB,
            ),
        )
        .await?;

        debug!("Seeded {} disk {}", disk.provider, disk.name);
        Ok(())
    }

    async fn delete_user(&self, email: &str) -> E2eResult<u64> {
        let mut conn = self.conn().await?;
        conn.exec_drop("DELETE FROM users WHERE email = ?", (email,))
            .await?;
        Ok(conn.affected_rows())
    }

    async fn purge_volume(&self, volume_uuid: &str) -> E2eResult<()> {
        let mut conn = self.conn().await?;
        let mut tx = conn.start_transaction(TxOpts::default()).await?;
        tx.exec_drop("DELETE FROM files WHERE volume_uuid = ?", (volume_uuid,))
            .await?;
        tx.exec_drop("DELETE FROM disks WHERE volume_uuid = ?", (volume_uuid,))
            .await?;
        tx.exec_drop("DELETE FROM volumes WHERE uuid = ?", (volume_uuid,))
            .await?;
        tx.commit().await?;

        info!("Purged volume {}", volume_uuid);
        Ok(())
    }
}
