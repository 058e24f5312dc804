//! Scenario runner: drives one expanded scenario through the console and
//! checks every step against the database

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use dcfs_common::Scenario;

use crate::browser::require;
use crate::config::{E2eConfig, ProviderSettings};
use crate::error::{E2eError, E2eResult};
use crate::frontend::{DiskRequest, Frontend, VolumeRequest};
use crate::payload::{self, Payload};
use crate::store::{SeededDisk, StateStore};

/// File the suite results are written to inside the output directory
pub const RESULTS_FILE: &str = "test-results.json";

/// Outcome of one step of a test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,
    pub error: Option<String>,
}

/// Result of running a whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(started_at: DateTime<Utc>, duration: Duration, results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            skipped: 0,
            duration_ms: duration.as_millis() as u64,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Write the results as JSON into `output_dir`
    pub fn write_to(&self, output_dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(RESULTS_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Results written to {}", path.display());
        Ok(path)
    }
}

/// Timed step log of one test
#[derive(Debug, Default)]
pub struct StepLog {
    records: Vec<StepRecord>,
}

impl StepLog {
    /// Run `fut` as a named step and record how it went
    pub async fn step<T, Fut>(&mut self, name: impl Into<String>, fut: Fut) -> E2eResult<T>
    where
        Fut: Future<Output = E2eResult<T>>,
    {
        let name = name.into();
        debug!("Step: {}", name);
        let start = Instant::now();
        let outcome = fut.await;
        self.records.push(StepRecord {
            name,
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.as_ref().err().map(|e| e.to_string()),
        });
        outcome
    }

    /// Close the log into a test result
    pub fn finish(self, name: impl Into<String>, start: Instant, outcome: E2eResult<()>) -> TestResult {
        let name = name.into();
        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(()) => info!("✓ {} ({} ms)", name, duration_ms),
            Err(e) => error!("✗ {} - {}", name, e),
        }
        TestResult {
            name,
            success: outcome.is_ok(),
            duration_ms,
            steps: self.records,
            error: outcome.err().map(|e| e.to_string()),
        }
    }
}

/// Fail with `message` unless `condition` holds
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message()))
    }
}

/// Everything a scenario needs besides the console and the database
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub payloads: Vec<Payload>,
    pub download_dir: PathBuf,
    pub disk_free_space_gb: u32,
    pub providers: BTreeMap<String, ProviderSettings>,
    pub transfer_timeout: Duration,
    pub poll_interval: Duration,
    pub strict_waits: bool,
}

impl RunSettings {
    pub fn from_config(config: &E2eConfig, payloads: Vec<Payload>) -> Self {
        Self {
            payloads,
            download_dir: config.download_dir.clone(),
            disk_free_space_gb: config.disk_free_space_gb,
            providers: config.providers.clone(),
            transfer_timeout: config.waits.transfer(),
            poll_interval: config.waits.poll_interval(),
            strict_waits: config.waits.strict,
        }
    }

    fn provider(&self, name: &str) -> E2eResult<&ProviderSettings> {
        self.providers
            .get(name)
            .ok_or_else(|| E2eError::Config(format!("no settings for provider '{}'", name)))
    }
}

/// Name of the `position`-th disk attached to `volume`
pub fn disk_name(volume: &str, position: usize) -> String {
    format!("{}_disk{}", volume, position)
}

/// Runs scenarios one at a time against a logged-in console
pub struct ScenarioRunner<'a, S: StateStore> {
    store: &'a S,
    settings: &'a RunSettings,
}

impl<'a, S: StateStore> ScenarioRunner<'a, S> {
    pub fn new(store: &'a S, settings: &'a RunSettings) -> Self {
        Self { store, settings }
    }

    /// Run one scenario to completion. Failures are captured in the result;
    /// a failed scenario leaves no volume behind.
    pub async fn run<F: Frontend>(&self, frontend: &F, scenario: &Scenario) -> TestResult {
        let span = info_span!("scenario", index = scenario.index, name = %scenario.name);
        async {
            info!("Running {}", scenario);
            let start = Instant::now();
            let mut steps = StepLog::default();
            let mut volume_uuid = None;

            let outcome = self
                .execute(frontend, scenario, &mut steps, &mut volume_uuid)
                .await;
            if outcome.is_err() {
                self.cleanup(scenario, volume_uuid).await;
            }
            steps.finish(scenario.name.clone(), start, outcome)
        }
        .instrument(span)
        .await
    }

    async fn execute<F: Frontend>(
        &self,
        frontend: &F,
        scenario: &Scenario,
        steps: &mut StepLog,
        volume_uuid: &mut Option<String>,
    ) -> E2eResult<()> {
        let volume = scenario.volume_name();
        let store = self.store;

        let request = VolumeRequest::for_scenario(scenario);
        let uuid = steps
            .step("create volume", async {
                frontend.create_volume(&request).await?;
                store.volume_uuid(&volume).await?.ok_or_else(|| {
                    E2eError::AssertionFailed(format!("volume {} missing from the database", volume))
                })
            })
            .await?;
        *volume_uuid = Some(uuid.clone());

        for (position, provider) in scenario.disks.iter().enumerate() {
            let name = disk_name(&volume, position);
            steps
                .step(format!("attach {} disk {}", provider, name), async {
                    self.attach_disk(frontend, &volume, &uuid, provider, &name).await
                })
                .await?;
        }
        steps
            .step("verify disks", async {
                let count = store.disk_count(&uuid).await?;
                ensure(count == scenario.disks.len(), || {
                    format!("expected {} disks on {}, found {}", scenario.disks.len(), volume, count)
                })
            })
            .await?;

        for payload in &self.settings.payloads {
            steps
                .step(format!("upload {}", payload.name), async {
                    frontend.upload(&volume, &payload.path).await?;
                    let stored = store.file_exists(&uuid, &payload.name).await?;
                    ensure(stored, || format!("file {} missing from the database", payload.name))
                })
                .await?;
        }

        for payload in &self.settings.payloads {
            let target = payload.download_path(&self.settings.download_dir);
            steps
                .step(format!("download {}", payload.name), async {
                    payload::remove_download(&target)?;
                    frontend.download(&payload.name).await?;
                    let outcome = payload::wait_for_download(
                        &target,
                        self.settings.transfer_timeout,
                        self.settings.poll_interval,
                    )
                    .await;
                    require(
                        outcome,
                        &format!("download of {}", payload.name),
                        self.settings.strict_waits,
                    )
                })
                .await?;
            steps
                .step(format!("compare {}", payload.name), async {
                    payload::compare(&payload.path, &target)
                })
                .await?;
        }

        for payload in &self.settings.payloads {
            let target = payload.download_path(&self.settings.download_dir);
            steps
                .step(format!("delete {}", payload.name), async {
                    frontend.delete_file(&payload.name).await?;
                    let stored = store.file_exists(&uuid, &payload.name).await?;
                    ensure(!stored, || format!("file {} still in the database", payload.name))?;
                    payload::remove_download(&target)
                })
                .await?;
        }

        steps
            .step("delete volume", async {
                frontend.delete_volume(&volume).await?;
                let remaining = store.volume_uuid(&volume).await?;
                ensure(remaining.is_none(), || format!("volume {} still in the database", volume))
            })
            .await?;
        *volume_uuid = None;

        Ok(())
    }

    async fn attach_disk<F: Frontend>(
        &self,
        frontend: &F,
        volume: &str,
        volume_uuid: &str,
        provider: &str,
        name: &str,
    ) -> E2eResult<()> {
        match self.settings.provider(provider)? {
            ProviderSettings::Form(credentials) => {
                frontend
                    .create_disk(&DiskRequest {
                        name: name.to_string(),
                        volume: volume.to_string(),
                        provider: provider.to_string(),
                        free_space_gb: self.settings.disk_free_space_gb,
                        credentials: credentials.clone(),
                    })
                    .await
            }
            ProviderSettings::Oauth { credentials } => {
                self.store
                    .seed_disk(&SeededDisk {
                        name: name.to_string(),
                        volume_uuid: volume_uuid.to_string(),
                        provider: provider.to_string(),
                        credentials: credentials.clone(),
                        free_space_gb: self.settings.disk_free_space_gb,
                    })
                    .await
            }
        }
    }

    /// Best-effort removal of whatever the failed scenario left behind
    async fn cleanup(&self, scenario: &Scenario, volume_uuid: Option<String>) {
        let uuid = match volume_uuid {
            Some(uuid) => Some(uuid),
            None => self
                .store
                .volume_uuid(&scenario.volume_name())
                .await
                .unwrap_or_else(|e| {
                    warn!("Cleanup lookup failed: {}", e);
                    None
                }),
        };
        if let Some(uuid) = uuid {
            match self.store.purge_volume(&uuid).await {
                Ok(()) => info!("Cleaned up volume {}", uuid),
                Err(e) => warn!("Cleanup of volume {} failed: {}", uuid, e),
            }
        }
        for payload in &self.settings.payloads {
            if let Err(e) = payload::remove_download(&payload.download_path(&self.settings.download_dir)) {
                warn!("Could not remove download {}: {}", payload.name, e);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::config::FormCredentials;
    use dcfs_common::catalog::{PROVIDER_FTP, PROVIDER_GDRIVE, PROVIDER_SFTP};
    use dcfs_common::Catalog;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        world: Shared,
        frontend: FakeFrontend,
        store: FakeStore,
        settings: RunSettings,
    }

    fn form(host: &str) -> ProviderSettings {
        ProviderSettings::Form(FormCredentials {
            login: "user".to_string(),
            password: "pass".to_string(),
            host: host.to_string(),
            port: 22,
            path: "/".to_string(),
        })
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let payload_dir = dir.path().join("payloads");
        let download_dir = dir.path().join("downloads");
        std::fs::create_dir_all(&payload_dir).unwrap();
        let payloads = vec![
            payload::ensure_payload(&payload_dir, "16", 2048).unwrap(),
            payload::ensure_payload(&payload_dir, "4", 512).unwrap(),
        ];

        let mut providers = BTreeMap::new();
        providers.insert(PROVIDER_SFTP.to_string(), form("sftp"));
        providers.insert(PROVIDER_FTP.to_string(), form("ftp"));
        providers.insert(
            PROVIDER_GDRIVE.to_string(),
            ProviderSettings::Oauth {
                credentials: "{\"token\":\"t\"}".to_string(),
            },
        );

        let world = Shared::default();
        Fixture {
            frontend: FakeFrontend::new(world.clone(), &payload_dir, &download_dir),
            store: FakeStore { world: world.clone() },
            settings: RunSettings {
                payloads,
                download_dir,
                disk_free_space_gb: 15,
                providers,
                transfer_timeout: Duration::from_millis(200),
                poll_interval: Duration::from_millis(10),
                strict_waits: true,
            },
            world,
            _dir: dir,
        }
    }

    fn scenario_with(disks: &[&str]) -> Scenario {
        Catalog::dcfs()
            .expand()
            .into_iter()
            .find(|s| s.disks.iter().map(String::as_str).eq(disks.iter().copied()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_raid_scenario_runs_every_step_in_order() {
        let fx = fixture();
        let scenario = scenario_with(&[PROVIDER_SFTP, PROVIDER_FTP, PROVIDER_FTP, PROVIDER_SFTP]);
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;

        assert!(result.success, "{:?}", result.error);
        let volume = scenario.volume_name();
        let calls = fx.world.lock().unwrap().calls.clone();
        assert_eq!(
            calls,
            vec![
                format!("create_volume {}", volume),
                format!("create_disk {}", PROVIDER_SFTP),
                format!("create_disk {}", PROVIDER_FTP),
                format!("create_disk {}", PROVIDER_FTP),
                format!("create_disk {}", PROVIDER_SFTP),
                "upload 16".to_string(),
                "upload 4".to_string(),
                "download 16".to_string(),
                "download 4".to_string(),
                "delete_file 16".to_string(),
                "delete_file 4".to_string(),
                format!("delete_volume {}", volume),
            ]
        );

        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], "create volume");
        assert_eq!(names[5], "verify disks");
        assert_eq!(*names.last().unwrap(), "delete volume");
        assert!(result.steps.iter().all(|s| s.success));

        let world = fx.world.lock().unwrap();
        assert!(world.volumes.is_empty());
        assert!(world.files.is_empty());
        assert!(world.purged.is_empty());
        assert!(!fx.settings.payloads[0].download_path(&fx.settings.download_dir).exists());
    }

    #[tokio::test]
    async fn test_oauth_disks_are_seeded_not_typed() {
        let fx = fixture();
        let scenario = scenario_with(&[PROVIDER_GDRIVE]);
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;

        assert!(result.success, "{:?}", result.error);
        let calls = fx.world.lock().unwrap().calls.clone();
        assert!(calls.contains(&format!("seed_disk {}", PROVIDER_GDRIVE)));
        assert!(!calls.iter().any(|c| c.starts_with("create_disk")));
    }

    #[tokio::test]
    async fn test_failed_upload_purges_volume() {
        let mut fx = fixture();
        fx.frontend.fail_on = Some("upload");
        let scenario = scenario_with(&[PROVIDER_SFTP]);
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("upload"));
        let last = result.steps.last().unwrap();
        assert_eq!(last.name, "upload 16");
        assert!(!last.success);

        let world = fx.world.lock().unwrap();
        assert_eq!(world.purged, vec![format!("uuid-{}", scenario.volume_name())]);
        assert!(world.volumes.is_empty());
        assert!(world.disks.is_empty());
        assert!(!world.calls.iter().any(|c| c.starts_with("delete_volume")));
    }

    #[tokio::test]
    async fn test_corrupted_download_is_reported() {
        let mut fx = fixture();
        fx.frontend.corrupt_downloads = true;
        let scenario = scenario_with(&[PROVIDER_FTP]);
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().starts_with("Payload mismatch: 16"));
        assert_eq!(result.steps.last().unwrap().name, "compare 16");
        assert_eq!(fx.world.lock().unwrap().purged.len(), 1);
        assert!(!fx.settings.payloads[0].download_path(&fx.settings.download_dir).exists());
    }

    #[tokio::test]
    async fn test_volume_missing_from_database_fails_first_step() {
        let mut fx = fixture();
        fx.frontend.skip_db = Some("create_volume");
        let scenario = scenario_with(&[PROVIDER_SFTP]);
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;

        assert!(!result.success);
        assert_eq!(result.steps.len(), 1);
        assert!(result.error.as_deref().unwrap().contains("missing from the database"));
        assert!(fx.world.lock().unwrap().purged.is_empty());
    }

    #[tokio::test]
    async fn test_file_left_in_database_fails_delete_step() {
        let mut fx = fixture();
        fx.frontend.skip_db = Some("delete_file");
        let scenario = scenario_with(&[PROVIDER_SFTP]);
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;

        assert!(!result.success);
        assert_eq!(result.steps.last().unwrap().name, "delete 16");
        assert!(fx.world.lock().unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn test_download_timeout_respects_strictness() {
        let mut fx = fixture();
        // the download never lands because the browser "downloads" elsewhere
        fx.frontend.download_dir = fx.settings.download_dir.join("elsewhere");
        let scenario = scenario_with(&[PROVIDER_SFTP]);

        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;
        assert!(result.error.as_deref().unwrap().starts_with("Timeout waiting for: download of 16"));

        fx.settings.strict_waits = false;
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;
        // lenient waits move on, and the missing file then fails the comparison
        assert_eq!(result.steps.last().unwrap().name, "compare 16");
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_a_config_error() {
        let mut fx = fixture();
        fx.settings.providers.remove(PROVIDER_FTP);
        let scenario = scenario_with(&[PROVIDER_FTP]);
        let result = ScenarioRunner::new(&fx.store, &fx.settings)
            .run(&fx.frontend, &scenario)
            .await;

        assert!(result.error.as_deref().unwrap().contains("no settings for provider 'FTP drive'"));
    }

    #[test]
    fn test_suite_result_counts_and_file() {
        let ok = TestResult {
            name: "a".to_string(),
            success: true,
            duration_ms: 1,
            steps: vec![],
            error: None,
        };
        let failed = TestResult {
            name: "b".to_string(),
            success: false,
            error: Some("boom".to_string()),
            ..ok.clone()
        };
        let suite = TestSuiteResult::from_results(Utc::now(), Duration::from_millis(5), vec![ok, failed]);
        assert_eq!((suite.total, suite.passed, suite.failed), (2, 1, 1));
        assert!(!suite.success());

        let dir = TempDir::new().unwrap();
        let path = suite.write_to(&dir.path().join("out")).unwrap();
        assert!(path.ends_with(RESULTS_FILE));
        let parsed: TestSuiteResult = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.results[1].error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_disk_names() {
        assert_eq!(disk_name("e2e_000_on_raid10_balanced", 3), "e2e_000_on_raid10_balanced_disk3");
    }
}
