//! Test suites: account flows, disk lifecycle and the scenario matrix

use chrono::Utc;
use std::time::Instant;
use tracing::{info, warn};

use dcfs_common::catalog::{BACKUP_OFF, ENCRYPTION_OFF, PARTITIONER_BALANCED, PROVIDER_SFTP};
use dcfs_common::{Catalog, OptionGroup, Scenario};

use crate::browser::release;
use crate::config::{Credentials, ProviderSettings, TestAccount};
use crate::error::{E2eError, E2eResult};
use crate::frontend::{AccountNames, DiskRequest, Frontend, Launcher, VolumeRequest};
use crate::runner::{disk_name, ensure, RunSettings, ScenarioRunner, StepLog, TestResult, TestSuiteResult};
use crate::selectors::{TEXT_APP_TITLE, TEXT_LOGGED_OUT};
use crate::store::StateStore;

/// Volume the disk suite creates and removes
pub const DISK_SUITE_VOLUME: &str = "e2e_disk_suite";

/// Which suite a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Suite {
    All,
    User,
    Disk,
    Scenarios,
}

impl Suite {
    pub fn includes(self, other: Suite) -> bool {
        self == Suite::All || self == other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserTest {
    LoginLogout,
    Register,
    UpdateAccount,
    VerifyAndDelete,
}

impl UserTest {
    const ALL: [UserTest; 4] = [
        UserTest::LoginLogout,
        UserTest::Register,
        UserTest::UpdateAccount,
        UserTest::VerifyAndDelete,
    ];

    fn name(self) -> &'static str {
        match self {
            UserTest::LoginLogout => "user: log in and out as root",
            UserTest::Register => "user: register",
            UserTest::UpdateAccount => "user: update account",
            UserTest::VerifyAndDelete => "user: verify update and delete",
        }
    }
}

/// Names the update step switches the test account to
pub fn updated_names(account: &TestAccount) -> AccountNames {
    AccountNames {
        first_name: format!("{}2", account.first_name),
        last_name: format!("{}2", account.last_name),
    }
}

/// Runs suites sequentially, one browser session per test
pub struct SuiteRunner<L: Launcher, S: StateStore> {
    launcher: L,
    store: S,
    root: Credentials,
    account: TestAccount,
    settings: RunSettings,
}

impl<L: Launcher, S: StateStore> SuiteRunner<L, S> {
    pub fn new(launcher: L, store: S, root: Credentials, account: TestAccount, settings: RunSettings) -> Self {
        Self {
            launcher,
            store,
            root,
            account,
            settings,
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run `suite`, with `scenarios` standing for the matrix part
    pub async fn run(&self, suite: Suite, scenarios: &[Scenario]) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();

        if suite.includes(Suite::User) {
            results.extend(self.run_user_suite().await);
        }
        if suite.includes(Suite::Disk) {
            results.push(self.run_disk_suite().await);
        }
        if suite.includes(Suite::Scenarios) {
            results.extend(self.run_scenarios(scenarios).await);
        }

        let result = TestSuiteResult::from_results(started_at, start.elapsed(), results);
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            result.passed, result.failed, result.skipped, result.duration_ms
        );
        result
    }

    /// Each scenario in a fresh session, logged in as root
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> Vec<TestResult> {
        info!("Running {} scenario(s)...", scenarios.len());
        let runner = ScenarioRunner::new(&self.store, &self.settings);
        let mut results = Vec::with_capacity(scenarios.len());

        for scenario in scenarios {
            let start = Instant::now();
            let frontend = match self.launcher.launch().await {
                Ok(f) => f,
                Err(e) => {
                    results.push(StepLog::default().finish(scenario.name.clone(), start, Err(e)));
                    continue;
                }
            };

            let result = match frontend.login(&self.root.email, &self.root.password).await {
                Ok(()) => runner.run(&frontend, scenario).await,
                Err(e) => StepLog::default().finish(scenario.name.clone(), start, Err(e)),
            };
            close(&frontend).await;
            results.push(result);
        }
        results
    }

    pub async fn run_user_suite(&self) -> Vec<TestResult> {
        // a previous aborted run may have left the account behind
        if let Err(e) = self.store.delete_user(&self.account.email).await {
            warn!("Could not remove stale test account: {}", e);
        }

        let mut results = Vec::with_capacity(UserTest::ALL.len());
        for test in UserTest::ALL {
            results.push(self.run_user_test(test).await);
        }

        match self.store.user_exists(&self.account.email).await {
            Ok(true) => {
                if let Err(e) = self.store.delete_user(&self.account.email).await {
                    warn!("Could not remove test account: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => warn!("Could not check for the test account: {}", e),
        }
        results
    }

    async fn run_user_test(&self, test: UserTest) -> TestResult {
        let start = Instant::now();
        let mut steps = StepLog::default();
        let outcome = match self.launcher.launch().await {
            Ok(frontend) => {
                let outcome = match test {
                    UserTest::LoginLogout => self.login_logout(&frontend, &mut steps).await,
                    UserTest::Register => self.register(&frontend, &mut steps).await,
                    UserTest::UpdateAccount => self.update_account(&frontend, &mut steps).await,
                    UserTest::VerifyAndDelete => self.verify_and_delete(&frontend, &mut steps).await,
                };
                close(&frontend).await;
                outcome
            }
            Err(e) => Err(e),
        };
        steps.finish(test.name(), start, outcome)
    }

    async fn login_logout(&self, frontend: &L::Frontend, steps: &mut StepLog) -> E2eResult<()> {
        steps
            .step("log in as root", async {
                frontend.login(&self.root.email, &self.root.password).await?;
                let shown = frontend.page_contains(TEXT_APP_TITLE).await?;
                ensure(shown, || "dashboard title not shown after login".to_string())
            })
            .await?;
        steps
            .step("log out", async {
                frontend.logout().await?;
                let shown = frontend.page_contains(TEXT_LOGGED_OUT).await?;
                ensure(shown, || "login page not shown after logout".to_string())
            })
            .await
    }

    async fn register(&self, frontend: &L::Frontend, steps: &mut StepLog) -> E2eResult<()> {
        steps
            .step("register", async {
                frontend.register(&self.account).await?;
                let exists = self.store.user_exists(&self.account.email).await?;
                ensure(exists, || format!("user {} missing from the database", self.account.email))
            })
            .await
    }

    async fn update_account(&self, frontend: &L::Frontend, steps: &mut StepLog) -> E2eResult<()> {
        let account = &self.account;
        steps
            .step("log in as test account", frontend.login(&account.email, &account.password))
            .await?;
        steps
            .step(
                "change names and password",
                frontend.update_account(&updated_names(account), &account.password, &account.new_password),
            )
            .await?;
        steps.step("log out", frontend.logout()).await
    }

    async fn verify_and_delete(&self, frontend: &L::Frontend, steps: &mut StepLog) -> E2eResult<()> {
        let account = &self.account;
        steps
            .step("log in with new password", frontend.login(&account.email, &account.new_password))
            .await?;
        steps
            .step("check names", async {
                let expected = updated_names(account);
                let shown = frontend.read_account().await?;
                ensure(shown == expected, || format!("expected {:?}, account shows {:?}", expected, shown))
            })
            .await?;
        steps.step("log out", frontend.logout()).await?;
        steps
            .step("delete account", async {
                let removed = self.store.delete_user(&account.email).await?;
                ensure(removed == 1, || format!("expected to delete 1 user, deleted {}", removed))
            })
            .await
    }

    /// Volume and SFTP disk created and removed through the console
    pub async fn run_disk_suite(&self) -> TestResult {
        let name = "disk: SFTP disk lifecycle";
        let start = Instant::now();
        let mut steps = StepLog::default();
        let outcome = match self.launcher.launch().await {
            Ok(frontend) => {
                let outcome = self.disk_lifecycle(&frontend, &mut steps).await;
                if outcome.is_err() {
                    self.purge_disk_suite_volume().await;
                }
                close(&frontend).await;
                outcome
            }
            Err(e) => Err(e),
        };
        steps.finish(name, start, outcome)
    }

    async fn disk_lifecycle(&self, frontend: &L::Frontend, steps: &mut StepLog) -> E2eResult<()> {
        let store = &self.store;
        let volume = DISK_SUITE_VOLUME;
        let disk = disk_name(volume, 0);
        let credentials = match self.settings.providers.get(PROVIDER_SFTP) {
            Some(ProviderSettings::Form(credentials)) => credentials.clone(),
            _ => {
                return Err(E2eError::Config(format!(
                    "the disk suite needs form credentials for '{}'",
                    PROVIDER_SFTP
                )))
            }
        };
        let request = plain_volume(volume)?;

        steps
            .step("log in as root", frontend.login(&self.root.email, &self.root.password))
            .await?;
        let uuid = steps
            .step("create volume", async {
                frontend.create_volume(&request).await?;
                store.volume_uuid(volume).await?.ok_or_else(|| {
                    E2eError::AssertionFailed(format!("volume {} missing from the database", volume))
                })
            })
            .await?;
        steps
            .step("add SFTP disk", async {
                frontend
                    .create_disk(&DiskRequest {
                        name: disk.clone(),
                        volume: volume.to_string(),
                        provider: PROVIDER_SFTP.to_string(),
                        free_space_gb: self.settings.disk_free_space_gb,
                        credentials,
                    })
                    .await?;
                let exists = store.disk_exists(&disk).await?;
                ensure(exists, || format!("disk {} missing from the database", disk))?;
                let count = store.disk_count(&uuid).await?;
                ensure(count == 1, || format!("expected 1 disk on {}, found {}", volume, count))
            })
            .await?;
        steps
            .step("delete disk", async {
                frontend.delete_disk(&disk).await?;
                let exists = store.disk_exists(&disk).await?;
                ensure(!exists, || format!("disk {} still in the database", disk))
            })
            .await?;
        steps
            .step("delete volume", async {
                frontend.delete_volume(volume).await?;
                let remaining = store.volume_uuid(volume).await?;
                ensure(remaining.is_none(), || format!("volume {} still in the database", volume))
            })
            .await
    }

    async fn purge_disk_suite_volume(&self) {
        match self.store.volume_uuid(DISK_SUITE_VOLUME).await {
            Ok(Some(uuid)) => {
                if let Err(e) = self.store.purge_volume(&uuid).await {
                    warn!("Cleanup of volume {} failed: {}", uuid, e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Cleanup lookup failed: {}", e),
        }
    }
}

/// Unencrypted, unreplicated volume on the first partitioner
fn plain_volume(name: &str) -> E2eResult<VolumeRequest> {
    let catalog = Catalog::dcfs();
    let pick = |group: &OptionGroup, choice: &str| {
        group
            .get(choice)
            .cloned()
            .ok_or_else(|| E2eError::Config(format!("no '{}' option in {}", choice, group.kind)))
    };
    Ok(VolumeRequest {
        name: name.to_string(),
        encryption: pick(catalog.encryption(), ENCRYPTION_OFF)?,
        backup: pick(catalog.backup(), BACKUP_OFF)?,
        partitioner: pick(catalog.partitioner(), PARTITIONER_BALANCED)?,
    })
}

async fn close<F: Frontend>(frontend: &F) {
    release(frontend.close()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormCredentials;
    use crate::payload;
    use crate::runner::fakes::*;
    use dcfs_common::catalog::PROVIDER_FTP;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        world: Shared,
        suite: SuiteRunner<FakeLauncher, FakeStore>,
    }

    fn fixture(configure: impl FnOnce(&mut FakeFrontend)) -> Fixture {
        let dir = TempDir::new().unwrap();
        let payload_dir = dir.path().join("payloads");
        let download_dir = dir.path().join("downloads");
        std::fs::create_dir_all(&payload_dir).unwrap();
        let payloads = vec![payload::ensure_payload(&payload_dir, "16", 1024).unwrap()];

        let mut providers = BTreeMap::new();
        for provider in [PROVIDER_SFTP, PROVIDER_FTP] {
            providers.insert(
                provider.to_string(),
                ProviderSettings::Form(FormCredentials {
                    login: "user".to_string(),
                    password: "pass".to_string(),
                    host: "localhost".to_string(),
                    port: 22,
                    path: "/".to_string(),
                }),
            );
        }

        let world = Shared::default();
        let mut frontend = FakeFrontend::new(world.clone(), &payload_dir, &download_dir);
        configure(&mut frontend);

        let suite = SuiteRunner::new(
            FakeLauncher {
                frontend,
                fail_launch: false,
            },
            FakeStore { world: world.clone() },
            Credentials {
                email: "root@root.com".to_string(),
                password: "password".to_string(),
            },
            TestAccount::default(),
            RunSettings {
                payloads,
                download_dir,
                disk_free_space_gb: 15,
                providers,
                transfer_timeout: Duration::from_millis(200),
                poll_interval: Duration::from_millis(10),
                strict_waits: true,
            },
        );
        Fixture {
            _dir: dir,
            world,
            suite,
        }
    }

    #[tokio::test]
    async fn test_user_suite_passes_and_cleans_up() {
        let fx = fixture(|_| {});
        let results = fx.suite.run_user_suite().await;

        assert_eq!(results.len(), 4);
        for result in &results {
            assert!(result.success, "{}: {:?}", result.name, result.error);
        }
        let world = fx.world.lock().unwrap();
        assert!(world.users.is_empty());
        assert_eq!(world.sessions_opened, 4);
        assert_eq!(world.sessions_closed, 4);
    }

    #[tokio::test]
    async fn test_failed_update_is_cleaned_up_anyway() {
        let fx = fixture(|f| f.fail_on = Some("update_account"));
        let results = fx.suite.run_user_suite().await;

        assert!(results[1].success);
        assert!(!results[2].success);
        // the old password still works, so the new one is rejected
        assert!(!results[3].success);
        assert!(fx.world.lock().unwrap().users.is_empty());
    }

    #[tokio::test]
    async fn test_disk_suite_lifecycle() {
        let fx = fixture(|_| {});
        let result = fx.suite.run_disk_suite().await;

        assert!(result.success, "{:?}", result.error);
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["log in as root", "create volume", "add SFTP disk", "delete disk", "delete volume"]
        );
        let world = fx.world.lock().unwrap();
        assert!(world.volumes.is_empty());
        assert!(world.disks.is_empty());
    }

    #[tokio::test]
    async fn test_disk_suite_purges_on_failure() {
        let fx = fixture(|f| f.skip_db = Some("delete_disk"));
        let result = fx.suite.run_disk_suite().await;

        assert!(!result.success);
        assert_eq!(result.steps.last().unwrap().name, "delete disk");
        let world = fx.world.lock().unwrap();
        assert_eq!(world.purged, vec![format!("uuid-{}", DISK_SUITE_VOLUME)]);
        assert!(world.disks.is_empty());
    }

    #[tokio::test]
    async fn test_scenarios_get_a_fresh_session_each() {
        let fx = fixture(|_| {});
        let catalog = Catalog::dcfs()
            .with_providers(vec![PROVIDER_SFTP.to_string(), PROVIDER_FTP.to_string()])
            .unwrap();
        let scenarios: Vec<Scenario> = catalog.expand().into_iter().take(4).collect();

        let result = fx.suite.run(Suite::Scenarios, &scenarios).await;
        assert_eq!(result.total, 4);
        assert!(result.success(), "{:?}", result.results);

        let world = fx.world.lock().unwrap();
        assert_eq!(world.sessions_opened, 4);
        assert_eq!(world.sessions_closed, 4);
        assert_eq!(world.calls.iter().filter(|c| c.starts_with("login root")).count(), 4);
    }

    #[tokio::test]
    async fn test_session_close_failure_does_not_fail_scenarios() {
        let fx = fixture(|f| f.fail_on = Some("close"));
        let catalog = Catalog::dcfs()
            .with_providers(vec![PROVIDER_SFTP.to_string(), PROVIDER_FTP.to_string()])
            .unwrap();
        let scenarios: Vec<Scenario> = catalog.expand().into_iter().take(2).collect();

        let result = fx.suite.run(Suite::Scenarios, &scenarios).await;
        assert!(result.success(), "{:?}", result.results);
        assert_eq!(fx.world.lock().unwrap().sessions_closed, 2);
    }

    #[tokio::test]
    async fn test_launch_failure_fails_each_scenario() {
        let mut fx = fixture(|_| {});
        fx.suite.launcher.fail_launch = true;
        let scenarios: Vec<Scenario> = Catalog::dcfs().expand().into_iter().take(2).collect();

        let results = fx.suite.run_scenarios(&scenarios).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
        assert_eq!(results[0].error.as_deref(), Some("Configuration error: no browser"));
    }

    #[test]
    fn test_suite_selection() {
        assert!(Suite::All.includes(Suite::Disk));
        assert!(Suite::User.includes(Suite::User));
        assert!(!Suite::User.includes(Suite::Scenarios));
    }

    #[test]
    fn test_plain_volume_uses_off_options() {
        let request = plain_volume("v").unwrap();
        assert_eq!(request.encryption.name, ENCRYPTION_OFF);
        assert_eq!(request.backup.name, BACKUP_OFF);
        assert_eq!(request.partitioner.name, PARTITIONER_BALANCED);
    }
}
