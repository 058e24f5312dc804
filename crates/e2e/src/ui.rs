//! Console flows over a WebDriver session

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use dcfs_common::OptionChoice;

use crate::browser::{release, BrowserConfig, BrowserHandle};
use crate::config::{E2eConfig, TestAccount};
use crate::error::{E2eError, E2eResult};
use crate::frontend::{AccountNames, DiskRequest, Frontend, Launcher, VolumeRequest};
use crate::selectors as sel;

/// Pauses and bounded waits used by the flows
#[derive(Debug, Clone)]
pub struct UiTimings {
    pub page_load: Duration,
    pub transfer: Duration,
    pub settle: Duration,
    pub disk_settle: Duration,
}

impl UiTimings {
    pub fn from_config(config: &E2eConfig) -> Self {
        Self {
            page_load: config.waits.page_load(),
            transfer: config.waits.transfer(),
            settle: config.waits.settle(),
            disk_settle: config.waits.disk_settle(),
        }
    }
}

/// The DCFS console driven through a browser
pub struct DcfsUi {
    browser: BrowserHandle,
    timings: UiTimings,
}

impl DcfsUi {
    pub fn new(browser: BrowserHandle, timings: UiTimings) -> Self {
        Self { browser, timings }
    }

    async fn settle(&self) {
        self.browser.settle(self.timings.settle).await;
    }

    async fn open_nav(&self, position: isize) -> E2eResult<()> {
        self.browser.click_nth(sel::MENU_ITEM, position).await?;
        self.settle().await;
        Ok(())
    }

    async fn open_account_panel(&self) -> E2eResult<()> {
        self.browser.click_nth(sel::AVATAR, 0).await?;
        self.settle().await;
        self.browser.click_nth(sel::PRIMARY_BUTTON, 0).await?;
        self.settle().await;
        Ok(())
    }

    /// Open the select at `field` and pick the option at the choice's token
    async fn choose(&self, field: isize, choice: &OptionChoice) -> E2eResult<()> {
        debug!("Choosing '{}' (token {})", choice.name, choice.token);
        self.browser.click_nth(sel::FORM_FIELD, field).await?;
        self.settle().await;
        self.browser
            .click_nth(sel::DROPDOWN_OPTION, choice.token as isize)
            .await?;
        self.settle().await;
        Ok(())
    }

    /// Click the delete button of the card titled `name`, then confirm
    async fn delete_card(&self, name: &str) -> E2eResult<()> {
        let position = self
            .browser
            .position_with_text(sel::CARD_TITLE, name, false)
            .await?;
        self.browser
            .click_nth(sel::DELETE_BUTTON, position as isize)
            .await?;
        self.settle().await;
        self.browser.click_nth(sel::PRIMARY_BUTTON, -1).await?;
        self.browser.settle(self.timings.settle * 2).await;
        Ok(())
    }

    /// Open the context menu of a file and pick `action`
    async fn file_action(&self, file_name: &str, action: &str) -> E2eResult<()> {
        self.browser
            .context_click_with_text(sel::FILE_BLOCK, file_name)
            .await?;
        self.browser.click_with_text(sel::MENU_ITEM, action).await
    }
}

#[async_trait]
impl Frontend for DcfsUi {
    async fn login(&self, email: &str, password: &str) -> E2eResult<()> {
        self.browser
            .expect_present(sel::INPUT, self.timings.page_load, "login form")
            .await?;
        self.browser.type_nth(sel::INPUT, 0, email).await?;
        self.browser.type_nth(sel::INPUT, 1, password).await?;
        self.browser.click_nth(sel::PRIMARY_BUTTON, 0).await?;
        self.browser
            .expect_present(sel::DASHBOARD, self.timings.page_load, "dashboard")
            .await?;
        debug!("Logged in as {}", email);
        Ok(())
    }

    async fn logout(&self) -> E2eResult<()> {
        self.browser.click_nth(sel::AVATAR, 0).await?;
        self.settle().await;
        self.browser.click_nth(sel::PRIMARY_BUTTON, 1).await?;
        self.settle().await;
        Ok(())
    }

    async fn page_contains(&self, text: &str) -> E2eResult<bool> {
        Ok(self.browser.page_source().await?.contains(text))
    }

    async fn register(&self, account: &TestAccount) -> E2eResult<()> {
        self.browser
            .expect_present(sel::REGISTER_LINK, self.timings.page_load, "register link")
            .await?;
        self.browser.click_nth(sel::REGISTER_LINK, 0).await?;
        self.browser.settle(self.timings.settle * 2).await;

        let fields = [
            account.first_name.as_str(),
            account.last_name.as_str(),
            account.email.as_str(),
            account.password.as_str(),
            account.password.as_str(),
        ];
        for (i, value) in fields.iter().enumerate() {
            self.browser.type_nth(sel::INPUT, i as isize, value).await?;
        }
        self.browser.click_nth(sel::PRIMARY_BUTTON, 0).await?;
        self.settle().await;
        info!("Registered {}", account.email);
        Ok(())
    }

    async fn update_account(
        &self,
        names: &AccountNames,
        current_password: &str,
        new_password: &str,
    ) -> E2eResult<()> {
        self.open_account_panel().await?;

        self.browser.replace_nth(sel::INPUT, 0, &names.first_name).await?;
        self.browser.replace_nth(sel::INPUT, 1, &names.last_name).await?;
        self.browser.click_nth(sel::PRIMARY_BUTTON, 0).await?;
        self.settle().await;

        self.browser.type_nth(sel::INPUT, 2, current_password).await?;
        self.browser.type_nth(sel::INPUT, 3, new_password).await?;
        self.browser.type_nth(sel::INPUT, 4, new_password).await?;
        self.browser.click_nth(sel::PRIMARY_BUTTON, 1).await?;
        self.browser.settle(self.timings.settle * 2).await;
        Ok(())
    }

    async fn read_account(&self) -> E2eResult<AccountNames> {
        self.open_account_panel().await?;
        Ok(AccountNames {
            first_name: self.browser.value_nth(sel::INPUT, 0).await?,
            last_name: self.browser.value_nth(sel::INPUT, 1).await?,
        })
    }

    async fn create_volume(&self, request: &VolumeRequest) -> E2eResult<()> {
        self.open_nav(sel::NAV_VOLUMES).await?;
        self.browser.click_nth(sel::POSITIVE_BUTTON, 0).await?;
        self.settle().await;

        self.browser.type_nth(sel::INPUT, 0, &request.name).await?;
        self.choose(sel::VOLUME_FIELD_BACKUP, &request.backup).await?;
        self.choose(sel::VOLUME_FIELD_ENCRYPTION, &request.encryption).await?;
        self.choose(sel::VOLUME_FIELD_PARTITIONER, &request.partitioner).await?;

        self.browser.click_nth(sel::POSITIVE_BUTTON, 1).await?;
        self.browser.settle(self.timings.settle * 2).await;
        info!("Created volume {}", request.name);
        Ok(())
    }

    async fn delete_volume(&self, name: &str) -> E2eResult<()> {
        self.open_nav(sel::NAV_VOLUMES).await?;
        self.delete_card(name).await?;
        info!("Deleted volume {}", name);
        Ok(())
    }

    async fn create_disk(&self, request: &DiskRequest) -> E2eResult<()> {
        self.open_nav(sel::NAV_DISKS).await?;
        self.browser.click_nth(sel::POSITIVE_BUTTON, 0).await?;
        self.settle().await;

        self.browser.type_nth(sel::INPUT, 0, &request.name).await?;

        self.browser.click_nth(sel::FORM_FIELD, sel::DISK_FIELD_VOLUME).await?;
        self.settle().await;
        self.browser
            .click_with_text(sel::DROPDOWN_OPTION, &request.volume)
            .await?;
        self.settle().await;

        self.browser
            .type_nth(sel::INPUT, 1, &request.free_space_gb.to_string())
            .await?;

        self.browser.click_nth(sel::FORM_FIELD, sel::DISK_FIELD_PROVIDER).await?;
        self.settle().await;
        self.browser
            .click_with_text(sel::DROPDOWN_OPTION, &request.provider)
            .await?;
        self.settle().await;

        // credential inputs render only once a provider is picked
        let c = &request.credentials;
        let port = c.port.to_string();
        let values = [
            c.login.as_str(),
            c.password.as_str(),
            c.host.as_str(),
            port.as_str(),
            c.path.as_str(),
        ];
        for (i, value) in values.iter().enumerate() {
            self.browser
                .type_nth(sel::INPUT, 2 + i as isize, value)
                .await?;
        }
        self.settle().await;

        self.browser.click_nth(sel::POSITIVE_BUTTON, 1).await?;
        self.browser.settle(self.timings.disk_settle).await;
        info!("Created {} disk {}", request.provider, request.name);
        Ok(())
    }

    async fn delete_disk(&self, name: &str) -> E2eResult<()> {
        self.open_nav(sel::NAV_DISKS).await?;
        self.delete_card(name).await?;
        info!("Deleted disk {}", name);
        Ok(())
    }

    async fn upload(&self, volume: &str, path: &Path) -> E2eResult<()> {
        self.browser.click_nth(sel::VOLUME_PICKER, 0).await?;
        self.settle().await;
        self.browser
            .click_with_text(sel::DROPDOWN_OPTION, volume)
            .await?;
        self.settle().await;

        self.browser.upload(sel::FILE_INPUT_ID, path).await?;
        // the progress card may never render for small files, so no wait for it to appear
        self.browser.settle(self.timings.settle * 2).await;
        self.browser
            .expect_gone(sel::TRANSFER_PROGRESS, self.timings.transfer, "upload to finish")
            .await?;
        Ok(())
    }

    async fn download(&self, file_name: &str) -> E2eResult<()> {
        self.file_action(file_name, sel::TEXT_DOWNLOAD).await?;
        self.settle().await;
        self.browser
            .expect_gone(sel::TRANSFER_PROGRESS, self.timings.transfer, "download to finish")
            .await
    }

    async fn delete_file(&self, file_name: &str) -> E2eResult<()> {
        self.file_action(file_name, sel::TEXT_DELETE).await?;
        self.browser.click_nth(sel::PRIMARY_BUTTON, 0).await?;
        self.browser.settle(self.timings.settle * 5).await;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        self.browser.quit().await
    }
}

/// Opens a logged-out console in a new Chrome session
pub struct DcfsLauncher {
    front_url: String,
    browser: BrowserConfig,
    timings: UiTimings,
}

impl DcfsLauncher {
    pub fn new(front_url: String, browser: BrowserConfig, timings: UiTimings) -> Self {
        Self {
            front_url,
            browser,
            timings,
        }
    }

    pub fn from_config(config: &E2eConfig) -> Self {
        Self::new(
            config.front_url.clone(),
            BrowserConfig {
                webdriver_url: config.webdriver_url.clone(),
                headless: config.headless,
                download_dir: config.download_dir.clone(),
                maximize: true,
                poll_interval: config.waits.poll_interval(),
                strict_waits: config.waits.strict,
            },
            UiTimings::from_config(config),
        )
    }
}

#[async_trait]
impl Launcher for DcfsLauncher {
    type Frontend = DcfsUi;

    async fn launch(&self) -> E2eResult<DcfsUi> {
        let browser = BrowserHandle::launch(&self.browser).await?;
        if let Err(e) = browser.goto(&self.front_url).await {
            release(browser.quit()).await;
            return Err(E2eError::StepFailed {
                step: format!("open {}", self.front_url),
                reason: e.to_string(),
            });
        }
        Ok(DcfsUi::new(browser, self.timings.clone()))
    }
}
