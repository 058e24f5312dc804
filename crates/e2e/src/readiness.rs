//! Waiting for the console to come up before launching browsers

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// How long and how often to probe
#[derive(Debug, Clone)]
pub struct Probe {
    pub timeout: Duration,
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// Poll `url` until it answers with a success status
pub async fn wait_for_frontend(url: &str, probe: &Probe) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(probe.request_timeout)
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < probe.timeout {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("{} is up after {} attempt(s)", url, attempts);
                return Ok(());
            }
            Ok(resp) => {
                warn!("{} returned {}", url, resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {}...", url);
                }
                if !e.is_connect() {
                    warn!("Probe error: {}", e);
                }
            }
        }

        sleep(probe.interval).await;
    }

    Err(E2eError::FrontendUnreachable {
        url: url.to_string(),
        attempts,
    })
}
