//! Reference payloads uploaded and downloaded by every scenario

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::browser::WaitOutcome;
use crate::error::{E2eError, E2eResult};

pub const MIB: u64 = 1024 * 1024;

/// Payload sizes in MiB. Each file is named after its size.
pub const REFERENCE_SIZES_MIB: [u64; 2] = [16, 4];

/// Suffix Chrome gives a download still in flight
const PARTIAL_SUFFIX: &str = ".crdownload";

/// A local file the scenarios upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

impl Payload {
    /// Where the browser drops this payload when downloading it
    pub fn download_path(&self, download_dir: &Path) -> PathBuf {
        download_dir.join(&self.name)
    }
}

/// Make sure every reference payload exists in `dir` with the right size.
///
/// Missing or truncated files are regenerated with random content.
pub fn ensure_reference_payloads(dir: &Path) -> E2eResult<Vec<Payload>> {
    std::fs::create_dir_all(dir)?;
    REFERENCE_SIZES_MIB
        .iter()
        .map(|mib| ensure_payload(dir, &mib.to_string(), mib * MIB))
        .collect()
}

pub fn ensure_payload(dir: &Path, name: &str, size: u64) -> E2eResult<Payload> {
    let path = dir.join(name);
    let current = std::fs::metadata(&path).map(|m| m.len()).ok();
    if current != Some(size) {
        info!("Generating {} byte payload at {}", size, path.display());
        generate(&path, size)?;
    }
    Ok(Payload {
        name: name.to_string(),
        size,
        path,
    })
}

/// Write `size` random bytes to `path`
pub fn generate(path: &Path, size: u64) -> E2eResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut rng = rand::thread_rng();
    let mut chunk = vec![0u8; MIB as usize];
    let mut remaining = size;
    while remaining > 0 {
        let n = remaining.min(MIB) as usize;
        rng.fill_bytes(&mut chunk[..n]);
        out.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    out.flush()?;
    Ok(())
}

/// Byte-for-byte comparison of a download against its original
pub fn compare(original: &Path, downloaded: &Path) -> E2eResult<()> {
    let expected = std::fs::read(original)?;
    let actual = std::fs::read(downloaded)?;
    if expected == actual {
        debug!("{} matches {}", downloaded.display(), original.display());
        return Ok(());
    }
    Err(E2eError::PayloadMismatch {
        name: original
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        expected: hex::encode(Sha256::digest(&expected)),
        actual: hex::encode(Sha256::digest(&actual)),
    })
}

/// Poll until `path` exists and the browser no longer writes to it
pub async fn wait_for_download(path: &Path, timeout: Duration, poll: Duration) -> WaitOutcome {
    let mut partial = path.as_os_str().to_owned();
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    let start = Instant::now();
    loop {
        if path.exists() && !partial.exists() {
            return WaitOutcome::Ready;
        }
        if start.elapsed() >= timeout {
            return WaitOutcome::TimedOut;
        }
        tokio::time::sleep(poll).await;
    }
}

/// Remove a downloaded copy; absent files are fine
pub fn remove_download(path: &Path) -> E2eResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
