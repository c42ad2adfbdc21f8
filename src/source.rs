use crate::config::SourceConfig;
use crate::error::{EtlError, Result};
use crate::types::{DirectoryResponse, RawMeetingRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Upstream meeting directory. A fetch failure is fatal to the run.
#[async_trait]
pub trait MeetingDirectory: Send + Sync {
    async fn fetch_meetings(&self) -> Result<Vec<RawMeetingRecord>>;
}

/// Client for a BMLT-style root server search endpoint.
pub struct BmltDirectoryClient {
    client: reqwest::Client,
    url: String,
}

impl BmltDirectoryClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl MeetingDirectory for BmltDirectoryClient {
    #[instrument(skip(self))]
    async fn fetch_meetings(&self) -> Result<Vec<RawMeetingRecord>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::LookupStatus {
                endpoint: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        let directory: DirectoryResponse = serde_json::from_str(&body)?;
        info!(count = directory.meetings.len(), "Fetched meetings from directory");
        Ok(directory.meetings)
    }
}

/// Writes a batch snapshot (raw or enriched) as pretty JSON, creating
/// the parent directory when needed.
pub fn save_snapshot<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "Wrote snapshot");
    Ok(())
}

/// Reads a previously written batch snapshot.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
