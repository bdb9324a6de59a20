use std::collections::HashSet;
use std::time::Duration;

use crate::core::error::FeedError;
use crate::core::job::JobRecord;

pub const DEFAULT_FEED_URL: &str = "https://flow.gabrielcredico.de/webhook/berlin-ui-ux-job-feed";

pub trait FeedSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<JobRecord>, FeedError>;
}

pub struct FeedClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jobwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for FeedClient {
    fn fetch(&self) -> Result<Vec<JobRecord>, FeedError> {
        let resp = self.client.get(&self.url).send()?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, status = status.as_u16(), "Feed returned error status");
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text()?;
        let jobs: Vec<JobRecord> = serde_json::from_str(&body)?;
        tracing::debug!(url = %self.url, count = jobs.len(), "Fetched job feed");
        Ok(jobs)
    }
}

/// Keeps the first record for every link, in feed order. Records without a link are dropped.
pub fn dedupe_by_link(jobs: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| {
            if !job.has_link() {
                tracing::debug!(id = job.identifier(), title = %job.title, "Dropping job without a link");
                return false;
            }
            seen.insert(job.link.clone())
        })
        .collect()
}
