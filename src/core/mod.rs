use std::sync::Arc;

pub mod config;
pub mod dashboard;
pub mod error;
pub mod event;
pub mod feed;
pub mod filter;
pub mod formatter;
pub mod job;
pub mod notify;
pub mod poller;
pub mod store;
pub mod tracker;

use config::{NotifyMethod, Settings};
use dashboard::Dashboard;
use error::FeedError;
use feed::FeedClient;
use notify::{BellNotifier, DesktopNotifier, Notifier, NullNotifier};
use poller::FeedPoller;
use store::{JsonFileStore, KeyValueStore, MemoryStore};
use tracker::SeenTracker;

pub type BoxedStore = Box<dyn KeyValueStore>;
pub type BoxedNotifier = Box<dyn Notifier>;
pub type AppDashboard = Dashboard<BoxedStore, BoxedNotifier>;

pub fn open_store(settings: &Settings) -> BoxedStore {
    match &settings.store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using seen jobs store");
            Box::new(JsonFileStore::new(path.clone()))
        }
        None => {
            tracing::info!("Seen jobs kept in memory only");
            Box::new(MemoryStore::new())
        }
    }
}

pub fn build_notifier(method: NotifyMethod) -> BoxedNotifier {
    match method {
        NotifyMethod::Desktop => Box::new(DesktopNotifier::new()),
        NotifyMethod::Bell => Box::new(BellNotifier),
        NotifyMethod::Off => Box::new(NullNotifier),
    }
}

pub fn build_poller(settings: &Settings) -> Result<FeedPoller, FeedError> {
    let client = FeedClient::new(settings.feed_url.clone(), settings.timeout)?;
    tracing::debug!(url = client.url(), interval = ?settings.poll_interval, "Feed poller configured");
    Ok(FeedPoller::new(Arc::new(client), settings.poll_interval))
}

pub fn build_dashboard(settings: &Settings) -> Result<AppDashboard, FeedError> {
    let poller = build_poller(settings)?;
    let tracker = SeenTracker::new(open_store(settings), settings.tracking);
    Ok(Dashboard::new(poller, tracker, build_notifier(settings.notify)))
}
