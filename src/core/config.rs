use std::path::PathBuf;
use std::time::Duration;

use crate::core::feed::DEFAULT_FEED_URL;
use crate::core::poller::DEFAULT_POLL_INTERVAL;
use crate::core::tracker::TrackingMode;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const STORE_FILE_NAME: &str = "job-tracker.json";
pub const LOG_FILE_NAME: &str = "jobwatch.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyMethod {
    Desktop,
    #[default]
    Bell,
    Off,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub feed_url: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// `None` keeps the seen set in memory only.
    pub store_path: Option<PathBuf>,
    pub log_path: PathBuf,
    pub tracking: TrackingMode,
    pub notify: NotifyMethod,
    pub title_filter: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            store_path: Some(data_dir.join(STORE_FILE_NAME)),
            log_path: data_dir.join(LOG_FILE_NAME),
            tracking: TrackingMode::default(),
            notify: NotifyMethod::default(),
            title_filter: false,
        }
    }
}

/// `$XDG_DATA_HOME/jobwatch`, then `$HOME/.local/share/jobwatch`, then `./.jobwatch`.
pub fn default_data_dir() -> PathBuf {
    data_dir_from(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn data_dir_from(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = xdg_data_home.filter(|p| p.is_absolute()) {
        return dir.join("jobwatch");
    }
    if let Some(home) = home.filter(|p| !p.as_os_str().is_empty()) {
        return home.join(".local").join("share").join("jobwatch");
    }
    PathBuf::from(".jobwatch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_xdg_data_home() {
        let dir = data_dir_from(Some(PathBuf::from("/data")), Some(PathBuf::from("/home/u")));
        assert_eq!(dir, PathBuf::from("/data/jobwatch"));
    }

    #[test]
    fn relative_xdg_is_ignored() {
        let dir = data_dir_from(Some(PathBuf::from("rel")), Some(PathBuf::from("/home/u")));
        assert_eq!(dir, PathBuf::from("/home/u/.local/share/jobwatch"));
    }

    #[test]
    fn falls_back_to_current_dir() {
        assert_eq!(data_dir_from(None, None), PathBuf::from(".jobwatch"));
    }

    #[test]
    fn defaults_match_feed() {
        let settings = Settings::default();
        assert_eq!(settings.feed_url, DEFAULT_FEED_URL);
        assert_eq!(settings.poll_interval, Duration::from_secs(900));
        assert_eq!(settings.tracking, TrackingMode::Highlight);
        assert!(settings.store_path.is_some());
    }
}
